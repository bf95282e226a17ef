use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};

use newswire_core::{BatchOutcome, FeedConfig, IngestPipeline, SourceFormat, Storage};

#[derive(Parser)]
#[command(name = "newswire", version, about = "Content record ingestion feed")]
struct Cli {
    /// TOML config file with feed/db/report locations
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Feed file location (overrides config)
    #[arg(long, global = true)]
    feed: Option<PathBuf>,

    /// Dedup index database location (overrides config)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Directory for word_count.csv and letter_stat.csv (overrides config)
    #[arg(long, global = true)]
    reports_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest one source document into the feed
    Ingest {
        path: PathBuf,

        /// Source format; inferred from the file extension when omitted
        #[arg(long, value_enum)]
        format: Option<FormatArg>,
    },
    /// Recompute the statistics reports from the current feed
    Stats,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatArg {
    Txt,
    Json,
    Xml,
}

impl From<FormatArg> for SourceFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Txt => Self::PlainText,
            FormatArg::Json => Self::Json,
            FormatArg::Xml => Self::Xml,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;

    let storage = Storage::open(&config.db_path.to_string_lossy(), &config.feed_path).await?;
    let pipeline = IngestPipeline::new(storage).with_reports_dir(&config.reports_dir);

    match cli.command {
        Commands::Ingest { path, format } => {
            run_ingest(&pipeline, &path, format.map(Into::into)).await
        }
        Commands::Stats => run_stats(&pipeline).await,
    }
}

fn load_config(cli: &Cli) -> Result<FeedConfig> {
    let mut config = match &cli.config {
        Some(path) => toml::from_str(&std::fs::read_to_string(path)?)?,
        None => FeedConfig::default(),
    };

    if let Some(feed) = &cli.feed {
        config.feed_path.clone_from(feed);
    }
    if let Some(db) = &cli.db {
        config.db_path.clone_from(db);
    }
    if let Some(reports_dir) = &cli.reports_dir {
        config.reports_dir.clone_from(reports_dir);
    }

    Ok(config)
}

async fn run_ingest(
    pipeline: &IngestPipeline,
    path: &Path,
    format: Option<SourceFormat>,
) -> Result<()> {
    match pipeline.ingest_file(path, format).await? {
        BatchOutcome::SourceMissing => {
            println!("source not found: {} (nothing to do)", path.display());
        }
        BatchOutcome::Completed(summary) => {
            println!("accepted: {}", summary.accepted);
            println!("duplicates: {}", summary.duplicates);
            println!("rejected: {}", summary.rejected);
            if summary.skipped > 0 {
                println!("skipped: {}", summary.skipped);
            }
            println!("source retained: {}", summary.source_retained);
            for failure in &summary.failures {
                println!("  record {}: {}", failure.ordinal, failure.reason);
            }
        }
    }
    Ok(())
}

async fn run_stats(pipeline: &IngestPipeline) -> Result<()> {
    let stats = pipeline.refresh_reports().await?;
    println!("distinct words: {}", stats.words.len());
    println!("distinct letters: {}", stats.letters.len());
    Ok(())
}
