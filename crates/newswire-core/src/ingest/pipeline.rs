use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::parser::{CompositeParser, FormatParser, ParseError, RecordOutcome, SourceFormat};
use crate::stats::FeedStats;
use crate::storage::{AppendOutcome, Storage};
use crate::{Error, Result};

/// One record-level failure, reported in the batch summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordFailure {
    /// Zero-based position of the record within the source document.
    pub ordinal: usize,
    pub reason: String,
}

/// What happened to one batch, returned to the caller. Record-level errors
/// are collected here and never thrown past the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BatchSummary {
    pub accepted: usize,
    pub duplicates: usize,
    pub rejected: usize,
    pub skipped: usize,
    pub source_retained: bool,
    pub failures: Vec<RecordFailure>,
}

#[derive(Debug)]
pub enum BatchOutcome {
    /// The source document does not exist. Nothing to do, not an error.
    SourceMissing,
    Completed(BatchSummary),
}

/// Drives one batch end to end: read the source document, parse it, persist
/// each record, delete or retain the source, and rebuild the statistics
/// reports. The persistence handle is passed in explicitly; there is no
/// process-wide feed.
pub struct IngestPipeline {
    storage: Storage,
    parser: CompositeParser,
    reports_dir: PathBuf,
}

impl IngestPipeline {
    #[must_use]
    pub fn new(storage: Storage) -> Self {
        Self {
            storage,
            parser: CompositeParser::default(),
            reports_dir: PathBuf::from("."),
        }
    }

    #[must_use]
    pub fn with_parser(mut self, parser: CompositeParser) -> Self {
        self.parser = parser;
        self
    }

    #[must_use]
    pub fn with_reports_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.reports_dir = dir.into();
        self
    }

    #[must_use]
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Run one batch against one source document. `format` falls back to the
    /// file extension when not given. A fully consumed source (no rejected
    /// records) is deleted; a batch with rejections retains it so an
    /// external trigger can retry. Failures before any record is persisted
    /// leave the feed and index untouched.
    pub async fn ingest_file(
        &self,
        path: &Path,
        format: Option<SourceFormat>,
    ) -> Result<BatchOutcome> {
        let format = format
            .or_else(|| {
                path.extension()
                    .and_then(|e| e.to_str())
                    .and_then(SourceFormat::from_extension)
            })
            .ok_or_else(|| {
                Error::Parse(ParseError::UnsupportedFormat(path.display().to_string()))
            })?;

        debug!(path = %path.display(), ?format, "reading source document");
        let document = match tokio::fs::read_to_string(path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "source document not found, nothing to do");
                return Ok(BatchOutcome::SourceMissing);
            }
            Err(e) => return Err(Error::Io(e)),
        };

        debug!("parsing source document");
        let outcomes = self.parser.parse(&document, format)?;

        debug!(records = outcomes.len(), "persisting parsed records");
        let mut summary = BatchSummary::default();
        for (ordinal, outcome) in outcomes.into_iter().enumerate() {
            match outcome {
                RecordOutcome::Parsed(record) => match self.storage.append(&record).await? {
                    AppendOutcome::Accepted => summary.accepted += 1,
                    AppendOutcome::Duplicate => {
                        warn!(ordinal, key = %record.natural_key(), "duplicate record, not inserted");
                        summary.duplicates += 1;
                    }
                },
                RecordOutcome::Skipped(reason) => {
                    warn!(ordinal, %reason, "record skipped");
                    summary.skipped += 1;
                }
                RecordOutcome::Rejected(error) => {
                    warn!(ordinal, %error, "record rejected");
                    summary.rejected += 1;
                    summary.failures.push(RecordFailure {
                        ordinal,
                        reason: error.to_string(),
                    });
                }
            }
        }

        if summary.rejected == 0 {
            debug!(path = %path.display(), "batch fully consumed, removing source");
            tokio::fs::remove_file(path).await?;
        } else {
            summary.source_retained = true;
        }

        if summary.accepted > 0 {
            self.refresh_reports().await?;
        }

        info!(
            accepted = summary.accepted,
            duplicates = summary.duplicates,
            rejected = summary.rejected,
            skipped = summary.skipped,
            source_retained = summary.source_retained,
            "batch complete"
        );
        Ok(BatchOutcome::Completed(summary))
    }

    /// Recompute both frequency tables from the full feed and overwrite the
    /// report files.
    pub async fn refresh_reports(&self) -> Result<FeedStats> {
        let stats = FeedStats::recompute(&self.storage.feed_text().await?);
        stats.write_reports(&self.reports_dir).await?;
        Ok(stats)
    }
}
