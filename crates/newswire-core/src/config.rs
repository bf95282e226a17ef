use std::path::PathBuf;

use serde::Deserialize;

/// Locations of the durable feed artifacts. All paths are relative to the
/// working directory unless absolute.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Append-only feed text file.
    pub feed_path: PathBuf,
    /// SQLite dedup index.
    pub db_path: PathBuf,
    /// Directory receiving word_count.csv and letter_stat.csv.
    pub reports_dir: PathBuf,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            feed_path: PathBuf::from("news_feed.txt"),
            db_path: PathBuf::from("news_feed.db"),
            reports_dir: PathBuf::from("."),
        }
    }
}
