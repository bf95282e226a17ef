use std::path::{Path, PathBuf};

use sqlx::{sqlite::SqlitePoolOptions, Pool, Sqlite};
use tokio::io::AsyncWriteExt;

use crate::record::Record;
use crate::{Error, Result};

const INIT_SQL: &str = r"
CREATE TABLE IF NOT EXISTS news (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    text TEXT NOT NULL,
    city TEXT NOT NULL,
    published_at TEXT NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_news_key ON news(text, city);

CREATE TABLE IF NOT EXISTS private_ads (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    text TEXT NOT NULL,
    exp_date TEXT NOT NULL,
    days_left INTEGER NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_private_ads_key ON private_ads(text, exp_date);

CREATE TABLE IF NOT EXISTS events (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    location TEXT NOT NULL,
    starts_at TEXT NOT NULL,
    event_code TEXT NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_events_key ON events(name, starts_at);
";

/// Result of offering a record to the feed. A duplicate is a recognized
/// outcome, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    Accepted,
    Duplicate,
}

/// Durable feed plus per-type dedup index. The feed is an append-only text
/// artifact; the index is a SQLite database with one table per record type,
/// unique on that type's natural key. Both are updated together: a rejected
/// duplicate touches neither.
pub struct Storage {
    pool: Pool<Sqlite>,
    feed_path: PathBuf,
}

impl Storage {
    pub async fn open(db_path: &str, feed_path: impl Into<PathBuf>) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&format!("sqlite:{db_path}?mode=rwc"))
            .await?;

        sqlx::query(INIT_SQL).execute(&pool).await?;

        Ok(Self {
            pool,
            feed_path: feed_path.into(),
        })
    }

    pub async fn open_memory(feed_path: impl Into<PathBuf>) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        sqlx::query(INIT_SQL).execute(&pool).await?;

        Ok(Self {
            pool,
            feed_path: feed_path.into(),
        })
    }

    /// Append one record, deduplicating against the natural-key index. The
    /// claim is a single conflict-target insert, so check-and-insert cannot
    /// interleave with another append for the same key. If the feed write
    /// fails the claim is released again; the key is only held once its block
    /// is on disk, and a retried batch can re-append the record.
    pub async fn append(&self, record: &Record) -> Result<AppendOutcome> {
        if !self.try_claim(record).await? {
            return Ok(AppendOutcome::Duplicate);
        }

        if let Err(error) = self.write_block(record).await {
            self.release_claim(record).await?;
            return Err(Error::Io(error));
        }

        Ok(AppendOutcome::Accepted)
    }

    async fn write_block(&self, record: &Record) -> std::io::Result<()> {
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.feed_path)
            .await?;
        file.write_all(record.render_block().as_bytes()).await?;
        file.write_all(b"\n\n").await?;
        file.flush().await
    }

    async fn try_claim(&self, record: &Record) -> Result<bool> {
        let result = match record {
            Record::News {
                text,
                city,
                published_at,
            } => {
                sqlx::query(
                    "INSERT INTO news (text, city, published_at) VALUES (?, ?, ?)
                     ON CONFLICT(text, city) DO NOTHING",
                )
                .bind(text)
                .bind(city)
                .bind(published_at.format(crate::record::DATETIME_FORMAT).to_string())
                .execute(&self.pool)
                .await?
            }
            Record::PrivateAd {
                text,
                expires_on,
                days_left,
            } => {
                sqlx::query(
                    "INSERT INTO private_ads (text, exp_date, days_left) VALUES (?, ?, ?)
                     ON CONFLICT(text, exp_date) DO NOTHING",
                )
                .bind(text)
                .bind(expires_on.format(crate::record::DATE_FORMAT).to_string())
                .bind(days_left)
                .execute(&self.pool)
                .await?
            }
            Record::Event {
                name,
                location,
                starts_at,
                code,
            } => {
                sqlx::query(
                    "INSERT INTO events (name, location, starts_at, event_code) VALUES (?, ?, ?, ?)
                     ON CONFLICT(name, starts_at) DO NOTHING",
                )
                .bind(name)
                .bind(location)
                .bind(starts_at.format(crate::record::DATETIME_FORMAT).to_string())
                .bind(code)
                .execute(&self.pool)
                .await?
            }
        };

        Ok(result.rows_affected() > 0)
    }

    /// Undo a claim whose feed write failed. Deletes by natural key, so it
    /// can only remove the row `try_claim` just inserted.
    async fn release_claim(&self, record: &Record) -> Result<()> {
        match record {
            Record::News { text, city, .. } => {
                sqlx::query("DELETE FROM news WHERE text = ? AND city = ?")
                    .bind(text)
                    .bind(city)
                    .execute(&self.pool)
                    .await?;
            }
            Record::PrivateAd {
                text, expires_on, ..
            } => {
                sqlx::query("DELETE FROM private_ads WHERE text = ? AND exp_date = ?")
                    .bind(text)
                    .bind(expires_on.format(crate::record::DATE_FORMAT).to_string())
                    .execute(&self.pool)
                    .await?;
            }
            Record::Event { name, starts_at, .. } => {
                sqlx::query("DELETE FROM events WHERE name = ? AND starts_at = ?")
                    .bind(name)
                    .bind(starts_at.format(crate::record::DATETIME_FORMAT).to_string())
                    .execute(&self.pool)
                    .await?;
            }
        }
        Ok(())
    }

    /// Full feed contents; the empty string when no record was ever accepted.
    pub async fn feed_text(&self) -> Result<String> {
        match tokio::fs::read_to_string(&self.feed_path).await {
            Ok(text) => Ok(text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(Error::Io(e)),
        }
    }

    #[must_use]
    pub fn feed_path(&self) -> &Path {
        &self.feed_path
    }
}
