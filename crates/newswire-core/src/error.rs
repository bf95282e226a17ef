use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid record type: {0}")]
    InvalidRecordType(String),

    #[error(transparent)]
    Parse(#[from] crate::ingest::ParseError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
