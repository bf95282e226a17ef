pub mod config;
pub mod error;
pub mod ingest;
pub mod record;
pub mod stats;
pub mod storage;

pub use config::FeedConfig;
pub use error::{Error, Result};
pub use ingest::{
    BatchOutcome, BatchSummary, CompositeParser, FormatParser, IngestPipeline, JsonParser,
    NormalizeError, NormalizedText, ParseError, PlainTextParser, RecordError, RecordFailure,
    RecordOutcome, SourceFormat, XmlParser,
};
pub use record::{Record, RecordType};
pub use stats::{FeedStats, LetterCount};
pub use storage::{AppendOutcome, Storage};
