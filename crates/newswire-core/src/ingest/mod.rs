mod normalizer;
mod parser;
mod pipeline;

pub use normalizer::{
    count_whitespace, fix_misspelling, normalize, split_sentences, summarize_last_words,
    NormalizeError, NormalizeResult, NormalizedText,
};
pub use parser::{
    CompositeParser, FormatParser, JsonParser, ParseError, ParseResult, PlainTextParser,
    RawFieldMap, RecordError, RecordOutcome, SourceFormat, XmlParser,
};
pub use pipeline::{BatchOutcome, BatchSummary, IngestPipeline, RecordFailure};
