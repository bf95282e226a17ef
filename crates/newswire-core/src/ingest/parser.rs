use std::collections::HashMap;
use std::sync::LazyLock;

use chrono::{Local, NaiveDate, NaiveDateTime};
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::normalizer::{self, NormalizeError};
use crate::record::{Record, RecordType, DATETIME_FORMAT, DATE_FORMAT};

/// Document-level failure: the source cannot be decoded as the declared
/// format at all. Fatal to the whole batch; the source document is retained.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
    #[error("Malformed JSON document: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Malformed XML document: {0}")]
    Xml(#[from] roxmltree::Error),
}

pub type ParseResult<T> = Result<T, ParseError>;

/// Record-level failure: fatal to one record only, the batch continues.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("invalid date/time {value:?}, expected {expected}")]
    InvalidDate {
        value: String,
        expected: &'static str,
    },
    #[error("record is not an object")]
    NotAnObject,
    #[error(transparent)]
    Normalize(#[from] NormalizeError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceFormat {
    PlainText,
    Json,
    Xml,
}

impl SourceFormat {
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "txt" => Some(Self::PlainText),
            "json" => Some(Self::Json),
            "xml" => Some(Self::Xml),
            _ => None,
        }
    }
}

/// Uppercase field name to raw string value, produced by the format adapters
/// before type dispatch. Transient, never persisted.
pub type RawFieldMap = HashMap<String, String>;

/// Per-record parse outcome. One malformed record never aborts the batch.
#[derive(Debug)]
pub enum RecordOutcome {
    Parsed(Record),
    /// Unknown or missing type tag. Reported and dropped, but not counted
    /// against the batch: the source can still be consumed in full.
    Skipped(String),
    Rejected(RecordError),
}

pub trait FormatParser: Send + Sync {
    fn supported_formats(&self) -> &[SourceFormat];

    fn can_parse(&self, format: SourceFormat) -> bool {
        self.supported_formats().contains(&format)
    }

    fn parse(&self, document: &str, format: SourceFormat) -> ParseResult<Vec<RecordOutcome>>;
}

static BLOCK_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-{3,}").expect("hard-coded pattern"));

/// Block format: records separated by runs of 3+ `-` characters, one
/// `KEY: value` pair per line.
pub struct PlainTextParser;

impl PlainTextParser {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Default for PlainTextParser {
    fn default() -> Self {
        Self::new()
    }
}

impl FormatParser for PlainTextParser {
    fn supported_formats(&self) -> &[SourceFormat] {
        &[SourceFormat::PlainText]
    }

    fn parse(&self, document: &str, _format: SourceFormat) -> ParseResult<Vec<RecordOutcome>> {
        let mut outcomes = Vec::new();

        for block in BLOCK_SEPARATOR.split(document.trim()) {
            let mut fields = RawFieldMap::new();
            for line in block.lines().map(str::trim).filter(|l| !l.is_empty()) {
                if let Some((key, value)) = line.split_once(':') {
                    fields.insert(canonical_field_name(key.trim()), value.trim().to_string());
                }
            }
            if fields.is_empty() {
                continue;
            }
            outcomes.push(dispatch_fields(fields));
        }

        Ok(outcomes)
    }
}

/// JSON format: an array of record objects, or a single object treated as a
/// one-element batch.
pub struct JsonParser;

impl JsonParser {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Default for JsonParser {
    fn default() -> Self {
        Self::new()
    }
}

impl FormatParser for JsonParser {
    fn supported_formats(&self) -> &[SourceFormat] {
        &[SourceFormat::Json]
    }

    fn parse(&self, document: &str, _format: SourceFormat) -> ParseResult<Vec<RecordOutcome>> {
        let value: serde_json::Value = serde_json::from_str(document)?;
        let elements = match value {
            serde_json::Value::Array(items) => items,
            other => vec![other],
        };

        Ok(elements.into_iter().map(json_outcome).collect())
    }
}

fn json_outcome(value: serde_json::Value) -> RecordOutcome {
    let Some(object) = value.as_object() else {
        return RecordOutcome::Rejected(RecordError::NotAnObject);
    };

    let mut fields = RawFieldMap::new();
    for (key, value) in object {
        let raw = match value {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        fields.insert(canonical_field_name(key), raw);
    }

    dispatch_fields(fields)
}

/// XML format: `<record type="...">` elements under the document root, one
/// child element per field. Missing children default to the empty string and
/// fail required-field validation per record.
pub struct XmlParser;

impl XmlParser {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Default for XmlParser {
    fn default() -> Self {
        Self::new()
    }
}

impl FormatParser for XmlParser {
    fn supported_formats(&self) -> &[SourceFormat] {
        &[SourceFormat::Xml]
    }

    fn parse(&self, document: &str, _format: SourceFormat) -> ParseResult<Vec<RecordOutcome>> {
        let doc = roxmltree::Document::parse(document)?;
        let mut outcomes = Vec::new();

        for node in doc
            .root_element()
            .children()
            .filter(|n| n.has_tag_name("record"))
        {
            let mut fields = RawFieldMap::new();
            if let Some(type_tag) = node.attribute("type") {
                fields.insert("TYPE".to_string(), type_tag.to_string());
            }
            for child in node.children().filter(roxmltree::Node::is_element) {
                fields.insert(
                    canonical_field_name(child.tag_name().name()),
                    child.text().unwrap_or("").trim().to_string(),
                );
            }
            outcomes.push(dispatch_fields(fields));
        }

        Ok(outcomes)
    }
}

fn canonical_field_name(key: &str) -> String {
    match key.to_lowercase().as_str() {
        "exp_date" | "expires" => "EXPIRES".to_string(),
        other => other.to_uppercase(),
    }
}

fn dispatch_fields(fields: RawFieldMap) -> RecordOutcome {
    let Some(type_tag) = fields.get("TYPE") else {
        tracing::warn!("record block carries no TYPE field, skipping");
        return RecordOutcome::Skipped("unknown type".to_string());
    };

    match type_tag.parse::<RecordType>() {
        Ok(record_type) => match build_record(record_type, &fields) {
            Ok(record) => RecordOutcome::Parsed(record),
            Err(error) => RecordOutcome::Rejected(error),
        },
        Err(_) => {
            tracing::warn!(type_tag = %type_tag, "unknown record type, skipping");
            RecordOutcome::Skipped(format!("unknown type: {type_tag}"))
        }
    }
}

/// Convert a validated field map into a typed record. Text-bearing fields go
/// through the normalizer; the record body additionally gets the synthesized
/// last-words sentence. Dates and times are parsed strictly.
fn build_record(record_type: RecordType, fields: &RawFieldMap) -> Result<Record, RecordError> {
    match record_type {
        RecordType::News => {
            let text = required(fields, "TEXT")?;
            let city = optional(fields, "CITY").unwrap_or("Unknown");

            Ok(Record::News {
                text: normalizer::normalize(text, true)?.final_text,
                city: normalizer::normalize(city, false)?.final_text,
                published_at: Local::now().naive_local(),
            })
        }
        RecordType::PrivateAd => {
            let text = required(fields, "TEXT")?;
            let expires_raw = required(fields, "EXPIRES")?;
            let expires_on =
                NaiveDate::parse_from_str(expires_raw, DATE_FORMAT).map_err(|_| {
                    RecordError::InvalidDate {
                        value: expires_raw.to_string(),
                        expected: DATE_FORMAT,
                    }
                })?;
            let days_left = (expires_on - Local::now().date_naive()).num_days();

            Ok(Record::PrivateAd {
                text: normalizer::normalize(text, true)?.final_text,
                expires_on,
                days_left,
            })
        }
        RecordType::Event => {
            let name = required(fields, "NAME")?;
            let location = required(fields, "LOCATION")?;
            let time_raw = required(fields, "TIME")?;
            let starts_at = NaiveDateTime::parse_from_str(time_raw, DATETIME_FORMAT).map_err(
                |_| RecordError::InvalidDate {
                    value: time_raw.to_string(),
                    expected: DATETIME_FORMAT,
                },
            )?;

            Ok(Record::Event {
                name: normalizer::normalize(name, false)?.final_text,
                location: normalizer::normalize(location, false)?.final_text,
                starts_at,
                code: new_event_code(),
            })
        }
    }
}

fn required<'a>(fields: &'a RawFieldMap, key: &'static str) -> Result<&'a str, RecordError> {
    optional(fields, key).ok_or(RecordError::MissingField(key))
}

fn optional<'a>(fields: &'a RawFieldMap, key: &str) -> Option<&'a str> {
    fields
        .get(key)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
}

/// Opaque 8-character identifier, unique with overwhelming probability.
fn new_event_code() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    hex[..8].to_string()
}

/// Format-dispatching parser composed of one adapter per input encoding.
pub struct CompositeParser {
    parsers: Vec<Box<dyn FormatParser>>,
}

impl CompositeParser {
    #[must_use]
    pub fn new() -> Self {
        Self {
            parsers: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_parser(mut self, parser: Box<dyn FormatParser>) -> Self {
        self.parsers.push(parser);
        self
    }

    fn find_parser(&self, format: SourceFormat) -> Option<&dyn FormatParser> {
        self.parsers
            .iter()
            .find(|p| p.can_parse(format))
            .map(|p| p.as_ref())
    }
}

impl Default for CompositeParser {
    fn default() -> Self {
        Self::new()
            .with_parser(Box::new(PlainTextParser::new()))
            .with_parser(Box::new(JsonParser::new()))
            .with_parser(Box::new(XmlParser::new()))
    }
}

impl FormatParser for CompositeParser {
    fn supported_formats(&self) -> &[SourceFormat] {
        &[SourceFormat::PlainText, SourceFormat::Json, SourceFormat::Xml]
    }

    fn can_parse(&self, format: SourceFormat) -> bool {
        self.find_parser(format).is_some()
    }

    fn parse(&self, document: &str, format: SourceFormat) -> ParseResult<Vec<RecordOutcome>> {
        let parser = self
            .find_parser(format)
            .ok_or_else(|| ParseError::UnsupportedFormat(format!("{format:?}")))?;

        parser.parse(document, format)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(outcome: &RecordOutcome) -> &Record {
        match outcome {
            RecordOutcome::Parsed(record) => record,
            other => panic!("expected parsed record, got {other:?}"),
        }
    }

    #[test]
    fn format_from_extension() {
        assert_eq!(
            SourceFormat::from_extension("TXT"),
            Some(SourceFormat::PlainText)
        );
        assert_eq!(SourceFormat::from_extension("json"), Some(SourceFormat::Json));
        assert_eq!(SourceFormat::from_extension("xml"), Some(SourceFormat::Xml));
        assert_eq!(SourceFormat::from_extension("csv"), None);
    }

    #[test]
    fn plain_text_blocks_dispatch_by_type() {
        let document = "\
TYPE: news
TEXT: breaking story. details soon.
CITY: lviv
---
TYPE: ad
TEXT: old couch for free.
EXPIRES: 2030-01-01
----------
TYPE: weather
TEXT: sunny
";
        let parser = PlainTextParser::new();
        let outcomes = parser.parse(document, SourceFormat::PlainText).unwrap();

        assert_eq!(outcomes.len(), 3);
        match parsed(&outcomes[0]) {
            Record::News { text, city, .. } => {
                assert_eq!(text, "Breaking story. Details soon. Story soon.");
                assert_eq!(city, "Lviv");
            }
            other => panic!("expected news, got {other:?}"),
        }
        assert!(matches!(outcomes[1], RecordOutcome::Parsed(Record::PrivateAd { .. })));
        assert!(matches!(outcomes[2], RecordOutcome::Skipped(_)));
    }

    #[test]
    fn plain_text_block_without_type_is_skipped() {
        let parser = PlainTextParser::new();
        let outcomes = parser
            .parse("TEXT: orphan line", SourceFormat::PlainText)
            .unwrap();

        assert_eq!(outcomes.len(), 1);
        assert!(matches!(outcomes[0], RecordOutcome::Skipped(_)));
    }

    #[test]
    fn json_single_object_wraps_into_batch() {
        let parser = JsonParser::new();
        let outcomes = parser
            .parse(
                r#"{"type":"news","text":"Hello","city":"Lviv"}"#,
                SourceFormat::Json,
            )
            .unwrap();

        assert_eq!(outcomes.len(), 1);
        match parsed(&outcomes[0]) {
            Record::News { text, city, .. } => {
                assert_eq!(text, "Hello Hello.");
                assert_eq!(city, "Lviv");
            }
            other => panic!("expected news, got {other:?}"),
        }
    }

    #[test]
    fn json_accepts_exp_date_field_name() {
        let parser = JsonParser::new();
        let outcomes = parser
            .parse(
                r#"[{"type":"private_ad","text":"selling bike.","exp_date":"2030-06-01"}]"#,
                SourceFormat::Json,
            )
            .unwrap();

        match parsed(&outcomes[0]) {
            Record::PrivateAd { expires_on, .. } => {
                assert_eq!(expires_on.to_string(), "2030-06-01");
            }
            other => panic!("expected ad, got {other:?}"),
        }
    }

    #[test]
    fn json_scalar_element_is_rejected() {
        let parser = JsonParser::new();
        let outcomes = parser.parse(r#"["just a string"]"#, SourceFormat::Json).unwrap();

        assert!(matches!(
            outcomes[0],
            RecordOutcome::Rejected(RecordError::NotAnObject)
        ));
    }

    #[test]
    fn malformed_json_is_a_document_error() {
        let parser = JsonParser::new();
        assert!(matches!(
            parser.parse("{not json", SourceFormat::Json),
            Err(ParseError::Json(_))
        ));
    }

    #[test]
    fn xml_records_parse_and_missing_time_rejects_only_that_record() {
        let document = r#"
<root>
    <record type="event">
        <name>book fair.</name>
        <location>kyiv.</location>
        <time>2030-06-05 18:00</time>
    </record>
    <record type="event">
        <name>no time.</name>
        <location>odesa.</location>
    </record>
    <record type="news">
        <text>hello there.</text>
        <city>lviv</city>
    </record>
</root>"#;

        let parser = XmlParser::new();
        let outcomes = parser.parse(document, SourceFormat::Xml).unwrap();

        assert_eq!(outcomes.len(), 3);
        match parsed(&outcomes[0]) {
            Record::Event { name, code, .. } => {
                assert_eq!(name, "Book fair.");
                assert_eq!(code.len(), 8);
            }
            other => panic!("expected event, got {other:?}"),
        }
        assert!(matches!(
            outcomes[1],
            RecordOutcome::Rejected(RecordError::MissingField("TIME"))
        ));
        assert!(matches!(outcomes[2], RecordOutcome::Parsed(Record::News { .. })));
    }

    #[test]
    fn malformed_xml_is_a_document_error() {
        let parser = XmlParser::new();
        assert!(matches!(
            parser.parse("<root><record>", SourceFormat::Xml),
            Err(ParseError::Xml(_))
        ));
    }

    #[test]
    fn bad_expiration_date_is_rejected() {
        let parser = JsonParser::new();
        let outcomes = parser
            .parse(
                r#"[{"type":"ad","text":"x.","exp_date":"June 1st"}]"#,
                SourceFormat::Json,
            )
            .unwrap();

        assert!(matches!(
            outcomes[0],
            RecordOutcome::Rejected(RecordError::InvalidDate { .. })
        ));
    }

    #[test]
    fn event_codes_are_fresh_per_parse() {
        let document = r#"[{"type":"event","name":"x.","location":"y.","time":"2030-01-01 10:00"}]"#;
        let parser = JsonParser::new();

        let first = parser.parse(document, SourceFormat::Json).unwrap();
        let second = parser.parse(document, SourceFormat::Json).unwrap();

        let code = |outcomes: &[RecordOutcome]| match parsed(&outcomes[0]) {
            Record::Event { code, .. } => code.clone(),
            other => panic!("expected event, got {other:?}"),
        };
        assert_ne!(code(&first), code(&second));
    }

    #[test]
    fn composite_dispatches_by_format() {
        let parser = CompositeParser::default();

        let from_json = parser
            .parse(r#"{"type":"news","text":"a."}"#, SourceFormat::Json)
            .unwrap();
        let from_text = parser
            .parse("TYPE: news\nTEXT: a.", SourceFormat::PlainText)
            .unwrap();

        assert!(matches!(from_json[0], RecordOutcome::Parsed(_)));
        assert!(matches!(from_text[0], RecordOutcome::Parsed(_)));
    }
}
