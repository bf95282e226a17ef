use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordType {
    News,
    PrivateAd,
    Event,
}

impl RecordType {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::News => "news",
            Self::PrivateAd => "private_ad",
            Self::Event => "event",
        }
    }
}

impl std::fmt::Display for RecordType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RecordType {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "news" => Ok(Self::News),
            "private_ad" | "ad" => Ok(Self::PrivateAd),
            "event" => Ok(Self::Event),
            _ => Err(crate::Error::InvalidRecordType(s.to_string())),
        }
    }
}

/// One validated unit of content, ready for persistence. Every record belongs
/// to exactly one variant and all variant fields are set at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Record {
    News {
        text: String,
        city: String,
        published_at: NaiveDateTime,
    },
    PrivateAd {
        text: String,
        expires_on: NaiveDate,
        days_left: i64,
    },
    Event {
        name: String,
        location: String,
        starts_at: NaiveDateTime,
        code: String,
    },
}

impl Record {
    #[must_use]
    pub fn record_type(&self) -> RecordType {
        match self {
            Self::News { .. } => RecordType::News,
            Self::PrivateAd { .. } => RecordType::PrivateAd,
            Self::Event { .. } => RecordType::Event,
        }
    }

    /// Human-readable form of the field tuple used for duplicate detection.
    /// News dedups on (text, city), ads on (text, expiration date), events on
    /// (name, start time).
    #[must_use]
    pub fn natural_key(&self) -> String {
        match self {
            Self::News { text, city, .. } => format!("news({text:?}, {city:?})"),
            Self::PrivateAd {
                text, expires_on, ..
            } => format!("private_ad({text:?}, {expires_on})"),
            Self::Event {
                name, starts_at, ..
            } => format!("event({name:?}, {starts_at})"),
        }
    }

    /// Canonical feed block for this record, without the trailing blank line
    /// the feed inserts between blocks.
    #[must_use]
    pub fn render_block(&self) -> String {
        match self {
            Self::News {
                text,
                city,
                published_at,
            } => format!(
                "News -------------------------\n{text}\n{city}, {}",
                published_at.format(DATETIME_FORMAT)
            ),
            Self::PrivateAd {
                text,
                expires_on,
                days_left,
            } => format!(
                "Private Ad -------------------\n{text}\nExpires: {}, {days_left} days left",
                expires_on.format(DATE_FORMAT)
            ),
            Self::Event {
                name,
                location,
                starts_at,
                code,
            } => format!(
                "Event ------------------------\nEvent: {name}\nLocation: {location}\nTime: {}\nEvent Code: {code}",
                starts_at.format(DATETIME_FORMAT)
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn record_type_round_trip() {
        assert_eq!("news".parse::<RecordType>().unwrap(), RecordType::News);
        assert_eq!("AD".parse::<RecordType>().unwrap(), RecordType::PrivateAd);
        assert_eq!(
            "Private_Ad".parse::<RecordType>().unwrap(),
            RecordType::PrivateAd
        );
        assert_eq!("event".parse::<RecordType>().unwrap(), RecordType::Event);
        assert!("weather".parse::<RecordType>().is_err());
    }

    #[test]
    fn news_block_layout() {
        let record = Record::News {
            text: "Hello.".into(),
            city: "Lviv".into(),
            published_at: NaiveDate::from_ymd_opt(2024, 3, 1)
                .unwrap()
                .and_hms_opt(9, 30, 0)
                .unwrap(),
        };

        assert_eq!(
            record.render_block(),
            "News -------------------------\nHello.\nLviv, 2024-03-01 09:30"
        );
    }

    #[test]
    fn ad_block_layout() {
        let record = Record::PrivateAd {
            text: "Selling bike.".into(),
            expires_on: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
            days_left: 10,
        };

        assert_eq!(
            record.render_block(),
            "Private Ad -------------------\nSelling bike.\nExpires: 2024-12-31, 10 days left"
        );
    }

    #[test]
    fn event_block_layout() {
        let record = Record::Event {
            name: "Book fair.".into(),
            location: "Kyiv.".into(),
            starts_at: NaiveDate::from_ymd_opt(2024, 6, 5)
                .unwrap()
                .and_hms_opt(18, 0, 0)
                .unwrap(),
            code: "1a2b3c4d".into(),
        };

        assert_eq!(
            record.render_block(),
            "Event ------------------------\nEvent: Book fair.\nLocation: Kyiv.\nTime: 2024-06-05 18:00\nEvent Code: 1a2b3c4d"
        );
    }
}
