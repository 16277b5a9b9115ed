//! Lenient serde adapters for the backend's wire formats.
//!
//! The API emits timestamps both with and without a UTC offset, and some
//! identifiers as integers in one endpoint and strings in another.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serializer};

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    // Offset-less timestamps are UTC on the backend.
    raw.parse::<NaiveDateTime>()
        .ok()
        .map(|naive| naive.and_utc())
}

/// `DateTime<Utc>` accepting RFC 3339 or a naive ISO 8601 string.
pub mod timestamp {
    use super::*;

    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_rfc3339())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse_timestamp(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {}", raw)))
    }
}

/// `Option<DateTime<Utc>>` variant of [`timestamp`]. Use with `#[serde(default)]`.
pub mod timestamp_opt {
    use super::*;

    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(value) => serializer.serialize_str(&value.to_rfc3339()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        match raw {
            None => Ok(None),
            Some(raw) if raw.is_empty() => Ok(None),
            Some(raw) => parse_timestamp(&raw)
                .map(Some)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {}", raw))),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    String(String),
    Integer(i64),
    Float(f64),
}

impl From<StringOrNumber> for String {
    fn from(value: StringOrNumber) -> Self {
        match value {
            StringOrNumber::String(value) => value,
            StringOrNumber::Integer(value) => value.to_string(),
            StringOrNumber::Float(value) => value.to_string(),
        }
    }
}

/// Accepts a JSON string or number and stores it as a `String`.
pub mod string_or_number {
    use super::*;

    pub fn serialize<S>(value: &str, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(value)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<String, D::Error>
    where
        D: Deserializer<'de>,
    {
        StringOrNumber::deserialize(deserializer).map(String::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};
    use serde::Serialize;

    #[derive(Debug, Serialize, Deserialize)]
    struct Stamped {
        #[serde(with = "timestamp")]
        at: DateTime<Utc>,
        #[serde(default, with = "timestamp_opt")]
        maybe: Option<DateTime<Utc>>,
        #[serde(with = "string_or_number")]
        id: String,
    }

    #[test]
    fn test_naive_timestamp_is_utc() {
        let parsed: Stamped =
            serde_json::from_str(r#"{"at": "2024-03-01T10:20:30.123456", "id": 7}"#).unwrap();
        assert_eq!(parsed.at.year(), 2024);
        assert_eq!(parsed.at.hour(), 10);
        assert!(parsed.maybe.is_none());
        assert_eq!(parsed.id, "7");
    }

    #[test]
    fn test_offset_timestamp_is_normalised() {
        let parsed: Stamped = serde_json::from_str(
            r#"{"at": "2024-03-01T10:00:00+02:00", "maybe": "2024-03-02T00:00:00Z", "id": "v1"}"#,
        )
        .unwrap();
        assert_eq!(parsed.at.hour(), 8);
        assert_eq!(parsed.maybe.map(|m| m.day()), Some(2));
        assert_eq!(parsed.id, "v1");
    }

    #[test]
    fn test_invalid_timestamp_is_rejected() {
        let parsed = serde_json::from_str::<Stamped>(r#"{"at": "yesterday", "id": 1}"#);
        assert!(parsed.is_err());
    }
}
