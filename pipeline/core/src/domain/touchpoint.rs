// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Source records read from the touchpoint store.
//!
//! Conversions and sessions are immutable inputs; every run re-reads them.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Textual form used by the store, the journeys CSV and the IHC wire format.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversionId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

/// The user (or device) both conversions and sessions are keyed on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityId(pub String);

macro_rules! string_id {
    ($name:ident) => {
        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

string_id!(ConversionId);
string_id!(SessionId);
string_id!(IdentityId);

/// A completed goal event (e.g. a purchase).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversion {
    pub conversion_id: ConversionId,
    pub identity_id: IdentityId,
    pub occurred_at: NaiveDateTime,
}

/// A single marketing session tied to an identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Touchpoint {
    pub session_id: SessionId,
    pub identity_id: IdentityId,
    pub occurred_at: NaiveDateTime,
    pub channel_label: String,
    pub holder_engagement: bool,
    pub closer_engagement: bool,
    pub impression_interaction: bool,
}

/// Inclusive calendar-date window. Either end may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }

    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.map_or(true, |start| date >= start) && self.end.map_or(true, |end| date <= end)
    }

    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let start = self.start.map(|d| d.to_string()).unwrap_or_else(|| "All".to_string());
        let end = self.end.map(|d| d.to_string()).unwrap_or_else(|| "All".to_string());
        write!(f, "{} to {}", start, end)
    }
}

/// Parse a store/CSV timestamp. `T`-separated ISO strings are accepted too.
pub fn parse_timestamp(value: &str) -> Result<NaiveDateTime, chrono::ParseError> {
    let value = value.trim();
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S"))
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f"))
}

/// Serde adapter for [`TIMESTAMP_FORMAT`].
pub mod timestamp_format {
    use super::{parse_timestamp, TIMESTAMP_FORMAT};
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.format(TIMESTAMP_FORMAT).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse_timestamp(&raw).map_err(serde::de::Error::custom)
    }
}

/// Serde adapter writing booleans as `0`/`1`.
///
/// Reading accepts integers, floats, booleans and their string forms, since
/// the store and hand-edited CSV files are not consistent about it.
pub mod flag {
    use serde::de::{self, Visitor};
    use serde::{Deserializer, Serializer};
    use std::fmt;

    pub fn serialize<S>(value: &bool, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u8(u8::from(*value))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<bool, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(FlagVisitor)
    }

    struct FlagVisitor;

    impl<'de> Visitor<'de> for FlagVisitor {
        type Value = bool;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a 0/1 flag")
        }

        fn visit_bool<E: de::Error>(self, v: bool) -> Result<bool, E> {
            Ok(v)
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<bool, E> {
            Ok(v != 0)
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<bool, E> {
            Ok(v != 0)
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<bool, E> {
            Ok(v != 0.0)
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<bool, E> {
            match v.trim().to_ascii_lowercase().as_str() {
                "1" | "1.0" | "true" => Ok(true),
                "0" | "0.0" | "false" | "" => Ok(false),
                other => Err(E::custom(format!("invalid flag value '{}'", other))),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_date_range_bounds_are_inclusive() {
        let range = DateRange::new(Some(date("2024-01-10")), Some(date("2024-01-20")));
        assert!(range.contains(date("2024-01-10")));
        assert!(range.contains(date("2024-01-20")));
        assert!(!range.contains(date("2024-01-09")));
        assert!(!range.contains(date("2024-01-21")));
    }

    #[test]
    fn test_open_ended_range() {
        let range = DateRange::new(None, Some(date("2024-01-20")));
        assert!(range.contains(date("1999-12-31")));
        assert!(!range.contains(date("2024-02-01")));
        assert!(DateRange::unbounded().contains(date("2024-02-01")));
        assert_eq!(DateRange::unbounded().to_string(), "All to All");
    }

    #[test]
    fn test_parse_timestamp_variants() {
        let expected = date("2024-03-01").and_hms_opt(9, 30, 0).unwrap();
        assert_eq!(parse_timestamp("2024-03-01 09:30:00").unwrap(), expected);
        assert_eq!(parse_timestamp("2024-03-01T09:30:00").unwrap(), expected);
        assert_eq!(parse_timestamp(" 2024-03-01 09:30:00.000 ").unwrap(), expected);
        assert!(parse_timestamp("yesterday").is_err());
    }
}
