//! Date and time fields.
//!
//! A CSV date has no single representation, so date fields are written and
//! read with the layout given in [`CsvSettings::date_layout`](crate::CsvSettings::date_layout).
//! To mark a `chrono` field as a date field, annotate it with one of the two
//! adapter modules here:
//!
//! ```
//! use chrono::{NaiveDate, NaiveDateTime};
//!
//! #[derive(Debug, PartialEq, serde::Serialize, serde::Deserialize)]
//! struct Visit {
//!     name: String,
//!     #[serde(with = "flatcsv::date")]
//!     day: NaiveDate,
//!     #[serde(with = "flatcsv::datetime")]
//!     arrived: NaiveDateTime,
//! }
//! ```
//!
//! The adapters pass the value through a reserved newtype name that this crate's
//! row (de)serializers recognize; any other serde format simply sees an ISO 8601
//! string.
use std::fmt;
use std::marker::PhantomData;

use chrono::{NaiveDate, NaiveDateTime};
use serde::de::{self, Visitor};

pub(crate) const DATETIME_TOKEN: &str = "$flatcsv::private::NaiveDateTime";
pub(crate) const DATE_TOKEN: &str = "$flatcsv::private::NaiveDate";

/// Which chrono type a date field holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TemporalKind {
    Date,
    DateTime,
}

impl TemporalKind {
    pub(crate) fn from_token(name: &str) -> Option<Self> {
        match name {
            DATE_TOKEN => Some(Self::Date),
            DATETIME_TOKEN => Some(Self::DateTime),
            _ => None,
        }
    }

    /// An arbitrary valid value in the canonical form, used when probing a record type.
    pub(crate) fn placeholder(&self) -> &'static str {
        match self {
            Self::Date => "1970-01-01",
            Self::DateTime => "1970-01-01T00:00:00",
        }
    }

    /// Parse `text` with `layout` and return the value in its canonical form.
    pub(crate) fn layout_to_canonical(&self, text: &str, layout: &str) -> crate::conv_error::CResult<String> {
        match self {
            Self::Date => Ok(crate::parsing::parse_date(text, layout)?.to_canonical()),
            Self::DateTime => Ok(crate::parsing::parse_datetime(text, layout)?.to_canonical()),
        }
    }

    /// Inverse of [`Self::layout_to_canonical`].
    pub(crate) fn canonical_to_layout(&self, canonical: &str, layout: &str) -> crate::conv_error::CResult<String> {
        match self {
            Self::Date => {
                let v = crate::parsing::parse_date(canonical, NaiveDate::CANONICAL)?;
                crate::parsing::format_date(&v, layout)
            },
            Self::DateTime => {
                let v = crate::parsing::parse_datetime(canonical, NaiveDateTime::CANONICAL)?;
                crate::parsing::format_datetime(&v, layout)
            }
        }
    }
}

/// A chrono type with a fixed, lossless text form used between the adapters and the (de)serializers
trait Canonical: Sized {
    const TOKEN: &'static str;
    const CANONICAL: &'static str;
    const EXPECTING: &'static str;

    fn to_canonical(&self) -> String;
    fn from_canonical(s: &str) -> chrono::ParseResult<Self>;
}

impl Canonical for NaiveDateTime {
    const TOKEN: &'static str = DATETIME_TOKEN;
    const CANONICAL: &'static str = "%Y-%m-%dT%H:%M:%S%.f";
    const EXPECTING: &'static str = "a date and time";

    fn to_canonical(&self) -> String {
        self.format(Self::CANONICAL).to_string()
    }

    fn from_canonical(s: &str) -> chrono::ParseResult<Self> {
        NaiveDateTime::parse_from_str(s, Self::CANONICAL)
    }
}

impl Canonical for NaiveDate {
    const TOKEN: &'static str = DATE_TOKEN;
    const CANONICAL: &'static str = "%Y-%m-%d";
    const EXPECTING: &'static str = "a date";

    fn to_canonical(&self) -> String {
        self.format(Self::CANONICAL).to_string()
    }

    fn from_canonical(s: &str) -> chrono::ParseResult<Self> {
        NaiveDate::parse_from_str(s, Self::CANONICAL)
    }
}

struct CanonicalVisitor<T>(PhantomData<T>);

impl<'de, T: Canonical> Visitor<'de> for CanonicalVisitor<T> {
    type Value = T;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str(T::EXPECTING)
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        T::from_canonical(v).map_err(E::custom)
    }

    fn visit_newtype_struct<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
    where
        D: de::Deserializer<'de>,
    {
        deserializer.deserialize_str(self)
    }
}

fn serialize_canonical<T: Canonical, S: serde::Serializer>(value: &T, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_newtype_struct(T::TOKEN, &value.to_canonical())
}

fn deserialize_canonical<'de, T: Canonical, D: serde::Deserializer<'de>>(deserializer: D) -> Result<T, D::Error> {
    deserializer.deserialize_newtype_struct(T::TOKEN, CanonicalVisitor(PhantomData))
}

/// Serde adapter for `chrono::NaiveDateTime` fields; use with `#[serde(with = "flatcsv::datetime")]`.
pub mod datetime {
    use chrono::NaiveDateTime;

    pub fn serialize<S: serde::Serializer>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        super::serialize_canonical(value, serializer)
    }

    pub fn deserialize<'de, D: serde::Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        super::deserialize_canonical(deserializer)
    }
}

/// Serde adapter for `chrono::NaiveDate` fields; use with `#[serde(with = "flatcsv::date")]`.
pub mod date {
    use chrono::NaiveDate;

    pub fn serialize<S: serde::Serializer>(value: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        super::serialize_canonical(value, serializer)
    }

    pub fn deserialize<'de, D: serde::Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        super::deserialize_canonical(deserializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_round_trip() {
        let dt = NaiveDate::from_ymd_opt(2023, 10, 20).unwrap().and_hms_milli_opt(8, 5, 9, 250).unwrap();
        let s = dt.to_canonical();
        assert_eq!(s, "2023-10-20T08:05:09.250");
        assert_eq!(NaiveDateTime::from_canonical(&s).unwrap(), dt);

        let whole = NaiveDate::from_ymd_opt(2023, 10, 20).unwrap().and_hms_opt(8, 5, 9).unwrap();
        assert_eq!(NaiveDateTime::from_canonical(&whole.to_canonical()).unwrap(), whole);
    }

    #[test]
    fn test_layout_conversion() {
        let kind = TemporalKind::DateTime;
        let canonical = kind.layout_to_canonical("20/10/2023 08:05", "%d/%m/%Y %H:%M").unwrap();
        assert_eq!(canonical, "2023-10-20T08:05:00");
        let back = kind.canonical_to_layout(&canonical, "%d/%m/%Y %H:%M").unwrap();
        assert_eq!(back, "20/10/2023 08:05");

        let kind = TemporalKind::Date;
        assert_eq!(kind.layout_to_canonical("20231020", "%Y%m%d").unwrap(), "2023-10-20");
        assert!(kind.layout_to_canonical("2023-10-20", "%Y%m%d").is_err());
    }

    #[test]
    fn test_placeholders_are_canonical() {
        assert!(NaiveDate::from_canonical(TemporalKind::Date.placeholder()).is_ok());
        assert!(NaiveDateTime::from_canonical(TemporalKind::DateTime.placeholder()).is_ok());
    }
}
