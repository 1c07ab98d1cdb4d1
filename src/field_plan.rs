//! Describe flat record types as an ordered list of typed CSV columns.
//!
//! The first step in reading or writing records of some type `T` is to build
//! a [`FieldPlan`] for it:
//!
//! ```
//! use flatcsv::field_plan::{FieldPlan, FieldKind};
//!
//! #[derive(serde::Deserialize)]
//! struct Person {
//!     name: String,
//!     surname: String,
//!     age: u32,
//! }
//!
//! let plan = FieldPlan::of::<Person>(None).unwrap();
//! assert_eq!(plan.len(), 3);
//! assert_eq!(plan.header(), vec!["name", "surname", "age"]);
//! assert_eq!(plan.get(2).unwrap().kind, FieldKind::Integer);
//! ```
//!
//! The plan is built once, by letting the type's `Deserialize` implementation
//! describe itself, and then reused for every row. Types whose fields are not
//! text, integers, floats, or dates are rejected here, before any row is read:
//!
//! ```
//! # use flatcsv::field_plan::{FieldPlan, PError};
//! #[derive(serde::Deserialize)]
//! struct Flagged {
//!     name: String,
//!     active: bool,
//! }
//!
//! let err = FieldPlan::of::<Flagged>(None).unwrap_err();
//! assert!(matches!(err, PError::UnsupportedFieldType { ref field, .. } if field == "active"));
//! ```
use std::fmt::Display;

use serde::de;

use crate::parsing::is_valid_layout;
use crate::probe::Probe;

/// A type alias for `Result` with [`PError`] as the error type.
pub type PResult<T> = std::result::Result<T, PError>;

/// Represents an error building a [`FieldPlan`] for a record type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PError {
    /// Indicates that a field's type has no CSV representation.
    UnsupportedFieldType{ field: String, found: &'static str },
    /// Indicates that the record has a date field but no date layout was given.
    MissingDateLayout{ field: String },
    /// Indicates that the date layout contains specifiers that cannot be parsed.
    InvalidDateLayout(String),
    /// Indicates that the type is not a struct with named fields.
    NotAFlatRecord(&'static str),
    /// Indicates that the type's `Deserialize` implementation failed while being described.
    ProbeFailure(String),
}

impl Display for PError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsupportedFieldType { field, found } => write!(f, "The field '{field}' has type {found}, which cannot be stored in a CSV column"),
            Self::MissingDateLayout { field } => write!(f, "The field '{field}' is a date, but no date layout was given"),
            Self::InvalidDateLayout(layout) => write!(f, "Invalid date layout: '{layout}'"),
            Self::NotAFlatRecord(found) => write!(f, "Expected a struct with named fields, found {found}"),
            Self::ProbeFailure(msg) => write!(f, "Could not describe the record type: {msg}"),
        }
    }
}

impl std::error::Error for PError {}

impl de::Error for PError {
    fn custom<T>(msg:T) -> Self where T:Display {
        Self::ProbeFailure(msg.to_string())
    }
}

/// The four kinds of value a CSV column can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// Passed through unchanged (`String`, `&str`, `char`).
    Text,
    /// Base-10 integers of any width and signedness.
    Integer,
    /// `f32` and `f64`.
    Float,
    /// `chrono::NaiveDate` or `chrono::NaiveDateTime`, written with the date layout.
    DateTime,
}

impl Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FieldKind::Text => "text",
            FieldKind::Integer => "an integer",
            FieldKind::Float => "a float",
            FieldKind::DateTime => "a date/time",
        };

        write!(f, "{s}")
    }
}

/// One column of a [`FieldPlan`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldEntry {
    /// The field name as serde sees it (i.e. after any `rename`).
    pub name: &'static str,
    /// Which primitive converter applies to this column.
    pub kind: FieldKind,
    /// The date layout, present only for [`FieldKind::DateTime`] columns.
    pub format: Option<String>,
}

impl Display for FieldEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(layout) = &self.format {
            write!(f, "{}: {} ({layout})", self.name, self.kind)
        } else {
            write!(f, "{}: {}", self.name, self.kind)
        }
    }
}


/// The ordered columns of a flat record type.
///
/// Column `i` of a row corresponds to the `i`-th field in the type's declaration
/// order (fields marked `#[serde(skip)]` are not columns). A plan is immutable
/// once built; clone it to share it between readers and writers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPlan {
    pub(crate) entries: Vec<FieldEntry>
}

impl FieldPlan {
    /// Build the plan for `T`.
    ///
    /// `date_layout` is the strftime-style layout used for every date field of `T`;
    /// it may be `None` only if `T` has no date fields.
    ///
    /// Returns an error if any field of `T` has an unsupported type, if `T` is
    /// not a struct, or if the date layout is missing or invalid.
    pub fn of<'de, T>(date_layout: Option<&str>) -> PResult<Self>
    where T: de::Deserialize<'de>
    {
        if let Some(layout) = date_layout {
            if !is_valid_layout(layout) {
                return Err(PError::InvalidDateLayout(layout.to_string()));
            }
        }

        let mut probe = Probe::new(date_layout);
        T::deserialize(&mut probe)?;
        let plan = Self { entries: probe.into_entries() };
        log::debug!("Built field plan for {}: [{}]", std::any::type_name::<T>(), plan);
        Ok(plan)
    }

    /// Number of columns
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` if the record type has no columns
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The entry for column `i`, if there is one
    pub fn get(&self, i: usize) -> Option<&FieldEntry> {
        self.entries.get(i)
    }

    /// Iterate over the columns in order
    pub fn iter(&self) -> std::slice::Iter<'_, FieldEntry> {
        self.entries.iter()
    }

    /// Iterate over the field names in order
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|e| e.name)
    }

    /// The header row for this record type, i.e. its field names in order.
    pub fn header(&self) -> Vec<String> {
        self.names().map(|n| n.to_string()).collect()
    }

    /// Consume the plan and return its entries.
    pub fn into_entries(self) -> Vec<FieldEntry> {
        self.entries
    }

    /// The column name for error messages; out of range columns get a `#i` placeholder.
    pub(crate) fn field_name(&self, i: usize) -> String {
        self.entries.get(i)
            .map(|e| e.name.to_string())
            .unwrap_or_else(|| format!("#{i}"))
    }
}

impl Display for FieldPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, entry) in self.entries.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{entry}")?;
        }
        Ok(())
    }
}

impl<'p> IntoIterator for &'p FieldPlan {
    type Item = &'p FieldEntry;
    type IntoIter = std::slice::Iter<'p, FieldEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
