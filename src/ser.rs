//! Serialize records to rows of CSV fields and rows to CSV text
//!
//! Writing a record is two steps. [`to_row`] turns the record into its ordered
//! text fields using the record type's [`FieldPlan`], and [`write_row`] quotes
//! the fields as needed and joins them into one line of CSV:
//!
//! ```
//! use flatcsv::field_plan::FieldPlan;
//! use flatcsv::serde_common::CsvSettings;
//! use flatcsv::ser::{to_row, write_row};
//!
//! #[derive(serde::Serialize, serde::Deserialize)]
//! struct Person {
//!     name: String,
//!     surname: String,
//!     age: i32,
//! }
//!
//! let plan = FieldPlan::of::<Person>(None).unwrap();
//! let p = Person { name: "Andrea".to_string(), surname: "Ferretti, jr".to_string(), age: 34 };
//! let row = to_row(&p, &plan).unwrap();
//! assert_eq!(row, vec!["Andrea", "Ferretti, jr", "34"]);
//! assert_eq!(write_row(&row, &CsvSettings::default()), "Andrea,\"Ferretti, jr\",34\n");
//! ```
//!
//! [`to_string`] does both at once.
use std::borrow::Cow;

use itertools::Itertools;
use serde::ser::{self, Impossible};

use crate::field_plan::{FieldKind, FieldPlan};
use crate::parsing;
use crate::serde_common::{CsvSettings, SError, SResult};
use crate::temporal::TemporalKind;

/// Convert a record into its row of text fields, in plan order.
pub fn to_row<T>(value: &T, plan: &FieldPlan) -> SResult<Vec<String>>
where T: ser::Serialize + ?Sized
{
    let mut serializer = Serializer::new(plan);
    value.serialize(&mut serializer)?;
    Ok(serializer.out)
}

/// Convert a record into one line of CSV text, including the terminator.
pub fn to_string<T>(value: &T, plan: &FieldPlan, settings: &CsvSettings) -> SResult<String>
where T: ser::Serialize + ?Sized
{
    let row = to_row(value, plan)?;
    Ok(write_row(&row, settings))
}

/// Quote a single field if it needs it.
///
/// A field is quoted when `quote_always` is set or when it contains the separator,
/// the quote character, the terminator, or a line break. Inside a quoted field,
/// quote characters are doubled, or prefixed with the escape character if that
/// differs from the quote. If quoting is disabled, the field is returned as is.
///
/// ```
/// # use flatcsv::serde_common::CsvSettings;
/// # use flatcsv::ser::quote_field;
/// let settings = CsvSettings::default();
/// assert_eq!(quote_field("Hello", &settings), "Hello");
/// assert_eq!(quote_field("a,b", &settings), "\"a,b\"");
/// assert_eq!(quote_field("string\"", &settings), "\"string\"\"\"");
/// ```
pub fn quote_field<'f>(field: &'f str, settings: &CsvSettings) -> Cow<'f, str> {
    let Some(quote) = settings.quote else {
        return Cow::Borrowed(field);
    };

    let needs_quotes = settings.quote_always || field.bytes().any(|b| {
        b == settings.separator || b == quote || b == settings.terminator || b == b'\n' || b == b'\r'
    });
    if !needs_quotes {
        return Cow::Borrowed(field);
    }

    let quote = quote as char;
    let escape = settings.escape.map(char::from).filter(|&e| e != quote);
    let mut quoted = String::with_capacity(field.len() + 2);
    quoted.push(quote);
    for c in field.chars() {
        match escape {
            Some(e) if c == quote || c == e => quoted.push(e),
            None if c == quote => quoted.push(quote),
            _ => {}
        }
        quoted.push(c);
    }
    quoted.push(quote);
    Cow::Owned(quoted)
}

/// Join fields into one line of CSV, quoting where needed and appending the terminator.
///
/// A row made of a single empty field is written as an empty quoted field, since
/// readers skip blank lines.
pub fn write_row<S: AsRef<str>>(fields: &[S], settings: &CsvSettings) -> String {
    let sep = (settings.separator as char).to_string();
    let mut line = match (fields, settings.quote) {
        ([only], Some(q)) if only.as_ref().is_empty() => [q as char, q as char].iter().collect(),
        _ => fields.iter()
            .map(|f| quote_field(f.as_ref(), settings))
            .join(&sep),
    };
    line.push(settings.terminator as char);
    line
}


/// Serializer that turns one flat record into a row of fields
pub struct Serializer<'p> {
    plan: &'p FieldPlan,
    out: Vec<String>,
}

impl<'p> Serializer<'p> {
    /// Create a serializer for records of the type `plan` was built from.
    pub fn new(plan: &'p FieldPlan) -> Self {
        Self { plan, out: Vec::with_capacity(plan.len()) }
    }

    /// The fields serialized so far
    pub fn into_row(self) -> Vec<String> {
        self.out
    }

    fn not_a_record<T>(found: &'static str) -> SResult<T> {
        Err(SError::UnsupportedValue { field: None, found })
    }
}

impl<'a, 'p> ser::Serializer for &'a mut Serializer<'p> {
    type Ok = ();
    type Error = SError;

    type SerializeSeq = Impossible<(), SError>;
    type SerializeTuple = Impossible<(), SError>;
    type SerializeTupleStruct = Impossible<(), SError>;
    type SerializeTupleVariant = Impossible<(), SError>;
    type SerializeMap = Impossible<(), SError>;
    type SerializeStruct = Self;
    type SerializeStructVariant = Impossible<(), SError>;

    fn serialize_bool(self, _v: bool) -> Result<Self::Ok, Self::Error> {
        Serializer::not_a_record("bool")
    }

    fn serialize_i8(self, _v: i8) -> Result<Self::Ok, Self::Error> {
        Serializer::not_a_record("an integer")
    }

    fn serialize_i16(self, _v: i16) -> Result<Self::Ok, Self::Error> {
        Serializer::not_a_record("an integer")
    }

    fn serialize_i32(self, _v: i32) -> Result<Self::Ok, Self::Error> {
        Serializer::not_a_record("an integer")
    }

    fn serialize_i64(self, _v: i64) -> Result<Self::Ok, Self::Error> {
        Serializer::not_a_record("an integer")
    }

    fn serialize_u8(self, _v: u8) -> Result<Self::Ok, Self::Error> {
        Serializer::not_a_record("an integer")
    }

    fn serialize_u16(self, _v: u16) -> Result<Self::Ok, Self::Error> {
        Serializer::not_a_record("an integer")
    }

    fn serialize_u32(self, _v: u32) -> Result<Self::Ok, Self::Error> {
        Serializer::not_a_record("an integer")
    }

    fn serialize_u64(self, _v: u64) -> Result<Self::Ok, Self::Error> {
        Serializer::not_a_record("an integer")
    }

    fn serialize_f32(self, _v: f32) -> Result<Self::Ok, Self::Error> {
        Serializer::not_a_record("a float")
    }

    fn serialize_f64(self, _v: f64) -> Result<Self::Ok, Self::Error> {
        Serializer::not_a_record("a float")
    }

    fn serialize_char(self, _v: char) -> Result<Self::Ok, Self::Error> {
        Serializer::not_a_record("a char")
    }

    fn serialize_str(self, _v: &str) -> Result<Self::Ok, Self::Error> {
        Serializer::not_a_record("a string")
    }

    fn serialize_bytes(self, _v: &[u8]) -> Result<Self::Ok, Self::Error> {
        Serializer::not_a_record("bytes")
    }

    fn serialize_none(self) -> Result<Self::Ok, Self::Error> {
        Serializer::not_a_record("None")
    }

    fn serialize_some<T>(self, _value: &T) -> Result<Self::Ok, Self::Error>
    where
        T: serde::Serialize + ?Sized {
        Serializer::not_a_record("an Option")
    }

    fn serialize_unit(self) -> Result<Self::Ok, Self::Error> {
        Serializer::not_a_record("()")
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<Self::Ok, Self::Error> {
        Serializer::not_a_record("a unit struct")
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
    ) -> Result<Self::Ok, Self::Error> {
        Serializer::not_a_record("an enum")
    }

    fn serialize_newtype_struct<T>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<Self::Ok, Self::Error>
    where
        T: serde::Serialize + ?Sized {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T>(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> Result<Self::Ok, Self::Error>
    where
        T: serde::Serialize + ?Sized {
        Serializer::not_a_record("an enum")
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq, Self::Error> {
        Serializer::not_a_record("a sequence")
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple, Self::Error> {
        Serializer::not_a_record("a tuple")
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct, Self::Error> {
        Serializer::not_a_record("a tuple struct")
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant, Self::Error> {
        Serializer::not_a_record("an enum")
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap, Self::Error> {
        Serializer::not_a_record("a map")
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStruct, Self::Error> {
        Ok(self)
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant, Self::Error> {
        Serializer::not_a_record("an enum")
    }
}

impl<'a, 'p> ser::SerializeStruct for &'a mut Serializer<'p> {
    type Ok = ();
    type Error = SError;

    fn serialize_field<T>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), Self::Error>
    where
        T: serde::Serialize + ?Sized {
        let plan: &'p FieldPlan = self.plan;
        let entry = plan.get(self.out.len())
            .ok_or_else(|| SError::PlanMismatch(format!("the record has more than {} fields", plan.len())))?;
        if entry.name != key {
            return Err(SError::PlanMismatch(format!(
                "expected field '{}' in position {}, found '{key}'", entry.name, self.out.len() + 1
            )));
        }

        let field = value.serialize(FieldSerializer { name: entry.name, kind: entry.kind, layout: entry.format.as_deref() })?;
        self.out.push(field);
        Ok(())
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        if self.out.len() != self.plan.len() {
            return Err(SError::PlanMismatch(format!(
                "the record has {} fields, the plan has {}", self.out.len(), self.plan.len()
            )));
        }
        Ok(())
    }
}


/// Serializer for a single field, producing its text
struct FieldSerializer<'p> {
    name: &'p str,
    kind: FieldKind,
    layout: Option<&'p str>,
}

impl<'p> FieldSerializer<'p> {
    fn check_kind(&self, kind: FieldKind, found: &'static str) -> SResult<()> {
        if self.kind == kind {
            Ok(())
        } else {
            Err(SError::PlanMismatch(format!(
                "the field '{}' is planned as {}, but holds {found}", self.name, self.kind
            )))
        }
    }

    fn unsupported<T>(&self, found: &'static str) -> SResult<T> {
        Err(SError::UnsupportedValue { field: Some(self.name.to_string()), found })
    }

    fn integer<I: itoa::Integer>(self, v: I) -> SResult<String> {
        self.check_kind(FieldKind::Integer, "an integer")?;
        Ok(parsing::format_integer(v))
    }

    fn real<F: ryu::Float>(self, v: F) -> SResult<String> {
        self.check_kind(FieldKind::Float, "a float")?;
        Ok(parsing::format_real(v))
    }
}

impl<'p> ser::Serializer for FieldSerializer<'p> {
    type Ok = String;
    type Error = SError;

    type SerializeSeq = Impossible<String, SError>;
    type SerializeTuple = Impossible<String, SError>;
    type SerializeTupleStruct = Impossible<String, SError>;
    type SerializeTupleVariant = Impossible<String, SError>;
    type SerializeMap = Impossible<String, SError>;
    type SerializeStruct = Impossible<String, SError>;
    type SerializeStructVariant = Impossible<String, SError>;

    fn serialize_bool(self, _v: bool) -> Result<Self::Ok, Self::Error> {
        self.unsupported("bool")
    }

    fn serialize_i8(self, v: i8) -> Result<Self::Ok, Self::Error> {
        self.integer(v)
    }

    fn serialize_i16(self, v: i16) -> Result<Self::Ok, Self::Error> {
        self.integer(v)
    }

    fn serialize_i32(self, v: i32) -> Result<Self::Ok, Self::Error> {
        self.integer(v)
    }

    fn serialize_i64(self, v: i64) -> Result<Self::Ok, Self::Error> {
        self.integer(v)
    }

    fn serialize_i128(self, v: i128) -> Result<Self::Ok, Self::Error> {
        self.integer(v)
    }

    fn serialize_u8(self, v: u8) -> Result<Self::Ok, Self::Error> {
        self.integer(v)
    }

    fn serialize_u16(self, v: u16) -> Result<Self::Ok, Self::Error> {
        self.integer(v)
    }

    fn serialize_u32(self, v: u32) -> Result<Self::Ok, Self::Error> {
        self.integer(v)
    }

    fn serialize_u64(self, v: u64) -> Result<Self::Ok, Self::Error> {
        self.integer(v)
    }

    fn serialize_u128(self, v: u128) -> Result<Self::Ok, Self::Error> {
        self.integer(v)
    }

    fn serialize_f32(self, v: f32) -> Result<Self::Ok, Self::Error> {
        self.real(v)
    }

    fn serialize_f64(self, v: f64) -> Result<Self::Ok, Self::Error> {
        self.real(v)
    }

    fn serialize_char(self, v: char) -> Result<Self::Ok, Self::Error> {
        self.check_kind(FieldKind::Text, "a char")?;
        Ok(v.to_string())
    }

    fn serialize_str(self, v: &str) -> Result<Self::Ok, Self::Error> {
        self.check_kind(FieldKind::Text, "a string")?;
        Ok(v.to_string())
    }

    fn serialize_bytes(self, _v: &[u8]) -> Result<Self::Ok, Self::Error> {
        self.unsupported("bytes")
    }

    fn serialize_none(self) -> Result<Self::Ok, Self::Error> {
        self.unsupported("None")
    }

    fn serialize_some<T>(self, _value: &T) -> Result<Self::Ok, Self::Error>
    where
        T: serde::Serialize + ?Sized {
        self.unsupported("an Option")
    }

    fn serialize_unit(self) -> Result<Self::Ok, Self::Error> {
        self.unsupported("()")
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<Self::Ok, Self::Error> {
        self.unsupported("a unit struct")
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
    ) -> Result<Self::Ok, Self::Error> {
        self.unsupported("an enum")
    }

    fn serialize_newtype_struct<T>(
        self,
        name: &'static str,
        value: &T,
    ) -> Result<Self::Ok, Self::Error>
    where
        T: serde::Serialize + ?Sized {
        let Some(temporal) = TemporalKind::from_token(name) else {
            return value.serialize(self);
        };

        self.check_kind(FieldKind::DateTime, "a date")?;
        let layout = self.layout
            .ok_or_else(|| SError::PlanMismatch(format!("the date field '{}' has no layout", self.name)))?;
        // the date adapters hand over their value as canonical text
        let canonical = value.serialize(FieldSerializer { name: self.name, kind: FieldKind::Text, layout: None })?;
        temporal.canonical_to_layout(&canonical, layout)
            .map_err(|source| SError::ConversionError { field: self.name.to_string(), source })
    }

    fn serialize_newtype_variant<T>(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> Result<Self::Ok, Self::Error>
    where
        T: serde::Serialize + ?Sized {
        self.unsupported("an enum")
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq, Self::Error> {
        self.unsupported("a sequence")
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple, Self::Error> {
        self.unsupported("a tuple")
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct, Self::Error> {
        self.unsupported("a tuple struct")
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant, Self::Error> {
        self.unsupported("an enum")
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap, Self::Error> {
        self.unsupported("a map")
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStruct, Self::Error> {
        self.unsupported("a nested struct")
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant, Self::Error> {
        self.unsupported("an enum")
    }
}
