//! Deserialize records from rows of CSV fields
//!
//! # Basic usage
//!
//! A row is an ordered list of text fields. Given a [`FieldPlan`] for the record
//! type, field `i` of the row is converted into the `i`-th field of the record:
//!
//! ```
//! use flatcsv::field_plan::FieldPlan;
//! use flatcsv::de::from_row;
//!
//! #[derive(Debug, PartialEq, serde::Deserialize)]
//! struct Person {
//!     name: String,
//!     surname: String,
//!     age: i32,
//! }
//!
//! let plan = FieldPlan::of::<Person>(None).unwrap();
//! let p: Person = from_row(&["Andrea", "Ferretti", "34"], &plan).unwrap();
//! assert_eq!(p, Person { name: "Andrea".to_string(), surname: "Ferretti".to_string(), age: 34 });
//! ```
//!
//! Column names are never consulted: the data must be in the same order as the
//! fields are declared. A row with too few or too many fields is an error, as is
//! any field whose text does not convert to the field's type. Either way, no
//! partially filled record is returned:
//!
//! ```
//! # use flatcsv::field_plan::FieldPlan;
//! # use flatcsv::de::from_row;
//! use flatcsv::serde_common::{DError, DResult};
//! # #[derive(Debug, PartialEq, serde::Deserialize)]
//! # struct Person {
//! #     name: String,
//! #     surname: String,
//! #     age: i32,
//! # }
//! # let plan = FieldPlan::of::<Person>(None).unwrap();
//! let res: DResult<Person> = from_row(&["Andrea", "Ferretti"], &plan);
//! assert!(matches!(res, Err(DError::RowArityMismatch { expected: 3, found: 2, .. })));
//!
//! let res: DResult<Person> = from_row(&["Andrea", "Ferretti", "thirty-four"], &plan);
//! assert!(matches!(res, Err(DError::ConversionError { ref field, .. }) if field == "age"));
//! ```
//!
//! # Borrowed fields
//!
//! `&str` fields borrow from the row, so a record can hold them as long as the
//! row lives. Readers that own their rows (like the iterators in [`crate::table`])
//! require owned fields instead.
use serde::de::{self, IntoDeserializer, SeqAccess};

use crate::conv_error::CResult;
use crate::field_plan::{FieldEntry, FieldKind, FieldPlan};
use crate::parsing;
use crate::serde_common::{CsvSettings, DError, DResult};
use crate::temporal::TemporalKind;

/// Deserialize a record from one row of fields.
pub fn from_row<'de, T, S>(row: &'de [S], plan: &'de FieldPlan) -> DResult<T>
where T: de::Deserialize<'de>,
      S: AsRef<str>
{
    from_row_at(row, plan, None)
}

/// Deserialize a record from one row of fields, including the row number in any error.
pub fn from_row_at<'de, T, S>(row: &'de [S], plan: &'de FieldPlan, row_num: Option<usize>) -> DResult<T>
where T: de::Deserialize<'de>,
      S: AsRef<str>
{
    let mut deserializer = Deserializer::from_row(row, plan, row_num);
    let t = T::deserialize(&mut deserializer)?;
    Ok(t)
}

/// Tokenize a single line of CSV text and deserialize it into a record.
///
/// ```
/// # use flatcsv::field_plan::FieldPlan;
/// # use flatcsv::serde_common::CsvSettings;
/// # use flatcsv::de::from_line;
/// #[derive(Debug, PartialEq, serde::Deserialize)]
/// struct Gas {
///     name: String,
///     ppm: f64,
/// }
///
/// let plan = FieldPlan::of::<Gas>(None).unwrap();
/// let g: Gas = from_line("\"CO2, dry\",412.5", &plan, &CsvSettings::default()).unwrap();
/// assert_eq!(g, Gas { name: "CO2, dry".to_string(), ppm: 412.5 });
/// ```
pub fn from_line<T>(line: &str, plan: &FieldPlan, settings: &CsvSettings) -> DResult<T>
where T: de::DeserializeOwned
{
    let mut reader = settings.reader(line.as_bytes());
    let mut record = csv::StringRecord::new();
    let has_row = reader.read_record(&mut record)
        .map_err(|source| DError::TableReadError { row: None, source })?;

    let fields = if has_row {
        tokens_to_fields(&record)
    } else {
        vec![]
    };
    from_row(&fields, plan)
}

pub(crate) fn tokens_to_fields(record: &csv::StringRecord) -> Vec<String> {
    record.iter().map(|f| f.to_string()).collect()
}

/// Deserializer for one row of CSV fields.
pub struct Deserializer<'de, S: AsRef<str>> {
    row: &'de [S],
    plan: &'de FieldPlan,
    row_num: Option<usize>,
    idx: usize,
    in_record: bool,
}

impl<'de, S: AsRef<str>> Deserializer<'de, S> {
    /// Create a deserializer over `row` for the record type `plan` was built from.
    ///
    /// `row_num` is only used to locate errors; pass `None` for a standalone row.
    pub fn from_row(row: &'de [S], plan: &'de FieldPlan, row_num: Option<usize>) -> Self {
        Self { row, plan, row_num, idx: 0, in_record: false }
    }

    /// Take the next field, checking that the plan expects a value of `kind` there.
    fn next_field(&mut self, kind: FieldKind, serde_type: &'static str) -> DResult<(&'de FieldEntry, &'de str)> {
        if !self.in_record {
            return Err(DError::PlanMismatch(format!("expected a struct with named fields, found {serde_type}")));
        }

        let plan: &'de FieldPlan = self.plan;
        let entry = plan.get(self.idx)
            .ok_or_else(|| DError::PlanMismatch(format!("the record has more than {} fields", plan.len())))?;
        if entry.kind != kind {
            return Err(DError::PlanMismatch(format!(
                "the field '{}' is planned as {}, but the record type asked for {serde_type}",
                entry.name, entry.kind
            )));
        }

        let row: &'de [S] = self.row;
        let text = row.get(self.idx)
            .map(|s| s.as_ref())
            .ok_or_else(|| DError::RowArityMismatch { row: self.row_num, expected: plan.len(), found: row.len() })?;
        self.idx += 1;
        Ok((entry, text))
    }

    /// Attach the field name and row to a conversion failure
    fn convert<T>(&self, entry: &FieldEntry, res: CResult<T>) -> DResult<T> {
        res.map_err(|source| DError::ConversionError { field: entry.name.to_string(), row: self.row_num, source })
    }

    fn unsupported<T>(&self, serde_type: &'static str) -> DResult<T> {
        Err(DError::PlanMismatch(format!(
            "the field '{}' asked for {serde_type}, which has no CSV representation",
            self.plan.field_name(self.idx)
        )))
    }
}

impl<'de, 'a, S: AsRef<str>> de::Deserializer<'de> for &'a mut Deserializer<'de, S> {
    type Error = DError;

    fn deserialize_any<V>(self, _visitor: V) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de> {
        // Rows carry no type information of their own, the record type must supply it
        self.unsupported("an untyped value")
    }

    fn deserialize_bool<V>(self, _visitor: V) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de> {
        self.unsupported("bool")
    }

    fn deserialize_i8<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de> {
        let (entry, text) = self.next_field(FieldKind::Integer, "i8")?;
        let v = self.convert(entry, parsing::parse_integer(text))?;
        visitor.visit_i8(v)
    }

    fn deserialize_i16<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de> {
        let (entry, text) = self.next_field(FieldKind::Integer, "i16")?;
        let v = self.convert(entry, parsing::parse_integer(text))?;
        visitor.visit_i16(v)
    }

    fn deserialize_i32<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de> {
        let (entry, text) = self.next_field(FieldKind::Integer, "i32")?;
        let v = self.convert(entry, parsing::parse_integer(text))?;
        visitor.visit_i32(v)
    }

    fn deserialize_i64<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de> {
        let (entry, text) = self.next_field(FieldKind::Integer, "i64")?;
        let v = self.convert(entry, parsing::parse_integer(text))?;
        visitor.visit_i64(v)
    }

    fn deserialize_i128<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de> {
        let (entry, text) = self.next_field(FieldKind::Integer, "i128")?;
        let v = self.convert(entry, parsing::parse_integer(text))?;
        visitor.visit_i128(v)
    }

    fn deserialize_u8<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de> {
        let (entry, text) = self.next_field(FieldKind::Integer, "u8")?;
        let v = self.convert(entry, parsing::parse_integer(text))?;
        visitor.visit_u8(v)
    }

    fn deserialize_u16<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de> {
        let (entry, text) = self.next_field(FieldKind::Integer, "u16")?;
        let v = self.convert(entry, parsing::parse_integer(text))?;
        visitor.visit_u16(v)
    }

    fn deserialize_u32<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de> {
        let (entry, text) = self.next_field(FieldKind::Integer, "u32")?;
        let v = self.convert(entry, parsing::parse_integer(text))?;
        visitor.visit_u32(v)
    }

    fn deserialize_u64<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de> {
        let (entry, text) = self.next_field(FieldKind::Integer, "u64")?;
        let v = self.convert(entry, parsing::parse_integer(text))?;
        visitor.visit_u64(v)
    }

    fn deserialize_u128<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de> {
        let (entry, text) = self.next_field(FieldKind::Integer, "u128")?;
        let v = self.convert(entry, parsing::parse_integer(text))?;
        visitor.visit_u128(v)
    }

    fn deserialize_f32<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de> {
        let (entry, text) = self.next_field(FieldKind::Float, "f32")?;
        let v = self.convert(entry, parsing::parse_real(text))?;
        visitor.visit_f32(v)
    }

    fn deserialize_f64<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de> {
        let (entry, text) = self.next_field(FieldKind::Float, "f64")?;
        let v = self.convert(entry, parsing::parse_real(text))?;
        visitor.visit_f64(v)
    }

    fn deserialize_char<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de> {
        let (entry, text) = self.next_field(FieldKind::Text, "char")?;
        let mut chars = text.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => visitor.visit_char(c),
            _ => {
                let source = crate::conv_error::ConvError::parsing(text, FieldKind::Text, "expected exactly one character");
                Err(DError::ConversionError { field: entry.name.to_string(), row: self.row_num, source })
            }
        }
    }

    fn deserialize_str<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de> {
        let (_, text) = self.next_field(FieldKind::Text, "a string")?;
        visitor.visit_borrowed_str(text)
    }

    fn deserialize_string<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de> {
        self.deserialize_str(visitor)
    }

    fn deserialize_bytes<V>(self, _visitor: V) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de> {
        self.unsupported("bytes")
    }

    fn deserialize_byte_buf<V>(self, _visitor: V) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de> {
        self.unsupported("bytes")
    }

    fn deserialize_option<V>(self, _visitor: V) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de> {
        self.unsupported("Option")
    }

    fn deserialize_unit<V>(self, _visitor: V) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de> {
        self.unsupported("()")
    }

    fn deserialize_unit_struct<V>(
        self,
        _name: &'static str,
        _visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de> {
        self.unsupported("a unit struct")
    }

    fn deserialize_newtype_struct<V>(
        self,
        name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de> {
        let Some(temporal) = TemporalKind::from_token(name) else {
            return visitor.visit_newtype_struct(self);
        };

        let (entry, text) = self.next_field(FieldKind::DateTime, "a date")?;
        let layout = entry.format.as_deref()
            .ok_or_else(|| DError::PlanMismatch(format!("the date field '{}' has no layout", entry.name)))?;
        let canonical = self.convert(entry, temporal.layout_to_canonical(text, layout))?;
        visitor.visit_newtype_struct(canonical.into_deserializer())
    }

    fn deserialize_seq<V>(self, _visitor: V) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de> {
        self.unsupported("a sequence")
    }

    fn deserialize_tuple<V>(self, _len: usize, _visitor: V) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de> {
        self.unsupported("a tuple")
    }

    fn deserialize_tuple_struct<V>(
        self,
        _name: &'static str,
        _len: usize,
        _visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de> {
        self.unsupported("a tuple struct")
    }

    fn deserialize_map<V>(self, _visitor: V) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de> {
        self.unsupported("a map")
    }

    fn deserialize_struct<V>(
        self,
        _name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de> {
        if self.in_record {
            return self.unsupported("a nested struct");
        }

        let plan_names = self.plan.names();
        if fields.len() != self.plan.len() || !fields.iter().copied().eq(plan_names) {
            return Err(DError::PlanMismatch(format!(
                "the record has fields [{}], the plan has [{}]",
                fields.join(", "),
                self.plan.header().join(", ")
            )));
        }

        // Check the width up front so that no field is converted from a bad row
        if self.row.len() != self.plan.len() {
            return Err(DError::RowArityMismatch { row: self.row_num, expected: self.plan.len(), found: self.row.len() });
        }

        self.in_record = true;
        visitor.visit_seq(KnownLenSeq::new(self, fields.len()))
    }

    fn deserialize_enum<V>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        _visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de> {
        self.unsupported("an enum")
    }

    fn deserialize_identifier<V>(self, _visitor: V) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de> {
        self.unsupported("an identifier")
    }

    fn deserialize_ignored_any<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de> {
        if self.idx >= self.row.len() {
            return Err(DError::RowArityMismatch { row: self.row_num, expected: self.plan.len(), found: self.row.len() });
        }
        self.idx += 1;
        visitor.visit_unit()
    }
}


struct KnownLenSeq<'a, 'de: 'a, S: AsRef<str>> {
    de: &'a mut Deserializer<'de, S>,
    n: usize,
    i: usize,
}

impl<'a, 'de, S: AsRef<str>> KnownLenSeq<'a, 'de, S> {
    fn new(de: &'a mut Deserializer<'de, S>, n: usize) -> Self {
        Self { de, n, i: 0 }
    }
}

impl<'de, 'a, S: AsRef<str>> SeqAccess<'de> for KnownLenSeq<'a, 'de, S> {
    type Error = DError;

    fn next_element_seed<T>(&mut self, seed: T) -> Result<Option<T::Value>, Self::Error>
    where
        T: de::DeserializeSeed<'de> {
        if self.i == self.n {
            Ok(None)
        } else {
            self.i += 1;
            seed.deserialize(&mut *self.de).map(Some)
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.n - self.i)
    }
}


#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveDateTime};
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, PartialEq, Deserialize)]
    struct Person {
        name: String,
        surname: String,
        age: i32,
    }

    #[test]
    fn test_de_struct() -> DResult<()> {
        let plan = FieldPlan::of::<Person>(None)?;
        let p: Person = from_row(&["Andrea", "Ferretti", "34"], &plan)?;
        assert_eq!(p, Person { name: "Andrea".to_string(), surname: "Ferretti".to_string(), age: 34 });
        Ok(())
    }

    #[test]
    fn test_de_owned_row() -> DResult<()> {
        let plan = FieldPlan::of::<Person>(None)?;
        let row = vec!["Andrea".to_string(), "Ferretti".to_string(), "-34".to_string()];
        let p: Person = from_row(&row, &plan)?;
        assert_eq!(p.age, -34);
        Ok(())
    }

    #[test]
    fn test_de_borrowed() -> DResult<()> {
        #[derive(Debug, Deserialize)]
        struct Borrowed<'a> {
            name: &'a str,
            initial: char,
        }

        let plan = FieldPlan::of::<Borrowed>(None)?;
        let row = ["Ferretti", "A"];
        let b: Borrowed = from_row(&row, &plan)?;
        assert_eq!(b.name, "Ferretti");
        assert_eq!(b.initial, 'A');

        let row = ["Ferretti", "AB"];
        let res: DResult<Borrowed> = from_row(&row, &plan);
        assert!(matches!(res, Err(DError::ConversionError { ref field, .. }) if field == "initial"));
        Ok(())
    }

    #[test]
    fn test_de_numbers() -> DResult<()> {
        #[derive(Debug, PartialEq, Deserialize)]
        struct Numbers {
            a: u8,
            b: i64,
            c: u128,
            d: f32,
            e: f64,
        }

        let plan = FieldPlan::of::<Numbers>(None)?;
        let n: Numbers = from_row(&["255", "-9000000000", "1", "0.5", "1.34e-03"], &plan)?;
        assert_eq!(n, Numbers { a: 255, b: -9_000_000_000, c: 1, d: 0.5, e: 1.34e-3 });

        let res: DResult<Numbers> = from_row(&["256", "0", "0", "0", "0"], &plan);
        assert!(matches!(res, Err(DError::ConversionError { ref field, .. }) if field == "a"));
        Ok(())
    }

    #[test]
    fn test_arity_mismatch() -> DResult<()> {
        let plan = FieldPlan::of::<Person>(None)?;
        let res: DResult<Person> = from_row_at(&["a", "b", "1", "extra"], &plan, Some(7));
        assert!(matches!(res, Err(DError::RowArityMismatch { row: Some(7), expected: 3, found: 4 })));
        Ok(())
    }

    #[test]
    fn test_conversion_error_context() -> DResult<()> {
        let plan = FieldPlan::of::<Person>(None)?;
        let err = from_row_at::<Person, _>(&["Andrea", "Ferretti", "34abc"], &plan, Some(2)).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("'age'"), "{msg}");
        assert!(msg.contains("row 2"), "{msg}");
        assert!(msg.contains("'34abc'"), "{msg}");
        Ok(())
    }

    #[test]
    fn test_de_dates() -> DResult<()> {
        #[derive(Debug, PartialEq, Deserialize)]
        struct Event {
            name: String,
            #[serde(with = "crate::datetime")]
            at: NaiveDateTime,
        }

        #[derive(Debug, PartialEq, Deserialize)]
        struct Birthday {
            #[serde(with = "crate::date")]
            day: NaiveDate,
        }

        let plan = FieldPlan::of::<Event>(Some("%d/%m/%Y %H:%M"))?;
        let e: Event = from_row(&["launch", "03/02/2021 14:30"], &plan)?;
        let expected = NaiveDate::from_ymd_opt(2021, 2, 3).unwrap().and_hms_opt(14, 30, 0).unwrap();
        assert_eq!(e.at, expected);

        let res: DResult<Event> = from_row(&["launch", "2021-02-03 14:30"], &plan);
        assert!(matches!(res, Err(DError::ConversionError { ref field, .. }) if field == "at"));

        let plan = FieldPlan::of::<Birthday>(Some("%Y%m%d"))?;
        let b: Birthday = from_row(&["19900115"], &plan)?;
        assert_eq!(b.day, NaiveDate::from_ymd_opt(1990, 1, 15).unwrap());
        Ok(())
    }

    #[test]
    fn test_newtype_field() -> DResult<()> {
        #[derive(Debug, PartialEq, Deserialize)]
        struct Age(u8);

        #[derive(Debug, PartialEq, Deserialize)]
        struct Test {
            name: String,
            age: Age,
        }

        let plan = FieldPlan::of::<Test>(None)?;
        let t: Test = from_row(&["x", "12"], &plan)?;
        assert_eq!(t.age, Age(12));
        Ok(())
    }

    #[test]
    fn test_wrong_plan() -> DResult<()> {
        #[derive(Debug, Deserialize)]
        #[allow(dead_code)]
        struct Other {
            name: String,
            surname: String,
            height: f64,
        }

        let plan = FieldPlan::of::<Other>(None)?;
        let res: DResult<Person> = from_row(&["a", "b", "1"], &plan);
        assert!(matches!(res, Err(DError::PlanMismatch(_))));
        Ok(())
    }

    #[test]
    fn test_from_line() -> DResult<()> {
        let plan = FieldPlan::of::<Person>(None)?;
        let settings = CsvSettings::default().skip_initial_space(true);
        let p: Person = from_line("Andrea,  Ferretti, 34", &plan, &settings)?;
        assert_eq!(p.surname, "Ferretti");
        assert_eq!(p.age, 34);

        let p: Person = from_line("\"Ferretti, jr\",Andrea,34", &plan, &CsvSettings::default())?;
        assert_eq!(p.name, "Ferretti, jr");

        let settings = CsvSettings::default().separator(b'\t').escape(Some(b'\\'));
        let p: Person = from_line("\"A \\\"nickname\\\"\"\tFerretti\t34", &plan, &settings)?;
        assert_eq!(p.name, "A \"nickname\"");

        let settings = CsvSettings::default().skip_initial_space(true);
        let p: Person = from_line("  Andrea, \"Ferretti, jr\",  34", &plan, &settings)?;
        assert_eq!(p, Person { name: "Andrea".to_string(), surname: "Ferretti, jr".to_string(), age: 34 });

        let res: DResult<Person> = from_line("", &plan, &CsvSettings::default());
        assert!(matches!(res, Err(DError::RowArityMismatch { found: 0, .. })));
        Ok(())
    }
}
