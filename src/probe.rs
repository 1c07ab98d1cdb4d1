//! A deserializer that reads no data, only the shape of a record type.
//!
//! Serde's derived `Deserialize` for a struct asks for its fields one at a time,
//! in declaration order, naming the Rust type it wants for each. Answering
//! those requests with placeholder values lets us record each field's
//! [`FieldKind`] without ever constructing a record from real data.
use serde::de::{self, IntoDeserializer, SeqAccess, Visitor};

use crate::field_plan::{FieldEntry, FieldKind, PError, PResult};
use crate::temporal::TemporalKind;

pub(crate) struct Probe<'l> {
    date_layout: Option<&'l str>,
    entries: Vec<FieldEntry>,
}

impl<'l> Probe<'l> {
    pub(crate) fn new(date_layout: Option<&'l str>) -> Self {
        Self { date_layout, entries: vec![] }
    }

    pub(crate) fn into_entries(self) -> Vec<FieldEntry> {
        self.entries
    }

    fn record(&mut self, name: &'static str, kind: FieldKind) -> PResult<()> {
        let format = if let FieldKind::DateTime = kind {
            let layout = self.date_layout
                .ok_or_else(|| PError::MissingDateLayout { field: name.to_string() })?;
            Some(layout.to_string())
        } else {
            None
        };

        self.entries.push(FieldEntry { name, kind, format });
        Ok(())
    }
}

impl<'de, 'a, 'l> de::Deserializer<'de> for &'a mut Probe<'l> {
    type Error = PError;

    fn deserialize_any<V>(self, _visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de> {
        Err(PError::NotAFlatRecord("a self-describing type"))
    }

    fn deserialize_newtype_struct<V>(self, _name: &'static str, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_tuple<V>(self, _len: usize, _visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de> {
        Err(PError::NotAFlatRecord("a tuple"))
    }

    fn deserialize_tuple_struct<V>(self, _name: &'static str, _len: usize, _visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de> {
        Err(PError::NotAFlatRecord("a tuple struct"))
    }

    fn deserialize_struct<V>(
        self,
        _name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de> {
        visitor.visit_seq(ProbeFields { probe: self, fields, i: 0 })
    }

    serde::forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf option unit unit_struct seq map enum identifier ignored_any
    }
}


/// Hands out one [`FieldProbe`] per declared field
struct ProbeFields<'a, 'l> {
    probe: &'a mut Probe<'l>,
    fields: &'static [&'static str],
    i: usize,
}

impl<'de, 'a, 'l> SeqAccess<'de> for ProbeFields<'a, 'l> {
    type Error = PError;

    fn next_element_seed<T>(&mut self, seed: T) -> Result<Option<T::Value>, Self::Error>
    where
        T: de::DeserializeSeed<'de> {
        let Some(&name) = self.fields.get(self.i) else {
            return Ok(None)
        };
        self.i += 1;
        seed.deserialize(FieldProbe { probe: &mut *self.probe, name }).map(Some)
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.fields.len() - self.i)
    }
}


/// Records the kind of a single field and answers with a placeholder value
struct FieldProbe<'a, 'l> {
    probe: &'a mut Probe<'l>,
    name: &'static str,
}

impl<'a, 'l> FieldProbe<'a, 'l> {
    fn unsupported<T>(&self, found: &'static str) -> PResult<T> {
        Err(PError::UnsupportedFieldType { field: self.name.to_string(), found })
    }
}

impl<'de, 'a, 'l> de::Deserializer<'de> for FieldProbe<'a, 'l> {
    type Error = PError;

    fn deserialize_any<V>(self, _visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de> {
        // untyped values, `#[serde(flatten)]` and untagged enums all end up here
        self.unsupported("an untyped value")
    }

    fn deserialize_bool<V>(self, _visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de> {
        self.unsupported("bool")
    }

    fn deserialize_i8<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de> {
        self.deserialize_i64(visitor)
    }

    fn deserialize_i16<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de> {
        self.deserialize_i64(visitor)
    }

    fn deserialize_i32<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de> {
        self.deserialize_i64(visitor)
    }

    fn deserialize_i64<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de> {
        self.probe.record(self.name, FieldKind::Integer)?;
        visitor.visit_i64(0)
    }

    fn deserialize_i128<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de> {
        self.probe.record(self.name, FieldKind::Integer)?;
        visitor.visit_i128(0)
    }

    fn deserialize_u8<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de> {
        self.deserialize_u64(visitor)
    }

    fn deserialize_u16<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de> {
        self.deserialize_u64(visitor)
    }

    fn deserialize_u32<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de> {
        self.deserialize_u64(visitor)
    }

    fn deserialize_u64<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de> {
        self.probe.record(self.name, FieldKind::Integer)?;
        visitor.visit_u64(0)
    }

    fn deserialize_u128<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de> {
        self.probe.record(self.name, FieldKind::Integer)?;
        visitor.visit_u128(0)
    }

    fn deserialize_f32<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de> {
        self.deserialize_f64(visitor)
    }

    fn deserialize_f64<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de> {
        self.probe.record(self.name, FieldKind::Float)?;
        visitor.visit_f64(0.0)
    }

    fn deserialize_char<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de> {
        self.probe.record(self.name, FieldKind::Text)?;
        visitor.visit_char(' ')
    }

    fn deserialize_str<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de> {
        self.probe.record(self.name, FieldKind::Text)?;
        visitor.visit_borrowed_str("")
    }

    fn deserialize_string<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de> {
        self.deserialize_str(visitor)
    }

    fn deserialize_bytes<V>(self, _visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de> {
        self.unsupported("bytes")
    }

    fn deserialize_byte_buf<V>(self, _visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de> {
        self.unsupported("bytes")
    }

    fn deserialize_option<V>(self, _visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de> {
        self.unsupported("Option")
    }

    fn deserialize_unit<V>(self, _visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de> {
        self.unsupported("()")
    }

    fn deserialize_unit_struct<V>(
        self,
        _name: &'static str,
        _visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de> {
        self.unsupported("a unit struct")
    }

    fn deserialize_newtype_struct<V>(
        self,
        name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de> {
        if let Some(temporal) = TemporalKind::from_token(name) {
            self.probe.record(self.name, FieldKind::DateTime)?;
            visitor.visit_newtype_struct(temporal.placeholder().into_deserializer())
        } else {
            visitor.visit_newtype_struct(self)
        }
    }

    fn deserialize_seq<V>(self, _visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de> {
        self.unsupported("a sequence")
    }

    fn deserialize_tuple<V>(self, _len: usize, _visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de> {
        self.unsupported("a tuple")
    }

    fn deserialize_tuple_struct<V>(
        self,
        _name: &'static str,
        _len: usize,
        _visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de> {
        self.unsupported("a tuple struct")
    }

    fn deserialize_map<V>(self, _visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de> {
        self.unsupported("a map")
    }

    fn deserialize_struct<V>(
        self,
        _name: &'static str,
        _fields: &'static [&'static str],
        _visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de> {
        self.unsupported("a nested struct")
    }

    fn deserialize_enum<V>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        _visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de> {
        self.unsupported("an enum")
    }

    fn deserialize_identifier<V>(self, _visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de> {
        self.unsupported("an identifier")
    }

    fn deserialize_ignored_any<V>(self, _visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de> {
        self.unsupported("an ignored value")
    }
}
