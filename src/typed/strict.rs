//! A deserializer over `serde_yaml::Value` that refuses numeric widening.
//!
//! `serde_yaml::Value` hands an integer to any float visitor, so `3` decodes
//! into an `f64`. Scalars read through the node layer must match the kind
//! written in the document, so float targets only accept float scalars.

use serde::de::value::{MapDeserializer, SeqDeserializer};
use serde::de::{self, IntoDeserializer, Unexpected, Visitor};
use serde::{forward_to_deserialize_any, Deserializer};
use serde_yaml::{Number, Value};

pub(crate) struct Strict(pub(crate) Value);

fn unexpected(n: &Number) -> Unexpected<'static> {
    match (n.as_i64(), n.as_u64()) {
        (Some(i), _) => Unexpected::Signed(i),
        (None, Some(u)) => Unexpected::Unsigned(u),
        (None, None) => Unexpected::Other("number"),
    }
}

impl Strict {
    fn float<'de, V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, serde_yaml::Error> {
        match self.0 {
            Value::Number(n) if !n.is_f64() => Err(de::Error::invalid_type(unexpected(&n), &visitor)),
            other => other.deserialize_any(visitor),
        }
    }
}

impl<'de> Deserializer<'de> for Strict {
    type Error = serde_yaml::Error;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.0 {
            Value::Sequence(items) => {
                let mut seq: SeqDeserializer<_, serde_yaml::Error> = SeqDeserializer::new(items.into_iter().map(Strict));
                let value = visitor.visit_seq(&mut seq)?;
                seq.end()?;
                Ok(value)
            }
            Value::Mapping(entries) => {
                let mut map: MapDeserializer<'de, _, serde_yaml::Error> =
                    MapDeserializer::new(entries.into_iter().map(|(k, v)| (Strict(k), Strict(v))));
                let value = visitor.visit_map(&mut map)?;
                map.end()?;
                Ok(value)
            }
            other => other.deserialize_any(visitor),
        }
    }

    fn deserialize_f32<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        self.float(visitor)
    }

    fn deserialize_f64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        self.float(visitor)
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.0 {
            Value::Null => visitor.visit_none(),
            other => visitor.visit_some(Strict(other)),
        }
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(self, _name: &'static str, visitor: V) -> Result<V::Value, Self::Error> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        name: &'static str,
        variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.0.deserialize_enum(name, variants, visitor)
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 char str string
        bytes byte_buf unit unit_struct seq tuple tuple_struct map struct
        identifier ignored_any
    }
}

impl<'de> IntoDeserializer<'de, serde_yaml::Error> for Strict {
    type Deserializer = Self;

    fn into_deserializer(self) -> Self {
        self
    }
}
