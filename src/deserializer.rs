//! Serde deserializer implementation for resolved configs
//!
//! This module provides the serde integration, allowing a resolved config to
//! be deserialized directly into Rust types using the standard serde derive
//! macros. Scalars are coerced with the same rules as the typed accessors,
//! so `port = "8080"` and `port = 8080` both fill a `u16`.

use crate::config::Config;
use crate::error::HoconError;
use crate::view::{ValueKind, ValueRef};
use serde::de::{self, DeserializeOwned, DeserializeSeed, IntoDeserializer, Visitor};

/// Deserializer over one resolved value
pub struct ValueDeserializer<'a> {
    value: ValueRef<'a>,
}

impl<'a> ValueDeserializer<'a> {
    /// Creates a deserializer for `value`
    pub fn new(value: ValueRef<'a>) -> Self {
        Self { value }
    }
}

macro_rules! deserialize_scalar {
    ($de:lifetime; $($method:ident => $ty:ty, $visit:ident;)*) => {
        $(
            fn $method<V>(self, visitor: V) -> Result<V::Value, Self::Error>
            where
                V: Visitor<$de>,
            {
                visitor.$visit(self.value.to::<$ty>()?)
            }
        )*
    };
}

impl<'de, 'a> de::Deserializer<'de> for ValueDeserializer<'a> {
    type Error = HoconError;

    fn deserialize_any<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        match self.value.kind()? {
            ValueKind::Object => self.deserialize_map(visitor),
            ValueKind::Array => self.deserialize_seq(visitor),
            ValueKind::String => visitor.visit_string(self.value.get_string()?),
            ValueKind::Empty => visitor.visit_unit(),
            ValueKind::Mixed => Err(de::Error::custom(
                "cannot deserialize text concatenated with an object",
            )),
        }
    }

    deserialize_scalar! {
        'de;
        deserialize_bool => bool, visit_bool;
        deserialize_i8 => i8, visit_i8;
        deserialize_i16 => i16, visit_i16;
        deserialize_i32 => i32, visit_i32;
        deserialize_i64 => i64, visit_i64;
        deserialize_u8 => u8, visit_u8;
        deserialize_u16 => u16, visit_u16;
        deserialize_u32 => u32, visit_u32;
        deserialize_u64 => u64, visit_u64;
        deserialize_f32 => f32, visit_f32;
        deserialize_f64 => f64, visit_f64;
        deserialize_string => String, visit_string;
    }

    fn deserialize_char<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        let text = self.value.get_string()?;
        let mut chars = text.chars();
        match (chars.next(), chars.next()) {
            (Some(ch), None) => visitor.visit_char(ch),
            _ => Err(de::Error::invalid_value(
                de::Unexpected::Str(&text),
                &"a single character",
            )),
        }
    }

    fn deserialize_str<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        self.deserialize_string(visitor)
    }

    fn deserialize_bytes<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        self.deserialize_byte_buf(visitor)
    }

    fn deserialize_byte_buf<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        visitor.visit_byte_buf(self.value.get_string()?.into_bytes())
    }

    fn deserialize_option<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        match self.value.kind()? {
            ValueKind::Empty => visitor.visit_none(),
            ValueKind::String if self.value.get_string()? == "null" => visitor.visit_none(),
            _ => visitor.visit_some(self),
        }
    }

    fn deserialize_unit<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        visitor.visit_unit()
    }

    fn deserialize_unit_struct<V>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        self.deserialize_unit(visitor)
    }

    fn deserialize_newtype_struct<V>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        let items = self.value.get_array()?;
        visitor.visit_seq(SeqAccess {
            items: items.into_iter(),
        })
    }

    fn deserialize_tuple<V>(self, _len: usize, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        self.deserialize_seq(visitor)
    }

    fn deserialize_tuple_struct<V>(
        self,
        _name: &'static str,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        self.deserialize_seq(visitor)
    }

    fn deserialize_map<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        let fields = self.value.fields()?;
        visitor.visit_map(MapAccess {
            fields: fields.into_iter(),
            current_value: None,
        })
    }

    fn deserialize_struct<V>(
        self,
        _name: &'static str,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        self.deserialize_map(visitor)
    }

    fn deserialize_enum<V>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        match self.value.kind()? {
            // Unit variant (string)
            ValueKind::String => visitor.visit_enum(EnumAccess {
                variant: self.value.get_string()?,
                value: None,
            }),
            // Data variant (object with single key)
            ValueKind::Object => {
                let mut fields = self.value.fields()?;
                if fields.len() != 1 {
                    return Err(de::Error::invalid_length(
                        fields.len(),
                        &"an object with exactly one key",
                    ));
                }
                let (variant, value) = fields.remove(0);
                visitor.visit_enum(EnumAccess {
                    variant: variant.to_string(),
                    value: Some(value),
                })
            }
            kind => Err(de::Error::invalid_type(
                de::Unexpected::Other(kind.name()),
                &"a string or a single-key object",
            )),
        }
    }

    fn deserialize_identifier<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        self.deserialize_string(visitor)
    }

    fn deserialize_ignored_any<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        visitor.visit_unit()
    }
}

/// Sequence access over array items
struct SeqAccess<'a> {
    items: std::vec::IntoIter<ValueRef<'a>>,
}

impl<'de, 'a> de::SeqAccess<'de> for SeqAccess<'a> {
    type Error = HoconError;

    fn next_element_seed<T>(&mut self, seed: T) -> Result<Option<T::Value>, Self::Error>
    where
        T: DeserializeSeed<'de>,
    {
        match self.items.next() {
            Some(item) => seed.deserialize(ValueDeserializer::new(item)).map(Some),
            None => Ok(None),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.items.len())
    }
}

/// Map access over object fields
struct MapAccess<'a> {
    fields: std::vec::IntoIter<(&'a str, ValueRef<'a>)>,
    current_value: Option<ValueRef<'a>>,
}

impl<'de, 'a> de::MapAccess<'de> for MapAccess<'a> {
    type Error = HoconError;

    fn next_key_seed<K>(&mut self, seed: K) -> Result<Option<K::Value>, Self::Error>
    where
        K: DeserializeSeed<'de>,
    {
        match self.fields.next() {
            Some((key, value)) => {
                self.current_value = Some(value);
                seed.deserialize(key.to_string().into_deserializer()).map(Some)
            }
            None => Ok(None),
        }
    }

    fn next_value_seed<V>(&mut self, seed: V) -> Result<V::Value, Self::Error>
    where
        V: DeserializeSeed<'de>,
    {
        match self.current_value.take() {
            Some(value) => seed.deserialize(ValueDeserializer::new(value)),
            None => Err(de::Error::custom("No value available for map entry")),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.fields.len())
    }
}

/// Enum access for string and single-key object variants
struct EnumAccess<'a> {
    variant: String,
    value: Option<ValueRef<'a>>,
}

impl<'de, 'a> de::EnumAccess<'de> for EnumAccess<'a> {
    type Error = HoconError;
    type Variant = VariantAccess<'a>;

    fn variant_seed<V>(self, seed: V) -> Result<(V::Value, Self::Variant), Self::Error>
    where
        V: DeserializeSeed<'de>,
    {
        let name: de::value::StringDeserializer<HoconError> = self.variant.into_deserializer();
        let variant = seed.deserialize(name)?;
        Ok((variant, VariantAccess { value: self.value }))
    }
}

/// Variant access for enum payloads
struct VariantAccess<'a> {
    value: Option<ValueRef<'a>>,
}

impl<'a> VariantAccess<'a> {
    fn payload(self) -> Result<ValueDeserializer<'a>, HoconError> {
        self.value
            .map(ValueDeserializer::new)
            .ok_or_else(|| de::Error::custom("Expected variant data, found unit variant"))
    }
}

impl<'de, 'a> de::VariantAccess<'de> for VariantAccess<'a> {
    type Error = HoconError;

    fn unit_variant(self) -> Result<(), Self::Error> {
        match self.value {
            None => Ok(()),
            Some(_) => Err(de::Error::custom("Expected unit variant, found data")),
        }
    }

    fn newtype_variant_seed<T>(self, seed: T) -> Result<T::Value, Self::Error>
    where
        T: DeserializeSeed<'de>,
    {
        seed.deserialize(self.payload()?)
    }

    fn tuple_variant<V>(self, _len: usize, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        de::Deserializer::deserialize_seq(self.payload()?, visitor)
    }

    fn struct_variant<V>(
        self,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        de::Deserializer::deserialize_map(self.payload()?, visitor)
    }
}

/// Deserializes the root object of a resolved config
pub fn from_config<T>(config: &Config) -> Result<T, HoconError>
where
    T: DeserializeOwned,
{
    T::deserialize(ValueDeserializer::new(config.root()))
}

/// Convenience function to parse, resolve and deserialize text
pub fn from_str<T>(s: &str) -> Result<T, HoconError>
where
    T: DeserializeOwned,
{
    let config = Config::parse_str(s)?;
    from_config(&config)
}
