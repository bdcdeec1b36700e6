//! Serde deserializer for the AMQP 0-9-1 wire format, the inverse of
//! [`ser`](super::ser).
//!
//! The format is not self-describing. A string or byte string takes its
//! length from the octet or long read just before it, which is how
//! [`ShortStr`] and [`LongStr`] are laid out.
//!
//! [`ShortStr`]: super::types::ShortStr
//! [`LongStr`]: super::types::LongStr
use serde::de::{
    self, value::StrDeserializer, DeserializeSeed, EnumAccess, MapAccess, SeqAccess,
    VariantAccess, Visitor,
};
use serde::Deserialize;

use super::Error;

/// Deserialize `T` from the whole of `input`.
///
/// # Errors
///
/// [`Error::Syntax`] if `input` is truncated, malformed or has trailing bytes.
pub fn from_bytes<'de, T>(input: &'de [u8]) -> Result<T, Error>
where
    T: Deserialize<'de>,
{
    let mut deserializer = Deserializer::new(input);
    let value = T::deserialize(&mut deserializer)?;
    deserializer.end()?;
    Ok(value)
}

pub struct Deserializer<'de> {
    input: &'de [u8],
    // the latest octet or long, length of a following string
    last_len: Option<usize>,
}

impl<'de> Deserializer<'de> {
    pub fn new(input: &'de [u8]) -> Self {
        Self {
            input,
            last_len: None,
        }
    }

    fn end(&self) -> Result<(), Error> {
        if !self.input.is_empty() {
            return Err(Error::Syntax(format!(
                "{} trailing bytes",
                self.input.len()
            )));
        }
        Ok(())
    }

    fn take(&mut self, len: usize) -> Result<&'de [u8], Error> {
        if self.input.len() < len {
            return Err(Error::Syntax(format!(
                "need {} bytes, only {} remaining",
                len,
                self.input.len()
            )));
        }
        let (head, tail) = self.input.split_at(len);
        self.input = tail;
        Ok(head)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N], Error> {
        let mut array = [0u8; N];
        array.copy_from_slice(self.take(N)?);
        Ok(array)
    }

    fn take_str_len(&mut self) -> Result<usize, Error> {
        self.last_len
            .take()
            .ok_or_else(|| Error::Syntax("string without a length prefix".to_string()))
    }

    // content of a sequence or map, prefixed by its byte length
    fn take_length_prefixed(&mut self) -> Result<Deserializer<'de>, Error> {
        let len = u32::from_be_bytes(self.take_array()?) as usize;
        Ok(Deserializer::new(self.take(len)?))
    }
}

fn unsupported(what: &str) -> Error {
    Error::Syntax(format!("{} is not supported by the wire format", what))
}

macro_rules! impl_deserialize_number {
    ($($method:ident => $ty:ty, $visit:ident);+ $(;)?) => {
        $(
            fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
                let value = <$ty>::from_be_bytes(self.take_array()?);
                visitor.$visit(value)
            }
        )+
    };
}

impl<'de> de::Deserializer<'de> for &mut Deserializer<'de> {
    type Error = Error;

    impl_deserialize_number! {
        deserialize_i8 => i8, visit_i8;
        deserialize_i16 => i16, visit_i16;
        deserialize_i32 => i32, visit_i32;
        deserialize_i64 => i64, visit_i64;
        deserialize_u16 => u16, visit_u16;
        deserialize_u64 => u64, visit_u64;
        deserialize_f32 => f32, visit_f32;
        deserialize_f64 => f64, visit_f64;
    }

    fn is_human_readable(&self) -> bool {
        false
    }

    fn deserialize_any<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value, Error> {
        Err(unsupported("self-describing value"))
    }

    fn deserialize_bool<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        let [octet] = self.take_array::<1>()?;
        visitor.visit_bool(octet != 0)
    }

    fn deserialize_u8<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        let [octet] = self.take_array::<1>()?;
        self.last_len = Some(octet as usize);
        visitor.visit_u8(octet)
    }

    fn deserialize_u32<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        let value = u32::from_be_bytes(self.take_array()?);
        self.last_len = Some(value as usize);
        visitor.visit_u32(value)
    }

    fn deserialize_char<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value, Error> {
        Err(unsupported("char"))
    }

    fn deserialize_str<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        let len = self.take_str_len()?;
        let raw = self.take(len)?;
        let s = std::str::from_utf8(raw).map_err(|err| Error::Syntax(err.to_string()))?;
        visitor.visit_borrowed_str(s)
    }

    fn deserialize_string<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        self.deserialize_str(visitor)
    }

    fn deserialize_bytes<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        let len = self.take_str_len()?;
        visitor.visit_borrowed_bytes(self.take(len)?)
    }

    fn deserialize_byte_buf<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        self.deserialize_bytes(visitor)
    }

    fn deserialize_option<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value, Error> {
        Err(unsupported("optional value"))
    }

    fn deserialize_unit<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        visitor.visit_unit()
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Error> {
        visitor.visit_unit()
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Error> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        let mut content = self.take_length_prefixed()?;
        let value = visitor.visit_seq(UntilEnd { de: &mut content })?;
        content.end()?;
        Ok(value)
    }

    fn deserialize_tuple<V: Visitor<'de>>(
        self,
        len: usize,
        visitor: V,
    ) -> Result<V::Value, Error> {
        visitor.visit_seq(Fields {
            de: self,
            remaining: len,
        })
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        len: usize,
        visitor: V,
    ) -> Result<V::Value, Error> {
        self.deserialize_tuple(len, visitor)
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        let mut content = self.take_length_prefixed()?;
        let value = visitor.visit_map(UntilEnd { de: &mut content })?;
        content.end()?;
        Ok(value)
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Error> {
        self.deserialize_tuple(fields.len(), visitor)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Error> {
        let [tag] = self.take_array::<1>()?;
        visitor.visit_enum(Tagged { de: self, tag })
    }

    fn deserialize_identifier<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value, Error> {
        Err(unsupported("identifier"))
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value, Error> {
        Err(unsupported("ignored value"))
    }
}

/// Fixed number of fields of a struct or tuple.
struct Fields<'a, 'de> {
    de: &'a mut Deserializer<'de>,
    remaining: usize,
}

impl<'de> SeqAccess<'de> for Fields<'_, 'de> {
    type Error = Error;

    fn next_element_seed<T>(&mut self, seed: T) -> Result<Option<T::Value>, Error>
    where
        T: DeserializeSeed<'de>,
    {
        if self.remaining == 0 {
            return Ok(None);
        }
        self.remaining -= 1;
        seed.deserialize(&mut *self.de).map(Some)
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.remaining)
    }
}

/// Items of a length prefixed sequence or map, read until its content is exhausted.
struct UntilEnd<'a, 'de> {
    de: &'a mut Deserializer<'de>,
}

impl<'de> SeqAccess<'de> for UntilEnd<'_, 'de> {
    type Error = Error;

    fn next_element_seed<T>(&mut self, seed: T) -> Result<Option<T::Value>, Error>
    where
        T: DeserializeSeed<'de>,
    {
        if self.de.input.is_empty() {
            return Ok(None);
        }
        seed.deserialize(&mut *self.de).map(Some)
    }
}

impl<'de> MapAccess<'de> for UntilEnd<'_, 'de> {
    type Error = Error;

    fn next_key_seed<K>(&mut self, seed: K) -> Result<Option<K::Value>, Error>
    where
        K: DeserializeSeed<'de>,
    {
        if self.de.input.is_empty() {
            return Ok(None);
        }
        seed.deserialize(&mut *self.de).map(Some)
    }

    fn next_value_seed<V>(&mut self, seed: V) -> Result<V::Value, Error>
    where
        V: DeserializeSeed<'de>,
    {
        seed.deserialize(&mut *self.de)
    }
}

/// Enum value whose variant is named by a one octet tag.
struct Tagged<'a, 'de> {
    de: &'a mut Deserializer<'de>,
    tag: u8,
}

impl<'a, 'de> EnumAccess<'de> for Tagged<'a, 'de> {
    type Error = Error;
    type Variant = Self;

    fn variant_seed<V>(self, seed: V) -> Result<(V::Value, Self), Error>
    where
        V: DeserializeSeed<'de>,
    {
        let mut name = [0u8; 4];
        let name = char::from(self.tag).encode_utf8(&mut name);
        let variant = seed.deserialize(StrDeserializer::<Error>::new(name))?;
        Ok((variant, self))
    }
}

impl<'de> VariantAccess<'de> for Tagged<'_, 'de> {
    type Error = Error;

    fn unit_variant(self) -> Result<(), Error> {
        Ok(())
    }

    fn newtype_variant_seed<T>(self, seed: T) -> Result<T::Value, Error>
    where
        T: DeserializeSeed<'de>,
    {
        seed.deserialize(self.de)
    }

    fn tuple_variant<V: Visitor<'de>>(self, _len: usize, _visitor: V) -> Result<V::Value, Error> {
        Err(unsupported("tuple variant"))
    }

    fn struct_variant<V: Visitor<'de>>(
        self,
        _fields: &'static [&'static str],
        _visitor: V,
    ) -> Result<V::Value, Error> {
        Err(unsupported("struct variant"))
    }
}
