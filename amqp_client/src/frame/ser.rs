//! Serde serializer for the AMQP 0-9-1 wire format.
//!
//! Numbers are written big endian and a `bool` takes a whole octet.
//! Strings and bytes are written raw: their length prefix belongs to the
//! type that owns them, see [`ShortStr`] and [`LongStr`]. Sequences and
//! maps are prefixed with their size in bytes as a long. Structs and
//! tuples are the plain concatenation of their fields. An enum variant is
//! written as its one octet name followed by its value.
//!
//! [`ShortStr`]: super::types::ShortStr
//! [`LongStr`]: super::types::LongStr
use bytes::{BufMut, BytesMut};
use serde::{
    ser::{self, Impossible},
    Serialize,
};

use super::Error;

/// Append `value` to `buf`, returning the number of bytes written.
pub fn to_buffer<T>(value: &T, buf: &mut BytesMut) -> Result<usize, Error>
where
    T: Serialize + ?Sized,
{
    let start = buf.len();
    value.serialize(&mut Serializer { output: buf })?;
    Ok(buf.len() - start)
}

pub struct Serializer<'a> {
    output: &'a mut BytesMut,
}

impl Serializer<'_> {
    fn write_tag(&mut self, variant: &'static str) -> Result<(), Error> {
        match variant.as_bytes() {
            [tag] => {
                self.output.put_u8(*tag);
                Ok(())
            }
            _ => Err(Error::Syntax(format!(
                "variant '{}' is not a one octet tag",
                variant
            ))),
        }
    }

    // placeholder, patched by `end_length_prefixed`
    fn begin_length_prefixed(&mut self) -> usize {
        let start = self.output.len();
        self.output.put_u32(0);
        start
    }

    fn end_length_prefixed(&mut self, start: usize) -> Result<(), Error> {
        let len = self.output.len() - start - 4;
        let len = u32::try_from(len)
            .map_err(|_| Error::Syntax(format!("{} bytes do not fit a long length", len)))?;
        self.output[start..start + 4].copy_from_slice(&len.to_be_bytes());
        Ok(())
    }
}

fn unsupported(what: &str) -> Error {
    Error::Syntax(format!("{} is not supported by the wire format", what))
}

impl<'a, 'b> ser::Serializer for &'b mut Serializer<'a> {
    type Ok = ();
    type Error = Error;

    type SerializeSeq = LengthPrefixed<'a, 'b>;
    type SerializeTuple = Self;
    type SerializeTupleStruct = Self;
    type SerializeTupleVariant = Impossible<(), Error>;
    type SerializeMap = LengthPrefixed<'a, 'b>;
    type SerializeStruct = Self;
    type SerializeStructVariant = Impossible<(), Error>;

    fn is_human_readable(&self) -> bool {
        false
    }

    fn serialize_bool(self, v: bool) -> Result<(), Error> {
        self.output.put_u8(v as u8);
        Ok(())
    }

    fn serialize_i8(self, v: i8) -> Result<(), Error> {
        self.output.put_i8(v);
        Ok(())
    }

    fn serialize_i16(self, v: i16) -> Result<(), Error> {
        self.output.put_i16(v);
        Ok(())
    }

    fn serialize_i32(self, v: i32) -> Result<(), Error> {
        self.output.put_i32(v);
        Ok(())
    }

    fn serialize_i64(self, v: i64) -> Result<(), Error> {
        self.output.put_i64(v);
        Ok(())
    }

    fn serialize_u8(self, v: u8) -> Result<(), Error> {
        self.output.put_u8(v);
        Ok(())
    }

    fn serialize_u16(self, v: u16) -> Result<(), Error> {
        self.output.put_u16(v);
        Ok(())
    }

    fn serialize_u32(self, v: u32) -> Result<(), Error> {
        self.output.put_u32(v);
        Ok(())
    }

    fn serialize_u64(self, v: u64) -> Result<(), Error> {
        self.output.put_u64(v);
        Ok(())
    }

    fn serialize_f32(self, v: f32) -> Result<(), Error> {
        self.output.put_f32(v);
        Ok(())
    }

    fn serialize_f64(self, v: f64) -> Result<(), Error> {
        self.output.put_f64(v);
        Ok(())
    }

    fn serialize_char(self, v: char) -> Result<(), Error> {
        if !v.is_ascii() {
            return Err(unsupported("non ASCII char"));
        }
        self.output.put_u8(v as u8);
        Ok(())
    }

    fn serialize_str(self, v: &str) -> Result<(), Error> {
        self.output.put_slice(v.as_bytes());
        Ok(())
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<(), Error> {
        self.output.put_slice(v);
        Ok(())
    }

    fn serialize_none(self) -> Result<(), Error> {
        Err(unsupported("optional value"))
    }

    fn serialize_some<T>(self, _value: &T) -> Result<(), Error>
    where
        T: ?Sized + Serialize,
    {
        Err(unsupported("optional value"))
    }

    fn serialize_unit(self) -> Result<(), Error> {
        Ok(())
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<(), Error> {
        Ok(())
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<(), Error> {
        self.write_tag(variant)
    }

    fn serialize_newtype_struct<T>(self, _name: &'static str, value: &T) -> Result<(), Error>
    where
        T: ?Sized + Serialize,
    {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T>(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<(), Error>
    where
        T: ?Sized + Serialize,
    {
        self.write_tag(variant)?;
        value.serialize(self)
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq, Error> {
        let start = self.begin_length_prefixed();
        Ok(LengthPrefixed { ser: self, start })
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple, Error> {
        Ok(self)
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct, Error> {
        Ok(self)
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant, Error> {
        Err(unsupported("tuple variant"))
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap, Error> {
        let start = self.begin_length_prefixed();
        Ok(LengthPrefixed { ser: self, start })
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStruct, Error> {
        Ok(self)
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant, Error> {
        Err(unsupported("struct variant"))
    }
}

impl ser::SerializeTuple for &mut Serializer<'_> {
    type Ok = ();
    type Error = Error;

    fn serialize_element<T>(&mut self, value: &T) -> Result<(), Error>
    where
        T: ?Sized + Serialize,
    {
        value.serialize(&mut **self)
    }

    fn end(self) -> Result<(), Error> {
        Ok(())
    }
}

impl ser::SerializeTupleStruct for &mut Serializer<'_> {
    type Ok = ();
    type Error = Error;

    fn serialize_field<T>(&mut self, value: &T) -> Result<(), Error>
    where
        T: ?Sized + Serialize,
    {
        value.serialize(&mut **self)
    }

    fn end(self) -> Result<(), Error> {
        Ok(())
    }
}

impl ser::SerializeStruct for &mut Serializer<'_> {
    type Ok = ();
    type Error = Error;

    fn serialize_field<T>(&mut self, _key: &'static str, value: &T) -> Result<(), Error>
    where
        T: ?Sized + Serialize,
    {
        value.serialize(&mut **self)
    }

    fn end(self) -> Result<(), Error> {
        Ok(())
    }
}

/// Sequence or map whose byte length is written once all items are.
pub struct LengthPrefixed<'a, 'b> {
    ser: &'b mut Serializer<'a>,
    start: usize,
}

impl ser::SerializeSeq for LengthPrefixed<'_, '_> {
    type Ok = ();
    type Error = Error;

    fn serialize_element<T>(&mut self, value: &T) -> Result<(), Error>
    where
        T: ?Sized + Serialize,
    {
        value.serialize(&mut *self.ser)
    }

    fn end(self) -> Result<(), Error> {
        self.ser.end_length_prefixed(self.start)
    }
}

impl ser::SerializeMap for LengthPrefixed<'_, '_> {
    type Ok = ();
    type Error = Error;

    fn serialize_key<T>(&mut self, key: &T) -> Result<(), Error>
    where
        T: ?Sized + Serialize,
    {
        key.serialize(&mut *self.ser)
    }

    fn serialize_value<T>(&mut self, value: &T) -> Result<(), Error>
    where
        T: ?Sized + Serialize,
    {
        value.serialize(&mut *self.ser)
    }

    fn end(self) -> Result<(), Error> {
        self.ser.end_length_prefixed(self.start)
    }
}

/////////////////////////////////////////////////////////////////////////////
#[cfg(test)]
mod tests {
    use bytes::BytesMut;
    use serde::Serialize;

    use super::to_buffer;
    use crate::frame::Error;

    #[derive(Serialize)]
    struct Header {
        class_id: u16,
        method_id: u16,
        flag: bool,
    }

    #[derive(Serialize)]
    #[allow(non_camel_case_types)]
    enum Tagged {
        u(u16),
        V,
        Long(u8),
    }

    #[test]
    fn test_struct_fields_in_order() {
        let mut buf = BytesMut::new();
        let header = Header {
            class_id: 10,
            method_id: 11,
            flag: true,
        };
        assert_eq!(5, to_buffer(&header, &mut buf).unwrap());
        assert_eq!(&[0, 10, 0, 11, 1][..], &buf[..]);
    }

    #[test]
    fn test_seq_has_byte_length() {
        let mut buf = BytesMut::new();
        to_buffer(&vec![1u16, 2, 3], &mut buf).unwrap();
        assert_eq!(&[0, 0, 0, 6, 0, 1, 0, 2, 0, 3][..], &buf[..]);
    }

    #[test]
    fn test_variant_tags() {
        let mut buf = BytesMut::new();
        to_buffer(&(Tagged::u(9), Tagged::V), &mut buf).unwrap();
        assert_eq!(&[b'u', 0, 9, b'V'][..], &buf[..]);

        assert!(matches!(
            to_buffer(&Tagged::Long(1), &mut buf),
            Err(Error::Syntax(_))
        ));
    }

    #[test]
    fn test_option_is_rejected() {
        let mut buf = BytesMut::new();
        assert!(to_buffer(&Some(1u8), &mut buf).is_err());
    }
}
