//! AMQP 0-9-1 wire types as used by RabbitMQ.
//!
//! See [RabbitMQ errata](https://www.rabbitmq.com/amqp-0-9-1-errata.html#section_3)
//! for the field value tags.
use std::{collections::BTreeMap, fmt, num::TryFromIntError, ops::Deref};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub type Octect = u8;
pub type ShortUint = u16;
pub type LongUint = u32;
pub type LongLongUint = u64;
pub type TimeStamp = u64;

// AMQP domains
pub type AmqpChannelId = ShortUint;
pub type AmqpClassId = ShortUint;
pub type AmqpMethodId = ShortUint;
pub type AmqpReplyCode = ShortUint;
pub type AmqpPeerProperties = FieldTable;

/////////////////////////////////////////////////////////////////////////////
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone, Default)]
pub struct ShortStr(String);

impl fmt::Display for ShortStr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
impl Deref for ShortStr {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
impl From<ShortStr> for String {
    fn from(s: ShortStr) -> Self {
        s.0
    }
}
impl TryFrom<String> for ShortStr {
    type Error = TryFromIntError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        u8::try_from(s.len())?;
        Ok(Self(s))
    }
}
impl TryFrom<&str> for ShortStr {
    type Error = TryFromIntError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        s.to_string().try_into()
    }
}
// octet length followed by the UTF-8 bytes
impl Serialize for ShortStr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        // length is checked on construction
        (self.0.len() as u8, self.0.as_str()).serialize(serializer)
    }
}
impl<'de> Deserialize<'de> for ShortStr {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let (_len, s) = <(u8, String)>::deserialize(deserializer)?;
        Ok(Self(s))
    }
}

/////////////////////////////////////////////////////////////////////////////
#[derive(PartialEq, Eq, Debug, Clone, Default)]
pub struct LongStr(String);

impl fmt::Display for LongStr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
impl Deref for LongStr {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
impl From<LongStr> for String {
    fn from(s: LongStr) -> Self {
        s.0
    }
}
impl TryFrom<String> for LongStr {
    type Error = TryFromIntError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        u32::try_from(s.len())?;
        Ok(Self(s))
    }
}
impl TryFrom<&str> for LongStr {
    type Error = TryFromIntError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        s.to_string().try_into()
    }
}
// long length followed by the UTF-8 bytes
impl Serialize for LongStr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = u32::try_from(self.0.len()).map_err(serde::ser::Error::custom)?;
        (len, self.0.as_str()).serialize(serializer)
    }
}
impl<'de> Deserialize<'de> for LongStr {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let (_len, s) = <(u32, String)>::deserialize(deserializer)?;
        Ok(Self(s))
    }
}

/////////////////////////////////////////////////////////////////////////////
/// Decimals are an octet of scale followed by a signed long.
#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct DecimalValue(pub Octect, pub i32);

impl fmt::Display for DecimalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Decimal({}, {})", self.0, self.1)
    }
}

//----------------------------------------------------------------------------
// 0-9-1   Qpid/Rabbit  Type
//----------------------------------------------------------------------------
//   t       t            Boolean
//   b       b            Signed 8-bit
//   B       B            Unsigned 8-bit
//   U       s            Signed 16-bit
//   u       u            Unsigned 16-bit
//   I       I            Signed 32-bit
//   i       i            Unsigned 32-bit
//   L       l            Signed 64-bit
//   f       f            32-bit float
//   d       d            64-bit float
//   D       D            Decimal
//   S       S            Long string
//   A       A            Array
//   T       T            Timestamp (u64)
//   F       F            Nested Table
//   V       V            Void
//           x            Byte array
//
// The variant name is the tag on the wire. Arrays and byte arrays are
// prefixed with their size in bytes.
#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
#[allow(non_camel_case_types)]
pub enum FieldValue {
    t(bool),
    b(i8),
    B(u8),
    s(i16),
    u(u16),
    I(i32),
    i(u32),
    l(i64),
    f(f32),
    d(f64),
    D(DecimalValue),
    S(LongStr),
    A(Vec<FieldValue>),
    T(TimeStamp),
    F(FieldTable),
    V,
    x(Vec<u8>),
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::t(v)
    }
}
impl From<LongStr> for FieldValue {
    fn from(v: LongStr) -> Self {
        FieldValue::S(v)
    }
}
impl From<FieldTable> for FieldValue {
    fn from(v: FieldTable) -> Self {
        FieldValue::F(v)
    }
}
impl TryFrom<FieldValue> for bool {
    type Error = FieldValue;

    fn try_from(v: FieldValue) -> Result<Self, Self::Error> {
        match v {
            FieldValue::t(v) => Ok(v),
            other => Err(other),
        }
    }
}
impl TryFrom<FieldValue> for LongStr {
    type Error = FieldValue;

    fn try_from(v: FieldValue) -> Result<Self, Self::Error> {
        match v {
            FieldValue::S(v) => Ok(v),
            other => Err(other),
        }
    }
}
impl TryFrom<FieldValue> for FieldTable {
    type Error = FieldValue;

    fn try_from(v: FieldValue) -> Result<Self, Self::Error> {
        match v {
            FieldValue::F(v) => Ok(v),
            other => Err(other),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::t(v) => write!(f, "{}", v),
            FieldValue::b(v) => write!(f, "{}", v),
            FieldValue::B(v) => write!(f, "{}", v),
            FieldValue::s(v) => write!(f, "{}", v),
            FieldValue::u(v) => write!(f, "{}", v),
            FieldValue::I(v) => write!(f, "{}", v),
            FieldValue::i(v) => write!(f, "{}", v),
            FieldValue::l(v) => write!(f, "{}", v),
            FieldValue::f(v) => write!(f, "{}", v),
            FieldValue::d(v) => write!(f, "{}", v),
            FieldValue::D(v) => write!(f, "{}", v),
            FieldValue::S(v) => write!(f, "{}", v),
            FieldValue::A(values) => {
                let items: Vec<String> = values.iter().map(|v| v.to_string()).collect();
                write!(f, "[{}]", items.join(", "))
            }
            FieldValue::T(v) => write!(f, "{}", v),
            FieldValue::F(v) => write!(f, "{}", v),
            FieldValue::V => f.write_str("()"),
            FieldValue::x(v) => write!(f, "{:?}", v),
        }
    }
}

/////////////////////////////////////////////////////////////////////////////
pub type FieldName = ShortStr;

/// Ordered by field name, so that encoding is deterministic.
///
/// On the wire, the size in bytes as a long followed by name and value pairs.
#[derive(PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct FieldTable(BTreeMap<FieldName, FieldValue>);

impl FieldTable {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn insert(&mut self, k: FieldName, v: FieldValue) -> Option<FieldValue> {
        self.0.insert(k, v)
    }

    pub fn remove(&mut self, k: &str) -> Option<FieldValue> {
        let key = ShortStr::try_from(k).ok()?;
        self.0.remove(&key)
    }

    pub fn get(&self, k: &str) -> Option<&FieldValue> {
        let key = ShortStr::try_from(k).ok()?;
        self.0.get(&key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FieldName, &FieldValue)> {
        self.0.iter()
    }
}

impl fmt::Display for FieldTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let items: Vec<String> = self.0.iter().map(|(k, v)| format!("{}: {}", k, v)).collect();
        write!(f, "{{ {} }}", items.join(", "))
    }
}
