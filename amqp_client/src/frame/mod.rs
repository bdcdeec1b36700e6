use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};

///////////////////////////////////////////////////////////
mod constants;
mod de;
mod demux;
mod error;
mod method;
mod protocol_header;
mod ser;
pub mod types;

pub use constants::*;
pub use de::from_bytes;
pub use demux::*;
pub use error::*;
pub use method::*;
pub use protocol_header::*;
pub use ser::to_buffer;

use types::{AmqpChannelId, Octect};

/////////////////////////////////////////////////////////////////
/// One complete frame as extracted from the byte stream: header, payload and terminator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    bytes: Bytes,
}

impl RawFrame {
    /// `bytes` must hold exactly `FRAME_HEADER_SIZE + payload_size + 1` bytes.
    pub(crate) fn new(bytes: Bytes) -> Self {
        debug_assert!(bytes.len() > FRAME_HEADER_SIZE);
        Self { bytes }
    }

    pub fn frame_type(&self) -> Octect {
        self.bytes[0]
    }

    pub fn channel(&self) -> AmqpChannelId {
        u16::from_be_bytes([self.bytes[1], self.bytes[2]])
    }

    pub fn payload_size(&self) -> usize {
        self.bytes.len() - FRAME_HEADER_SIZE - 1
    }

    pub fn payload(&self) -> Bytes {
        self.bytes.slice(FRAME_HEADER_SIZE..self.bytes.len() - 1)
    }

    pub fn frame_end(&self) -> Octect {
        self.bytes[self.bytes.len() - 1]
    }

    /// Total size on the wire.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/////////////////////////////////////////////////////////////////
/// Decoded frame payload. Content frames are carried opaque.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Method(Method),
    ContentHeader(Bytes),
    ContentBody(Bytes),
    HeartBeat,
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Frame::Method(method) => write!(f, "{}", method),
            Frame::ContentHeader(payload) => write!(f, "ContentHeader({} bytes)", payload.len()),
            Frame::ContentBody(payload) => write!(f, "ContentBody({} bytes)", payload.len()),
            Frame::HeartBeat => f.write_str("HeartBeat"),
        }
    }
}

impl From<Method> for Frame {
    fn from(method: Method) -> Self {
        Frame::Method(method)
    }
}

impl Frame {
    pub fn frame_type(&self) -> Octect {
        match self {
            Frame::Method(_) => FRAME_METHOD,
            Frame::ContentHeader(_) => FRAME_CONTENT_HEADER,
            Frame::ContentBody(_) => FRAME_CONTENT_BODY,
            Frame::HeartBeat => FRAME_HEARTBEAT,
        }
    }

    /// Decode the payload of a complete frame.
    pub fn decode(raw: &RawFrame) -> Result<Frame, Error> {
        let payload = raw.payload();
        match raw.frame_type() {
            FRAME_METHOD => Ok(Frame::Method(Method::decode(payload)?)),
            FRAME_HEARTBEAT => Ok(Frame::HeartBeat),
            FRAME_CONTENT_HEADER => Ok(Frame::ContentHeader(payload)),
            FRAME_CONTENT_BODY => Ok(Frame::ContentBody(payload)),
            _ => Err(Error::Corrupted),
        }
    }

    /// Encode as a complete frame over given channel.
    pub fn encode(&self, channel: AmqpChannelId) -> Result<Bytes, Error> {
        let mut buf = BytesMut::with_capacity(64);
        // payload size is updated after encoding payload
        buf.put_u8(self.frame_type());
        buf.put_u16(channel);
        buf.put_u32(0);

        match self {
            Frame::Method(method) => method.encode(&mut buf)?,
            Frame::ContentHeader(payload) | Frame::ContentBody(payload) => buf.put_slice(payload),
            Frame::HeartBeat => {}
        }

        let payload_size = buf.len() - FRAME_HEADER_SIZE;
        let payload_size = u32::try_from(payload_size)
            .map_err(|_| Error::Syntax(format!("payload of {} bytes is too large", payload_size)))?;
        buf[3..FRAME_HEADER_SIZE].copy_from_slice(&payload_size.to_be_bytes());
        buf.put_u8(FRAME_END);
        Ok(buf.freeze())
    }
}
