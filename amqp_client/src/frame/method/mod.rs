use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};

use super::{
    from_bytes, to_buffer,
    types::{AmqpClassId, AmqpMethodId},
    Error,
};

mod basic;
mod channel;
mod connection;
mod tx;

pub use basic::*;
pub use channel::*;
pub use connection::*;
pub use tx::*;

//////////////////////////////////////////////////////////
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MethodHeader {
    class_id: AmqpClassId,
    method_id: AmqpMethodId,
}

/// Class id and method id, both short.
pub const METHOD_HEADER_SIZE: usize = 4;

impl MethodHeader {
    pub const fn new(class_id: AmqpClassId, method_id: AmqpMethodId) -> Self {
        Self {
            class_id,
            method_id,
        }
    }

    pub fn class_id(&self) -> AmqpClassId {
        self.class_id
    }

    pub fn method_id(&self) -> AmqpMethodId {
        self.method_id
    }
}

impl fmt::Display for MethodHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.class_id, self.method_id)
    }
}

//////////////////////////////////////////////////////////
macro_rules! impl_method {
    ($($class_id:literal => $($method_id:literal : $method:ident),+);+ $(;)?) => {
        /// Typed arguments of a method frame.
        #[derive(Debug, Clone, PartialEq)]
        pub enum Method {
            $($($method($method),)+)+
            /// Method this client does not model, kept as raw arguments.
            Unknown(MethodHeader, Bytes),
        }

        impl Method {
            pub fn header(&self) -> MethodHeader {
                match self {
                    $($(Method::$method(_) => MethodHeader::new($class_id, $method_id),)+)+
                    Method::Unknown(header, _) => *header,
                }
            }

            fn decode_arguments(header: MethodHeader, args: Bytes) -> Result<Self, Error> {
                let method = match (header.class_id(), header.method_id()) {
                    $($(($class_id, $method_id) => Method::$method(from_bytes(&args)?),)+)+
                    _ => Method::Unknown(header, args),
                };
                Ok(method)
            }

            fn encode_arguments(&self, buf: &mut BytesMut) -> Result<(), Error> {
                match self {
                    $($(Method::$method(method) => {
                        to_buffer(method, buf)?;
                    })+)+
                    Method::Unknown(_, args) => buf.put_slice(args),
                }
                Ok(())
            }
        }

        $($(
            impl $method {
                pub fn header() -> MethodHeader {
                    MethodHeader::new($class_id, $method_id)
                }
            }

            impl From<$method> for Method {
                fn from(method: $method) -> Self {
                    Method::$method(method)
                }
            }

            impl From<$method> for super::Frame {
                fn from(method: $method) -> Self {
                    super::Frame::Method(Method::$method(method))
                }
            }
        )+)+
    };
}

impl_method! {
    // == Connection ==
    10 =>   10: Start,
            11: StartOk,
            20: Secure,
            21: SecureOk,
            30: Tune,
            31: TuneOk,
            40: Open,
            41: OpenOk,
            50: Close,
            51: CloseOk,
            60: Blocked,
            61: Unblocked;
    // == Channel ==
    20 =>   10: OpenChannel,
            11: OpenChannelOk,
            20: Flow,
            21: FlowOk,
            40: CloseChannel,
            41: CloseChannelOk;
    // == Basic ==
    60 =>   10: Qos,
            11: QosOk;
    // == Transaction ==
    90 =>   10: TxSelect,
            11: TxSelectOk,
            20: TxCommit,
            21: TxCommitOk,
            30: TxRollback,
            31: TxRollbackOk
}

impl Method {
    /// Append method header and arguments to `buf`.
    pub fn encode(&self, buf: &mut BytesMut) -> Result<(), Error> {
        to_buffer(&self.header(), buf)?;
        self.encode_arguments(buf)
    }

    /// Decode the payload of a method frame.
    ///
    /// Methods this client does not model are returned as [`Method::Unknown`].
    pub fn decode(payload: Bytes) -> Result<Self, Error> {
        if payload.len() < METHOD_HEADER_SIZE {
            return Err(Error::Syntax(format!(
                "method payload of {} bytes has no header",
                payload.len()
            )));
        }
        let header: MethodHeader = from_bytes(&payload[..METHOD_HEADER_SIZE])?;
        Self::decode_arguments(header, payload.slice(METHOD_HEADER_SIZE..))
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}
