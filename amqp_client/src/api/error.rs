//! Error type can be returned by the APIs.

use std::{fmt, io};

use tokio::sync::{mpsc::error::SendError, oneshot::error::RecvError};

use crate::frame::{
    self,
    types::{AmqpChannelId, AmqpClassId, AmqpMethodId, AmqpReplyCode},
};

/// A list of errors can be returned by the APIs.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// Status value is not in the permitted set of the entity.
    ImproperStatus(String),
    /// Server closed the connection before the handshake completed.
    AuthenticationFailure(String),
    /// Server sent an unsolicited `connection.close`.
    PeerClosed {
        reply_code: AmqpReplyCode,
        reply_text: String,
        class_id: AmqpClassId,
        method_id: AmqpMethodId,
    },
    /// Server sent an unsolicited `channel.close`.
    ChannelClosed {
        channel_id: AmqpChannelId,
        reply_code: AmqpReplyCode,
        reply_text: String,
    },
    /// Acknowledgment received without a matching outstanding request.
    CorrelationMismatch(String),
    /// Frame received out of the expected protocol sequence.
    UnexpectedFrame(String),
    /// Error during opening a connection, e.g. unsupported mechanism.
    ConnectionOpenError(String),
    /// Error when using the connection. Usually due to incorrect usage by user.
    ConnectionUseError(String),
    /// Error when using the channel. Usually due to incorrect usage by user.
    ChannelUseError(String),
    /// Inbound bytes could not be split into frames or decoded.
    FramingError(String),
    /// Error occurs in network layer.
    NetworkError(String),
    /// Error in sending or receiving messages via internal communication channel.
    InternalChannelError(String),
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Self::NetworkError(err.to_string())
    }
}
impl From<frame::Error> for Error {
    fn from(err: frame::Error) -> Self {
        Self::FramingError(err.to_string())
    }
}
impl<T> From<SendError<T>> for Error {
    fn from(err: SendError<T>) -> Self {
        Self::InternalChannelError(err.to_string())
    }
}
impl From<RecvError> for Error {
    fn from(err: RecvError) -> Self {
        Self::InternalChannelError(err.to_string())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::ImproperStatus(msg) => write!(f, "improper status: {}", msg),
            Error::AuthenticationFailure(msg) => {
                write!(f, "AMQP authentication failure: {}", msg)
            }
            Error::PeerClosed {
                reply_code,
                reply_text,
                class_id,
                method_id,
            } => write!(
                f,
                "AMQP connection closed by server '{}: {}', (class_id = {}, method_id = {})",
                reply_code, reply_text, class_id, method_id
            ),
            Error::ChannelClosed {
                channel_id,
                reply_code,
                reply_text,
            } => write!(
                f,
                "AMQP channel {} closed by server '{}: {}'",
                channel_id, reply_code, reply_text
            ),
            Error::CorrelationMismatch(msg) => write!(f, "AMQP ack correlation error: {}", msg),
            Error::UnexpectedFrame(msg) => write!(f, "AMQP unexpected frame: {}", msg),
            Error::ConnectionOpenError(msg) => write!(f, "AMQP connection open error: {}", msg),
            Error::ConnectionUseError(msg) => write!(f, "AMQP connection usage error: {}", msg),
            Error::ChannelUseError(msg) => write!(f, "AMQP channel usage error: {}", msg),
            Error::FramingError(msg) => write!(f, "AMQP framing error: {}", msg),
            Error::NetworkError(msg) => write!(f, "AMQP network error: {}", msg),
            Error::InternalChannelError(msg) => {
                write!(f, "internal communication error: {}", msg)
            }
        }
    }
}

impl std::error::Error for Error {}
