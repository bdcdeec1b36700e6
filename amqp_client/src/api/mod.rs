//! Connection and channel lifecycle of an AMQP 0-9-1 client.
pub mod callbacks;
pub mod channel;
pub mod connection;
pub mod error;
pub mod security;
pub mod status;

/// A [`Result`] with [`error::Error`] as the error type.
///
/// [`Result`]: std::result::Result
pub type Result<T> = std::result::Result<T, error::Error>;
