//! Tokio adapter driving a [`Connection`] over a byte stream.
//!
//! One task owns the connection and reads the socket, another writes
//! outgoing bytes and heartbeats. The application talks to the reading
//! task through [`Client`].
//!
//! [`Connection`]: crate::connection::Connection
mod client;
mod connector;
mod reader_handler;
mod transport;
mod writer_handler;

pub use client::*;
pub use connector::*;
pub use transport::*;

use crate::api::connection::Connection;

/// Closure run by the reading task against the connection it owns.
pub(crate) type Command = Box<dyn FnOnce(&mut Connection) + Send>;
