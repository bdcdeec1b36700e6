//! AMQP 0-9-1 client connection and channel lifecycle, compatible with RabbitMQ.
//!
//! The protocol logic lives in [`connection::Connection`], a synchronous
//! state machine fed with inbound bytes and writing through a [`Transport`].
//! [`Client`] runs it on tokio tasks over any stream a [`Connector`] opens.
//!
//! # Example
//! ```no_run
//! use amqp_client::{connection::OpenConnectionArguments, Client};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), amqp_client::error::Error> {
//! let args = OpenConnectionArguments::new("localhost", 5672, "user", "bitnami")
//!     .virtual_host("/")
//!     .heartbeat(30)
//!     .finish();
//! let client = Client::connect(&args).await?;
//! client.open_channel(1).await?;
//! client
//!     .call(|connection| connection.channel(1)?.qos(0, 100, false, |_, _| {}))
//!     .await?;
//! client.close_channel(1).await?;
//! client.disconnect().await
//! # }
//! ```
pub mod frame;
mod net;
mod api;

// public API
pub use api::*;
pub use net::{Client, Connector, OutgoingMessage, TcpConnector, Transport};

#[cfg(test)]
mod test_utils;
