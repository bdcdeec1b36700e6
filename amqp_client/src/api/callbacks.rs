//! Callbacks for asynchronous events received from the server.
//!
//! They are invoked on the task that owns the connection, so they must not block.
use tracing::{error, info, warn};

use crate::frame::{types::AmqpChannelId, CloseChannel};

use super::{connection::Connection, error::Error, Result};

/////////////////////////////////////////////////////////////////////////////
pub trait ConnectionCallback: Send {
    /// Server closed the connection, either with a peer close after open or
    /// as an authentication failure during the handshake.
    ///
    /// Returning `Err` aborts frame processing and is surfaced to the caller
    /// of [`Connection::on_read`].
    fn close(&mut self, connection: &Connection, error: Error) -> Result<()>;

    fn blocked(&mut self, _connection: &Connection, reason: &str) {
        warn!("connection blocked by server: {}", reason);
    }

    fn unblocked(&mut self, _connection: &Connection) {
        info!("connection unblocked by server");
    }
}

/// Treats any close as fatal.
pub struct DefaultConnectionCallback;

impl ConnectionCallback for DefaultConnectionCallback {
    fn close(&mut self, _connection: &Connection, error: Error) -> Result<()> {
        error!("{}", error);
        Err(error)
    }
}

/////////////////////////////////////////////////////////////////////////////
pub trait ChannelCallback: Send {
    fn close(&mut self, channel_id: AmqpChannelId, close: CloseChannel);

    /// Server asked to pause (`false`) or resume (`true`) content delivery.
    fn flow(&mut self, channel_id: AmqpChannelId, active: bool) {
        info!("channel {} flow active: {}", channel_id, active);
    }

    /// Transport dropped, every outstanding operation of the channel is discarded.
    fn interrupted(&mut self, channel_id: AmqpChannelId) {
        warn!("channel {} interrupted", channel_id);
    }
}

pub struct DefaultChannelCallback;

impl ChannelCallback for DefaultChannelCallback {
    fn close(&mut self, channel_id: AmqpChannelId, close: CloseChannel) {
        error!("channel {}: {}", channel_id, close);
    }
}
