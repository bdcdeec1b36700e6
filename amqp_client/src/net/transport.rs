use bytes::Bytes;
use tokio::sync::mpsc::UnboundedSender;
use tracing::warn;

/// Message from a connection to the task writing the socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutgoingMessage {
    /// Complete, encoded frames.
    Raw(Bytes),
    /// Negotiated heartbeat interval in seconds, zero disables heartbeats.
    Heartbeat(u16),
}

/// Outbound side of the link, as seen by [`Connection`].
///
/// Sending is fire-and-forget: write failures are detected by the reading
/// side and reported through [`Connection::on_connection_interruption`].
///
/// [`Connection`]: crate::connection::Connection
/// [`Connection::on_connection_interruption`]: crate::connection::Connection::on_connection_interruption
pub trait Transport: Send {
    fn send_raw(&mut self, bytes: Bytes);

    fn heartbeat_negotiated(&mut self, _interval: u16) {}
}

impl Transport for UnboundedSender<OutgoingMessage> {
    fn send_raw(&mut self, bytes: Bytes) {
        let len = bytes.len();
        if self.send(OutgoingMessage::Raw(bytes)).is_err() {
            warn!("writer is gone, discard {} outgoing bytes", len);
        }
    }

    fn heartbeat_negotiated(&mut self, interval: u16) {
        if self.send(OutgoingMessage::Heartbeat(interval)).is_err() {
            warn!("writer is gone, discard heartbeat interval {}", interval);
        }
    }
}
