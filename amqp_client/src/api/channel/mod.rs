//! Implementation of AMQP_0-9-1's Channel class compatible with RabbitMQ.
//!
//! Channels are registered on a [`Connection`] under an id chosen by the
//! application, and are operated through a short-lived [`ChannelHandle`].
//! Every request takes a continuation that fires on the connection's task
//! when the matching response arrives.
//!
//! # Example
//! ```
//! # use amqp_client::{connection::Connection, error::Error};
//! fn setup(connection: &mut Connection) -> Result<(), Error> {
//!     connection.channel(1)?.open(|connection, channel_id| {
//!         if let Ok(mut channel) = connection.channel(channel_id) {
//!             channel.qos(0, 50, false, |_, _| {}).ok();
//!         }
//!     })
//! }
//! ```
//!
//! [`Connection`]: ../connection/struct.Connection.html
mod basic;
mod tx;

use std::{
    collections::{HashMap, VecDeque},
    fmt,
};

use tracing::{debug, error, warn};

use crate::frame::{
    types::{AmqpChannelId, AmqpReplyCode, ShortStr},
    CloseChannel, Flow, Frame, MethodHeader, OpenChannel, REPLY_SUCCESS,
};

use super::{
    callbacks::{ChannelCallback, DefaultChannelCallback},
    connection::{AckKind, Connection},
    error::Error,
    status::{Stateful, Status, StatusTracker, CHANNEL_STATUSES},
    Result,
};

/// Invoked with the owning connection and the channel id once the response arrives.
pub type Continuation = Box<dyn FnOnce(&mut Connection, AmqpChannelId) + Send>;

/////////////////////////////////////////////////////////////////////////////
/// Per-channel state kept by the connection.
pub struct Channel {
    id: AmqpChannelId,
    status: StatusTracker,
    flow_active: bool,
    on_open: Option<Continuation>,
    on_close: Option<Continuation>,
    pending: HashMap<AckKind, VecDeque<Continuation>>,
    callback: Option<Box<dyn ChannelCallback>>,
}

impl fmt::Debug for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pending: usize = self.pending.values().map(VecDeque::len).sum();
        f.debug_struct("Channel")
            .field("id", &self.id)
            .field("status", &self.status())
            .field("flow_active", &self.flow_active)
            .field("pending", &pending)
            .finish()
    }
}

impl Stateful for Channel {
    fn tracker(&self) -> &StatusTracker {
        &self.status
    }

    fn tracker_mut(&mut self) -> &mut StatusTracker {
        &mut self.status
    }
}

impl Channel {
    pub(crate) fn new(id: AmqpChannelId) -> Self {
        Self {
            id,
            status: StatusTracker::new(CHANNEL_STATUSES),
            flow_active: true,
            on_open: None,
            on_close: None,
            pending: HashMap::new(),
            callback: None,
        }
    }

    pub fn id(&self) -> AmqpChannelId {
        self.id
    }

    pub fn flow_active(&self) -> bool {
        self.flow_active
    }

    pub(crate) fn expect_status(&self, expected: Status, header: MethodHeader) -> Result<()> {
        if self.status() != Some(expected) {
            return Err(Error::UnexpectedFrame(format!(
                "{} on channel {} in status {:?}",
                header,
                self.id,
                self.status()
            )));
        }
        Ok(())
    }

    pub(crate) fn set_flow_active(&mut self, active: bool) {
        self.flow_active = active;
    }

    pub(crate) fn take_on_open(&mut self) -> Option<Continuation> {
        self.on_open.take()
    }

    pub(crate) fn take_on_close(&mut self) -> Option<Continuation> {
        self.on_close.take()
    }

    pub(crate) fn push_continuation(&mut self, kind: AckKind, continuation: Continuation) {
        self.pending.entry(kind).or_default().push_back(continuation);
    }

    pub(crate) fn take_continuation(&mut self, kind: AckKind) -> Option<Continuation> {
        self.pending.get_mut(&kind).and_then(VecDeque::pop_front)
    }

    /// Drop every continuation, none of them will fire.
    pub(crate) fn discard_pending(&mut self) {
        let pending: usize = self.pending.values().map(VecDeque::len).sum();
        if pending > 0 || self.on_open.is_some() || self.on_close.is_some() {
            debug!("channel {} discards {} pending operations", self.id, pending);
        }
        self.pending.clear();
        self.on_open = None;
        self.on_close = None;
    }

    pub(crate) fn closed_by_peer(&mut self, close: CloseChannel) -> Result<()> {
        self.discard_pending();
        self.mark_closed()?;
        let id = self.id;
        warn!(
            "{}",
            Error::ChannelClosed {
                channel_id: id,
                reply_code: close.reply_code(),
                reply_text: close.reply_text().to_owned(),
            }
        );
        match self.callback.as_mut() {
            Some(callback) => callback.close(id, close),
            None => DefaultChannelCallback.close(id, close),
        }
        Ok(())
    }

    pub(crate) fn notify_flow(&mut self, active: bool) {
        let id = self.id;
        match self.callback.as_mut() {
            Some(callback) => callback.flow(id, active),
            None => DefaultChannelCallback.flow(id, active),
        }
    }

    pub(crate) fn on_connection_interruption(&mut self) {
        self.discard_pending();
        if let Err(err) = self.mark_closed() {
            error!("channel {}: {}", self.id, err);
        }
        let id = self.id;
        match self.callback.as_mut() {
            Some(callback) => callback.interrupted(id),
            None => DefaultChannelCallback.interrupted(id),
        }
    }
}

/////////////////////////////////////////////////////////////////////////////
/// Operations on one channel of a connection.
pub struct ChannelHandle<'a> {
    connection: &'a mut Connection,
    channel_id: AmqpChannelId,
}

impl<'a> ChannelHandle<'a> {
    pub(crate) fn new(connection: &'a mut Connection, channel_id: AmqpChannelId) -> Self {
        Self {
            connection,
            channel_id,
        }
    }

    pub fn channel_id(&self) -> AmqpChannelId {
        self.channel_id
    }

    pub fn status(&self) -> Option<Status> {
        self.connection.channel_status(self.channel_id)
    }

    pub fn register_callback<F>(&mut self, callback: F) -> Result<()>
    where
        F: ChannelCallback + 'static,
    {
        self.channel()?.callback = Some(Box::new(callback));
        Ok(())
    }

    /// Sends `channel.open`, `on_open` fires when `open-ok` arrives.
    pub fn open<F>(&mut self, on_open: F) -> Result<()>
    where
        F: FnOnce(&mut Connection, AmqpChannelId) + Send + 'static,
    {
        self.ensure_connection_opened()?;
        let channel = self.channel()?;
        // only a new or fully closed channel can be (re)opened
        if let Some(status @ (Status::Opening | Status::Opened | Status::Closing)) =
            channel.status()
        {
            return Err(Error::ChannelUseError(format!(
                "channel {} cannot be opened while {}",
                channel.id,
                status.as_str()
            )));
        }
        channel.mark_opening()?;
        channel.on_open = Some(Box::new(on_open));
        self.send(OpenChannel::default())
    }

    /// Sends `channel.close`, `on_close` fires when `close-ok` arrives.
    pub fn close<F>(&mut self, reply_code: AmqpReplyCode, reply_text: &str, on_close: F) -> Result<()>
    where
        F: FnOnce(&mut Connection, AmqpChannelId) + Send + 'static,
    {
        let reply_text = ShortStr::try_from(reply_text)
            .map_err(|err| Error::ChannelUseError(format!("reply text: {}", err)))?;
        self.ensure_channel_opened()?;
        let channel = self.channel()?;
        channel.mark_closing()?;
        channel.on_close = Some(Box::new(on_close));
        self.send(CloseChannel::new(reply_code, reply_text, 0, 0))
    }

    /// `close(200, "Goodbye", on_close)`
    pub fn close_gracefully<F>(&mut self, on_close: F) -> Result<()>
    where
        F: FnOnce(&mut Connection, AmqpChannelId) + Send + 'static,
    {
        self.close(REPLY_SUCCESS, "Goodbye", on_close)
    }

    /// Ask the server to pause (`false`) or resume (`true`) content delivery.
    pub fn flow<F>(&mut self, active: bool, on_ok: F) -> Result<()>
    where
        F: FnOnce(&mut Connection, AmqpChannelId) + Send + 'static,
    {
        self.send_with_ack(AckKind::Flow, Flow::new(active), Box::new(on_ok))
    }

    /////////////////////////////////////////////////////////////////////////
    fn channel(&mut self) -> Result<&mut Channel> {
        let channel_id = self.channel_id;
        self.connection
            .channel_mut(channel_id)
            .ok_or_else(|| Error::ChannelUseError(format!("channel {} is not registered", channel_id)))
    }

    fn ensure_connection_opened(&self) -> Result<()> {
        if !self.connection.is_opened() {
            return Err(Error::ConnectionUseError(format!(
                "connection is not open, status {:?}",
                self.connection.status()
            )));
        }
        Ok(())
    }

    fn ensure_channel_opened(&mut self) -> Result<()> {
        self.ensure_connection_opened()?;
        let channel = self.channel()?;
        if !channel.is_opened() {
            return Err(Error::ChannelUseError(format!(
                "channel {} is not open, status {:?}",
                channel.id,
                channel.status()
            )));
        }
        Ok(())
    }

    fn send<F: Into<Frame>>(&mut self, frame: F) -> Result<()> {
        self.connection.send_frame(self.channel_id, frame)
    }

    /// Send a request whose acknowledgment carries nothing but the channel id.
    fn send_with_ack<F: Into<Frame>>(
        &mut self,
        kind: AckKind,
        frame: F,
        continuation: Continuation,
    ) -> Result<()> {
        self.ensure_channel_opened()?;
        self.channel()?.push_continuation(kind, continuation);
        self.connection.enqueue_ack(kind, self.channel_id);
        self.send(frame)
    }
}

/////////////////////////////////////////////////////////////////////////////
#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use bytes::Bytes;

    use crate::{
        api::{
            connection::{AckKind, Connection, OpenConnectionArguments},
            error::Error,
            status::{Stateful, Status},
        },
        frame::{
            types::{AmqpChannelId, FieldTable},
            CloseChannelOk, Flow, FlowOk, Frame, OpenChannelOk, OpenOk, Start, Tune,
        },
        net::Transport,
    };

    struct Discard;

    impl Transport for Discard {
        fn send_raw(&mut self, _bytes: Bytes) {}
    }

    fn feed<F: Into<Frame>>(connection: &mut Connection, channel_id: AmqpChannelId, frame: F) {
        connection
            .on_read(&frame.into().encode(channel_id).unwrap())
            .unwrap();
    }

    fn opened_connection() -> Connection {
        let mut connection =
            Connection::new(&OpenConnectionArguments::default(), Box::new(Discard)).unwrap();
        let start = Start::new(
            FieldTable::new(),
            "PLAIN".try_into().unwrap(),
            "en_US".try_into().unwrap(),
        );
        feed(&mut connection, 0, start);
        feed(&mut connection, 0, Tune::new(16, 131072, 0));
        feed(&mut connection, 0, OpenOk::default());
        connection
    }

    #[test]
    fn test_open_requires_opened_connection() {
        let mut connection =
            Connection::new(&OpenConnectionArguments::default(), Box::new(Discard)).unwrap();
        let mut channel = connection.channel(1).unwrap();
        assert!(matches!(
            channel.open(|_, _| {}),
            Err(Error::ConnectionUseError(_))
        ));
        assert_eq!(None, channel.status());
    }

    #[test]
    fn test_open_and_close() {
        let mut connection = opened_connection();
        let fired = Arc::new(Mutex::new(Vec::new()));

        let log = fired.clone();
        connection
            .channel(1)
            .unwrap()
            .open(move |_, id| log.lock().unwrap().push(("open", id)))
            .unwrap();
        assert_eq!(Some(Status::Opening), connection.channel_status(1));
        assert!(connection.channel(1).unwrap().open(|_, _| {}).is_err());

        feed(&mut connection, 1, OpenChannelOk::default());
        assert_eq!(Some(Status::Opened), connection.channel_status(1));

        let log = fired.clone();
        connection
            .channel(1)
            .unwrap()
            .close_gracefully(move |_, id| log.lock().unwrap().push(("close", id)))
            .unwrap();
        assert_eq!(Some(Status::Closing), connection.channel_status(1));

        feed(&mut connection, 1, CloseChannelOk);
        assert_eq!(Some(Status::Closed), connection.channel_status(1));
        assert_eq!(vec![("open", 1), ("close", 1)], *fired.lock().unwrap());

        // closed channels can be reopened
        connection.channel(1).unwrap().open(|_, _| {}).unwrap();
        assert_eq!(Some(Status::Opening), connection.channel_status(1));
    }

    #[test]
    fn test_open_while_closing_is_rejected() {
        let mut connection = opened_connection();
        connection.channel(1).unwrap().open(|_, _| {}).unwrap();
        feed(&mut connection, 1, OpenChannelOk::default());
        connection
            .channel(1)
            .unwrap()
            .close_gracefully(|_, _| {})
            .unwrap();

        assert!(matches!(
            connection.channel(1).unwrap().open(|_, _| {}),
            Err(Error::ChannelUseError(_))
        ));
        assert_eq!(Some(Status::Closing), connection.channel_status(1));

        // close-ok still completes the close
        feed(&mut connection, 1, CloseChannelOk);
        assert_eq!(Some(Status::Closed), connection.channel_status(1));
    }

    #[test]
    fn test_request_on_closed_channel() {
        let mut connection = opened_connection();
        let mut channel = connection.channel(2).unwrap();
        assert!(matches!(
            channel.tx_select(|_, _| {}),
            Err(Error::ChannelUseError(_))
        ));
        assert_eq!(0, connection.pending_acks(AckKind::TxSelect));
    }

    #[test]
    fn test_flow_ok_updates_flag_before_continuation() {
        let mut connection = opened_connection();
        connection.channel(1).unwrap().open(|_, _| {}).unwrap();
        feed(&mut connection, 1, OpenChannelOk::default());

        let seen = Arc::new(Mutex::new(None));
        let flag = seen.clone();
        connection
            .channel(1)
            .unwrap()
            .flow(false, move |connection, id| {
                let active = connection.channel_mut(id).map(|ch| ch.flow_active());
                *flag.lock().unwrap() = active;
            })
            .unwrap();
        feed(&mut connection, 1, FlowOk::new(false));

        assert_eq!(Some(false), *seen.lock().unwrap());
    }

    #[test]
    fn test_server_flow_request() {
        let mut connection = opened_connection();
        connection.channel(1).unwrap().open(|_, _| {}).unwrap();
        feed(&mut connection, 1, OpenChannelOk::default());

        feed(&mut connection, 1, Flow::new(false));
        assert_eq!(Some(false), connection.channel_mut(1).map(|ch| ch.flow_active()));
        assert!(connection.channel_mut(1).map_or(false, |ch| ch.is_opened()));
    }
}
