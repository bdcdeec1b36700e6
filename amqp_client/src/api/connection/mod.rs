//! Implementation of AMQP_0-9-1's Connection class compatible with RabbitMQ.
//!
//! [`Connection`] is a synchronous state machine. It does no I/O by itself:
//! inbound bytes are handed to [`Connection::on_read`], outbound frames go
//! to the [`Transport`] given at construction. The handshake is driven by
//! the server, every step is a reaction to an inbound method:
//!
//! ```text
//! S: start      C: start-ok          initial -> opening
//! S: tune       C: tune-ok, open
//! S: open-ok                         opening -> opened
//! C: close                           opened  -> closing
//! S: close-ok                        closing -> closed
//! ```
//!
//! A `connection.close` sent by the server moves any status to `closed`.
//!
//! [`Transport`]: crate::Transport
mod ack_queues;
mod arguments;
mod properties;

pub use ack_queues::*;
pub use arguments::*;
pub use properties::*;

use std::{collections::BTreeMap, fmt};

use tracing::{debug, info, trace, warn};

use crate::{
    frame::{
        types::{
            AmqpChannelId, AmqpClassId, AmqpMethodId, AmqpPeerProperties, AmqpReplyCode, ShortStr,
        },
        Close, CloseChannelOk, CloseOk, FlowOk, Frame, FrameDemultiplexer, Method, MethodHeader,
        Open, OpenOk, SecureOk, Start, StartOk, Tune, TuneOk, DEFAULT_CONN_CHANNEL, REPLY_SUCCESS,
    },
    net::Transport,
};

use super::{
    callbacks::{ConnectionCallback, DefaultConnectionCallback},
    channel::{Channel, ChannelHandle},
    error::Error,
    status::{Stateful, Status, StatusTracker, CONNECTION_STATUSES},
    Result,
};

type Hook = Box<dyn FnOnce(&mut Connection) + Send>;

/////////////////////////////////////////////////////////////////////////////
/// Client side of one AMQP connection and the channels multiplexed on it.
pub struct Connection {
    status: StatusTracker,

    client_properties: AmqpPeerProperties,
    server_properties: Option<ServerProperties>,
    mechanism: String,
    response: String,
    locale: String,
    virtual_host: String,

    // local limits, resolved against the server's proposal on tune
    local_frame_max: u32,
    local_heartbeat: Option<u16>,

    channel_max: u16,
    frame_max: u32,
    heartbeat: u16,
    tuned: bool,
    known_hosts: Vec<String>,

    channels: BTreeMap<AmqpChannelId, Channel>,
    ack_queues: AckCorrelationQueues,
    demux: FrameDemultiplexer,
    transport: Box<dyn Transport>,

    callback: Option<Box<dyn ConnectionCallback>>,
    on_open: Option<Hook>,
    on_connection: Option<Hook>,
    on_disconnection: Option<Hook>,
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("status", &self.status())
            .field("virtual_host", &self.virtual_host)
            .field("channel_max", &self.channel_max)
            .field("frame_max", &self.frame_max)
            .field("heartbeat", &self.heartbeat)
            .field("channels", &self.channels)
            .finish()
    }
}

impl Stateful for Connection {
    fn tracker(&self) -> &StatusTracker {
        &self.status
    }

    fn tracker_mut(&mut self) -> &mut StatusTracker {
        &mut self.status
    }
}

impl Connection {
    pub fn new(args: &OpenConnectionArguments, transport: Box<dyn Transport>) -> Result<Self> {
        let credentials = args.get_credentials();
        let mut connection = Self {
            status: StatusTracker::new(CONNECTION_STATUSES),
            client_properties: client_properties(args),
            server_properties: None,
            mechanism: credentials.mechanism_name().to_owned(),
            response: credentials.response()?,
            locale: args.get_locale().to_owned(),
            virtual_host: args.get_virtual_host().to_owned(),
            local_frame_max: args.get_frame_max(),
            local_heartbeat: args.get_heartbeat(),
            channel_max: 0,
            frame_max: 0,
            heartbeat: 0,
            tuned: false,
            known_hosts: Vec::new(),
            channels: BTreeMap::new(),
            ack_queues: AckCorrelationQueues::new(),
            demux: FrameDemultiplexer::new(args.get_max_buffer_size()),
            transport,
            callback: None,
            on_open: None,
            on_connection: None,
            on_disconnection: None,
        };
        connection.mark_initial()?;
        Ok(connection)
    }

    pub fn client_properties(&self) -> &AmqpPeerProperties {
        &self.client_properties
    }

    /// `None` until `connection.start` is received.
    pub fn server_properties(&self) -> Option<&ServerProperties> {
        self.server_properties.as_ref()
    }

    pub fn mechanism(&self) -> &str {
        &self.mechanism
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    pub fn virtual_host(&self) -> &str {
        &self.virtual_host
    }

    pub fn channel_max(&self) -> u16 {
        self.channel_max
    }

    pub fn frame_max(&self) -> u32 {
        self.frame_max
    }

    pub fn heartbeat_interval(&self) -> u16 {
        self.heartbeat
    }

    pub fn known_hosts(&self) -> &[String] {
        &self.known_hosts
    }

    /// Number of channels awaiting an acknowledgment of `kind`.
    pub fn pending_acks(&self, kind: AckKind) -> usize {
        self.ack_queues.len(kind)
    }

    pub fn register_callback<F>(&mut self, callback: F)
    where
        F: ConnectionCallback + 'static,
    {
        self.callback = Some(Box::new(callback));
    }

    /// Fires once, after `tune-ok` is sent and before `open` is sent.
    pub fn on_open<F>(&mut self, hook: F)
    where
        F: FnOnce(&mut Connection) + Send + 'static,
    {
        self.on_open = Some(Box::new(hook));
    }

    /// Fires once, after `open-ok` is received.
    pub fn on_connection<F>(&mut self, hook: F)
    where
        F: FnOnce(&mut Connection) + Send + 'static,
    {
        self.on_connection = Some(Box::new(hook));
    }

    /// Fires once, after `close-ok` is received.
    pub fn on_disconnection<F>(&mut self, hook: F)
    where
        F: FnOnce(&mut Connection) + Send + 'static,
    {
        self.on_disconnection = Some(Box::new(hook));
    }

    /// Get a handle to the channel, registering it if it is new.
    ///
    /// Ids are chosen by the application. Zero is reserved for the connection.
    pub fn channel(&mut self, channel_id: AmqpChannelId) -> Result<ChannelHandle<'_>> {
        if channel_id == DEFAULT_CONN_CHANNEL {
            return Err(Error::ChannelUseError(format!(
                "channel {} is reserved for the connection",
                DEFAULT_CONN_CHANNEL
            )));
        }
        if self.channel_max != 0 && channel_id > self.channel_max {
            return Err(Error::ChannelUseError(format!(
                "channel {} exceeds channel_max {}",
                channel_id, self.channel_max
            )));
        }
        self.channels
            .entry(channel_id)
            .or_insert_with(|| Channel::new(channel_id));
        Ok(ChannelHandle::new(self, channel_id))
    }

    pub fn channel_status(&self, channel_id: AmqpChannelId) -> Option<Status> {
        self.channels.get(&channel_id).and_then(|ch| ch.status())
    }

    pub fn channel_ids(&self) -> impl Iterator<Item = AmqpChannelId> + '_ {
        self.channels.keys().copied()
    }

    /// Sends `connection.open`. Status is updated when `open-ok` arrives.
    pub fn open(&mut self, virtual_host: &str) -> Result<()> {
        if !self.is_opening() || !self.tuned {
            return Err(Error::ConnectionUseError(
                "open is only allowed after tune-ok".to_string(),
            ));
        }
        let virtual_host = ShortStr::try_from(virtual_host)
            .map_err(|err| Error::ConnectionUseError(format!("virtual host: {}", err)))?;
        self.send_frame(DEFAULT_CONN_CHANNEL, Open::new(virtual_host))
    }

    /// Sends `connection.close`, then waits in `closing` for `close-ok`.
    ///
    /// `class_id` and `method_id` of zero mean the close is not caused by a method.
    pub fn close(
        &mut self,
        reply_code: AmqpReplyCode,
        reply_text: &str,
        class_id: AmqpClassId,
        method_id: AmqpMethodId,
    ) -> Result<()> {
        if self.is_closing() || self.is_closed() {
            return Err(Error::ConnectionUseError(format!(
                "connection is already {}",
                self.status_name()
            )));
        }
        let reply_text = ShortStr::try_from(reply_text)
            .map_err(|err| Error::ConnectionUseError(format!("reply text: {}", err)))?;
        self.send_frame(
            DEFAULT_CONN_CHANNEL,
            Close::new(reply_code, reply_text, class_id, method_id),
        )?;
        self.mark_closing()?;
        debug!("connection closing");
        Ok(())
    }

    /// `close(200, "Goodbye", 0, 0)`
    pub fn close_gracefully(&mut self) -> Result<()> {
        self.close(REPLY_SUCCESS, "Goodbye", 0, 0)
    }

    /// Feed bytes read from the transport and dispatch every complete frame.
    ///
    /// # Errors
    ///
    /// Framing errors, protocol sequence violations and errors returned by
    /// the registered [`ConnectionCallback`]. The connection should be
    /// dropped after any error.
    pub fn on_read(&mut self, chunk: &[u8]) -> Result<()> {
        self.demux.feed(chunk)?;
        while let Some(raw) = self.demux.next_frame()? {
            let frame = Frame::decode(&raw)?;
            trace!("RECV on channel {}: {}", raw.channel(), frame);
            self.handle_frame(raw.channel(), frame)?;
        }
        Ok(())
    }

    /// The link dropped without a close handshake.
    ///
    /// Every channel is closed and loses its outstanding operations, whose
    /// continuations will never fire.
    pub fn on_connection_interruption(&mut self) {
        warn!("connection interrupted in status {}", self.status_name());
        for channel in self.channels.values_mut() {
            channel.on_connection_interruption();
        }
        self.ack_queues.reset();
        self.demux.clear();
    }

    /////////////////////////////////////////////////////////////////////////
    pub(crate) fn send_frame<F: Into<Frame>>(
        &mut self,
        channel_id: AmqpChannelId,
        frame: F,
    ) -> Result<()> {
        let frame = frame.into();
        trace!("SENT on channel {}: {}", channel_id, frame);
        self.transport.send_raw(frame.encode(channel_id)?);
        Ok(())
    }

    pub(crate) fn channel_mut(&mut self, channel_id: AmqpChannelId) -> Option<&mut Channel> {
        self.channels.get_mut(&channel_id)
    }

    pub(crate) fn enqueue_ack(&mut self, kind: AckKind, channel_id: AmqpChannelId) {
        self.ack_queues.enqueue(kind, channel_id);
    }

    /////////////////////////////////////////////////////////////////////////
    fn handle_frame(&mut self, channel_id: AmqpChannelId, frame: Frame) -> Result<()> {
        if self.is_closed() {
            return Err(Error::UnexpectedFrame(format!(
                "{} on channel {} after connection closed",
                frame, channel_id
            )));
        }
        match frame {
            Frame::HeartBeat => {
                trace!("heartbeat from server");
                Ok(())
            }
            Frame::ContentHeader(_) | Frame::ContentBody(_) => {
                warn!("discard {} on channel {}", frame, channel_id);
                Ok(())
            }
            Frame::Method(method) if channel_id == DEFAULT_CONN_CHANNEL => {
                self.handle_connection_method(method)
            }
            Frame::Method(method) => self.handle_channel_method(channel_id, method),
        }
    }

    fn status_name(&self) -> &'static str {
        self.status().map_or("unset", |s| s.as_str())
    }

    fn expect_status(&self, expected: Status, header: MethodHeader) -> Result<()> {
        if self.status() != Some(expected) {
            return Err(Error::UnexpectedFrame(format!(
                "{} while connection is {}",
                header,
                self.status_name()
            )));
        }
        Ok(())
    }

    fn handle_connection_method(&mut self, method: Method) -> Result<()> {
        let header = method.header();
        match method {
            Method::Start(start) => {
                self.expect_status(Status::Initial, header)?;
                self.start_ok_response(start)
            }
            Method::Secure(_) => {
                self.expect_status(Status::Opening, header)?;
                let response = self
                    .response
                    .clone()
                    .try_into()
                    .map_err(|err| Error::ConnectionOpenError(format!("response: {}", err)))?;
                self.send_frame(DEFAULT_CONN_CHANNEL, SecureOk::new(response))
            }
            Method::Tune(tune) => {
                self.expect_status(Status::Opening, header)?;
                self.tune_response(tune)
            }
            Method::OpenOk(open_ok) => {
                self.expect_status(Status::Opening, header)?;
                self.open_ok_response(open_ok)
            }
            Method::Close(close) => self.peer_initiated_close(close),
            Method::CloseOk(_) => {
                self.expect_status(Status::Closing, header)?;
                self.close_ok_response()
            }
            Method::Blocked(blocked) => {
                let reason = blocked.reason().to_owned();
                self.with_callback(|callback, conn| {
                    callback.blocked(conn, &reason);
                    Ok(())
                })
            }
            Method::Unblocked(_) => self.with_callback(|callback, conn| {
                callback.unblocked(conn);
                Ok(())
            }),
            Method::Unknown(header, _) => {
                warn!("ignore unsupported method {} on connection", header);
                Ok(())
            }
            _ => Err(Error::UnexpectedFrame(format!(
                "{} is not a connection method",
                header
            ))),
        }
    }

    fn with_callback<F>(&mut self, f: F) -> Result<()>
    where
        F: FnOnce(&mut dyn ConnectionCallback, &Connection) -> Result<()>,
    {
        match self.callback.take() {
            Some(mut callback) => {
                let result = f(callback.as_mut(), self);
                self.callback = Some(callback);
                result
            }
            None => f(&mut DefaultConnectionCallback, self),
        }
    }

    /// Reply to `connection.start`.
    pub(crate) fn start_ok_response(&mut self, start: Start) -> Result<()> {
        if !start.mechanisms().split(' ').any(|m| m == self.mechanism) {
            return Err(Error::ConnectionOpenError(format!(
                "authentication '{}' is not supported by server, supported: '{}'",
                self.mechanism,
                start.mechanisms()
            )));
        }
        if !start.locales().split(' ').any(|l| l == self.locale) {
            return Err(Error::ConnectionOpenError(format!(
                "locale '{}' is not supported by server",
                self.locale
            )));
        }

        let server_properties = ServerProperties::from(start.into_server_properties());
        info!(
            "server {} {} on cluster '{}'",
            server_properties.product(),
            server_properties.version(),
            server_properties.cluster_name()
        );
        self.server_properties = Some(server_properties);
        self.mark_opening()?;
        debug!("connection opening");

        let start_ok = StartOk::new(
            self.client_properties.clone(),
            to_short_str(&self.mechanism)?,
            self.response
                .clone()
                .try_into()
                .map_err(|err| Error::ConnectionOpenError(format!("response: {}", err)))?,
            to_short_str(&self.locale)?,
        );
        self.send_frame(DEFAULT_CONN_CHANNEL, start_ok)
    }

    /// Resolve tuning, reply `tune-ok`, fire `on_open` then send `open`.
    pub(crate) fn tune_response(&mut self, tune: Tune) -> Result<()> {
        self.channel_max = tune.channel_max();
        self.frame_max = self.local_frame_max.min(tune.frame_max());
        self.heartbeat = self.local_heartbeat.unwrap_or_else(|| tune.heartbeat());
        self.tuned = true;
        self.demux.set_frame_max(self.frame_max);
        debug!(
            "tuned channel_max = {}, frame_max = {}, heartbeat = {}",
            self.channel_max, self.frame_max, self.heartbeat
        );

        let tune_ok = TuneOk::new(self.channel_max, self.frame_max, self.heartbeat);
        self.send_frame(DEFAULT_CONN_CHANNEL, tune_ok)?;
        self.transport.heartbeat_negotiated(self.heartbeat);

        if let Some(hook) = self.on_open.take() {
            hook(self);
        }
        let virtual_host = self.virtual_host.clone();
        self.open(&virtual_host)
    }

    pub(crate) fn open_ok_response(&mut self, open_ok: OpenOk) -> Result<()> {
        self.known_hosts = open_ok
            .known_hosts()
            .split(',')
            .map(str::trim)
            .filter(|host| !host.is_empty())
            .map(str::to_owned)
            .collect();
        self.mark_opened()?;
        info!("connection opened on virtual host '{}'", self.virtual_host);

        if let Some(hook) = self.on_connection.take() {
            hook(self);
        }
        Ok(())
    }

    pub(crate) fn close_ok_response(&mut self) -> Result<()> {
        self.mark_closed()?;
        for channel in self.channels.values_mut() {
            channel.discard_pending();
            channel.mark_closed()?;
        }
        self.ack_queues.reset();
        info!("connection closed");

        if let Some(hook) = self.on_disconnection.take() {
            hook(self);
        }
        Ok(())
    }

    /// Server closed the connection unsolicited.
    ///
    /// Before `opened` this is reported as an authentication failure.
    pub(crate) fn peer_initiated_close(&mut self, close: Close) -> Result<()> {
        self.send_frame(DEFAULT_CONN_CHANNEL, CloseOk)?;
        if self.is_closing() {
            // both sides closed at the same time
            return self.close_ok_response();
        }

        let handshake_done = self.is_opened();
        for channel in self.channels.values_mut() {
            channel.discard_pending();
            channel.mark_closed()?;
        }
        self.ack_queues.reset();
        self.mark_closed()?;
        warn!("{}", close);

        let error = if handshake_done {
            Error::PeerClosed {
                reply_code: close.reply_code(),
                reply_text: close.reply_text().to_owned(),
                class_id: close.class_id(),
                method_id: close.method_id(),
            }
        } else {
            Error::AuthenticationFailure(format!(
                "{}: {}",
                close.reply_code(),
                close.reply_text()
            ))
        };
        self.with_callback(|callback, conn| callback.close(conn, error))
    }

    /////////////////////////////////////////////////////////////////////////
    fn handle_channel_method(&mut self, channel_id: AmqpChannelId, method: Method) -> Result<()> {
        let header = method.header();
        if !self.is_opened() && !self.is_closing() {
            return Err(Error::UnexpectedFrame(format!(
                "{} on channel {} before connection is opened",
                header, channel_id
            )));
        }
        match method {
            Method::OpenChannelOk(_) => {
                let channel = self.expect_channel(channel_id, header)?;
                channel.expect_status(Status::Opening, header)?;
                channel.mark_opened()?;
                debug!("channel {} opened", channel_id);
                if let Some(continuation) = channel.take_on_open() {
                    continuation(self, channel_id);
                }
                Ok(())
            }
            Method::CloseChannelOk(_) => {
                let channel = self.expect_channel(channel_id, header)?;
                channel.expect_status(Status::Closing, header)?;
                let on_close = channel.take_on_close();
                channel.discard_pending();
                channel.mark_closed()?;
                self.ack_queues.remove_channel(channel_id);
                debug!("channel {} closed", channel_id);
                if let Some(continuation) = on_close {
                    continuation(self, channel_id);
                }
                Ok(())
            }
            Method::CloseChannel(close) => {
                self.expect_channel(channel_id, header)?;
                self.send_frame(channel_id, CloseChannelOk)?;
                self.ack_queues.remove_channel(channel_id);
                if let Some(channel) = self.channel_mut(channel_id) {
                    channel.closed_by_peer(close)?;
                }
                Ok(())
            }
            Method::Flow(flow) => {
                self.expect_channel(channel_id, header)?;
                self.send_frame(channel_id, FlowOk::new(flow.active()))?;
                if let Some(channel) = self.channel_mut(channel_id) {
                    channel.set_flow_active(flow.active());
                    channel.notify_flow(flow.active());
                }
                Ok(())
            }
            Method::QosOk(_) => {
                self.correlate_ack(AckKind::Qos, channel_id)?;
                self.complete_ack(AckKind::Qos, channel_id);
                Ok(())
            }
            Method::FlowOk(flow_ok) => {
                self.correlate_ack(AckKind::Flow, channel_id)?;
                if let Some(channel) = self.channel_mut(channel_id) {
                    channel.set_flow_active(flow_ok.active());
                }
                self.complete_ack(AckKind::Flow, channel_id);
                Ok(())
            }
            Method::TxSelectOk(_) => {
                self.correlate_ack(AckKind::TxSelect, channel_id)?;
                self.complete_ack(AckKind::TxSelect, channel_id);
                Ok(())
            }
            Method::TxCommitOk(_) => {
                self.correlate_ack(AckKind::TxCommit, channel_id)?;
                self.complete_ack(AckKind::TxCommit, channel_id);
                Ok(())
            }
            Method::TxRollbackOk(_) => {
                self.correlate_ack(AckKind::TxRollback, channel_id)?;
                self.complete_ack(AckKind::TxRollback, channel_id);
                Ok(())
            }
            Method::Unknown(header, _) => {
                warn!("ignore unsupported method {} on channel {}", header, channel_id);
                Ok(())
            }
            _ => Err(Error::UnexpectedFrame(format!(
                "{} on channel {}",
                header, channel_id
            ))),
        }
    }

    fn expect_channel(
        &mut self,
        channel_id: AmqpChannelId,
        header: MethodHeader,
    ) -> Result<&mut Channel> {
        self.channels.get_mut(&channel_id).ok_or_else(|| {
            Error::UnexpectedFrame(format!("{} on unknown channel {}", header, channel_id))
        })
    }

    /// Match an acknowledgment with the oldest request of its kind.
    fn correlate_ack(&mut self, kind: AckKind, frame_channel: AmqpChannelId) -> Result<()> {
        let channel_id = self.ack_queues.dequeue(kind)?;
        if channel_id != frame_channel {
            return Err(Error::CorrelationMismatch(format!(
                "{} received on channel {}, but channel {} is the oldest awaiting it",
                kind, frame_channel, channel_id
            )));
        }
        Ok(())
    }

    fn complete_ack(&mut self, kind: AckKind, channel_id: AmqpChannelId) {
        let continuation = self
            .channels
            .get_mut(&channel_id)
            .and_then(|channel| channel.take_continuation(kind));
        match continuation {
            Some(continuation) => continuation(self, channel_id),
            None => debug!("no continuation for {} on channel {}", kind, channel_id),
        }
    }
}

fn to_short_str(value: &str) -> Result<ShortStr> {
    ShortStr::try_from(value)
        .map_err(|err| Error::ConnectionOpenError(format!("'{}': {}", value, err)))
}

/////////////////////////////////////////////////////////////////////////////
#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use bytes::Bytes;

    use super::{AckKind, Connection, OpenConnectionArguments};
    use crate::{
        api::{
            callbacks::ConnectionCallback,
            error::Error,
            status::{Stateful, Status},
            Result,
        },
        frame::{
            types::{AmqpChannelId, FieldTable, FieldValue, LongStr},
            Blocked, Close, CloseChannel, CloseChannelOk, CloseOk, Frame, FrameDemultiplexer,
            Method, MethodHeader, OpenChannelOk, OpenOk, QosOk, Start, Tune, TuneOk, TxCommitOk,
            TxSelectOk, Unblocked, FRAME_END,
        },
        net::Transport,
        test_utils::setup_logging,
    };

    #[derive(Debug, PartialEq)]
    enum Event {
        Sent(AmqpChannelId, Frame),
        Heartbeat(u16),
        Hook(&'static str),
        Continuation(&'static str, AmqpChannelId),
    }

    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<Event>>>);

    impl Recorder {
        fn push(&self, event: Event) {
            self.0.lock().unwrap().push(event);
        }

        fn take(&self) -> Vec<Event> {
            std::mem::take(&mut *self.0.lock().unwrap())
        }
    }

    impl Transport for Recorder {
        fn send_raw(&mut self, bytes: Bytes) {
            let mut demux = FrameDemultiplexer::default();
            demux.feed(&bytes).unwrap();
            while let Some(raw) = demux.next_frame().unwrap() {
                self.push(Event::Sent(raw.channel(), Frame::decode(&raw).unwrap()));
            }
        }

        fn heartbeat_negotiated(&mut self, interval: u16) {
            self.push(Event::Heartbeat(interval));
        }
    }

    #[derive(Clone, Default)]
    struct BlockedRecorder(Arc<Mutex<Vec<String>>>);

    impl ConnectionCallback for BlockedRecorder {
        fn close(&mut self, _connection: &Connection, _error: Error) -> Result<()> {
            Ok(())
        }

        fn blocked(&mut self, _connection: &Connection, reason: &str) {
            self.0.lock().unwrap().push(format!("blocked: {}", reason));
        }

        fn unblocked(&mut self, _connection: &Connection) {
            self.0.lock().unwrap().push("unblocked".to_string());
        }
    }

    #[derive(Clone, Default)]
    struct CloseRecorder(Arc<Mutex<Vec<Error>>>);

    impl ConnectionCallback for CloseRecorder {
        fn close(&mut self, _connection: &Connection, error: Error) -> Result<()> {
            self.0.lock().unwrap().push(error);
            Ok(())
        }
    }

    fn new_connection(args: &OpenConnectionArguments) -> (Connection, Recorder) {
        setup_logging();
        let recorder = Recorder::default();
        let connection = Connection::new(args, Box::new(recorder.clone())).unwrap();
        (connection, recorder)
    }

    fn server_start() -> Start {
        let mut props = FieldTable::new();
        props.insert(
            "product".try_into().unwrap(),
            FieldValue::S(LongStr::try_from("RabbitMQ").unwrap()),
        );
        Start::new(
            props,
            "AMQPLAIN PLAIN".try_into().unwrap(),
            "en_US".try_into().unwrap(),
        )
    }

    fn feed<F: Into<Frame>>(
        connection: &mut Connection,
        channel_id: AmqpChannelId,
        frame: F,
    ) -> Result<()> {
        connection.on_read(&frame.into().encode(channel_id).unwrap())
    }

    fn method_sent(event: &Event) -> Option<(AmqpChannelId, MethodHeader)> {
        match event {
            Event::Sent(channel_id, Frame::Method(method)) => Some((*channel_id, method.header())),
            _ => None,
        }
    }

    fn opened_connection() -> (Connection, Recorder) {
        let (mut connection, recorder) = new_connection(&OpenConnectionArguments::default());
        feed(&mut connection, 0, server_start()).unwrap();
        feed(&mut connection, 0, Tune::new(2047, 131072, 60)).unwrap();
        feed(&mut connection, 0, OpenOk::default()).unwrap();
        assert!(connection.is_opened());
        recorder.take();
        (connection, recorder)
    }

    fn open_channel(connection: &mut Connection, channel_id: AmqpChannelId) {
        connection.channel(channel_id).unwrap().open(|_, _| {}).unwrap();
        feed(connection, channel_id, OpenChannelOk::default()).unwrap();
        assert_eq!(Some(Status::Opened), connection.channel_status(channel_id));
    }

    #[test]
    fn test_handshake_sequence() {
        let (mut connection, recorder) = new_connection(&OpenConnectionArguments::default());
        let hooks = recorder.clone();
        connection.on_open(move |_| hooks.push(Event::Hook("open")));
        let hooks = recorder.clone();
        connection.on_connection(move |_| hooks.push(Event::Hook("connection")));
        assert!(connection.is_initial());

        feed(&mut connection, 0, server_start()).unwrap();
        assert!(connection.is_opening());
        assert_eq!("RabbitMQ", connection.server_properties().unwrap().product());
        match recorder.take().as_slice() {
            [Event::Sent(0, Frame::Method(Method::StartOk(start_ok)))] => {
                assert_eq!("PLAIN", start_ok.mechanism());
                assert_eq!("\0guest\0guest", start_ok.response());
                assert_eq!("en_US", start_ok.locale());
            }
            other => panic!("unexpected events {:?}", other),
        }

        feed(&mut connection, 0, Tune::new(2047, 131072, 60)).unwrap();
        assert!(connection.is_opening());
        let events = recorder.take();
        assert_eq!(4, events.len());
        assert_eq!(
            Event::Sent(0, Frame::Method(Method::TuneOk(TuneOk::new(2047, 131072, 60)))),
            events[0]
        );
        assert_eq!(Event::Heartbeat(60), events[1]);
        assert_eq!(Event::Hook("open"), events[2]);
        match &events[3] {
            Event::Sent(0, Frame::Method(Method::Open(open))) => assert_eq!("/", open.virtual_host()),
            other => panic!("unexpected event {:?}", other),
        }

        feed(
            &mut connection,
            0,
            OpenOk::new("rabbit1:5672,rabbit2:5672".try_into().unwrap()),
        )
        .unwrap();
        assert!(connection.is_opened());
        assert_eq!(
            vec!["rabbit1:5672".to_string(), "rabbit2:5672".to_string()],
            connection.known_hosts().to_vec()
        );
        assert_eq!(vec![Event::Hook("connection")], recorder.take());
    }

    #[test]
    fn test_frame_max_is_minimum() {
        for (local, server) in [(131072, 262144), (131072, 4096), (8192, 8192)] {
            let args = OpenConnectionArguments::default().frame_max(local).finish();
            let (mut connection, recorder) = new_connection(&args);
            feed(&mut connection, 0, server_start()).unwrap();
            feed(&mut connection, 0, Tune::new(0, server, 0)).unwrap();

            let expected = std::cmp::min(local, server);
            assert_eq!(expected, connection.frame_max());
            assert!(recorder.take().iter().any(|event| matches!(
                event,
                Event::Sent(0, Frame::Method(Method::TuneOk(tune_ok))) if tune_ok.frame_max() == expected
            )));
        }
    }

    #[test]
    fn test_heartbeat_override() {
        let args = OpenConnectionArguments::default().heartbeat(5).finish();
        let (mut connection, _recorder) = new_connection(&args);
        feed(&mut connection, 0, server_start()).unwrap();
        feed(&mut connection, 0, Tune::new(0, 131072, 60)).unwrap();
        assert_eq!(5, connection.heartbeat_interval());

        let (mut connection, _recorder) = new_connection(&OpenConnectionArguments::default());
        feed(&mut connection, 0, server_start()).unwrap();
        feed(&mut connection, 0, Tune::new(0, 131072, 60)).unwrap();
        assert_eq!(60, connection.heartbeat_interval());
    }

    #[test]
    fn test_whole_handshake_in_one_chunk() {
        let (mut connection, recorder) = new_connection(&OpenConnectionArguments::default());
        let mut chunk = Frame::from(server_start()).encode(0).unwrap().to_vec();
        chunk.extend_from_slice(&Frame::from(Tune::new(0, 131072, 0)).encode(0).unwrap());
        chunk.extend_from_slice(&Frame::from(OpenOk::default()).encode(0).unwrap());

        for byte in chunk {
            connection.on_read(&[byte]).unwrap();
        }
        assert!(connection.is_opened());
        let sent: Vec<_> = recorder.take().iter().filter_map(method_sent).collect();
        assert_eq!(3, sent.len());
    }

    #[test]
    fn test_unsupported_mechanism() {
        let (mut connection, _recorder) = new_connection(&OpenConnectionArguments::default());
        let start = Start::new(
            FieldTable::new(),
            "EXTERNAL".try_into().unwrap(),
            "en_US".try_into().unwrap(),
        );
        assert!(matches!(
            feed(&mut connection, 0, start),
            Err(Error::ConnectionOpenError(_))
        ));
    }

    #[test]
    fn test_out_of_sequence_tune() {
        let (mut connection, _recorder) = new_connection(&OpenConnectionArguments::default());
        assert!(matches!(
            feed(&mut connection, 0, Tune::new(0, 131072, 0)),
            Err(Error::UnexpectedFrame(_))
        ));
        assert!(connection.is_initial());
    }

    #[test]
    fn test_open_before_tune_is_rejected() {
        let (mut connection, recorder) = new_connection(&OpenConnectionArguments::default());
        feed(&mut connection, 0, server_start()).unwrap();
        recorder.take();

        assert!(matches!(
            connection.open("/"),
            Err(Error::ConnectionUseError(_))
        ));
        assert!(recorder.take().is_empty());
    }

    #[test]
    fn test_client_initiated_close() {
        let (mut connection, recorder) = opened_connection();
        let hooks = recorder.clone();
        connection.on_disconnection(move |_| hooks.push(Event::Hook("disconnection")));

        connection.close_gracefully().unwrap();
        assert!(connection.is_closing());
        match recorder.take().as_slice() {
            [Event::Sent(0, Frame::Method(Method::Close(close)))] => {
                assert_eq!(200, close.reply_code());
                assert_eq!("Goodbye", close.reply_text());
                assert_eq!(0, close.class_id());
                assert_eq!(0, close.method_id());
            }
            other => panic!("unexpected events {:?}", other),
        }
        assert!(connection.close_gracefully().is_err());

        feed(&mut connection, 0, CloseOk).unwrap();
        assert!(connection.is_closed());
        assert_eq!(vec![Event::Hook("disconnection")], recorder.take());
    }

    #[test]
    fn test_frame_after_closed_is_reported() {
        let (mut connection, _recorder) = opened_connection();
        connection.close_gracefully().unwrap();
        feed(&mut connection, 0, CloseOk).unwrap();

        assert!(matches!(
            feed(&mut connection, 0, CloseOk),
            Err(Error::UnexpectedFrame(_))
        ));
    }

    #[test]
    fn test_peer_initiated_close() {
        let (mut connection, recorder) = opened_connection();
        let closes = CloseRecorder::default();
        connection.register_callback(closes.clone());
        open_channel(&mut connection, 1);
        open_channel(&mut connection, 2);
        recorder.take();

        let close = Close::new(320, "CONNECTION_FORCED - shutdown".try_into().unwrap(), 0, 0);
        feed(&mut connection, 0, close).unwrap();

        assert!(connection.is_closed());
        assert_eq!(Some(Status::Closed), connection.channel_status(1));
        assert_eq!(Some(Status::Closed), connection.channel_status(2));
        assert_eq!(
            vec![Event::Sent(0, Frame::Method(Method::CloseOk(CloseOk)))],
            recorder.take()
        );
        match closes.0.lock().unwrap().as_slice() {
            [Error::PeerClosed {
                reply_code,
                reply_text,
                ..
            }] => {
                assert_eq!(320, *reply_code);
                assert_eq!("CONNECTION_FORCED - shutdown", reply_text);
            }
            other => panic!("unexpected errors {:?}", other),
        };
    }

    #[test]
    fn test_peer_close_is_fatal_by_default() {
        let (mut connection, _recorder) = opened_connection();
        let close = Close::new(541, "INTERNAL_ERROR".try_into().unwrap(), 0, 0);

        match feed(&mut connection, 0, close) {
            Err(Error::PeerClosed { reply_text, .. }) => assert_eq!("INTERNAL_ERROR", reply_text),
            other => panic!("unexpected result {:?}", other),
        }
        assert!(connection.is_closed());
    }

    #[test]
    fn test_close_before_opened_is_authentication_failure() {
        let (mut connection, _recorder) = new_connection(&OpenConnectionArguments::default());
        feed(&mut connection, 0, server_start()).unwrap();

        let close = Close::new(403, "ACCESS_REFUSED".try_into().unwrap(), 10, 11);
        assert!(matches!(
            feed(&mut connection, 0, close),
            Err(Error::AuthenticationFailure(_))
        ));
        assert!(connection.is_closed());
    }

    #[test]
    fn test_blocked_goes_to_callback() {
        let (mut connection, _recorder) = opened_connection();
        let notices = BlockedRecorder::default();
        connection.register_callback(notices.clone());

        feed(&mut connection, 0, Blocked::new("low on memory".try_into().unwrap())).unwrap();
        assert_eq!(
            vec!["blocked: low on memory".to_string()],
            *notices.0.lock().unwrap()
        );
        feed(&mut connection, 0, Unblocked).unwrap();
        assert_eq!(
            vec!["blocked: low on memory".to_string(), "unblocked".to_string()],
            *notices.0.lock().unwrap()
        );
        assert!(connection.is_opened());
    }

    #[test]
    fn test_blocked_without_callback() {
        let (mut connection, _recorder) = opened_connection();
        feed(&mut connection, 0, Blocked::new("low on disk".try_into().unwrap())).unwrap();
        feed(&mut connection, 0, Unblocked).unwrap();
        assert!(connection.is_opened());
    }

    #[test]
    fn test_small_buffer_accepts_negotiated_frame_max() {
        let args = OpenConnectionArguments::default()
            .max_buffer_size(1024)
            .frame_max(8192)
            .finish();
        let (mut connection, _recorder) = new_connection(&args);
        feed(&mut connection, 0, server_start()).unwrap();
        feed(&mut connection, 0, Tune::new(0, 131072, 0)).unwrap();
        feed(&mut connection, 0, OpenOk::default()).unwrap();
        assert_eq!(8192, connection.frame_max());

        // content is discarded, but must get through the read buffer
        let body = Frame::ContentBody(Bytes::from(vec![0xAB; 8184]))
            .encode(1)
            .unwrap();
        assert_eq!(8192, body.len());
        connection.on_read(&body[..1000]).unwrap();
        connection.on_read(&body[1000..]).unwrap();
        assert!(connection.is_opened());
    }

    #[test]
    fn test_unknown_method_is_ignored() {
        let (mut connection, _recorder) = opened_connection();
        // connection.update-secret
        let frame = [1, 0, 0, 0, 0, 0, 4, 0, 10, 0, 70, FRAME_END];
        connection.on_read(&frame).unwrap();
        assert!(connection.is_opened());
    }

    #[test]
    fn test_channel_zero_is_reserved() {
        let (mut connection, _recorder) = opened_connection();
        assert!(matches!(
            connection.channel(0),
            Err(Error::ChannelUseError(_))
        ));
        assert!(connection.channel(2048).is_err());
    }

    #[test]
    fn test_ack_fires_oldest_continuation() {
        let (mut connection, recorder) = opened_connection();
        open_channel(&mut connection, 3);
        open_channel(&mut connection, 7);

        for channel_id in [3, 7] {
            let events = recorder.clone();
            connection
                .channel(channel_id)
                .unwrap()
                .qos(0, 10, false, move |_, id| events.push(Event::Continuation("qos", id)))
                .unwrap();
        }
        assert_eq!(2, connection.pending_acks(AckKind::Qos));
        recorder.take();

        feed(&mut connection, 3, QosOk).unwrap();
        feed(&mut connection, 7, QosOk).unwrap();
        assert_eq!(
            vec![
                Event::Continuation("qos", 3),
                Event::Continuation("qos", 7)
            ],
            recorder.take()
        );
        assert!(matches!(
            feed(&mut connection, 7, QosOk),
            Err(Error::CorrelationMismatch(_))
        ));
    }

    #[test]
    fn test_ack_on_wrong_channel_is_mismatch() {
        let (mut connection, _recorder) = opened_connection();
        open_channel(&mut connection, 1);
        open_channel(&mut connection, 2);
        connection.channel(1).unwrap().tx_select(|_, _| {}).unwrap();

        assert!(matches!(
            feed(&mut connection, 2, TxSelectOk),
            Err(Error::CorrelationMismatch(_))
        ));
        assert!(matches!(
            feed(&mut connection, 2, TxCommitOk),
            Err(Error::CorrelationMismatch(_))
        ));
    }

    #[test]
    fn test_server_closes_channel() {
        let (mut connection, recorder) = opened_connection();
        open_channel(&mut connection, 1);
        connection.channel(1).unwrap().flow(false, |_, _| {}).unwrap();
        recorder.take();

        let close = CloseChannel::new(404, "NOT_FOUND".try_into().unwrap(), 50, 10);
        feed(&mut connection, 1, close).unwrap();

        assert_eq!(Some(Status::Closed), connection.channel_status(1));
        assert_eq!(0, connection.pending_acks(AckKind::Flow));
        assert_eq!(
            vec![Event::Sent(1, Frame::Method(Method::CloseChannelOk(CloseChannelOk)))],
            recorder.take()
        );
        assert!(connection.is_opened());
    }

    #[test]
    fn test_interruption_discards_pending() {
        let (mut connection, recorder) = opened_connection();
        open_channel(&mut connection, 1);
        let events = recorder.clone();
        connection
            .channel(1)
            .unwrap()
            .tx_commit(move |_, id| events.push(Event::Continuation("commit", id)))
            .unwrap();
        recorder.take();

        connection.on_connection_interruption();

        assert_eq!(Some(Status::Closed), connection.channel_status(1));
        assert_eq!(0, connection.pending_acks(AckKind::TxCommit));
        assert!(matches!(
            feed(&mut connection, 1, TxCommitOk),
            Err(Error::CorrelationMismatch(_))
        ));
        assert!(recorder.take().is_empty());
    }
}
