use std::time::Duration;

use tokio::{
    io::{AsyncWrite, AsyncWriteExt},
    sync::mpsc::UnboundedReceiver,
    time::{self, Instant, Interval, MissedTickBehavior},
};
use tracing::{debug, error, trace};

use crate::frame::{Frame, DEFAULT_CONN_CHANNEL};

use super::OutgoingMessage;

pub(super) struct WriterHandler<W> {
    stream: W,
    /// receiver half of the connection's transport
    outgoing_rx: UnboundedReceiver<OutgoingMessage>,
    heartbeat: Option<Interval>,
}

impl<W> WriterHandler<W>
where
    W: AsyncWrite + Send + Unpin,
{
    pub fn new(stream: W, outgoing_rx: UnboundedReceiver<OutgoingMessage>) -> Self {
        Self {
            stream,
            outgoing_rx,
            heartbeat: None,
        }
    }

    /// Heartbeats are sent at half the negotiated interval.
    fn set_heartbeat(&mut self, interval: u16) {
        if interval == 0 {
            self.heartbeat = None;
            return;
        }
        let period = Duration::from_secs(u64::from((interval / 2).max(1)));
        let mut ticker = time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.heartbeat = Some(ticker);
        debug!("send heartbeat every {:?}", period);
    }

    pub async fn run_until_shutdown(mut self) {
        loop {
            tokio::select! {
                message = self.outgoing_rx.recv() => {
                    match message {
                        // connection dropped
                        None => break,
                        Some(OutgoingMessage::Raw(bytes)) => {
                            if let Err(err) = self.stream.write_all(&bytes).await {
                                error!("failed to write {} bytes, cause: {}", bytes.len(), err);
                                break;
                            }
                        }
                        Some(OutgoingMessage::Heartbeat(interval)) => self.set_heartbeat(interval),
                    }
                }
                _ = next_tick(&mut self.heartbeat) => {
                    trace!("heartbeat to server");
                    let heartbeat = match Frame::HeartBeat.encode(DEFAULT_CONN_CHANNEL) {
                        Ok(heartbeat) => heartbeat,
                        Err(err) => {
                            error!("failed to encode heartbeat, cause: {}", err);
                            break;
                        }
                    };
                    if let Err(err) = self.stream.write_all(&heartbeat).await {
                        error!("failed to send heartbeat, cause: {}", err);
                        break;
                    }
                }
            }
        }
        if let Err(err) = self.stream.shutdown().await {
            debug!("socket shutdown: {}", err);
        }
        debug!("writer handler exits");
    }
}

async fn next_tick(heartbeat: &mut Option<Interval>) -> Instant {
    match heartbeat {
        Some(ticker) => ticker.tick().await,
        None => std::future::pending().await,
    }
}
