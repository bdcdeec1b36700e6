use std::{collections::VecDeque, fmt};

use crate::{
    api::{error::Error, Result},
    frame::types::AmqpChannelId,
};

/// Operations whose acknowledgment carries only the channel number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AckKind {
    Qos,
    Flow,
    TxSelect,
    TxCommit,
    TxRollback,
}

impl AckKind {
    pub const ALL: [AckKind; 5] = [
        AckKind::Qos,
        AckKind::Flow,
        AckKind::TxSelect,
        AckKind::TxCommit,
        AckKind::TxRollback,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for AckKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AckKind::Qos => "basic.qos-ok",
            AckKind::Flow => "channel.flow-ok",
            AckKind::TxSelect => "tx.select-ok",
            AckKind::TxCommit => "tx.commit-ok",
            AckKind::TxRollback => "tx.rollback-ok",
        };
        f.write_str(name)
    }
}

/// FIFO of channels awaiting an acknowledgment, one queue per [`AckKind`].
///
/// Acknowledgments of one kind must come back in the order the requests
/// were sent. There is no cross-kind ordering.
#[derive(Debug, Default)]
pub struct AckCorrelationQueues {
    queues: [VecDeque<AmqpChannelId>; 5],
}

impl AckCorrelationQueues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called when the request is sent.
    pub fn enqueue(&mut self, kind: AckKind, channel_id: AmqpChannelId) {
        self.queues[kind.index()].push_back(channel_id);
    }

    /// Called when an acknowledgment of `kind` arrives.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CorrelationMismatch`] if nothing of `kind` is outstanding.
    pub fn dequeue(&mut self, kind: AckKind) -> Result<AmqpChannelId> {
        self.queues[kind.index()].pop_front().ok_or_else(|| {
            Error::CorrelationMismatch(format!("unsolicited {}, no request outstanding", kind))
        })
    }

    pub fn len(&self, kind: AckKind) -> usize {
        self.queues[kind.index()].len()
    }

    pub fn is_empty(&self) -> bool {
        self.queues.iter().all(|q| q.is_empty())
    }

    /// Drop all outstanding entries of a channel that will never be acknowledged.
    pub fn remove_channel(&mut self, channel_id: AmqpChannelId) {
        for queue in self.queues.iter_mut() {
            queue.retain(|id| *id != channel_id);
        }
    }

    pub fn reset(&mut self) {
        for queue in self.queues.iter_mut() {
            queue.clear();
        }
    }
}
