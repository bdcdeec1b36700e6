use crate::{
    api::{
        connection::{AckKind, Connection},
        Result,
    },
    frame::{types::AmqpChannelId, TxCommit, TxRollback, TxSelect},
};

use super::ChannelHandle;

/// APIs for AMQP transaction class.
impl ChannelHandle<'_> {
    /// See [AMQP_0-9-1 Reference](https://github.com/rabbitmq/amqp-0.9.1-spec/blob/main/docs/amqp-0-9-1-reference.md#tx.select)
    pub fn tx_select<F>(&mut self, on_ok: F) -> Result<()>
    where
        F: FnOnce(&mut Connection, AmqpChannelId) + Send + 'static,
    {
        self.send_with_ack(AckKind::TxSelect, TxSelect, Box::new(on_ok))
    }

    /// See [AMQP_0-9-1 Reference](https://github.com/rabbitmq/amqp-0.9.1-spec/blob/main/docs/amqp-0-9-1-reference.md#tx.commit)
    pub fn tx_commit<F>(&mut self, on_ok: F) -> Result<()>
    where
        F: FnOnce(&mut Connection, AmqpChannelId) + Send + 'static,
    {
        self.send_with_ack(AckKind::TxCommit, TxCommit, Box::new(on_ok))
    }

    /// See [AMQP_0-9-1 Reference](https://github.com/rabbitmq/amqp-0.9.1-spec/blob/main/docs/amqp-0-9-1-reference.md#tx.rollback)
    pub fn tx_rollback<F>(&mut self, on_ok: F) -> Result<()>
    where
        F: FnOnce(&mut Connection, AmqpChannelId) + Send + 'static,
    {
        self.send_with_ack(AckKind::TxRollback, TxRollback, Box::new(on_ok))
    }
}
