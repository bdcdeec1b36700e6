use crate::{
    api::{
        connection::{AckKind, Connection},
        Result,
    },
    frame::{types::AmqpChannelId, Qos},
};

use super::ChannelHandle;

impl ChannelHandle<'_> {
    /// See [AMQP_0-9-1 Reference](https://github.com/rabbitmq/amqp-0.9.1-spec/blob/main/docs/amqp-0-9-1-reference.md#basic.qos)
    ///
    /// `on_ok` fires when `basic.qos-ok` arrives.
    pub fn qos<F>(
        &mut self,
        prefetch_size: u32,
        prefetch_count: u16,
        global: bool,
        on_ok: F,
    ) -> Result<()>
    where
        F: FnOnce(&mut Connection, AmqpChannelId) + Send + 'static,
    {
        let qos = Qos::new(prefetch_size, prefetch_count, global);
        self.send_with_ack(AckKind::Qos, qos, Box::new(on_ok))
    }
}
