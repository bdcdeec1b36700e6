use crate::frame::types::{AmqpPeerProperties, FieldTable, FieldValue, LongStr};

use super::OpenConnectionArguments;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServerCapabilities {
    consumer_cancel_notify: bool,
    publisher_confirms: bool,
    consumer_priorities: bool,
    authentication_failure_close: bool,
    per_consumer_qos: bool,
    connection_blocked: bool,
    exchange_exchange_bindings: bool,
    basic_nack: bool,
    direct_reply_to: bool,
}

impl ServerCapabilities {
    pub fn consumer_cancel_notify(&self) -> bool {
        self.consumer_cancel_notify
    }

    pub fn publisher_confirms(&self) -> bool {
        self.publisher_confirms
    }

    pub fn consumer_priorities(&self) -> bool {
        self.consumer_priorities
    }

    pub fn authentication_failure_close(&self) -> bool {
        self.authentication_failure_close
    }

    pub fn per_consumer_qos(&self) -> bool {
        self.per_consumer_qos
    }

    pub fn connection_blocked(&self) -> bool {
        self.connection_blocked
    }

    pub fn exchange_exchange_bindings(&self) -> bool {
        self.exchange_exchange_bindings
    }

    pub fn basic_nack(&self) -> bool {
        self.basic_nack
    }

    pub fn direct_reply_to(&self) -> bool {
        self.direct_reply_to
    }
}

/// Properties announced by the server in `connection.start`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServerProperties {
    capabilities: ServerCapabilities,
    cluster_name: String,
    product: String,
    version: String,
    raw: AmqpPeerProperties,
}

impl ServerProperties {
    pub fn capabilities(&self) -> &ServerCapabilities {
        &self.capabilities
    }

    pub fn cluster_name(&self) -> &str {
        &self.cluster_name
    }

    pub fn product(&self) -> &str {
        &self.product
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// The table as received, including entries not parsed above.
    pub fn raw(&self) -> &AmqpPeerProperties {
        &self.raw
    }
}

// missing or mistyped entries fall back to defaults
impl From<AmqpPeerProperties> for ServerProperties {
    fn from(raw: AmqpPeerProperties) -> Self {
        let caps = match raw.get("capabilities") {
            Some(FieldValue::F(table)) => table.clone(),
            _ => FieldTable::new(),
        };
        let flag = |key: &str| matches!(caps.get(key), Some(FieldValue::t(true)));
        let text = |key: &str| match raw.get(key) {
            Some(FieldValue::S(value)) => value.to_string(),
            _ => String::new(),
        };

        let capabilities = ServerCapabilities {
            consumer_cancel_notify: flag("consumer_cancel_notify"),
            publisher_confirms: flag("publisher_confirms"),
            consumer_priorities: flag("consumer_priorities"),
            authentication_failure_close: flag("authentication_failure_close"),
            per_consumer_qos: flag("per_consumer_qos"),
            connection_blocked: flag("connection.blocked"),
            exchange_exchange_bindings: flag("exchange_exchange_bindings"),
            basic_nack: flag("basic.nack"),
            direct_reply_to: flag("direct_reply_to"),
        };

        Self {
            capabilities,
            cluster_name: text("cluster_name"),
            product: text("product"),
            version: text("version"),
            raw,
        }
    }
}

/////////////////////////////////////////////////////////////////////////////
fn insert_str(table: &mut FieldTable, key: &str, value: &str) {
    if let (Ok(key), Ok(value)) = (key.try_into(), LongStr::try_from(value)) {
        table.insert(key, FieldValue::S(value));
    }
}

fn insert_flag(table: &mut FieldTable, key: &str) {
    if let Ok(key) = key.try_into() {
        table.insert(key, FieldValue::t(true));
    }
}

/// Client properties sent in `connection.start-ok`.
pub(crate) fn client_properties(args: &OpenConnectionArguments) -> AmqpPeerProperties {
    let mut capabilities = FieldTable::new();
    for cap in [
        "authentication_failure_close",
        "basic.nack",
        "connection.blocked",
        "consumer_cancel_notify",
        "publisher_confirms",
    ] {
        insert_flag(&mut capabilities, cap);
    }

    let mut properties = AmqpPeerProperties::new();
    insert_str(&mut properties, "product", env!("CARGO_PKG_NAME"));
    insert_str(&mut properties, "version", env!("CARGO_PKG_VERSION"));
    insert_str(&mut properties, "platform", "Rust");
    insert_str(&mut properties, "information", "AMQP 0-9-1 client");
    if let Some(name) = args.get_connection_name() {
        insert_str(&mut properties, "connection_name", name);
    }
    if let Ok(key) = "capabilities".try_into() {
        properties.insert(key, FieldValue::F(capabilities));
    }
    for (key, value) in args.get_client_properties() {
        insert_str(&mut properties, key, value);
    }
    properties
}
