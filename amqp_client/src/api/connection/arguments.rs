use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{api::security::SecurityCredentials, frame::DEFAULT_MAX_BUFFER_SIZE};

const DEFAULT_LOCALE: &str = "en_US";
/// Local upper bound proposed for `frame_max`, RabbitMQ's default.
pub const DEFAULT_FRAME_MAX: u32 = 131_072;

/// Arguments to open a connection.
///
/// Can be built in code or deserialized from any serde format, missing
/// fields take their default values.
///
/// # Example
///
/// ```
/// use amqp_client::connection::OpenConnectionArguments;
///
/// let args = OpenConnectionArguments::new("localhost", 5672, "user", "bitnami")
///     .virtual_host("staging")
///     .heartbeat(30)
///     .finish();
/// assert_eq!("staging", args.get_virtual_host());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenConnectionArguments {
    host: String,
    port: u16,
    virtual_host: String,
    connection_name: Option<String>,
    credentials: SecurityCredentials,
    locale: String,
    /// Overrides the heartbeat proposed by the server.
    heartbeat: Option<u16>,
    frame_max: u32,
    max_buffer_size: usize,
    /// Extra entries merged into the client properties sent in `start-ok`.
    client_properties: BTreeMap<String, String>,
}

impl Default for OpenConnectionArguments {
    fn default() -> Self {
        Self {
            host: String::from("localhost"),
            port: 5672,
            virtual_host: String::from("/"),
            connection_name: None,
            credentials: SecurityCredentials::default(),
            locale: String::from(DEFAULT_LOCALE),
            heartbeat: None,
            frame_max: DEFAULT_FRAME_MAX,
            max_buffer_size: DEFAULT_MAX_BUFFER_SIZE,
            client_properties: BTreeMap::new(),
        }
    }
}

impl OpenConnectionArguments {
    /// Arguments with SASL/PLAIN credentials, other values are defaults.
    pub fn new(host: &str, port: u16, username: &str, password: &str) -> Self {
        Self {
            host: host.to_owned(),
            port,
            credentials: SecurityCredentials::new_plain(username, password),
            ..Default::default()
        }
    }

    pub fn host(&mut self, host: &str) -> &mut Self {
        self.host = host.to_owned();
        self
    }

    pub fn port(&mut self, port: u16) -> &mut Self {
        self.port = port;
        self
    }

    pub fn virtual_host(&mut self, virtual_host: &str) -> &mut Self {
        self.virtual_host = virtual_host.to_owned();
        self
    }

    pub fn connection_name(&mut self, connection_name: &str) -> &mut Self {
        self.connection_name = Some(connection_name.to_owned());
        self
    }

    pub fn credentials(&mut self, credentials: SecurityCredentials) -> &mut Self {
        self.credentials = credentials;
        self
    }

    pub fn locale(&mut self, locale: &str) -> &mut Self {
        self.locale = locale.to_owned();
        self
    }

    /// Heartbeat interval in seconds, zero disables heartbeats.
    pub fn heartbeat(&mut self, heartbeat: u16) -> &mut Self {
        self.heartbeat = Some(heartbeat);
        self
    }

    pub fn frame_max(&mut self, frame_max: u32) -> &mut Self {
        self.frame_max = frame_max;
        self
    }

    /// Cap of buffered inbound bytes. Raised once tuned if it cannot hold a
    /// frame of the negotiated `frame_max`.
    pub fn max_buffer_size(&mut self, max_buffer_size: usize) -> &mut Self {
        self.max_buffer_size = max_buffer_size;
        self
    }

    pub fn client_property(&mut self, key: &str, value: &str) -> &mut Self {
        self.client_properties
            .insert(key.to_owned(), value.to_owned());
        self
    }

    pub fn finish(&mut self) -> Self {
        self.clone()
    }

    pub fn get_host(&self) -> &str {
        &self.host
    }

    pub fn get_port(&self) -> u16 {
        self.port
    }

    pub fn get_virtual_host(&self) -> &str {
        &self.virtual_host
    }

    pub fn get_connection_name(&self) -> Option<&str> {
        self.connection_name.as_deref()
    }

    pub fn get_credentials(&self) -> &SecurityCredentials {
        &self.credentials
    }

    pub fn get_locale(&self) -> &str {
        &self.locale
    }

    pub fn get_heartbeat(&self) -> Option<u16> {
        self.heartbeat
    }

    pub fn get_frame_max(&self) -> u32 {
        self.frame_max
    }

    pub fn get_max_buffer_size(&self) -> usize {
        self.max_buffer_size
    }

    pub fn get_client_properties(&self) -> &BTreeMap<String, String> {
        &self.client_properties
    }
}
