use std::fmt;

use serde::{Deserialize, Serialize};

use crate::frame::{
    types::{AmqpPeerProperties, LongStr, LongUint, Octect, ShortStr, ShortUint},
    REPLY_SUCCESS,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Start {
    version_major: Octect,
    version_minor: Octect,
    server_properties: AmqpPeerProperties,
    mechanisms: LongStr,
    locales: LongStr,
}

impl Start {
    pub fn new(server_properties: AmqpPeerProperties, mechanisms: LongStr, locales: LongStr) -> Self {
        Self {
            version_major: 0,
            version_minor: 9,
            server_properties,
            mechanisms,
            locales,
        }
    }

    pub fn version_major(&self) -> u8 {
        self.version_major
    }

    pub fn version_minor(&self) -> u8 {
        self.version_minor
    }

    pub fn server_properties(&self) -> &AmqpPeerProperties {
        &self.server_properties
    }

    pub fn into_server_properties(self) -> AmqpPeerProperties {
        self.server_properties
    }

    pub fn mechanisms(&self) -> &str {
        &self.mechanisms
    }

    pub fn locales(&self) -> &str {
        &self.locales
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartOk {
    client_properties: AmqpPeerProperties,
    mechanism: ShortStr,
    response: LongStr,
    locale: ShortStr,
}

impl StartOk {
    pub fn new(
        client_properties: AmqpPeerProperties,
        mechanism: ShortStr,
        response: LongStr,
        locale: ShortStr,
    ) -> Self {
        Self {
            client_properties,
            mechanism,
            response,
            locale,
        }
    }

    pub fn client_properties(&self) -> &AmqpPeerProperties {
        &self.client_properties
    }

    pub fn mechanism(&self) -> &str {
        &self.mechanism
    }

    pub fn response(&self) -> &str {
        &self.response
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Secure {
    challenge: LongStr,
}

impl Secure {
    pub fn new(challenge: LongStr) -> Self {
        Self { challenge }
    }

    pub fn challenge(&self) -> &str {
        &self.challenge
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecureOk {
    response: LongStr,
}

impl SecureOk {
    pub fn new(response: LongStr) -> Self {
        Self { response }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tune {
    channel_max: ShortUint,
    frame_max: LongUint,
    heartbeat: ShortUint,
}

impl Tune {
    pub fn new(channel_max: ShortUint, frame_max: LongUint, heartbeat: ShortUint) -> Self {
        Self {
            channel_max,
            frame_max,
            heartbeat,
        }
    }

    pub fn channel_max(&self) -> u16 {
        self.channel_max
    }

    pub fn frame_max(&self) -> u32 {
        self.frame_max
    }

    pub fn heartbeat(&self) -> u16 {
        self.heartbeat
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TuneOk {
    // RabbitMQ doesn't put a limit on channel-max, and treats any number in tune-ok as valid.
    // It does put a limit on frame-max, and checks that the value sent in tune-ok
    // is less than or equal.
    channel_max: ShortUint,
    frame_max: LongUint,
    heartbeat: ShortUint,
}

impl TuneOk {
    pub fn new(channel_max: ShortUint, frame_max: LongUint, heartbeat: ShortUint) -> Self {
        Self {
            channel_max,
            frame_max,
            heartbeat,
        }
    }

    pub fn channel_max(&self) -> u16 {
        self.channel_max
    }

    pub fn frame_max(&self) -> u32 {
        self.frame_max
    }

    pub fn heartbeat(&self) -> u16 {
        self.heartbeat
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Open {
    virtual_host: ShortStr,
    capabilities: ShortStr,
    insist: bool,
}

impl Open {
    pub fn new(virtual_host: ShortStr) -> Self {
        Self {
            virtual_host,
            capabilities: ShortStr::default(),
            insist: false,
        }
    }

    pub fn virtual_host(&self) -> &str {
        &self.virtual_host
    }
}

impl Default for Open {
    fn default() -> Self {
        // "/" always fits in a short string
        Self::new(ShortStr::try_from("/").unwrap_or_default())
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OpenOk {
    known_hosts: ShortStr,
}

impl OpenOk {
    pub fn new(known_hosts: ShortStr) -> Self {
        Self { known_hosts }
    }

    pub fn known_hosts(&self) -> &str {
        &self.known_hosts
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Close {
    reply_code: ShortUint,
    reply_text: ShortStr,
    class_id: ShortUint,
    method_id: ShortUint,
}

impl fmt::Display for Close {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_fmt(format_args!(
            "Close connection due to '{}: {}', (class_id = {}, method_id = {})",
            self.reply_code(),
            self.reply_text(),
            self.class_id(),
            self.method_id()
        ))
    }
}

impl Close {
    pub fn new(
        reply_code: ShortUint,
        reply_text: ShortStr,
        class_id: ShortUint,
        method_id: ShortUint,
    ) -> Self {
        Self {
            reply_code,
            reply_text,
            class_id,
            method_id,
        }
    }

    pub fn reply_code(&self) -> u16 {
        self.reply_code
    }

    pub fn reply_text(&self) -> &str {
        &self.reply_text
    }

    pub fn class_id(&self) -> u16 {
        self.class_id
    }

    pub fn method_id(&self) -> u16 {
        self.method_id
    }
}

impl Default for Close {
    fn default() -> Self {
        Self {
            reply_code: REPLY_SUCCESS,
            reply_text: ShortStr::try_from("Goodbye").unwrap_or_default(),
            class_id: 0,
            method_id: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CloseOk;

// below from https://www.rabbitmq.com/resources/specs/amqp0-9-1.extended.xml
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Blocked {
    reason: ShortStr,
}

impl Blocked {
    pub fn new(reason: ShortStr) -> Self {
        Self { reason }
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Unblocked;
