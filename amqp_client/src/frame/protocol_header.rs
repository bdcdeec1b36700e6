use serde::Serialize;

use super::types::Octect;

/// `AMQP` followed by protocol id and version, sent once when the socket connects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProtocolHeader {
    name: [u8; 4],
    id: Octect,
    major: Octect,
    minor: Octect,
    revision: Octect,
}

impl ProtocolHeader {
    pub fn set_version(&mut self, major: Octect, minor: Octect, revision: Octect) {
        self.major = major;
        self.minor = minor;
        self.revision = revision;
    }
}

impl Default for ProtocolHeader {
    fn default() -> Self {
        Self {
            name: *b"AMQP",
            id: 0,
            major: 0,
            minor: 9,
            revision: 1,
        }
    }
}
