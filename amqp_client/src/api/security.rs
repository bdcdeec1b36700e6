//! Configuration of Security and Access Control.
//!
//! The credentials are used as part of [`OpenConnectionArguments`] value.
//!
//! [`OpenConnectionArguments`]: ../connection/struct.OpenConnectionArguments.html
use std::fmt;

use bytes::BytesMut;
use serde::{Deserialize, Serialize};

use crate::frame::{
    to_buffer,
    types::{FieldValue, LongStr, ShortStr},
};

use super::{error::Error, Result};

/// Credentials used to open a connection.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityCredentials {
    username: String,
    password: String,
    mechanism: AuthenticationMechanism,
}

#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum AuthenticationMechanism {
    PLAIN,
    AMQPLAIN,
    EXTERNAL,
}

impl fmt::Debug for SecurityCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecurityCredentials")
            .field("username", &self.username)
            .field("password", &"********")
            .field("mechanism", &self.mechanism)
            .finish()
    }
}

impl Default for SecurityCredentials {
    fn default() -> Self {
        Self::new_plain("guest", "guest")
    }
}

impl SecurityCredentials {
    /// Create and return a SASL/PLAIN credential with given `username` and `password`.
    ///
    /// See [RabbitMQ access control](https://www.rabbitmq.com/access-control.html#mechanisms).
    pub fn new_plain(username: &str, password: &str) -> Self {
        Self {
            username: username.to_owned(),
            password: password.to_owned(),
            mechanism: AuthenticationMechanism::PLAIN,
        }
    }

    /// Create and return a AMQPLAIN credential with given `username` and `password`.
    ///
    /// See [RabbitMQ access control](https://www.rabbitmq.com/access-control.html#mechanisms).
    pub fn new_amqplain(username: &str, password: &str) -> Self {
        Self {
            username: username.to_owned(),
            password: password.to_owned(),
            mechanism: AuthenticationMechanism::AMQPLAIN,
        }
    }

    /// Create and return EXTERNAL without credentials
    ///
    /// This must be used together with mTLS connection.
    pub fn new_external() -> Self {
        Self {
            username: "".to_owned(),
            password: "".to_owned(),
            mechanism: AuthenticationMechanism::EXTERNAL,
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn mechanism(&self) -> AuthenticationMechanism {
        self.mechanism
    }

    /// Get the name of authentication mechanism of current credential
    pub fn mechanism_name(&self) -> &'static str {
        match self.mechanism {
            AuthenticationMechanism::PLAIN => "PLAIN",
            AuthenticationMechanism::AMQPLAIN => "AMQPLAIN",
            AuthenticationMechanism::EXTERNAL => "EXTERNAL",
        }
    }

    /// Get the security challenge `response` string, to be sent to server.
    pub(crate) fn response(&self) -> Result<String> {
        match self.mechanism {
            AuthenticationMechanism::PLAIN => {
                Ok(format!("\0{}\0{}", self.username, self.password))
            }
            AuthenticationMechanism::AMQPLAIN => {
                // field table content without the table length prefix
                let mut buf = BytesMut::new();
                for (key, value) in [("LOGIN", &self.username), ("PASSWORD", &self.password)] {
                    let key = ShortStr::try_from(key)
                        .map_err(|err| Error::ConnectionUseError(err.to_string()))?;
                    let value = LongStr::try_from(value.as_str())
                        .map_err(|err| Error::ConnectionUseError(err.to_string()))?;
                    to_buffer(&(key, FieldValue::S(value)), &mut buf)?;
                }
                String::from_utf8(buf.to_vec()).map_err(|err| {
                    Error::ConnectionUseError(format!("AMQPLAIN response is not UTF-8: {}", err))
                })
            }
            AuthenticationMechanism::EXTERNAL => Ok(String::new()),
        }
    }
}
