use std::fmt;

use serde::{Deserialize, Serialize};

use crate::frame::{
    types::{LongStr, ShortStr, ShortUint},
    REPLY_SUCCESS,
};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OpenChannel {
    out_of_band: ShortStr,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OpenChannelOk {
    channel_id: LongStr,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flow {
    active: bool,
}

impl Flow {
    pub fn new(active: bool) -> Self {
        Self { active }
    }

    pub fn active(&self) -> bool {
        self.active
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowOk {
    active: bool,
}

impl FlowOk {
    pub fn new(active: bool) -> Self {
        Self { active }
    }

    pub fn active(&self) -> bool {
        self.active
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloseChannel {
    reply_code: ShortUint,
    reply_text: ShortStr,
    class_id: ShortUint,
    method_id: ShortUint,
}

impl fmt::Display for CloseChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_fmt(format_args!(
            "Close channel due to '{}: {}', (class_id = {}, method_id = {})",
            self.reply_code, self.reply_text, self.class_id, self.method_id
        ))
    }
}

impl CloseChannel {
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

impl Default for CloseChannel {
    fn default() -> Self {
        Self {
            reply_code: REPLY_SUCCESS,
            reply_text: ShortStr::default(),
            class_id: 0,
            method_id: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CloseChannelOk;
