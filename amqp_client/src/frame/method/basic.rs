use serde::{Deserialize, Serialize};

use crate::frame::types::{LongUint, ShortUint};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Qos {
    prefetch_size: LongUint,
    prefetch_count: ShortUint,
    global: bool,
}

impl Qos {
    pub fn new(prefetch_size: LongUint, prefetch_count: ShortUint, global: bool) -> Self {
        Self {
            prefetch_size,
            prefetch_count,
            global,
        }
    }

    pub fn prefetch_size(&self) -> u32 {
        self.prefetch_size
    }

    pub fn prefetch_count(&self) -> u16 {
        self.prefetch_count
    }

    pub fn global(&self) -> bool {
        self.global
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QosOk;
