//! Control loop configuration.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// How the delays reported by `prepare` combine into one wait.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreparePolicy {
    /// Wait until the last of all deadlines has passed.
    #[default]
    Max,
    /// Wait for the deadline of the last object that asked for one.
    Latest,
}

/// Configuration for the control loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopConfig {
    /// How prepare delays are aggregated.
    pub prepare_policy: PreparePolicy,

    /// Upper bound on a single wait, in milliseconds. Bounds the virtual
    /// wait and, as a backstop, the real time spent waiting.
    pub max_wait_millis: u32,

    /// First byte of an unsolicited value log message.
    pub log_frame_tag: u8,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            prepare_policy: PreparePolicy::Max,
            max_wait_millis: u16::MAX as u32,
            log_frame_tag: 0x8A,
        }
    }
}

impl LoopConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
