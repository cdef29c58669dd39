//! Session configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{BluechatError, BluechatResult};
use crate::protocol::MAX_ATTRIBUTE_LEN;

// ----------------------------------------------------------------------------
// Configuration
// ----------------------------------------------------------------------------

/// Configuration for a chat session state machine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Single-write capacity of the link; longer frames are truncated
    pub max_frame_len: usize,
    /// Connect to any compatible advertiser seen while scanning, not only a selected target
    pub auto_connect: bool,
    /// Give up advertising and return to scanning after this long without a subscriber
    pub advertise_timeout: Option<Duration>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_frame_len: MAX_ATTRIBUTE_LEN,
            auto_connect: true,
            advertise_timeout: None,
        }
    }
}

impl SessionConfig {
    /// Create a new configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the single-write capacity
    pub fn with_max_frame_len(mut self, len: usize) -> Self {
        self.max_frame_len = len;
        self
    }

    /// Enable or disable connecting to any discovered advertiser
    pub fn with_auto_connect(mut self, enabled: bool) -> Self {
        self.auto_connect = enabled;
        self
    }

    /// Set the advertising timeout
    pub fn with_advertise_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.advertise_timeout = timeout;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> BluechatResult<()> {
        if self.max_frame_len == 0 {
            return Err(BluechatError::configuration(
                "max_frame_len must be greater than 0",
            ));
        }
        if self.max_frame_len > MAX_ATTRIBUTE_LEN {
            return Err(BluechatError::configuration(format!(
                "max_frame_len {} exceeds the GATT attribute limit of {}",
                self.max_frame_len, MAX_ATTRIBUTE_LEN
            )));
        }
        if self.advertise_timeout == Some(Duration::ZERO) {
            return Err(BluechatError::configuration(
                "advertise_timeout must be greater than 0 when set",
            ));
        }
        Ok(())
    }
}
