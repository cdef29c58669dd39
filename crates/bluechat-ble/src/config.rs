//! BLE radio configuration

use std::time::Duration;

use crate::error::BleRadioError;

// ----------------------------------------------------------------------------
// Configuration
// ----------------------------------------------------------------------------

/// Configuration for the BLE radio
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct BleRadioConfig {
    /// Name placed in our advertisement
    pub local_name: String,
    /// Maximum time for connect plus service discovery
    pub connection_timeout: Duration,
    /// How often the radio checks that a subscribed central is still there
    pub maintenance_interval: Duration,
    /// Write frames with response (acknowledged) instead of without
    pub write_with_response: bool,
}

impl Default for BleRadioConfig {
    fn default() -> Self {
        Self {
            local_name: "BlueChat".to_string(),
            connection_timeout: Duration::from_secs(10),
            maintenance_interval: Duration::from_secs(2),
            write_with_response: true,
        }
    }
}

impl BleRadioConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_local_name(mut self, name: impl Into<String>) -> Self {
        self.local_name = name.into();
        self
    }

    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    pub fn with_maintenance_interval(mut self, interval: Duration) -> Self {
        self.maintenance_interval = interval;
        self
    }

    pub fn with_write_with_response(mut self, enabled: bool) -> Self {
        self.write_with_response = enabled;
        self
    }

    pub fn validate(&self) -> Result<(), BleRadioError> {
        // Legacy advertising payloads leave little room for the name
        if self.local_name.is_empty() || self.local_name.len() > 29 {
            return Err(BleRadioError::InvalidConfiguration(format!(
                "local name must be 1-29 bytes, got {}",
                self.local_name.len()
            )));
        }
        if self.connection_timeout.is_zero() {
            return Err(BleRadioError::InvalidConfiguration(
                "connection timeout must be non-zero".into(),
            ));
        }
        if self.maintenance_interval.is_zero() {
            return Err(BleRadioError::InvalidConfiguration(
                "maintenance interval must be non-zero".into(),
            ));
        }
        Ok(())
    }
}
