//! Error types for the BLE radio

use thiserror::Error;

// ----------------------------------------------------------------------------
// Error Types
// ----------------------------------------------------------------------------

/// Errors raised by the BLE stack adapters
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BleRadioError {
    #[error("BLE adapter not available: {0}")]
    AdapterNotAvailable(String),

    #[error("BLE adapter not initialized")]
    AdapterNotInitialized,

    #[error("Failed to start scanning: {0}")]
    ScanFailed(String),

    #[error("Unknown device: {0}")]
    UnknownDevice(String),

    #[error("Failed to connect: {0}")]
    ConnectionFailed(String),

    #[error("Connection timed out")]
    ConnectionTimeout,

    #[error("Failed to discover services: {0}")]
    ServiceDiscoveryFailed(String),

    #[error("Characteristic not found: {0}")]
    CharacteristicNotFound(uuid::Uuid),

    #[error("Failed to subscribe to notifications: {0}")]
    SubscriptionFailed(String),

    #[error("Failed to write frame: {0}")]
    WriteFailed(String),

    #[error("No subscriber to notify")]
    NoSubscriber,

    #[error("Failed to start advertising: {0}")]
    AdvertisingFailed(String),

    #[error("Peripheral role not supported on this platform")]
    PeripheralUnsupported,

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_failure() {
        let missing = BleRadioError::CharacteristicNotFound(uuid::Uuid::nil());
        assert_eq!(
            missing.to_string(),
            "Characteristic not found: 00000000-0000-0000-0000-000000000000"
        );
        assert_eq!(
            BleRadioError::WriteFailed("gatt 0x0e".into()).to_string(),
            "Failed to write frame: gatt 0x0e"
        );
    }
}
