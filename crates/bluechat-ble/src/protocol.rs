//! GATT layout shared by both roles
//!
//! The peripheral serves one primary service, [`DISCOVERY_SERVICE_UUID`], with
//! two characteristics:
//! - [`SESSION_CHARACTERISTIC_UUID`]: notify, peripheral → central frames; also
//!   writable
//! - [`MESSAGE_CHARACTERISTIC_UUID`]: write, central → peripheral frames
//!
//! Older peers serve only the session characteristic and take writes on it, so
//! a central must accept either layout (see [`GattLayout::select`]).

use bluechat_core::DeviceId;
pub use bluechat_core::protocol::{
    DISCOVERY_SERVICE_UUID, MAX_ATTRIBUTE_LEN, MESSAGE_CHARACTERISTIC_UUID,
    SESSION_CHARACTERISTIC_UUID,
};
use uuid::Uuid;

use crate::error::BleRadioError;

/// Whether an advertisement carries the discovery service
pub fn advertises_discovery_service(services: &[Uuid]) -> bool {
    services.contains(&DISCOVERY_SERVICE_UUID)
}

/// Stable identifier for a platform peripheral id.
///
/// Platform ids have no common textual form, so their debug form is used.
pub fn device_id_for<T: std::fmt::Debug>(platform_id: &T) -> DeviceId {
    DeviceId::new(format!("{:?}", platform_id))
}

/// Characteristics a central uses on a connected peer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GattLayout {
    /// Subscribed for incoming frames
    pub notify: Uuid,
    /// Written with outgoing frames
    pub write: Uuid,
}

impl GattLayout {
    /// Pick characteristics from what the peer serves.
    ///
    /// The session characteristic is required. Frames are written to the
    /// message characteristic when served, otherwise to the session one.
    pub fn select(available: &[Uuid]) -> Result<Self, BleRadioError> {
        if !available.contains(&SESSION_CHARACTERISTIC_UUID) {
            return Err(BleRadioError::CharacteristicNotFound(
                SESSION_CHARACTERISTIC_UUID,
            ));
        }
        let write = if available.contains(&MESSAGE_CHARACTERISTIC_UUID) {
            MESSAGE_CHARACTERISTIC_UUID
        } else {
            SESSION_CHARACTERISTIC_UUID
        };
        Ok(Self {
            notify: SESSION_CHARACTERISTIC_UUID,
            write,
        })
    }

    /// Peer takes writes on the notify characteristic
    pub fn is_single_characteristic(&self) -> bool {
        self.notify == self.write
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_with_message_characteristic() {
        let layout = GattLayout::select(&[
            Uuid::from_u128(0x2a00),
            MESSAGE_CHARACTERISTIC_UUID,
            SESSION_CHARACTERISTIC_UUID,
        ])
        .unwrap();
        assert_eq!(layout.notify, SESSION_CHARACTERISTIC_UUID);
        assert_eq!(layout.write, MESSAGE_CHARACTERISTIC_UUID);
        assert!(!layout.is_single_characteristic());
    }

    #[test]
    fn test_layout_with_session_characteristic_only() {
        let layout = GattLayout::select(&[SESSION_CHARACTERISTIC_UUID]).unwrap();
        assert_eq!(layout.notify, SESSION_CHARACTERISTIC_UUID);
        assert_eq!(layout.write, SESSION_CHARACTERISTIC_UUID);
        assert!(layout.is_single_characteristic());
    }

    #[test]
    fn test_layout_requires_session_characteristic() {
        assert_eq!(
            GattLayout::select(&[MESSAGE_CHARACTERISTIC_UUID]),
            Err(BleRadioError::CharacteristicNotFound(
                SESSION_CHARACTERISTIC_UUID
            ))
        );
        assert!(GattLayout::select(&[]).is_err());
    }

    #[test]
    fn test_discovery_service_detected() {
        let other = Uuid::from_u128(0x1800);
        assert!(advertises_discovery_service(&[other, DISCOVERY_SERVICE_UUID]));
        assert!(!advertises_discovery_service(&[other]));
        assert!(!advertises_discovery_service(&[]));
    }

    #[test]
    fn test_device_id_is_stable() {
        #[derive(Debug)]
        struct FakeId(u32);
        assert_eq!(device_id_for(&FakeId(7)), device_id_for(&FakeId(7)));
        assert_ne!(device_id_for(&FakeId(7)), device_id_for(&FakeId(8)));
    }
}
