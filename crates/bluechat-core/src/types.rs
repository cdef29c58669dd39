//! Core types for the BlueChat protocol
//!
//! Newtypes for device identity and time, plus the immutable chat [`Message`].

use core::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ----------------------------------------------------------------------------
// Timestamp
// ----------------------------------------------------------------------------

/// Milliseconds since the Unix epoch
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Create a timestamp from raw milliseconds
    pub fn new(millis: u64) -> Self {
        Self(millis)
    }

    /// Current wall-clock time
    pub fn now() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        Self(millis)
    }

    /// Raw milliseconds
    pub fn as_millis(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ----------------------------------------------------------------------------
// Device Identity
// ----------------------------------------------------------------------------

/// Platform-assigned identifier of a discovered peer.
///
/// Opaque to the core; stable and unique for the lifetime of a discovery
/// session (a BLE address on Linux, a peripheral UUID on Apple platforms).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DeviceId(String);

impl DeviceId {
    /// Wrap a platform identifier
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier as a string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DeviceId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for DeviceId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A peer seen during discovery
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    /// Platform identifier
    pub id: DeviceId,
    /// Human-readable name, the identifier's string form when none was advertised
    pub name: String,
}

impl Device {
    /// Create a device, falling back to the identifier when no name was observed
    pub fn new(id: DeviceId, name: Option<String>) -> Self {
        let name = name.unwrap_or_else(|| id.to_string());
        Self { id, name }
    }
}

// ----------------------------------------------------------------------------
// Link Role
// ----------------------------------------------------------------------------

/// Which side of the underlying radio link this endpoint plays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LinkRole {
    /// Scanned, connected and subscribed to the peer's session characteristic
    Central,
    /// Advertised and accepted the peer's subscription
    Peripheral,
}

impl fmt::Display for LinkRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkRole::Central => f.write_str("central"),
            LinkRole::Peripheral => f.write_str("peripheral"),
        }
    }
}

// ----------------------------------------------------------------------------
// Message
// ----------------------------------------------------------------------------

/// Who authored a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Provenance {
    /// Authored on this endpoint
    Local,
    /// Received over the link
    Remote,
}

/// A single chat utterance. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    id: Uuid,
    text: String,
    provenance: Provenance,
    sent_at: Timestamp,
}

impl Message {
    /// A message authored by this endpoint
    pub fn local(text: impl Into<String>) -> Self {
        Self::with_provenance(text.into(), Provenance::Local)
    }

    /// A message decoded from the link
    pub fn remote(text: impl Into<String>) -> Self {
        Self::with_provenance(text.into(), Provenance::Remote)
    }

    fn with_provenance(text: String, provenance: Provenance) -> Self {
        Self {
            id: Uuid::new_v4(),
            text,
            provenance,
            sent_at: Timestamp::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn provenance(&self) -> Provenance {
        self.provenance
    }

    pub fn sent_at(&self) -> Timestamp {
        self.sent_at
    }

    pub fn is_local(&self) -> bool {
        self.provenance == Provenance::Local
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_name_defaults_to_identifier() {
        let device = Device::new(DeviceId::new("AA:BB:CC:DD:EE:FF"), None);
        assert_eq!(device.name, "AA:BB:CC:DD:EE:FF");

        let named = Device::new(DeviceId::new("AA:BB:CC:DD:EE:FF"), Some("Pixel".into()));
        assert_eq!(named.name, "Pixel");
    }

    #[test]
    fn test_messages_get_distinct_ids() {
        let a = Message::local("hi");
        let b = Message::local("hi");
        assert_ne!(a.id(), b.id());
        assert!(a.is_local());
        assert_eq!(Message::remote("yo").provenance(), Provenance::Remote);
    }
}
