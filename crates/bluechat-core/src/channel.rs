//! Channel message vocabulary
//!
//! Everything that crosses the core boundary is one of four message types:
//! - [`Command`]: UI collaborator → session
//! - [`Event`]: radio adapter → session
//! - [`Effect`]: session → radio adapter
//! - [`AppEvent`]: session → UI collaborator
//!
//! The radio adapter reports results of its operations as later [`Event`]s;
//! no effect blocks or returns a value.

use serde::{Deserialize, Serialize};

use crate::arbiter::SessionRole;
use crate::types::{Device, DeviceId, LinkRole, Message};

// ----------------------------------------------------------------------------
// Command: UI → Session
// ----------------------------------------------------------------------------

/// Requests from the UI collaborator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    /// Begin the chat session (listen first)
    Start,
    /// Send a line of text to the peer
    Submit { text: String },
    /// Only connect to this device when it is discovered
    ConnectTo { device: DeviceId },
    /// Drop the current link and go back to scanning
    Disconnect,
    /// End the chat session and silence the radio
    Stop,
}

// ----------------------------------------------------------------------------
// Event: Radio → Session
// ----------------------------------------------------------------------------

/// Link-layer events, delivered in the order the radio stack emits them
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    /// An advertiser of the discovery service was seen
    DeviceDiscovered {
        device: DeviceId,
        name: Option<String>,
    },
    /// The link for the given role finished its handshake
    LinkEstablished { role: LinkRole },
    /// A central subscribed to our session characteristic
    SubscriberAttached,
    /// One frame arrived on the data channel
    DataReceived { bytes: Vec<u8> },
    /// The link dropped
    LinkLost { reason: String },
    /// Service or characteristic discovery, or subscription, failed
    HandshakeFailed { reason: String },
    /// A frame handed to the radio could not be delivered
    WriteFailed { bytes: Vec<u8>, reason: String },
    /// The radio is powered off, unauthorized or unsupported
    RadioUnavailable { reason: String },
    /// Advertising went unanswered for the configured timeout
    AdvertisingTimedOut,
}

impl Event {
    /// Short name for logging
    pub fn name(&self) -> &'static str {
        match self {
            Event::DeviceDiscovered { .. } => "DeviceDiscovered",
            Event::LinkEstablished { .. } => "LinkEstablished",
            Event::SubscriberAttached => "SubscriberAttached",
            Event::DataReceived { .. } => "DataReceived",
            Event::LinkLost { .. } => "LinkLost",
            Event::HandshakeFailed { .. } => "HandshakeFailed",
            Event::WriteFailed { .. } => "WriteFailed",
            Event::RadioUnavailable { .. } => "RadioUnavailable",
            Event::AdvertisingTimedOut => "AdvertisingTimedOut",
        }
    }
}

// ----------------------------------------------------------------------------
// Effect: Session → Radio
// ----------------------------------------------------------------------------

/// Radio operations requested by the session. Fire-and-forget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    /// Scan for the discovery service; stops advertising
    BeginScanning,
    /// Advertise the discovery service; stops scanning
    BeginAdvertising,
    /// Connect to a discovered peer and run the characteristic handshake
    ConnectTo { device: DeviceId },
    /// Write one frame on the active link
    WriteBytes { bytes: Vec<u8> },
    /// Release every link-layer handle of the current session
    ReleaseLink,
    /// Stop scanning, advertising and any link
    Stop,
}

// ----------------------------------------------------------------------------
// AppEvent: Session → UI
// ----------------------------------------------------------------------------

/// Notifications for the UI collaborator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppEvent {
    /// A message should be shown (local echo or decoded remote frame)
    MessagePublished(Message),
    /// The discovered device list changed; first-seen order
    DeviceListChanged(Vec<Device>),
    /// The session role changed
    RoleChanged { from: SessionRole, to: SessionRole },
    /// A submitted message could not be delivered
    SendFailed { text: Option<String>, reason: String },
}
