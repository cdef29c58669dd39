//! Role Arbiter
//!
//! Pure transition function deciding whether this endpoint scans, advertises
//! or holds a connected session, and which radio effects each change needs.
//!
//! Both endpoints start symmetric and scan. The first one asked to send before
//! a link exists becomes discoverable; the other, still scanning, finds it and
//! connects as central. No out-of-band negotiation is needed.
//!
//! | From | Trigger | To |
//! |---|---|---|
//! | `Idle` | start | `Scanning` |
//! | `Idle`, `Scanning` | send requested | `Advertising` |
//! | `Scanning` | wanted peer discovered | `ConnectedAsCentral` (link pending) |
//! | `Advertising` | subscriber attached | `ConnectedAsPeripheral` |
//! | connected | link lost, handshake failed, disconnect | `Scanning` |
//! | `Advertising` | advertising timed out | `Scanning` |
//! | not `Idle` | stop | `Idle` |
//!
//! Any other pair leaves the role unchanged and produces no effects.

use core::fmt;

use serde::{Deserialize, Serialize};
use smallvec::{smallvec, SmallVec};

use crate::channel::Effect;
use crate::types::{DeviceId, LinkRole};

// ----------------------------------------------------------------------------
// Session Role
// ----------------------------------------------------------------------------

/// The one active posture of an endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SessionRole {
    #[default]
    Idle,
    Scanning,
    Advertising,
    ConnectedAsCentral,
    ConnectedAsPeripheral,
}

impl SessionRole {
    /// Whether a session link is held in this role
    pub fn is_connected(self) -> bool {
        matches!(
            self,
            SessionRole::ConnectedAsCentral | SessionRole::ConnectedAsPeripheral
        )
    }

    /// Link-layer role backing a connected state
    pub fn link_role(self) -> Option<LinkRole> {
        match self {
            SessionRole::ConnectedAsCentral => Some(LinkRole::Central),
            SessionRole::ConnectedAsPeripheral => Some(LinkRole::Peripheral),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            SessionRole::Idle => "Idle",
            SessionRole::Scanning => "Scanning",
            SessionRole::Advertising => "Advertising",
            SessionRole::ConnectedAsCentral => "ConnectedAsCentral",
            SessionRole::ConnectedAsPeripheral => "ConnectedAsPeripheral",
        }
    }
}

impl fmt::Display for SessionRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ----------------------------------------------------------------------------
// Triggers and Transitions
// ----------------------------------------------------------------------------

/// Inputs that may move the arbiter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleTrigger {
    StartRequested,
    /// Something is waiting to be sent and no ready link exists
    SendRequested,
    /// A compatible advertiser was seen; `wanted` if it matches the connect intent
    PeerDiscovered { device: DeviceId, wanted: bool },
    LinkEstablished { role: LinkRole },
    SubscriberAttached,
    LinkLost,
    HandshakeFailed,
    DisconnectRequested,
    AdvertisingTimedOut,
    StopRequested,
}

/// Result of feeding one trigger to the arbiter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub from: SessionRole,
    pub to: SessionRole,
    /// Radio effects to execute, in order
    pub effects: SmallVec<[Effect; 2]>,
}

impl Transition {
    fn stay(role: SessionRole) -> Self {
        Self {
            from: role,
            to: role,
            effects: SmallVec::new(),
        }
    }

    fn move_to(from: SessionRole, to: SessionRole, effects: SmallVec<[Effect; 2]>) -> Self {
        Self { from, to, effects }
    }

    /// Whether the role changed
    pub fn is_change(&self) -> bool {
        self.from != self.to
    }

    /// Entered a connected state from a disconnected one
    pub fn acquires_link(&self) -> bool {
        !self.from.is_connected() && self.to.is_connected()
    }

    /// Left a connected state
    pub fn releases_link(&self) -> bool {
        self.from.is_connected() && !self.to.is_connected()
    }
}

// ----------------------------------------------------------------------------
// Arbiter
// ----------------------------------------------------------------------------

/// Owner of the role transition table
pub struct RoleArbiter;

impl RoleArbiter {
    /// Compute the next role for `trigger` in `current`
    pub fn transition(current: SessionRole, trigger: &RoleTrigger) -> Transition {
        use SessionRole::*;

        match (current, trigger) {
            (Idle, RoleTrigger::StartRequested) => {
                Transition::move_to(current, Scanning, smallvec![Effect::BeginScanning])
            }

            (Idle | Scanning, RoleTrigger::SendRequested) => {
                Transition::move_to(current, Advertising, smallvec![Effect::BeginAdvertising])
            }

            (Scanning, RoleTrigger::PeerDiscovered { device, wanted: true }) => {
                Transition::move_to(
                    current,
                    ConnectedAsCentral,
                    smallvec![Effect::ConnectTo {
                        device: device.clone()
                    }],
                )
            }

            (Advertising, RoleTrigger::SubscriberAttached) => {
                Transition::move_to(current, ConnectedAsPeripheral, SmallVec::new())
            }

            (
                ConnectedAsCentral | ConnectedAsPeripheral,
                RoleTrigger::LinkLost | RoleTrigger::HandshakeFailed | RoleTrigger::DisconnectRequested,
            ) => Transition::move_to(
                current,
                Scanning,
                smallvec![Effect::ReleaseLink, Effect::BeginScanning],
            ),

            (Advertising, RoleTrigger::AdvertisingTimedOut) => {
                Transition::move_to(current, Scanning, smallvec![Effect::BeginScanning])
            }

            (Scanning | Advertising | ConnectedAsCentral | ConnectedAsPeripheral, RoleTrigger::StopRequested) => {
                Transition::move_to(current, Idle, smallvec![Effect::Stop])
            }

            _ => Transition::stay(current),
        }
    }
}
