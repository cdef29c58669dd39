//! BlueChat Core
//!
//! The platform-independent half of a two-party BLE chat: device discovery
//! bookkeeping, the role arbiter that decides whether this endpoint scans or
//! advertises, the session transport and the message pipeline. Everything here
//! is synchronous and free of I/O; radios talk to it through the message types
//! in [`channel`].

// ----------------------------------------------------------------------------
// Module Declarations
// ----------------------------------------------------------------------------

pub mod arbiter;
pub mod channel;
pub mod config;
pub mod directory;
pub mod dispatcher;
pub mod errors;
pub mod pipeline;
pub mod protocol;
pub mod transport;
pub mod types;

// ----------------------------------------------------------------------------
// Public API
// ----------------------------------------------------------------------------

pub use arbiter::{RoleArbiter, RoleTrigger, SessionRole, Transition};
pub use channel::{AppEvent, Command, Effect, Event};
pub use config::SessionConfig;
pub use directory::{DeviceDirectory, DirectoryUpdate};
pub use dispatcher::{ChatSession, Reaction, SessionStats};
pub use errors::{BluechatError, BluechatResult, SessionError, TransportError};
pub use pipeline::{MessagePipeline, PendingSendBuffer, SubmitOutcome};
pub use protocol::{
    DISCOVERY_SERVICE_UUID, MAX_ATTRIBUTE_LEN, MESSAGE_CHARACTERISTIC_UUID,
    SESSION_CHARACTERISTIC_UUID,
};
pub use transport::{ActiveLink, Delivery, SessionTransport};
pub use types::{Device, DeviceId, LinkRole, Message, Provenance, Timestamp};
