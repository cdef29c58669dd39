//! Session Transport
//!
//! The single live link of a session. Opened when the arbiter enters a
//! connected state and torn down exactly once when it leaves. Performs no
//! framing: each write is one frame, clipped to the link's single-write
//! capacity.

use tracing::{debug, warn};

use crate::channel::Effect;
use crate::errors::TransportError;
use crate::protocol::utf8_boundary;
use crate::types::{DeviceId, LinkRole, Timestamp};

// ----------------------------------------------------------------------------
// Link State
// ----------------------------------------------------------------------------

/// The link currently held by the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveLink {
    pub role: LinkRole,
    /// Remote device, known when we initiated as central
    pub peer: Option<DeviceId>,
    /// Handshake finished; writes are allowed
    pub ready: bool,
    pub opened_at: Timestamp,
}

/// One frame handed to the radio
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub bytes: Vec<u8>,
    /// Bytes dropped to fit the single-write capacity
    pub truncated: usize,
}

impl Delivery {
    pub fn into_effect(self) -> Effect {
        Effect::WriteBytes { bytes: self.bytes }
    }
}

// ----------------------------------------------------------------------------
// Transport
// ----------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SessionTransport {
    link: Option<ActiveLink>,
    max_frame_len: usize,
}

impl SessionTransport {
    pub fn new(max_frame_len: usize) -> Self {
        Self {
            link: None,
            max_frame_len,
        }
    }

    /// Acquire the link for a newly connected role.
    ///
    /// A stale link still held here would leak a radio handle, so it is
    /// released first and reported as a warning.
    pub fn open(&mut self, role: LinkRole, peer: Option<DeviceId>) {
        if let Some(stale) = self.link.take() {
            warn!("Opening {} link while a {} link was still held", role, stale.role);
        }
        debug!("Opened {} link (peer: {:?})", role, peer);
        self.link = Some(ActiveLink {
            role,
            peer,
            ready: false,
            opened_at: Timestamp::now(),
        });
    }

    /// Mark the handshake as finished. Returns false when there is no link.
    pub fn mark_ready(&mut self) -> bool {
        match self.link.as_mut() {
            Some(link) => {
                link.ready = true;
                true
            }
            None => false,
        }
    }

    pub fn link(&self) -> Option<&ActiveLink> {
        self.link.as_ref()
    }

    pub fn is_open(&self) -> bool {
        self.link.is_some()
    }

    pub fn is_ready(&self) -> bool {
        self.link.as_ref().is_some_and(|link| link.ready)
    }

    /// Hand one frame to the radio.
    ///
    /// Rejected outside a ready link. Oversized payloads are truncated to the
    /// largest UTF-8 boundary that fits, never reassembled on the far side.
    pub fn write(&mut self, mut bytes: Vec<u8>) -> Result<Delivery, TransportError> {
        let link = self.link.as_ref().ok_or(TransportError::NotConnected)?;
        if !link.ready {
            return Err(TransportError::LinkNotReady { role: link.role });
        }

        let original_len = bytes.len();
        bytes.truncate(utf8_boundary(&bytes, self.max_frame_len));
        let truncated = original_len - bytes.len();
        if truncated > 0 {
            warn!(
                "Frame of {} bytes truncated to {} bytes",
                original_len,
                bytes.len()
            );
        }

        Ok(Delivery { bytes, truncated })
    }

    /// Release the link. Idempotent: returns whether a link was actually held.
    pub fn teardown(&mut self) -> bool {
        match self.link.take() {
            Some(link) => {
                debug!("Tore down {} link", link.role);
                true
            }
            None => false,
        }
    }
}
