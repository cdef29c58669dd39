//! Error types for the BlueChat core
//!
//! Nothing in the core is fatal: transport and session errors are reported to
//! the caller and the session recovers by returning to scanning.

use thiserror::Error;

use crate::arbiter::SessionRole;
use crate::types::LinkRole;

// ----------------------------------------------------------------------------
// Specific Error Types
// ----------------------------------------------------------------------------

/// Failures of the single session transport
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("No session link is open")]
    NotConnected,
    #[error("Session link as {role} is not ready for writes")]
    LinkNotReady { role: LinkRole },
    #[error("Write failed: {reason}")]
    WriteFailed { reason: String },
    #[error("Radio unavailable: {reason}")]
    RadioUnavailable { reason: String },
}

/// Failures of the session state machine itself
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("Session handshake failed: {reason}")]
    HandshakeFailed { reason: String },
    #[error("Invalid session state: expected {expected}, got {actual}")]
    InvalidState {
        expected: &'static str,
        actual: SessionRole,
    },
}

// ----------------------------------------------------------------------------
// Main Error Type
// ----------------------------------------------------------------------------

/// Unified error type for the BlueChat core
#[derive(Debug, Error)]
pub enum BluechatError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Configuration error: {reason}")]
    Configuration { reason: String },

    #[error("Channel error: {reason}")]
    Channel { reason: String },
}

impl BluechatError {
    /// Create a configuration error
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    /// Create a channel error
    pub fn channel(reason: impl Into<String>) -> Self {
        Self::Channel {
            reason: reason.into(),
        }
    }

    /// Whether this error is a write to a link that is gone or not ready
    pub fn is_write_failure(&self) -> bool {
        matches!(
            self,
            Self::Transport(
                TransportError::NotConnected
                    | TransportError::LinkNotReady { .. }
                    | TransportError::WriteFailed { .. }
            )
        )
    }
}

/// Result type alias for BlueChat operations
pub type BluechatResult<T> = core::result::Result<T, BluechatError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_failure_classification() {
        let err: BluechatError = TransportError::NotConnected.into();
        assert!(err.is_write_failure());

        let err = BluechatError::configuration("bad frame length");
        assert!(!err.is_write_failure());
        assert_eq!(err.to_string(), "Configuration error: bad frame length");
    }

    #[test]
    fn test_invalid_state_message() {
        let err = SessionError::InvalidState {
            expected: "not connected",
            actual: SessionRole::ConnectedAsCentral,
        };
        assert_eq!(
            err.to_string(),
            "Invalid session state: expected not connected, got ConnectedAsCentral"
        );
    }
}
