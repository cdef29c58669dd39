//! Channel plumbing between the session task, the radio and the UI
//!
//! - Command: UI → session (mpsc)
//! - Event: radio → session (mpsc)
//! - Effect: session → radio (broadcast)
//! - AppEvent: session → UI (mpsc)

use bluechat_core::{AppEvent, BluechatError, BluechatResult, Command, Effect, Event};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc};

pub type CommandSender = mpsc::Sender<Command>;
pub type CommandReceiver = mpsc::Receiver<Command>;
pub type EventSender = mpsc::Sender<Event>;
pub type EventReceiver = mpsc::Receiver<Event>;
pub type EffectSender = broadcast::Sender<Effect>;
pub type EffectReceiver = broadcast::Receiver<Effect>;
pub type AppEventSender = mpsc::Sender<AppEvent>;
pub type AppEventReceiver = mpsc::Receiver<AppEvent>;

// ----------------------------------------------------------------------------
// Channel Configuration
// ----------------------------------------------------------------------------

/// Buffer sizes for the runtime channels
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub command_buffer_size: usize,
    pub event_buffer_size: usize,
    pub effect_buffer_size: usize,
    pub app_event_buffer_size: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            command_buffer_size: 32,
            // Scans can report many advertisements in a burst
            event_buffer_size: 128,
            effect_buffer_size: 64,
            app_event_buffer_size: 64,
        }
    }
}

impl RuntimeConfig {
    pub fn with_command_buffer_size(mut self, size: usize) -> Self {
        self.command_buffer_size = size;
        self
    }

    pub fn with_event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = size;
        self
    }

    pub fn with_effect_buffer_size(mut self, size: usize) -> Self {
        self.effect_buffer_size = size;
        self
    }

    pub fn with_app_event_buffer_size(mut self, size: usize) -> Self {
        self.app_event_buffer_size = size;
        self
    }

    /// Every buffer must hold at least one item
    pub fn validate(&self) -> BluechatResult<()> {
        let sizes = [
            ("command", self.command_buffer_size),
            ("event", self.event_buffer_size),
            ("effect", self.effect_buffer_size),
            ("app_event", self.app_event_buffer_size),
        ];
        for (name, size) in sizes {
            if size == 0 {
                return Err(BluechatError::configuration(format!(
                    "{} buffer size must be greater than zero",
                    name
                )));
            }
        }
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Channel Creation Utilities
// ----------------------------------------------------------------------------

/// Create bounded command channel (UI → session)
pub fn create_command_channel(config: &RuntimeConfig) -> (CommandSender, CommandReceiver) {
    mpsc::channel(config.command_buffer_size)
}

/// Create bounded event channel (radio → session)
pub fn create_event_channel(config: &RuntimeConfig) -> (EventSender, EventReceiver) {
    mpsc::channel(config.event_buffer_size)
}

/// Create broadcast effect channel. Radios get their receiver through
/// [`create_effect_receiver`].
pub fn create_effect_channel(config: &RuntimeConfig) -> (EffectSender, EffectReceiver) {
    broadcast::channel(config.effect_buffer_size)
}

pub fn create_effect_receiver(effect_sender: &EffectSender) -> EffectReceiver {
    effect_sender.subscribe()
}

/// Create bounded app event channel (session → UI)
pub fn create_app_event_channel(config: &RuntimeConfig) -> (AppEventSender, AppEventReceiver) {
    mpsc::channel(config.app_event_buffer_size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(RuntimeConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_buffer_rejected() {
        let config = RuntimeConfig::default().with_effect_buffer_size(0);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("effect"));
    }

    #[tokio::test]
    async fn test_effects_reach_every_subscriber() {
        let config = RuntimeConfig::default();
        let (sender, _keepalive) = create_effect_channel(&config);
        let mut first = create_effect_receiver(&sender);
        let mut second = create_effect_receiver(&sender);

        sender.send(Effect::BeginScanning).unwrap();
        assert_eq!(first.recv().await.unwrap(), Effect::BeginScanning);
        assert_eq!(second.recv().await.unwrap(), Effect::BeginScanning);
    }
}
