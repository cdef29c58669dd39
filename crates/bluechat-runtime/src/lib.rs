//! BlueChat Runtime
//!
//! Drives a [`ChatSession`](bluechat_core::ChatSession) from a single tokio
//! task:
//! - `SessionTask`: the loop that owns the session
//! - `RadioTask`: the trait radio adapters implement
//! - `RuntimeBuilder` / `RuntimeHandle`: wiring and lifecycle
//! - `LoopbackAir`: an in-memory radio for tests and demos

pub mod builder;
pub mod channel;
pub mod loopback;
pub mod radio;
pub mod task;

pub use builder::{RuntimeBuilder, RuntimeHandle};
pub use channel::{
    create_app_event_channel, create_command_channel, create_effect_channel,
    create_effect_receiver, create_event_channel, AppEventReceiver, AppEventSender,
    CommandReceiver, CommandSender, EffectReceiver, EffectSender, EventReceiver, EventSender,
    RuntimeConfig,
};
pub use loopback::{LoopbackAir, LoopbackRadio};
pub use radio::RadioTask;
pub use task::{SessionTask, TaskStats};

// Re-export core types for convenience
pub use bluechat_core::{
    AppEvent, BluechatError, BluechatResult, Command, DeviceId, Effect, Event, Message,
    Provenance, SessionConfig, SessionRole,
};
