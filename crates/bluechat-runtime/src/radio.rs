//! Radio Task Trait Definition
//!
//! A radio task owns the platform BLE stack. It executes [`Effect`]s from the
//! session task and reports what the stack observes as [`Event`]s.
//!
//! [`Effect`]: bluechat_core::Effect
//! [`Event`]: bluechat_core::Event

use bluechat_core::BluechatResult;

use crate::channel::{EffectReceiver, EventSender};

/// Common interface for radio adapters
///
/// Each radio runs as its own tokio task. It holds no session state: it only
/// turns effects into stack calls and stack callbacks into events, in the order
/// the stack delivers them.
#[async_trait::async_trait]
pub trait RadioTask: Send + Sync {
    /// Store the channel handles created by the runtime
    fn attach_channels(
        &mut self,
        event_sender: EventSender,
        effect_receiver: EffectReceiver,
    ) -> BluechatResult<()>;

    /// Run until the effect channel closes or the runtime aborts the task
    async fn run(&mut self) -> BluechatResult<()>;

    /// Short label used in logs
    fn name(&self) -> &'static str;
}
