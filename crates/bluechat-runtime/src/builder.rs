//! Runtime Builder API
//!
//! Wires the channels, spawns the session task and the radio, and hands the
//! caller a [`RuntimeHandle`] for commands and app events.

use bluechat_core::{BluechatError, BluechatResult, Command, SessionConfig};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::channel::{
    create_app_event_channel, create_command_channel, create_effect_channel,
    create_effect_receiver, create_event_channel, AppEventReceiver, CommandSender, RuntimeConfig,
};
use crate::radio::RadioTask;
use crate::task::SessionTask;

// ----------------------------------------------------------------------------
// Runtime Builder
// ----------------------------------------------------------------------------

pub struct RuntimeBuilder {
    session_config: SessionConfig,
    runtime_config: RuntimeConfig,
    radio: Option<Box<dyn RadioTask>>,
    start_immediately: bool,
}

impl RuntimeBuilder {
    pub fn new(session_config: SessionConfig) -> Self {
        Self {
            session_config,
            runtime_config: RuntimeConfig::default(),
            radio: None,
            start_immediately: false,
        }
    }

    /// Set channel buffer sizes
    pub fn with_runtime_config(mut self, config: RuntimeConfig) -> Self {
        self.runtime_config = config;
        self
    }

    /// Radio adapter to drive. One session owns exactly one radio.
    pub fn with_radio(mut self, radio: Box<dyn RadioTask>) -> Self {
        self.radio = Some(radio);
        self
    }

    /// Send [`Command::Start`] as soon as the runtime is up
    pub fn start_immediately(mut self, enabled: bool) -> Self {
        self.start_immediately = enabled;
        self
    }

    /// Build and start the runtime
    pub async fn build_and_start(self) -> BluechatResult<RuntimeHandle> {
        self.session_config.validate()?;
        self.runtime_config.validate()?;
        let mut radio = self
            .radio
            .ok_or_else(|| BluechatError::configuration("no radio registered"))?;

        info!("Building BlueChat runtime with {} radio", radio.name());

        let (command_sender, command_receiver) = create_command_channel(&self.runtime_config);
        let (event_sender, event_receiver) = create_event_channel(&self.runtime_config);
        let (effect_sender, _effect_receiver) = create_effect_channel(&self.runtime_config);
        let (app_event_sender, app_event_receiver) =
            create_app_event_channel(&self.runtime_config);
        let (shutdown_sender, shutdown_receiver) = watch::channel(false);

        radio.attach_channels(event_sender, create_effect_receiver(&effect_sender))?;
        let radio_handle = tokio::spawn(async move { radio.run().await });

        let mut task = SessionTask::new(
            self.session_config,
            command_receiver,
            event_receiver,
            effect_sender,
            app_event_sender,
            shutdown_receiver,
        );
        let session_handle = tokio::spawn(async move { task.run().await });

        let handle = RuntimeHandle {
            command_sender,
            app_event_receiver: Some(app_event_receiver),
            shutdown_sender,
            session_handle: Some(session_handle),
            radio_handle: Some(radio_handle),
        };

        if self.start_immediately {
            handle.send_command(Command::Start).await?;
        }

        info!("BlueChat runtime started");
        Ok(handle)
    }
}

// ----------------------------------------------------------------------------
// Runtime Handle
// ----------------------------------------------------------------------------

/// Handle to a running session
pub struct RuntimeHandle {
    command_sender: CommandSender,
    app_event_receiver: Option<AppEventReceiver>,
    shutdown_sender: watch::Sender<bool>,
    session_handle: Option<JoinHandle<BluechatResult<()>>>,
    radio_handle: Option<JoinHandle<BluechatResult<()>>>,
}

impl RuntimeHandle {
    pub fn command_sender(&self) -> CommandSender {
        self.command_sender.clone()
    }

    /// Take the app event receiver (can only be called once)
    pub fn take_app_event_receiver(&mut self) -> Option<AppEventReceiver> {
        self.app_event_receiver.take()
    }

    pub async fn send_command(&self, command: Command) -> BluechatResult<()> {
        self.command_sender
            .send(command)
            .await
            .map_err(|_| BluechatError::channel("session task is not running"))
    }

    pub fn is_running(&self) -> bool {
        self.session_handle
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }

    /// Stop the session, then the radio once it has executed the final `Stop`
    pub async fn shutdown(&mut self) -> BluechatResult<()> {
        info!("Shutting down BlueChat runtime");
        let _ = self.shutdown_sender.send(true);

        let result = match self.session_handle.take() {
            Some(handle) => handle
                .await
                .map_err(|e| BluechatError::channel(format!("session task panicked: {}", e)))
                .and_then(|r| r),
            None => Ok(()),
        };

        // The session task dropped the effect sender, so the radio drains and exits
        if let Some(handle) = self.radio_handle.take() {
            match handle.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!("Radio stopped with error: {}", e),
                Err(e) => warn!("Radio task panicked: {}", e),
            }
        }

        info!("BlueChat runtime stopped");
        result
    }
}

impl Drop for RuntimeHandle {
    fn drop(&mut self) {
        if let Some(handle) = self.radio_handle.take() {
            handle.abort();
        }
        if let Some(handle) = self.session_handle.take() {
            handle.abort();
        }
    }
}
