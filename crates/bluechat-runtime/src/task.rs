//! Session Task Implementation
//!
//! The only owner of the [`ChatSession`]. Commands, radio events and the
//! advertising deadline are multiplexed onto one loop, so every state change
//! happens on a single task.

use bluechat_core::{
    AppEvent, BluechatError, BluechatResult, ChatSession, Command, Effect, Event, Reaction,
    SessionConfig, SessionRole,
};
use tokio::sync::watch;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, error, info, warn};

use crate::channel::{AppEventSender, CommandReceiver, EffectSender, EventReceiver};

/// Counters for the task loop, alongside the session's own stats
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskStats {
    pub commands_processed: u64,
    pub events_processed: u64,
    pub effects_sent: u64,
    pub app_events_sent: u64,
    pub app_events_dropped: u64,
    pub advertising_timeouts: u64,
}

// ----------------------------------------------------------------------------
// Session Task
// ----------------------------------------------------------------------------

pub struct SessionTask {
    session: ChatSession,
    command_receiver: CommandReceiver,
    event_receiver: EventReceiver,
    effect_sender: EffectSender,
    app_event_sender: AppEventSender,
    shutdown: watch::Receiver<bool>,
    /// Set while advertising with a configured timeout
    advertise_deadline: Option<Instant>,
    stats: TaskStats,
    running: bool,
}

impl SessionTask {
    pub fn new(
        config: SessionConfig,
        command_receiver: CommandReceiver,
        event_receiver: EventReceiver,
        effect_sender: EffectSender,
        app_event_sender: AppEventSender,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            session: ChatSession::new(config),
            command_receiver,
            event_receiver,
            effect_sender,
            app_event_sender,
            shutdown,
            advertise_deadline: None,
            stats: TaskStats::default(),
            running: true,
        }
    }

    pub fn session(&self) -> &ChatSession {
        &self.session
    }

    pub fn stats(&self) -> &TaskStats {
        &self.stats
    }

    /// Run until shutdown is signalled or the command channel closes
    pub async fn run(&mut self) -> BluechatResult<()> {
        info!("Session task starting");
        let mut events_open = true;

        while self.running {
            let deadline = self.advertise_deadline;
            tokio::select! {
                command = self.command_receiver.recv() => {
                    match command {
                        Some(cmd) => {
                            if let Err(e) = self.process_command(cmd).await {
                                error!("Unrecoverable error processing command, stopping session task: {}", e);
                                self.running = false;
                            }
                        }
                        None => {
                            info!("Command channel closed, shutting down");
                            break;
                        }
                    }
                }

                event = self.event_receiver.recv(), if events_open => {
                    match event {
                        Some(evt) => {
                            if let Err(e) = self.process_event(evt).await {
                                error!("Unrecoverable error processing event, stopping session task: {}", e);
                                self.running = false;
                            }
                        }
                        None => {
                            // No radio left; commands are still served
                            info!("Event channel closed");
                            events_open = false;
                        }
                    }
                }

                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    info!("No central subscribed before the advertising deadline");
                    self.stats.advertising_timeouts += 1;
                    self.advertise_deadline = None;
                    if let Err(e) = self.process_event(Event::AdvertisingTimedOut).await {
                        error!("Unrecoverable error after advertising timeout: {}", e);
                        self.running = false;
                    }
                }

                _ = self.shutdown.changed() => {
                    info!("Shutdown requested");
                    break;
                }
            }
        }

        // Leave the radio quiet
        let reaction = self.session.stop();
        if let Err(e) = self.dispatch(reaction).await {
            debug!("Radio already gone at shutdown: {}", e);
        }

        info!("Session task stopped");
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Processing
    // ------------------------------------------------------------------------

    async fn process_command(&mut self, command: Command) -> BluechatResult<()> {
        self.stats.commands_processed += 1;
        debug!("Command: {:?}", command);

        let submitted = match &command {
            Command::Submit { text } => Some(text.clone()),
            _ => None,
        };

        let reaction = match self.session.execute(command) {
            Ok(reaction) => reaction,
            Err(e) if e.is_write_failure() => {
                warn!("Send failed: {}", e);
                Reaction {
                    effects: Vec::new(),
                    app_events: vec![AppEvent::SendFailed {
                        text: submitted,
                        reason: e.to_string(),
                    }],
                }
            }
            Err(e @ (BluechatError::Session(_) | BluechatError::Transport(_))) => {
                warn!("Command rejected: {}", e);
                Reaction::default()
            }
            Err(e) => return Err(e),
        };

        self.dispatch(reaction).await
    }

    async fn process_event(&mut self, event: Event) -> BluechatResult<()> {
        self.stats.events_processed += 1;
        let reaction = self.session.handle(event);
        self.dispatch(reaction).await
    }

    async fn dispatch(&mut self, reaction: Reaction) -> BluechatResult<()> {
        for effect in reaction.effects {
            self.send_effect(effect)?;
        }
        for app_event in reaction.app_events {
            self.send_app_event(app_event).await;
        }
        self.update_deadline();
        Ok(())
    }

    fn send_effect(&mut self, effect: Effect) -> BluechatResult<()> {
        debug!("Effect: {:?}", effect);
        self.effect_sender
            .send(effect)
            .map_err(|_| BluechatError::channel("no radio is listening for effects"))?;
        self.stats.effects_sent += 1;
        Ok(())
    }

    async fn send_app_event(&mut self, app_event: AppEvent) {
        // A detached UI must not stop the radio side
        if self.app_event_sender.send(app_event).await.is_err() {
            self.stats.app_events_dropped += 1;
            debug!("App event receiver dropped");
        } else {
            self.stats.app_events_sent += 1;
        }
    }

    fn update_deadline(&mut self) {
        if self.session.role() != SessionRole::Advertising {
            self.advertise_deadline = None;
            return;
        }
        if self.advertise_deadline.is_none() {
            if let Some(timeout) = self.session.config().advertise_timeout {
                self.advertise_deadline = Some(Instant::now() + timeout);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::*;
    use std::time::Duration;
    use tokio::time::timeout;

    struct Harness {
        commands: CommandSender,
        events: EventSender,
        effects: EffectReceiver,
        app_events: AppEventReceiver,
        shutdown: watch::Sender<bool>,
        task: tokio::task::JoinHandle<BluechatResult<()>>,
    }

    fn spawn(config: SessionConfig) -> Harness {
        let channels = RuntimeConfig::default();
        let (commands, command_receiver) = create_command_channel(&channels);
        let (events, event_receiver) = create_event_channel(&channels);
        let (effect_sender, effects) = create_effect_channel(&channels);
        let (app_event_sender, app_events) = create_app_event_channel(&channels);
        let (shutdown, shutdown_receiver) = watch::channel(false);

        let mut task = SessionTask::new(
            config,
            command_receiver,
            event_receiver,
            effect_sender,
            app_event_sender,
            shutdown_receiver,
        );
        let task = tokio::spawn(async move { task.run().await });
        Harness {
            commands,
            events,
            effects,
            app_events,
            shutdown,
            task,
        }
    }

    async fn next_effect(effects: &mut EffectReceiver) -> Effect {
        timeout(Duration::from_secs(1), effects.recv())
            .await
            .expect("effect within timeout")
            .expect("effect channel open")
    }

    #[tokio::test]
    async fn test_start_emits_begin_scanning() {
        let mut h = spawn(SessionConfig::default());
        h.commands.send(Command::Start).await.unwrap();
        assert_eq!(next_effect(&mut h.effects).await, Effect::BeginScanning);

        let event = timeout(Duration::from_secs(1), h.app_events.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            event,
            AppEvent::RoleChanged {
                from: SessionRole::Idle,
                to: SessionRole::Scanning
            }
        );
    }

    #[tokio::test]
    async fn test_advertising_deadline_falls_back_to_scanning() {
        let config = SessionConfig::new().with_advertise_timeout(Some(Duration::from_millis(20)));
        let mut h = spawn(config);
        h.commands.send(Command::Start).await.unwrap();
        h.commands
            .send(Command::Submit { text: "hi".into() })
            .await
            .unwrap();

        assert_eq!(next_effect(&mut h.effects).await, Effect::BeginScanning);
        assert_eq!(next_effect(&mut h.effects).await, Effect::BeginAdvertising);
        assert_eq!(next_effect(&mut h.effects).await, Effect::BeginScanning);
    }

    #[tokio::test]
    async fn test_shutdown_stops_radio_and_task() {
        let mut h = spawn(SessionConfig::default());
        h.commands.send(Command::Start).await.unwrap();
        assert_eq!(next_effect(&mut h.effects).await, Effect::BeginScanning);

        h.shutdown.send(true).unwrap();
        assert_eq!(next_effect(&mut h.effects).await, Effect::Stop);
        assert!(h.task.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_events_are_applied_in_order() {
        let mut h = spawn(SessionConfig::default());
        h.commands.send(Command::Start).await.unwrap();
        // Commands and events travel on separate channels; order them by hand
        assert_eq!(next_effect(&mut h.effects).await, Effect::BeginScanning);

        h.events
            .send(Event::DeviceDiscovered {
                device: "peer".into(),
                name: Some("Pixel".into()),
            })
            .await
            .unwrap();
        h.events
            .send(Event::LinkEstablished {
                role: bluechat_core::LinkRole::Central,
            })
            .await
            .unwrap();
        h.events
            .send(Event::DataReceived {
                bytes: b"hey".to_vec(),
            })
            .await
            .unwrap();

        assert_eq!(
            next_effect(&mut h.effects).await,
            Effect::ConnectTo {
                device: "peer".into()
            }
        );

        let mut published = None;
        while published.is_none() {
            let event = timeout(Duration::from_secs(1), h.app_events.recv())
                .await
                .unwrap()
                .unwrap();
            if let AppEvent::MessagePublished(message) = event {
                published = Some(message);
            }
        }
        assert_eq!(published.unwrap().text(), "hey");
    }
}
