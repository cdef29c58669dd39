//! Event Dispatcher
//!
//! [`ChatSession`] is the explicitly owned state machine of one endpoint. It
//! adapts [`Command`]s from the UI and [`Event`]s from the radio into calls on
//! the directory, arbiter, transport and pipeline, and answers each with a
//! [`Reaction`]: radio effects to run and app events to publish, in order.
//!
//! The session does no I/O and takes no locks; callers must serialize access
//! (the runtime crate does so with a single task).

use tracing::{debug, info, warn};

use crate::arbiter::{RoleArbiter, RoleTrigger, SessionRole, Transition};
use crate::channel::{AppEvent, Command, Effect, Event};
use crate::config::SessionConfig;
use crate::directory::DeviceDirectory;
use crate::errors::{BluechatResult, SessionError};
use crate::pipeline::{MessagePipeline, SubmitOutcome};
use crate::transport::{Delivery, SessionTransport};
use crate::types::{DeviceId, LinkRole, Message};

// ----------------------------------------------------------------------------
// Reaction
// ----------------------------------------------------------------------------

/// Output of one dispatch step
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reaction {
    pub effects: Vec<Effect>,
    pub app_events: Vec<AppEvent>,
}

impl Reaction {
    pub fn is_empty(&self) -> bool {
        self.effects.is_empty() && self.app_events.is_empty()
    }

    /// Messages published in this step
    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        self.app_events.iter().filter_map(|event| match event {
            AppEvent::MessagePublished(message) => Some(message),
            _ => None,
        })
    }

    fn publish(&mut self, message: Message) {
        self.app_events.push(AppEvent::MessagePublished(message));
    }
}

/// Counters kept by the session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub transitions: u64,
    pub links_opened: u64,
    pub teardowns: u64,
    pub frames_sent: u64,
    pub frames_failed: u64,
    pub frames_received: u64,
    pub frames_truncated: u64,
    pub pending_overwritten: u64,
}

// ----------------------------------------------------------------------------
// Chat Session
// ----------------------------------------------------------------------------

pub struct ChatSession {
    config: SessionConfig,
    role: SessionRole,
    /// Device explicitly chosen by the user, if any
    target: Option<DeviceId>,
    directory: DeviceDirectory,
    transport: SessionTransport,
    pipeline: MessagePipeline,
    stats: SessionStats,
}

impl ChatSession {
    pub fn new(config: SessionConfig) -> Self {
        let transport = SessionTransport::new(config.max_frame_len);
        Self {
            config,
            role: SessionRole::Idle,
            target: None,
            directory: DeviceDirectory::new(),
            transport,
            pipeline: MessagePipeline::new(),
            stats: SessionStats::default(),
        }
    }

    pub fn role(&self) -> SessionRole {
        self.role
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn directory(&self) -> &DeviceDirectory {
        &self.directory
    }

    pub fn transport(&self) -> &SessionTransport {
        &self.transport
    }

    pub fn target(&self) -> Option<&DeviceId> {
        self.target.as_ref()
    }

    /// Text waiting for a link, if any
    pub fn pending_text(&self) -> Option<&str> {
        self.pipeline.pending().peek()
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    // ------------------------------------------------------------------------
    // Entry points
    // ------------------------------------------------------------------------

    /// Apply a command from the UI collaborator
    pub fn execute(&mut self, command: Command) -> BluechatResult<Reaction> {
        match command {
            Command::Start => Ok(self.start()),
            Command::Submit { text } => self.submit(text),
            Command::ConnectTo { device } => self.connect_to(device),
            Command::Disconnect => Ok(self.teardown()),
            Command::Stop => Ok(self.stop()),
        }
    }

    /// Apply one radio event
    pub fn handle(&mut self, event: Event) -> Reaction {
        debug!("Handling {} in {}", event.name(), self.role);
        match event {
            Event::DeviceDiscovered { device, name } => self.on_device_discovered(device, name),
            Event::LinkEstablished { role } => self.on_link_established(role),
            Event::SubscriberAttached => self.on_subscriber_attached(),
            Event::DataReceived { bytes } => self.on_data_received(&bytes),
            Event::LinkLost { reason } => {
                info!("Link lost: {}", reason);
                self.reset(RoleTrigger::LinkLost)
            }
            Event::HandshakeFailed { reason } => {
                warn!("Handshake failed: {}", reason);
                self.reset(RoleTrigger::HandshakeFailed)
            }
            Event::WriteFailed { bytes, reason } => self.on_write_failed(&bytes, reason),
            Event::RadioUnavailable { reason } => {
                // Passive: we simply never find peers until the radio returns
                warn!("Radio unavailable: {}", reason);
                Reaction::default()
            }
            Event::AdvertisingTimedOut => {
                let mut reaction = Reaction::default();
                self.apply(&RoleTrigger::AdvertisingTimedOut, &mut reaction);
                reaction
            }
        }
    }

    // ------------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------------

    /// Leave `Idle` and start listening. A fresh cycle clears the directory.
    pub fn start(&mut self) -> Reaction {
        let mut reaction = Reaction::default();
        if self.apply(&RoleTrigger::StartRequested, &mut reaction).is_change() && !self.directory.is_empty() {
            self.directory.clear();
            reaction
                .app_events
                .push(AppEvent::DeviceListChanged(Vec::new()));
        }
        reaction
    }

    /// Send text now, or buffer it and ask the arbiter for a session
    pub fn submit(&mut self, text: String) -> BluechatResult<Reaction> {
        let mut reaction = Reaction::default();
        match self.pipeline.submit(text, &mut self.transport)? {
            SubmitOutcome::Sent { delivery, message } => {
                self.record_delivery(delivery, message, &mut reaction);
            }
            SubmitOutcome::Buffered { overwritten } => {
                if overwritten.is_some() {
                    self.stats.pending_overwritten += 1;
                }
                self.apply(&RoleTrigger::SendRequested, &mut reaction);
            }
        }
        Ok(reaction)
    }

    /// Restrict connecting to one specific device
    pub fn connect_to(&mut self, device: DeviceId) -> BluechatResult<Reaction> {
        if self.role.is_connected() {
            return Err(SessionError::InvalidState {
                expected: "not connected",
                actual: self.role,
            }
            .into());
        }
        info!("Chat target set to {}", device);
        self.target = Some(device.clone());

        // Already seen: connect straight away if we are scanning
        let mut reaction = Reaction::default();
        if self.directory.contains(&device) {
            self.apply(
                &RoleTrigger::PeerDiscovered {
                    device,
                    wanted: true,
                },
                &mut reaction,
            );
        }
        Ok(reaction)
    }

    /// Drop the current link and resume scanning. A no-op without a link.
    pub fn teardown(&mut self) -> Reaction {
        self.reset(RoleTrigger::DisconnectRequested)
    }

    /// End the chat session: back to `Idle`, pending text and target dropped
    pub fn stop(&mut self) -> Reaction {
        let mut reaction = Reaction::default();
        if self.apply(&RoleTrigger::StopRequested, &mut reaction).is_change() {
            if let Some(text) = self.pipeline.pending().peek() {
                debug!("Dropping unsent message {:?} on stop", text);
            }
            self.pipeline.clear();
            self.target = None;
        }
        reaction
    }

    // ------------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------------

    fn on_device_discovered(&mut self, device: DeviceId, name: Option<String>) -> Reaction {
        let mut reaction = Reaction::default();
        if self.directory.record(device.clone(), name).is_changed() {
            reaction
                .app_events
                .push(AppEvent::DeviceListChanged(self.directory.all().to_vec()));
        }

        let wanted = match &self.target {
            Some(target) => *target == device,
            None => self.config.auto_connect,
        };
        self.apply(&RoleTrigger::PeerDiscovered { device, wanted }, &mut reaction);
        reaction
    }

    fn on_link_established(&mut self, role: LinkRole) -> Reaction {
        let mut reaction = Reaction::default();
        self.apply(&RoleTrigger::LinkEstablished { role }, &mut reaction);

        // Only the central waits on a handshake; the peripheral is ready on subscription
        if self.role.link_role() == Some(role) && !self.transport.is_ready() {
            self.transport.mark_ready();
            info!("Session ready as {}", role);
            self.flush_pending(&mut reaction);
        } else {
            debug!("Ignoring {} link established in {}", role, self.role);
        }
        reaction
    }

    fn on_subscriber_attached(&mut self) -> Reaction {
        let mut reaction = Reaction::default();
        if self.apply(&RoleTrigger::SubscriberAttached, &mut reaction).is_change() {
            self.transport.mark_ready();
            info!("Session ready as peripheral");
            self.flush_pending(&mut reaction);
        } else if matches!(self.role, SessionRole::Idle | SessionRole::Scanning) {
            // The radio already accepted this central; do not leave it holding a link
            warn!("Releasing subscriber that arrived in {}", self.role);
            reaction.effects.push(Effect::ReleaseLink);
        } else {
            debug!("Ignoring subscriber in {}", self.role);
        }
        reaction
    }

    fn on_data_received(&mut self, bytes: &[u8]) -> Reaction {
        let mut reaction = Reaction::default();
        if !self.transport.is_open() {
            warn!("Dropping {} byte frame received without a link", bytes.len());
            return reaction;
        }
        self.stats.frames_received += 1;
        reaction.publish(self.pipeline.on_bytes_received(bytes));
        reaction
    }

    /// The echo is already out; hand the text back so the UI can re-queue it
    fn on_write_failed(&mut self, bytes: &[u8], reason: String) -> Reaction {
        warn!("Radio could not deliver a {} byte frame: {}", bytes.len(), reason);
        self.stats.frames_failed += 1;
        let text = String::from_utf8_lossy(bytes).into_owned();
        Reaction {
            effects: Vec::new(),
            app_events: vec![AppEvent::SendFailed {
                text: Some(text),
                reason,
            }],
        }
    }

    // ------------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------------

    fn reset(&mut self, trigger: RoleTrigger) -> Reaction {
        let mut reaction = Reaction::default();
        self.apply(&trigger, &mut reaction);
        reaction
    }

    /// Run the arbiter and keep the transport in step: a link is acquired on
    /// every entry into a connected state and released on every exit.
    fn apply(&mut self, trigger: &RoleTrigger, reaction: &mut Reaction) -> Transition {
        let transition = RoleArbiter::transition(self.role, trigger);
        if !transition.is_change() {
            return transition;
        }

        if transition.releases_link() && self.transport.teardown() {
            self.stats.teardowns += 1;
        }
        if transition.acquires_link() {
            let peer = match trigger {
                RoleTrigger::PeerDiscovered { device, .. } => Some(device.clone()),
                _ => None,
            };
            if let Some(role) = transition.to.link_role() {
                self.transport.open(role, peer);
                self.stats.links_opened += 1;
            }
        }

        info!("Role {} -> {}", transition.from, transition.to);
        self.role = transition.to;
        self.stats.transitions += 1;
        reaction.effects.extend(transition.effects.iter().cloned());
        reaction.app_events.push(AppEvent::RoleChanged {
            from: transition.from,
            to: transition.to,
        });
        transition
    }

    fn flush_pending(&mut self, reaction: &mut Reaction) {
        match self.pipeline.on_transport_ready(&mut self.transport) {
            Ok(Some((delivery, message))) => self.record_delivery(delivery, message, reaction),
            Ok(None) => {}
            Err(e) => {
                warn!("Could not flush pending message: {}", e);
                reaction.app_events.push(AppEvent::SendFailed {
                    text: self.pipeline.pending().peek().map(str::to_owned),
                    reason: e.to_string(),
                });
            }
        }
    }

    fn record_delivery(&mut self, delivery: Delivery, message: Message, reaction: &mut Reaction) {
        self.stats.frames_sent += 1;
        if delivery.truncated > 0 {
            self.stats.frames_truncated += 1;
        }
        reaction.effects.push(delivery.into_effect());
        reaction.publish(message);
    }
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}
