//! In-memory radio
//!
//! [`LoopbackAir`] is a shared medium that any number of [`LoopbackRadio`]s
//! attach to. It models just enough of BLE for the session state machine: a
//! scanner sees every advertiser, a connect succeeds only against an
//! advertising endpoint, and a link carries frames both ways until either side
//! releases it.

use std::sync::Arc;

use bluechat_core::{BluechatError, BluechatResult, DeviceId, Effect, Event, LinkRole};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

use crate::channel::{EffectReceiver, EventSender};
use crate::radio::RadioTask;

#[derive(Debug)]
struct Endpoint {
    id: DeviceId,
    name: String,
    scanning: bool,
    advertising: bool,
    link: Option<usize>,
    events: Option<EventSender>,
}

#[derive(Debug, Default)]
struct AirState {
    endpoints: Vec<Endpoint>,
}

type Outbox = Vec<(EventSender, Event)>;

impl AirState {
    fn position(&self, id: &DeviceId) -> Option<usize> {
        self.endpoints.iter().position(|e| &e.id == id)
    }

    fn post(&self, outbox: &mut Outbox, index: usize, event: Event) {
        match &self.endpoints[index].events {
            Some(sender) => outbox.push((sender.clone(), event)),
            None => debug!("{} has no channels attached; dropping {}", self.endpoints[index].id, event.name()),
        }
    }

    fn announce(&self, outbox: &mut Outbox, scanner: usize, advertiser: usize) {
        let device = &self.endpoints[advertiser];
        self.post(
            outbox,
            scanner,
            Event::DeviceDiscovered {
                device: device.id.clone(),
                name: Some(device.name.clone()),
            },
        );
    }

    fn release(&mut self, outbox: &mut Outbox, index: usize, reason: &str) {
        if let Some(peer) = self.endpoints[index].link.take() {
            self.endpoints[peer].link = None;
            self.post(
                outbox,
                peer,
                Event::LinkLost {
                    reason: reason.to_string(),
                },
            );
        }
    }

    fn apply(&mut self, index: usize, effect: Effect) -> Outbox {
        let mut outbox = Outbox::new();
        match effect {
            Effect::BeginScanning => {
                let me = &mut self.endpoints[index];
                me.scanning = true;
                me.advertising = false;
                for other in 0..self.endpoints.len() {
                    let e = &self.endpoints[other];
                    if other != index && e.advertising && e.link.is_none() {
                        self.announce(&mut outbox, index, other);
                    }
                }
            }
            Effect::BeginAdvertising => {
                let me = &mut self.endpoints[index];
                me.advertising = true;
                me.scanning = false;
                for other in 0..self.endpoints.len() {
                    if other != index && self.endpoints[other].scanning {
                        self.announce(&mut outbox, other, index);
                    }
                }
            }
            Effect::ConnectTo { device } => {
                self.endpoints[index].scanning = false;
                match self.position(&device) {
                    Some(peer) if self.endpoints[peer].advertising && self.endpoints[peer].link.is_none() => {
                        self.endpoints[peer].advertising = false;
                        self.endpoints[peer].link = Some(index);
                        self.endpoints[index].link = Some(peer);
                        self.post(
                            &mut outbox,
                            index,
                            Event::LinkEstablished {
                                role: LinkRole::Central,
                            },
                        );
                        self.post(&mut outbox, peer, Event::SubscriberAttached);
                    }
                    _ => self.post(
                        &mut outbox,
                        index,
                        Event::HandshakeFailed {
                            reason: format!("{} is not accepting connections", device),
                        },
                    ),
                }
            }
            Effect::WriteBytes { bytes } => match self.endpoints[index].link {
                Some(peer) => self.post(&mut outbox, peer, Event::DataReceived { bytes }),
                None => self.post(
                    &mut outbox,
                    index,
                    Event::WriteFailed {
                        bytes,
                        reason: "no link".to_string(),
                    },
                ),
            },
            Effect::ReleaseLink => self.release(&mut outbox, index, "remote released the link"),
            Effect::Stop => {
                let me = &mut self.endpoints[index];
                me.scanning = false;
                me.advertising = false;
                self.release(&mut outbox, index, "remote stopped");
            }
        }
        outbox
    }
}

// ----------------------------------------------------------------------------
// Loopback Air
// ----------------------------------------------------------------------------

/// Shared in-memory medium
#[derive(Clone, Default)]
pub struct LoopbackAir {
    state: Arc<Mutex<AirState>>,
}

impl LoopbackAir {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new endpoint and return its radio
    pub async fn radio(&self, id: impl Into<DeviceId>, name: impl Into<String>) -> LoopbackRadio {
        let id = id.into();
        let mut state = self.state.lock().await;
        let index = state.endpoints.len();
        state.endpoints.push(Endpoint {
            id: id.clone(),
            name: name.into(),
            scanning: false,
            advertising: false,
            link: None,
            events: None,
        });
        LoopbackRadio {
            index,
            id,
            air: self.clone(),
            event_sender: None,
            effect_receiver: None,
        }
    }

    /// Drop the link held by `id` as if the peers went out of range.
    /// Both sides observe `LinkLost`.
    pub async fn sever(&self, id: &DeviceId) -> bool {
        let outbox = {
            let mut state = self.state.lock().await;
            let Some(index) = state.position(id) else {
                return false;
            };
            let Some(peer) = state.endpoints[index].link else {
                return false;
            };
            let mut outbox = Outbox::new();
            state.release(&mut outbox, index, "out of range");
            state.post(
                &mut outbox,
                index,
                Event::LinkLost {
                    reason: "out of range".to_string(),
                },
            );
            debug!("Severed link between {} and endpoint {}", id, peer);
            outbox
        };
        deliver(outbox).await;
        true
    }

    /// Report the radio of `id` as switched off
    pub async fn power_off(&self, id: &DeviceId) -> bool {
        let outbox = {
            let mut state = self.state.lock().await;
            let Some(index) = state.position(id) else {
                return false;
            };
            let mut outbox = Outbox::new();
            state.endpoints[index].scanning = false;
            state.endpoints[index].advertising = false;
            state.release(&mut outbox, index, "remote radio off");
            state.post(
                &mut outbox,
                index,
                Event::RadioUnavailable {
                    reason: "powered off".to_string(),
                },
            );
            outbox
        };
        deliver(outbox).await;
        true
    }

    /// Whether `id` currently holds a link
    pub async fn is_linked(&self, id: &DeviceId) -> bool {
        let state = self.state.lock().await;
        state
            .position(id)
            .is_some_and(|index| state.endpoints[index].link.is_some())
    }

    async fn apply(&self, index: usize, effect: Effect) {
        let outbox = self.state.lock().await.apply(index, effect);
        deliver(outbox).await;
    }

    async fn attach(&self, index: usize, events: EventSender) {
        self.state.lock().await.endpoints[index].events = Some(events);
    }
}

async fn deliver(outbox: Outbox) {
    for (sender, event) in outbox {
        if sender.send(event).await.is_err() {
            debug!("Endpoint session gone; event dropped");
        }
    }
}

// ----------------------------------------------------------------------------
// Loopback Radio
// ----------------------------------------------------------------------------

pub struct LoopbackRadio {
    index: usize,
    id: DeviceId,
    air: LoopbackAir,
    event_sender: Option<EventSender>,
    effect_receiver: Option<EffectReceiver>,
}

impl LoopbackRadio {
    pub fn id(&self) -> &DeviceId {
        &self.id
    }
}

#[async_trait::async_trait]
impl RadioTask for LoopbackRadio {
    fn attach_channels(
        &mut self,
        event_sender: EventSender,
        effect_receiver: EffectReceiver,
    ) -> BluechatResult<()> {
        self.event_sender = Some(event_sender);
        self.effect_receiver = Some(effect_receiver);
        Ok(())
    }

    async fn run(&mut self) -> BluechatResult<()> {
        let mut effects = self
            .effect_receiver
            .take()
            .ok_or_else(|| BluechatError::channel("loopback radio run before attach_channels"))?;
        if let Some(events) = self.event_sender.take() {
            self.air.attach(self.index, events).await;
        }
        info!("Loopback radio {} up", self.id);

        loop {
            match effects.recv().await {
                Ok(effect) => {
                    debug!("{} executing {:?}", self.id, effect);
                    self.air.apply(self.index, effect).await;
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Loopback radio {} skipped {} effects", self.id, skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }

        info!("Loopback radio {} down", self.id);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "loopback"
    }
}
