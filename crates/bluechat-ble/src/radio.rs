//! BLE Radio Task Implementation
//!
//! Executes session effects against btleplug (central role) and the platform
//! advertiser (peripheral role), and reports what the stacks observe as
//! session events.

use std::collections::HashSet;

use async_trait::async_trait;
use btleplug::api::{CentralEvent, Peripheral as _};
use btleplug::platform::Peripheral;
use futures::StreamExt;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use bluechat_core::{BluechatError, BluechatResult, DeviceId, Effect, Event, LinkRole};
use bluechat_runtime::{EffectReceiver, EventSender, RadioTask};

use crate::advertising::{BleAdvertiser, PlatformAdvertiser};
use crate::config::BleRadioConfig;
use crate::connection::CentralLink;
use crate::discovery::{BleScanner, CentralEvents};
use crate::error::BleRadioError;
use crate::peer::PeerRegistry;
use crate::protocol::device_id_for;
use crate::signal::RadioSignal;

/// The single link this radio may hold
enum LinkSlot {
    Idle,
    Connecting {
        device: DeviceId,
        attempt: JoinHandle<()>,
    },
    Central(CentralLink),
    Peripheral,
}

// ----------------------------------------------------------------------------
// BLE Radio Task
// ----------------------------------------------------------------------------

pub struct BleRadioTask {
    config: BleRadioConfig,
    event_sender: Option<EventSender>,
    effect_receiver: Option<EffectReceiver>,
    scanner: BleScanner,
    advertiser: PlatformAdvertiser,
    peers: PeerRegistry<Peripheral>,
    /// Devices already reported during the current scan
    reported: HashSet<DeviceId>,
    link: LinkSlot,
    /// Bumped on every link change; tags central-link signals
    generation: u64,
    signal_sender: mpsc::UnboundedSender<RadioSignal>,
    signal_receiver: Option<mpsc::UnboundedReceiver<RadioSignal>>,
}

impl Default for BleRadioTask {
    fn default() -> Self {
        Self::new(BleRadioConfig::default())
    }
}

impl BleRadioTask {
    pub fn new(config: BleRadioConfig) -> Self {
        let (signal_sender, signal_receiver) = mpsc::unbounded_channel();
        Self {
            config,
            event_sender: None,
            effect_receiver: None,
            scanner: BleScanner::new(),
            advertiser: PlatformAdvertiser::new(),
            peers: PeerRegistry::new(),
            reported: HashSet::new(),
            link: LinkSlot::Idle,
            generation: 0,
            signal_sender,
            signal_receiver: Some(signal_receiver),
        }
    }

    pub fn config(&self) -> &BleRadioConfig {
        &self.config
    }

    /// Main task loop
    async fn run_internal(&mut self) -> BluechatResult<()> {
        info!("BLE radio task starting");
        self.config
            .validate()
            .map_err(|e| BluechatError::configuration(e.to_string()))?;

        let mut effects = self
            .effect_receiver
            .take()
            .ok_or_else(|| BluechatError::channel("BLE radio started without channels"))?;
        let mut signals = self
            .signal_receiver
            .take()
            .ok_or_else(|| BluechatError::channel("BLE radio started twice"))?;

        let mut central_events = match self.scanner.initialize().await {
            Ok(events) => Some(events),
            Err(e) => {
                warn!("Central role unavailable: {}", e);
                self.send_event(Event::RadioUnavailable {
                    reason: e.to_string(),
                })
                .await;
                None
            }
        };
        let mut maintenance = tokio::time::interval(self.config.maintenance_interval);

        loop {
            let mut adapter_gone = false;
            tokio::select! {
                effect = effects.recv() => {
                    match effect {
                        Ok(effect) => self.process_effect(effect).await,
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!("BLE radio skipped {} effects", skipped);
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            info!("Effect channel closed, shutting down");
                            break;
                        }
                    }
                }

                event = next_central_event(&mut central_events) => {
                    match event {
                        Some(event) => self.process_central_event(event).await,
                        None => adapter_gone = true,
                    }
                }

                Some(signal) = signals.recv() => {
                    self.process_signal(signal).await;
                }

                _ = maintenance.tick() => {
                    self.perform_maintenance().await;
                }
            }

            if adapter_gone {
                warn!("BLE adapter event stream ended");
                central_events = None;
                self.send_event(Event::RadioUnavailable {
                    reason: "adapter event stream ended".into(),
                })
                .await;
            }
        }

        self.shutdown().await;
        info!("BLE radio task stopped");
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Effects
    // ------------------------------------------------------------------------

    async fn process_effect(&mut self, effect: Effect) {
        debug!("Executing {:?}", effect);
        match effect {
            Effect::BeginScanning => self.begin_scanning().await,
            Effect::BeginAdvertising => self.begin_advertising().await,
            Effect::ConnectTo { device } => self.connect_to(device).await,
            Effect::WriteBytes { bytes } => self.write(bytes).await,
            Effect::ReleaseLink => self.release_link().await,
            Effect::Stop => self.shutdown().await,
        }
    }

    async fn begin_scanning(&mut self) {
        self.release_peripheral().await;
        self.advertiser.stop().await;
        self.reported.clear();
        if let Err(e) = self.scanner.start_scanning().await {
            self.report_unavailable(e).await;
        }
    }

    async fn begin_advertising(&mut self) {
        self.release_peripheral().await;
        if let Err(e) = self.scanner.stop_scanning().await {
            warn!("Failed to stop scanning: {}", e);
        }
        if let Err(e) = self
            .advertiser
            .start(&self.config, self.signal_sender.clone())
            .await
        {
            self.report_unavailable(e).await;
        }
    }

    async fn connect_to(&mut self, device: DeviceId) {
        let Some(peer) = self.peers.get(&device) else {
            self.send_event(Event::HandshakeFailed {
                reason: BleRadioError::UnknownDevice(device.to_string()).to_string(),
            })
            .await;
            return;
        };
        let peripheral = peer.peripheral.clone();

        self.release_link().await;
        // A connected central has no use for further advertisements
        if let Err(e) = self.scanner.stop_scanning().await {
            warn!("Failed to stop scanning: {}", e);
        }

        info!("Connecting to {}", device);
        let generation = self.generation;
        let config = self.config.clone();
        let signals = self.signal_sender.clone();
        let target = device.clone();
        let attempt = tokio::spawn(async move {
            let result =
                CentralLink::establish(target, peripheral, &config, generation, signals.clone())
                    .await;
            let _ = signals.send(RadioSignal::CentralReady { generation, result });
        });
        self.link = LinkSlot::Connecting { device, attempt };
    }

    async fn write(&mut self, bytes: Vec<u8>) {
        let result = match &self.link {
            LinkSlot::Central(link) => link.write(&bytes).await,
            LinkSlot::Peripheral => self.advertiser.notify(bytes.clone()).await,
            LinkSlot::Idle | LinkSlot::Connecting { .. } => {
                Err(BleRadioError::WriteFailed("no link".into()))
            }
        };
        if let Err(e) = result {
            warn!("Frame not delivered: {}", e);
            self.send_event(Event::WriteFailed {
                bytes,
                reason: e.to_string(),
            })
            .await;
        }
    }

    /// Drop whatever link is held. Safe to call without one.
    async fn release_link(&mut self) {
        self.generation += 1;
        match std::mem::replace(&mut self.link, LinkSlot::Idle) {
            LinkSlot::Idle => {}
            LinkSlot::Connecting { device, attempt } => {
                attempt.abort();
                if let Some(peer) = self.peers.get(&device) {
                    let _ = peer.peripheral.disconnect().await;
                }
                debug!("Abandoned connect to {}", device);
            }
            LinkSlot::Central(link) => link.disconnect().await,
            LinkSlot::Peripheral => self.advertiser.stop().await,
        }
    }

    /// A peripheral slot left over from a subscriber the session never took
    async fn release_peripheral(&mut self) {
        if matches!(self.link, LinkSlot::Peripheral) {
            debug!("Releasing stale peripheral link");
            self.release_link().await;
        }
    }

    async fn shutdown(&mut self) {
        self.release_link().await;
        if let Err(e) = self.scanner.stop_scanning().await {
            debug!("Failed to stop scanning: {}", e);
        }
        self.advertiser.stop().await;
        // The next session starts from a fresh scan
        self.peers.clear();
        self.reported.clear();
    }

    // ------------------------------------------------------------------------
    // Stack callbacks
    // ------------------------------------------------------------------------

    async fn process_central_event(&mut self, event: CentralEvent) {
        match event {
            CentralEvent::DeviceDiscovered(id) | CentralEvent::DeviceUpdated(id) => {
                if !self.scanner.is_scanning() {
                    return;
                }
                let Some(sighting) = self.scanner.inspect(&id).await else {
                    return;
                };
                let device = device_id_for(&id);
                let known_name = self.peers.get(&device).and_then(|p| p.name.clone());
                let renamed = sighting.name.is_some() && sighting.name != known_name;
                let name = sighting.name.clone();
                self.peers
                    .record(device.clone(), sighting.name, sighting.peripheral);

                if self.reported.insert(device.clone()) || renamed {
                    debug!("Sighted {} ({:?})", device, name);
                    self.send_event(Event::DeviceDiscovered { device, name }).await;
                }
            }
            CentralEvent::DeviceDisconnected(id) => {
                let ours = matches!(&self.link, LinkSlot::Central(link) if link.peripheral_id() == id);
                if ours {
                    self.release_link().await;
                    self.send_event(Event::LinkLost {
                        reason: "peripheral disconnected".into(),
                    })
                    .await;
                }
            }
            _ => {}
        }
    }

    async fn process_signal(&mut self, signal: RadioSignal) {
        match signal {
            RadioSignal::CentralReady { generation, result }
                if generation == self.generation
                    && matches!(self.link, LinkSlot::Connecting { .. }) =>
            {
                match result {
                    Ok(link) => {
                        self.link = LinkSlot::Central(link);
                        self.send_event(Event::LinkEstablished {
                            role: LinkRole::Central,
                        })
                        .await;
                    }
                    Err(e) => {
                        warn!("Handshake failed: {}", e);
                        self.link = LinkSlot::Idle;
                        self.send_event(Event::HandshakeFailed {
                            reason: e.to_string(),
                        })
                        .await;
                    }
                }
            }
            RadioSignal::CentralReady {
                result: Ok(link), ..
            } => {
                debug!("Dropping link to {} that finished after release", link.device());
                link.disconnect().await;
            }
            RadioSignal::LinkData { generation, bytes } if generation == self.generation => {
                self.send_event(Event::DataReceived { bytes }).await;
            }
            RadioSignal::LinkClosed { generation, reason }
                if generation == self.generation && matches!(self.link, LinkSlot::Central(_)) =>
            {
                self.release_link().await;
                self.send_event(Event::LinkLost { reason }).await;
            }
            RadioSignal::SubscriberAttached
                if self.advertiser.is_advertising() && matches!(self.link, LinkSlot::Idle) =>
            {
                self.link = LinkSlot::Peripheral;
                self.advertiser.stop_advertising().await;
                self.send_event(Event::SubscriberAttached).await;
            }
            RadioSignal::PeripheralData(bytes) if matches!(self.link, LinkSlot::Peripheral) => {
                self.send_event(Event::DataReceived { bytes }).await;
            }
            other => debug!("Ignoring stale {:?}", other),
        }
    }

    /// Detect a central that unsubscribed or vanished
    async fn perform_maintenance(&mut self) {
        if matches!(self.link, LinkSlot::Peripheral) && self.advertiser.subscriber_lost().await {
            info!("Notifications have stopped, disconnecting");
            self.release_link().await;
            self.send_event(Event::LinkLost {
                reason: "central unsubscribed".into(),
            })
            .await;
        }
    }

    // ------------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------------

    async fn report_unavailable(&self, error: BleRadioError) {
        warn!("Radio unavailable: {}", error);
        self.send_event(Event::RadioUnavailable {
            reason: error.to_string(),
        })
        .await;
    }

    async fn send_event(&self, event: Event) {
        let Some(sender) = &self.event_sender else {
            debug!("No session attached; dropping {}", event.name());
            return;
        };
        if sender.send(event).await.is_err() {
            debug!("Session task gone; event dropped");
        }
    }
}

async fn next_central_event(events: &mut Option<CentralEvents>) -> Option<CentralEvent> {
    match events {
        Some(stream) => stream.next().await,
        None => std::future::pending().await,
    }
}

#[async_trait]
impl RadioTask for BleRadioTask {
    fn attach_channels(
        &mut self,
        event_sender: EventSender,
        effect_receiver: EffectReceiver,
    ) -> BluechatResult<()> {
        if self.event_sender.is_some() {
            return Err(BluechatError::channel("BLE radio channels already attached"));
        }
        self.event_sender = Some(event_sender);
        self.effect_receiver = Some(effect_receiver);
        Ok(())
    }

    async fn run(&mut self) -> BluechatResult<()> {
        self.run_internal().await
    }

    fn name(&self) -> &'static str {
        "ble"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attach_channels_once() {
        let (event_tx, _event_rx) = tokio::sync::mpsc::channel(8);
        let (effect_tx, _effect_rx) = tokio::sync::broadcast::channel(8);

        let mut radio = BleRadioTask::default();
        radio
            .attach_channels(event_tx.clone(), effect_tx.subscribe())
            .unwrap();
        assert!(radio
            .attach_channels(event_tx, effect_tx.subscribe())
            .is_err());
        assert_eq!(radio.name(), "ble");
    }

    #[tokio::test]
    async fn test_run_without_channels_fails() {
        let mut radio = BleRadioTask::default();
        assert!(radio.run().await.is_err());
    }

    #[tokio::test]
    async fn test_invalid_config_rejected_at_run() {
        let mut radio = BleRadioTask::new(BleRadioConfig::new().with_local_name(""));
        let err = radio.run().await.unwrap_err();
        assert!(matches!(err, BluechatError::Configuration { .. }));
    }

    #[tokio::test]
    async fn test_scanning_again_releases_untaken_subscriber() {
        let mut radio = BleRadioTask::default();
        radio.link = LinkSlot::Peripheral;
        let generation = radio.generation;

        radio.release_peripheral().await;
        assert!(matches!(radio.link, LinkSlot::Idle));
        assert_eq!(radio.generation, generation + 1);

        // Nothing held: no new generation
        radio.release_peripheral().await;
        assert_eq!(radio.generation, generation + 1);
    }
}
