//! Linux peripheral role using bluer (BlueZ)

use std::collections::BTreeSet;
use std::sync::Arc;

use bluer::adv::{Advertisement, AdvertisementHandle, Type as AdvertisementType};
use bluer::gatt::local::{
    Application, ApplicationHandle, Characteristic, CharacteristicNotifier, CharacteristicNotify,
    CharacteristicNotifyMethod, CharacteristicWrite, CharacteristicWriteMethod, ReqError, Service,
};
use futures::FutureExt;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info};

use crate::config::BleRadioConfig;
use crate::error::BleRadioError;
use crate::protocol::{
    DISCOVERY_SERVICE_UUID, MESSAGE_CHARACTERISTIC_UUID, SESSION_CHARACTERISTIC_UUID,
};
use crate::signal::RadioSignal;

use super::BleAdvertiser;

type SubscriberSlot = Arc<Mutex<Option<CharacteristicNotifier>>>;

// ----------------------------------------------------------------------------
// Linux Implementation
// ----------------------------------------------------------------------------

pub struct LinuxAdvertiser {
    session: Option<bluer::Session>,
    adapter: Option<bluer::Adapter>,
    application: Option<ApplicationHandle>,
    advertisement: Option<AdvertisementHandle>,
    subscriber: SubscriberSlot,
}

impl Default for LinuxAdvertiser {
    fn default() -> Self {
        Self::new()
    }
}

impl LinuxAdvertiser {
    pub fn new() -> Self {
        Self {
            session: None,
            adapter: None,
            application: None,
            advertisement: None,
            subscriber: Arc::new(Mutex::new(None)),
        }
    }

    async fn initialize(&mut self) -> Result<bluer::Adapter, BleRadioError> {
        if let Some(adapter) = &self.adapter {
            return Ok(adapter.clone());
        }

        let session = bluer::Session::new()
            .await
            .map_err(|e| BleRadioError::AdapterNotAvailable(format!("BlueZ session: {}", e)))?;
        let adapter = session
            .default_adapter()
            .await
            .map_err(|e| BleRadioError::AdapterNotAvailable(e.to_string()))?;

        if !adapter.is_powered().await.unwrap_or(false) {
            adapter
                .set_powered(true)
                .await
                .map_err(|e| BleRadioError::AdapterNotAvailable(format!("power on: {}", e)))?;
        }

        info!("BlueZ adapter {} initialized for the peripheral role", adapter.name());
        self.session = Some(session);
        self.adapter = Some(adapter.clone());
        Ok(adapter)
    }

    fn application(&self, signals: mpsc::UnboundedSender<RadioSignal>) -> Application {
        let slot = self.subscriber.clone();
        let subscribe_signals = signals.clone();
        let on_subscribe = CharacteristicNotifyMethod::Fun(Box::new(move |notifier| {
            let slot = slot.clone();
            let signals = subscribe_signals.clone();
            async move {
                debug!("Central subscribed to the session characteristic");
                *slot.lock().await = Some(notifier);
                let _ = signals.send(RadioSignal::SubscriberAttached);
            }
            .boxed()
        }));


        Application {
            services: vec![Service {
                uuid: DISCOVERY_SERVICE_UUID,
                primary: true,
                characteristics: vec![
                    // Single-characteristic peers write here
                    Characteristic {
                        uuid: SESSION_CHARACTERISTIC_UUID,
                        notify: Some(CharacteristicNotify {
                            notify: true,
                            method: on_subscribe,
                            ..Default::default()
                        }),
                        write: Some(frame_write(signals.clone())),
                        ..Default::default()
                    },
                    Characteristic {
                        uuid: MESSAGE_CHARACTERISTIC_UUID,
                        write: Some(frame_write(signals)),
                        ..Default::default()
                    },
                ],
                ..Default::default()
            }],
            ..Default::default()
        }
    }
}

/// Accept frames written by the central
fn frame_write(signals: mpsc::UnboundedSender<RadioSignal>) -> CharacteristicWrite {
    CharacteristicWrite {
        write: true,
        write_without_response: true,
        method: CharacteristicWriteMethod::Fun(Box::new(move |value, _request| {
            let signals = signals.clone();
            async move {
                let _ = signals.send(RadioSignal::PeripheralData(value));
                Ok::<(), ReqError>(())
            }
            .boxed()
        })),
        ..Default::default()
    }
}

#[async_trait::async_trait]
impl BleAdvertiser for LinuxAdvertiser {
    async fn start(
        &mut self,
        config: &BleRadioConfig,
        signals: mpsc::UnboundedSender<RadioSignal>,
    ) -> Result<(), BleRadioError> {
        let adapter = self.initialize().await?;

        if self.application.is_none() {
            *self.subscriber.lock().await = None;
            let app = self.application(signals);
            let handle = adapter
                .serve_gatt_application(app)
                .await
                .map_err(|e| BleRadioError::AdvertisingFailed(format!("GATT service: {}", e)))?;
            self.application = Some(handle);
        }

        if self.advertisement.is_none() {
            let advertisement = Advertisement {
                advertisement_type: AdvertisementType::Peripheral,
                service_uuids: BTreeSet::from([DISCOVERY_SERVICE_UUID]),
                local_name: Some(config.local_name.clone()),
                discoverable: Some(true),
                ..Default::default()
            };
            let handle = adapter
                .advertise(advertisement)
                .await
                .map_err(|e| BleRadioError::AdvertisingFailed(e.to_string()))?;
            self.advertisement = Some(handle);
            info!("Advertising as '{}'", config.local_name);
        }
        Ok(())
    }

    async fn stop_advertising(&mut self) {
        // Dropping the handle unregisters the advertisement
        if self.advertisement.take().is_some() {
            debug!("Advertising stopped");
        }
    }

    async fn stop(&mut self) {
        self.stop_advertising().await;
        *self.subscriber.lock().await = None;
        if self.application.take().is_some() {
            info!("GATT service withdrawn");
        }
    }

    fn is_advertising(&self) -> bool {
        self.advertisement.is_some()
    }

    async fn notify(&mut self, bytes: Vec<u8>) -> Result<(), BleRadioError> {
        let mut slot = self.subscriber.lock().await;
        let notifier = slot.as_mut().ok_or(BleRadioError::NoSubscriber)?;
        let len = bytes.len();
        notifier
            .notify(bytes)
            .await
            .map_err(|e| BleRadioError::WriteFailed(e.to_string()))?;
        debug!("Notified {} bytes", len);
        Ok(())
    }

    async fn subscriber_lost(&self) -> bool {
        self.subscriber
            .lock()
            .await
            .as_ref()
            .is_some_and(|notifier| notifier.is_stopped())
    }
}
