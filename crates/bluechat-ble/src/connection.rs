//! Central-role link: connect, handshake, notifications, writes

use btleplug::api::{Characteristic, Peripheral as _, WriteType};
use btleplug::platform::{Peripheral, PeripheralId};
use futures::stream::StreamExt;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use bluechat_core::DeviceId;

use crate::config::BleRadioConfig;
use crate::error::BleRadioError;
use crate::protocol::{GattLayout, SESSION_CHARACTERISTIC_UUID};
use crate::signal::RadioSignal;

// ----------------------------------------------------------------------------
// Central Link
// ----------------------------------------------------------------------------

/// A connected, subscribed peripheral
pub struct CentralLink {
    device: DeviceId,
    peripheral: Peripheral,
    /// Characteristic outgoing frames are written to
    write_characteristic: Characteristic,
    write_type: WriteType,
}

impl CentralLink {
    /// Connect to `peripheral`, pick its characteristics and subscribe to
    /// session notifications.
    ///
    /// Received frames and the end of the notification stream are reported on
    /// `signals`, tagged with `generation`.
    pub async fn establish(
        device: DeviceId,
        peripheral: Peripheral,
        config: &BleRadioConfig,
        generation: u64,
        signals: mpsc::UnboundedSender<RadioSignal>,
    ) -> Result<Self, BleRadioError> {
        timeout(config.connection_timeout, peripheral.connect())
            .await
            .map_err(|_| BleRadioError::ConnectionTimeout)?
            .map_err(|e| BleRadioError::ConnectionFailed(e.to_string()))?;
        debug!("Connected to {}, discovering services", device);

        let handshake = async {
            peripheral
                .discover_services()
                .await
                .map_err(|e| BleRadioError::ServiceDiscoveryFailed(e.to_string()))?;

            let characteristics = peripheral.characteristics();
            let served: Vec<_> = characteristics.iter().map(|c| c.uuid).collect();
            let layout = GattLayout::select(&served)?;
            if layout.is_single_characteristic() {
                debug!("{} takes writes on the session characteristic", device);
            }
            let find = |uuid| {
                characteristics
                    .iter()
                    .find(|c| c.uuid == uuid)
                    .cloned()
                    .ok_or(BleRadioError::CharacteristicNotFound(uuid))
            };
            let session = find(layout.notify)?;
            let write = find(layout.write)?;

            peripheral
                .subscribe(&session)
                .await
                .map_err(|e| BleRadioError::SubscriptionFailed(e.to_string()))?;
            let notifications = peripheral
                .notifications()
                .await
                .map_err(|e| BleRadioError::SubscriptionFailed(e.to_string()))?;
            Ok::<_, BleRadioError>((write, notifications))
        };

        let (write_characteristic, mut notifications) =
            match timeout(config.connection_timeout, handshake).await {
                Ok(Ok(found)) => found,
                Ok(Err(e)) => {
                    let _ = peripheral.disconnect().await;
                    return Err(e);
                }
                Err(_) => {
                    let _ = peripheral.disconnect().await;
                    return Err(BleRadioError::ConnectionTimeout);
                }
            };

        let label = device.clone();
        tokio::spawn(async move {
            while let Some(data) = notifications.next().await {
                if data.uuid != SESSION_CHARACTERISTIC_UUID {
                    continue;
                }
                if signals
                    .send(RadioSignal::LinkData {
                        generation,
                        bytes: data.value,
                    })
                    .is_err()
                {
                    return;
                }
            }
            debug!("Notification stream from {} ended", label);
            let _ = signals.send(RadioSignal::LinkClosed {
                generation,
                reason: "notifications stopped".into(),
            });
        });

        info!("Session link to {} ready", device);
        Ok(Self {
            device,
            peripheral,
            write_characteristic,
            write_type: if config.write_with_response {
                WriteType::WithResponse
            } else {
                WriteType::WithoutResponse
            },
        })
    }

    pub fn device(&self) -> &DeviceId {
        &self.device
    }

    pub fn peripheral_id(&self) -> PeripheralId {
        self.peripheral.id()
    }

    /// Write one frame to the peer
    pub async fn write(&self, bytes: &[u8]) -> Result<(), BleRadioError> {
        self.peripheral
            .write(&self.write_characteristic, bytes, self.write_type)
            .await
            .map_err(|e| BleRadioError::WriteFailed(e.to_string()))?;
        debug!("Wrote {} bytes to {}", bytes.len(), self.device);
        Ok(())
    }

    pub async fn disconnect(self) {
        if let Err(e) = self.peripheral.disconnect().await {
            warn!("Failed to disconnect from {}: {}", self.device, e);
        } else {
            info!("Disconnected from {}", self.device);
        }
    }
}
