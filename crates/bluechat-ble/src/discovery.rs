//! Central-role scanning via btleplug

use std::pin::Pin;

use btleplug::api::{Central, CentralEvent, Manager as _, Peripheral as _, ScanFilter};
use btleplug::platform::{Adapter, Manager, Peripheral, PeripheralId};
use futures::Stream;
use tracing::{debug, info};

use crate::error::BleRadioError;
use crate::protocol::{advertises_discovery_service, DISCOVERY_SERVICE_UUID};

pub type CentralEvents = Pin<Box<dyn Stream<Item = CentralEvent> + Send>>;

/// An advertiser of the discovery service
pub struct Sighting {
    pub peripheral: Peripheral,
    pub name: Option<String>,
}

// ----------------------------------------------------------------------------
// Scanner
// ----------------------------------------------------------------------------

/// Handles the adapter and scanning
pub struct BleScanner {
    adapter: Option<Adapter>,
    scanning: bool,
}

impl Default for BleScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl BleScanner {
    pub fn new() -> Self {
        Self {
            adapter: None,
            scanning: false,
        }
    }

    /// Open the first adapter and subscribe to its events
    pub async fn initialize(&mut self) -> Result<CentralEvents, BleRadioError> {
        let manager = Manager::new()
            .await
            .map_err(|e| BleRadioError::AdapterNotAvailable(e.to_string()))?;
        let adapter = manager
            .adapters()
            .await
            .map_err(|e| BleRadioError::AdapterNotAvailable(e.to_string()))?
            .into_iter()
            .next()
            .ok_or_else(|| BleRadioError::AdapterNotAvailable("no adapters found".into()))?;

        let events = adapter
            .events()
            .await
            .map_err(|e| BleRadioError::AdapterNotAvailable(e.to_string()))?;

        info!("BLE adapter initialized");
        self.adapter = Some(adapter);
        Ok(events)
    }

    pub fn is_scanning(&self) -> bool {
        self.scanning
    }

    pub async fn start_scanning(&mut self) -> Result<(), BleRadioError> {
        let adapter = self.adapter.as_ref().ok_or(BleRadioError::AdapterNotInitialized)?;
        if self.scanning {
            return Ok(());
        }
        adapter
            .start_scan(ScanFilter {
                services: vec![DISCOVERY_SERVICE_UUID],
            })
            .await
            .map_err(|e| BleRadioError::ScanFailed(e.to_string()))?;
        self.scanning = true;
        info!("Scanning for the discovery service");
        Ok(())
    }

    pub async fn stop_scanning(&mut self) -> Result<(), BleRadioError> {
        if !self.scanning {
            return Ok(());
        }
        self.scanning = false;
        if let Some(adapter) = &self.adapter {
            adapter
                .stop_scan()
                .await
                .map_err(|e| BleRadioError::ScanFailed(e.to_string()))?;
            debug!("Scanning stopped");
        }
        Ok(())
    }

    /// Resolve an advertisement to a compatible peripheral.
    ///
    /// Returns `None` for devices without the discovery service; some stacks
    /// report them despite the scan filter.
    pub async fn inspect(&self, id: &PeripheralId) -> Option<Sighting> {
        let adapter = self.adapter.as_ref()?;
        let peripheral = adapter.peripheral(id).await.ok()?;
        let properties = peripheral.properties().await.ok()??;
        if !advertises_discovery_service(&properties.services) {
            return None;
        }
        Some(Sighting {
            peripheral,
            name: properties.local_name,
        })
    }
}
