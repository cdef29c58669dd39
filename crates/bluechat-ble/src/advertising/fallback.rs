//! Peripheral role for platforms without a supported GATT server

use tokio::sync::mpsc;
use tracing::warn;

use crate::config::BleRadioConfig;
use crate::error::BleRadioError;
use crate::signal::RadioSignal;

use super::BleAdvertiser;

/// Reports the peripheral role as unsupported; scanning still works
#[derive(Debug, Default)]
pub struct FallbackAdvertiser;

impl FallbackAdvertiser {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl BleAdvertiser for FallbackAdvertiser {
    async fn start(
        &mut self,
        config: &BleRadioConfig,
        _signals: mpsc::UnboundedSender<RadioSignal>,
    ) -> Result<(), BleRadioError> {
        warn!(
            "BLE advertising not supported on this platform; '{}' will not be discoverable",
            config.local_name
        );
        Err(BleRadioError::PeripheralUnsupported)
    }

    async fn stop_advertising(&mut self) {}

    async fn stop(&mut self) {}

    fn is_advertising(&self) -> bool {
        false
    }

    async fn notify(&mut self, _bytes: Vec<u8>) -> Result<(), BleRadioError> {
        Err(BleRadioError::NoSubscriber)
    }

    async fn subscriber_lost(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_start_reports_unsupported() {
        let (signals, _rx) = mpsc::unbounded_channel();
        let mut advertiser = FallbackAdvertiser::new();
        let result = advertiser.start(&BleRadioConfig::default(), signals).await;
        assert_eq!(result, Err(BleRadioError::PeripheralUnsupported));
        assert!(!advertiser.is_advertising());
        assert_eq!(
            advertiser.notify(b"hi".to_vec()).await,
            Err(BleRadioError::NoSubscriber)
        );
    }
}
