//! Peripheral role: GATT server plus advertisement

pub mod fallback;
#[cfg(target_os = "linux")]
pub mod linux;

use tokio::sync::mpsc;

use crate::config::BleRadioConfig;
use crate::error::BleRadioError;
use crate::signal::RadioSignal;

// ----------------------------------------------------------------------------
// Cross-platform Advertising Trait
// ----------------------------------------------------------------------------

/// What the radio needs from a platform peripheral implementation
#[async_trait::async_trait]
pub trait BleAdvertiser: Send + Sync {
    /// Serve the session service and advertise it. Subscriptions and incoming
    /// writes are reported on `signals`.
    async fn start(
        &mut self,
        config: &BleRadioConfig,
        signals: mpsc::UnboundedSender<RadioSignal>,
    ) -> Result<(), BleRadioError>;

    /// Stop advertising but keep serving the attached central
    async fn stop_advertising(&mut self);

    /// Tear everything down, dropping any subscriber
    async fn stop(&mut self);

    fn is_advertising(&self) -> bool;

    /// Notify the subscribed central with one frame
    async fn notify(&mut self, bytes: Vec<u8>) -> Result<(), BleRadioError>;

    /// A central subscribed earlier and has since gone away
    async fn subscriber_lost(&self) -> bool;
}

// ----------------------------------------------------------------------------
// Platform Detection and Factory
// ----------------------------------------------------------------------------

pub enum PlatformAdvertiser {
    #[cfg(target_os = "linux")]
    Linux(linux::LinuxAdvertiser),
    #[allow(dead_code)]
    Fallback(fallback::FallbackAdvertiser),
}

impl PlatformAdvertiser {
    /// Create the appropriate advertiser for the current platform
    pub fn new() -> Self {
        #[cfg(target_os = "linux")]
        {
            Self::Linux(linux::LinuxAdvertiser::new())
        }
        #[cfg(not(target_os = "linux"))]
        {
            Self::Fallback(fallback::FallbackAdvertiser::new())
        }
    }
}

impl Default for PlatformAdvertiser {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl BleAdvertiser for PlatformAdvertiser {
    async fn start(
        &mut self,
        config: &BleRadioConfig,
        signals: mpsc::UnboundedSender<RadioSignal>,
    ) -> Result<(), BleRadioError> {
        match self {
            #[cfg(target_os = "linux")]
            Self::Linux(advertiser) => advertiser.start(config, signals).await,
            Self::Fallback(advertiser) => advertiser.start(config, signals).await,
        }
    }

    async fn stop_advertising(&mut self) {
        match self {
            #[cfg(target_os = "linux")]
            Self::Linux(advertiser) => advertiser.stop_advertising().await,
            Self::Fallback(advertiser) => advertiser.stop_advertising().await,
        }
    }

    async fn stop(&mut self) {
        match self {
            #[cfg(target_os = "linux")]
            Self::Linux(advertiser) => advertiser.stop().await,
            Self::Fallback(advertiser) => advertiser.stop().await,
        }
    }

    fn is_advertising(&self) -> bool {
        match self {
            #[cfg(target_os = "linux")]
            Self::Linux(advertiser) => advertiser.is_advertising(),
            Self::Fallback(advertiser) => advertiser.is_advertising(),
        }
    }

    async fn notify(&mut self, bytes: Vec<u8>) -> Result<(), BleRadioError> {
        match self {
            #[cfg(target_os = "linux")]
            Self::Linux(advertiser) => advertiser.notify(bytes).await,
            Self::Fallback(advertiser) => advertiser.notify(bytes).await,
        }
    }

    async fn subscriber_lost(&self) -> bool {
        match self {
            #[cfg(target_os = "linux")]
            Self::Linux(advertiser) => advertiser.subscriber_lost().await,
            Self::Fallback(advertiser) => advertiser.subscriber_lost().await,
        }
    }
}
