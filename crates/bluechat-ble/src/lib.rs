//! Bluetooth Low Energy radio for BlueChat
//!
//! [`BleRadioTask`] implements [`RadioTask`](bluechat_runtime::RadioTask) on top
//! of the platform stacks:
//!
//! - [`config`] - radio configuration
//! - [`error`] - BLE specific errors
//! - [`protocol`] - GATT layout and identifier helpers
//! - [`peer`] - registry of discovered peripherals
//! - `discovery` - scanning via btleplug
//! - `connection` - central link: connect, handshake, notifications, writes
//! - `advertising` - peripheral role: GATT server and advertisement
//!
//! ## Usage
//!
//! ```rust,no_run
//! use bluechat_ble::{BleRadioConfig, BleRadioTask};
//! use bluechat_runtime::{RuntimeBuilder, SessionConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let radio = BleRadioTask::new(BleRadioConfig::new().with_local_name("Kitchen"));
//! let mut runtime = RuntimeBuilder::new(SessionConfig::default())
//!     .with_radio(Box::new(radio))
//!     .start_immediately(true)
//!     .build_and_start()
//!     .await?;
//! # runtime.shutdown().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Platform Support
//!
//! - **Central role** (scan, connect, write): everywhere btleplug runs
//! - **Peripheral role** (advertise, serve): Linux via `bluer` and BlueZ. Other
//!   platforms report the radio as unavailable when asked to advertise.

mod advertising;
pub mod config;
mod connection;
mod discovery;
pub mod error;
pub mod peer;
pub mod protocol;
mod radio;
mod signal;

pub use config::BleRadioConfig;
pub use error::BleRadioError;
pub use peer::{BlePeer, PeerRegistry};
pub use protocol::{
    DISCOVERY_SERVICE_UUID, MESSAGE_CHARACTERISTIC_UUID, SESSION_CHARACTERISTIC_UUID,
};
pub use radio::BleRadioTask;
