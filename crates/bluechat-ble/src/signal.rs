//! Internal notifications from background BLE tasks to the radio loop

use crate::connection::CentralLink;
use crate::error::BleRadioError;

/// Central-link signals carry the generation of the link they belong to, so
/// anything arriving after that link was released is ignored.
pub enum RadioSignal {
    /// A connect attempt finished
    CentralReady {
        generation: u64,
        result: Result<CentralLink, BleRadioError>,
    },
    /// Frame notified by the remote peripheral
    LinkData { generation: u64, bytes: Vec<u8> },
    /// The central link's notification stream ended
    LinkClosed { generation: u64, reason: String },
    /// A central subscribed to our session characteristic
    SubscriberAttached,
    /// Frame written by the remote central
    PeripheralData(Vec<u8>),
}

impl std::fmt::Debug for RadioSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CentralReady { generation, result } => f
                .debug_struct("CentralReady")
                .field("generation", generation)
                .field("ok", &result.is_ok())
                .finish(),
            Self::LinkData { generation, bytes } => f
                .debug_struct("LinkData")
                .field("generation", generation)
                .field("len", &bytes.len())
                .finish(),
            Self::LinkClosed { generation, reason } => f
                .debug_struct("LinkClosed")
                .field("generation", generation)
                .field("reason", reason)
                .finish(),
            Self::SubscriberAttached => f.write_str("SubscriberAttached"),
            Self::PeripheralData(bytes) => f
                .debug_tuple("PeripheralData")
                .field(&bytes.len())
                .finish(),
        }
    }
}
