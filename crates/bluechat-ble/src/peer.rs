//! Registry of peripherals seen while scanning

use std::collections::HashMap;

use bluechat_core::DeviceId;

// ----------------------------------------------------------------------------
// Peer Registry
// ----------------------------------------------------------------------------

/// A discovered advertiser and the handle needed to connect to it
#[derive(Debug, Clone)]
pub struct BlePeer<P> {
    pub device: DeviceId,
    pub name: Option<String>,
    pub peripheral: P,
}

/// Maps session device ids back to platform peripherals.
///
/// Generic over the peripheral handle so the bookkeeping does not need a live
/// adapter.
#[derive(Debug)]
pub struct PeerRegistry<P> {
    peers: HashMap<DeviceId, BlePeer<P>>,
}

impl<P> Default for PeerRegistry<P> {
    fn default() -> Self {
        Self {
            peers: HashMap::new(),
        }
    }
}

impl<P> PeerRegistry<P> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or refresh a sighting. A later sighting without a name keeps
    /// the earlier one.
    pub fn record(&mut self, device: DeviceId, name: Option<String>, peripheral: P) -> &BlePeer<P> {
        let peer = self
            .peers
            .entry(device.clone())
            .and_modify(|existing| {
                if name.is_some() {
                    existing.name = name.clone();
                }
            })
            .or_insert_with(|| BlePeer {
                device,
                name,
                peripheral,
            });
        peer
    }

    pub fn get(&self, device: &DeviceId) -> Option<&BlePeer<P>> {
        self.peers.get(device)
    }

    pub fn clear(&mut self) {
        self.peers.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_lookup() {
        let mut registry = PeerRegistry::new();
        registry.record(DeviceId::new("a"), Some("Pixel".into()), 1u8);
        let peer = registry.get(&DeviceId::new("a")).unwrap();
        assert_eq!(peer.name.as_deref(), Some("Pixel"));
        assert_eq!(peer.peripheral, 1);
    }

    #[test]
    fn test_nameless_sighting_keeps_name() {
        let mut registry = PeerRegistry::new();
        registry.record(DeviceId::new("a"), Some("Pixel".into()), 1u8);
        let peer = registry.record(DeviceId::new("a"), None, 2u8);
        assert_eq!(peer.name.as_deref(), Some("Pixel"));
        // First handle wins
        assert_eq!(peer.peripheral, 1);
    }

    #[test]
    fn test_clear_forgets_handles() {
        let mut registry = PeerRegistry::new();
        registry.record(DeviceId::new("a"), None, ());
        registry.clear();
        assert!(registry.get(&DeviceId::new("a")).is_none());
    }
}
