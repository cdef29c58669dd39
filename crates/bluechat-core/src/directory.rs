//! Device Directory
//!
//! Bookkeeping of peers seen during a scan session. At most one entry per
//! identifier; entries keep their first-seen position so list rendering is
//! stable while names change underneath.

use std::collections::HashMap;

use crate::types::{Device, DeviceId};

/// Whether a [`DeviceDirectory::record`] call warrants a UI refresh
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectoryUpdate {
    Changed,
    Unchanged,
}

impl DirectoryUpdate {
    pub fn is_changed(self) -> bool {
        self == DirectoryUpdate::Changed
    }
}

/// Ordered, deduplicated set of discovered devices
#[derive(Debug, Clone, Default)]
pub struct DeviceDirectory {
    devices: Vec<Device>,
    index: HashMap<DeviceId, usize>,
}

impl DeviceDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new device or update the name of a known one.
    ///
    /// A repeat sighting without a name keeps the name already on record.
    pub fn record(&mut self, id: DeviceId, observed_name: Option<String>) -> DirectoryUpdate {
        if let Some(&position) = self.index.get(&id) {
            let entry = &mut self.devices[position];
            return match observed_name {
                Some(name) if name != entry.name => {
                    entry.name = name;
                    DirectoryUpdate::Changed
                }
                _ => DirectoryUpdate::Unchanged,
            };
        }

        self.index.insert(id.clone(), self.devices.len());
        self.devices.push(Device::new(id, observed_name));
        DirectoryUpdate::Changed
    }

    /// All devices in first-seen order
    pub fn all(&self) -> &[Device] {
        &self.devices
    }

    pub fn get(&self, id: &DeviceId) -> Option<&Device> {
        self.index.get(id).map(|&position| &self.devices[position])
    }

    pub fn contains(&self, id: &DeviceId) -> bool {
        self.index.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Drop every entry; used when a fresh scan cycle begins
    pub fn clear(&mut self) {
        self.devices.clear();
        self.index.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> DeviceId {
        DeviceId::new(s)
    }

    #[test]
    fn test_record_new_device() {
        let mut directory = DeviceDirectory::new();
        assert_eq!(
            directory.record(id("a"), Some("Alice".into())),
            DirectoryUpdate::Changed
        );
        assert_eq!(directory.len(), 1);
        assert_eq!(directory.get(&id("a")).map(|d| d.name.as_str()), Some("Alice"));
    }

    #[test]
    fn test_repeat_with_same_name_is_unchanged() {
        let mut directory = DeviceDirectory::new();
        directory.record(id("a"), Some("Alice".into()));
        assert_eq!(
            directory.record(id("a"), Some("Alice".into())),
            DirectoryUpdate::Unchanged
        );
        assert_eq!(directory.record(id("a"), None), DirectoryUpdate::Unchanged);
        assert_eq!(directory.len(), 1);
    }

    #[test]
    fn test_rename_updates_in_place() {
        let mut directory = DeviceDirectory::new();
        directory.record(id("a"), None);
        directory.record(id("b"), Some("Bob".into()));
        assert_eq!(directory.all()[0].name, "a");

        assert_eq!(
            directory.record(id("a"), Some("Alice".into())),
            DirectoryUpdate::Changed
        );
        let names: Vec<_> = directory.all().iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["Alice", "Bob"]);
    }

    #[test]
    fn test_clear() {
        let mut directory = DeviceDirectory::new();
        directory.record(id("a"), None);
        directory.clear();
        assert!(directory.is_empty());
        assert!(!directory.contains(&id("a")));
        assert_eq!(directory.record(id("a"), None), DirectoryUpdate::Changed);
    }
}
