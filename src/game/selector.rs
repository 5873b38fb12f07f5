//! Device selection

use crate::data::Device;

/// The scanner's device list plus whichever card is currently picked
#[derive(Debug, Clone)]
pub struct DeviceSelector {
    devices: Vec<Device>,
    selected: Option<Device>,
}

impl DeviceSelector {
    pub fn new(devices: Vec<Device>) -> Self {
        Self {
            devices,
            selected: None,
        }
    }

    /// Always succeeds; the last call wins
    pub fn select(&mut self, device: Device) {
        self.selected = Some(device);
    }

    pub fn current(&self) -> Option<&Device> {
        self.selected.as_ref()
    }

    pub fn find(&self, id: &str) -> Option<&Device> {
        self.devices.iter().find(|d| d.id == id)
    }

    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    /// True when the selection may be handed to the runner
    pub fn has_target(&self) -> bool {
        self.selected.as_ref().is_some_and(|d| d.is_target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{default_devices, DeviceStatus};

    #[test]
    fn last_selection_wins() {
        let mut selector = DeviceSelector::new(default_devices());
        let a = selector.devices()[0].clone();
        let b = selector.devices()[1].clone();

        selector.select(a);
        selector.select(b.clone());
        assert_eq!(selector.current(), Some(&b));
    }

    #[test]
    fn non_target_selection_is_allowed_but_not_a_target() {
        let mut selector = DeviceSelector::new(default_devices());
        assert!(selector.current().is_none());

        selector.select(Device::new("X", "Decoy", DeviceStatus::Connected, false));
        assert!(selector.current().is_some());
        assert!(!selector.has_target());
    }

    #[test]
    fn find_by_id() {
        let selector = DeviceSelector::new(default_devices());
        assert_eq!(selector.find("DEV_ID:0x04e8").unwrap().model, "SM-A06F");
        assert!(selector.find("DEV_ID:nope").is_none());
    }
}
