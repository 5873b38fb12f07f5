//! USB devices visible to the scanner

use serde::{Deserialize, Serialize};

/// Connection status shown on a device card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceStatus {
    AwaitingHandshake,
    Connected,
    Vulnerable,
    UnknownDevice,
}

impl std::fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceStatus::AwaitingHandshake => write!(f, "Awaiting Handshake"),
            DeviceStatus::Connected => write!(f, "Connected"),
            DeviceStatus::Vulnerable => write!(f, "Vulnerable"),
            DeviceStatus::UnknownDevice => write!(f, "Unknown Device"),
        }
    }
}

/// A device the protocol could be pointed at
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub id: String,
    pub model: String,
    pub status: DeviceStatus,
    #[serde(default)]
    pub is_target: bool,
}

impl Device {
    pub fn new(id: &str, model: &str, status: DeviceStatus, is_target: bool) -> Self {
        Self {
            id: id.to_string(),
            model: model.to_string(),
            status,
            is_target,
        }
    }

    /// One-line label for the scanner list
    pub fn brief(&self) -> String {
        format!("{} [{}] - {}", self.model, self.id, self.status)
    }
}

/// Devices plugged in at session start
pub fn default_devices() -> Vec<Device> {
    vec![
        Device::new("DEV_ID:0x1a86", "CH340 Serial", DeviceStatus::Connected, false),
        Device::new("DEV_ID:0x04e8", "SM-A06F", DeviceStatus::Vulnerable, true),
        Device::new("DEV_ID:0x22b8", "ADB Interface", DeviceStatus::AwaitingHandshake, false),
        Device::new("DEV_ID:0x99c1", "Unknown Cygnus Device", DeviceStatus::UnknownDevice, false),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_catalog_has_exactly_one_target() {
        let devices = default_devices();
        let targets: Vec<_> = devices.iter().filter(|d| d.is_target).collect();
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].model, "SM-A06F");
    }

    #[test]
    fn brief_includes_status_text() {
        let device = Device::new("X", "Probe", DeviceStatus::AwaitingHandshake, false);
        assert_eq!(device.brief(), "Probe [X] - Awaiting Handshake");
    }
}
