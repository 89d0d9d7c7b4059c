use serde::{Deserialize, Serialize};

/// Presence and activity of a single device session.
///
/// # Examples
/// ```
/// use healthbridge_core::DeviceStatus;
///
/// let status = DeviceStatus::absent("A");
/// assert!(!status.has_instance);
/// assert!(!status.is_processing);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceStatus {
    pub device_id: String,
    pub has_instance: bool,
    /// True while a decode holds the device lock.
    pub is_processing: bool,
    /// Current decoder mode, when a session exists.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub mode: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation: Option<u64>,
}

impl DeviceStatus {
    pub fn absent(device_id: &str) -> Self {
        Self {
            device_id: device_id.to_string(),
            has_instance: false,
            is_processing: false,
            mode: None,
            generation: None,
        }
    }
}

/// Registry-wide summary; ids are sorted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryStatus {
    pub total_instances: usize,
    pub device_ids: Vec<String>,
    pub processing_devices: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StatusReport {
    Device(DeviceStatus),
    Registry(RegistryStatus),
}
