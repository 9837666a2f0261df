//! Device identity and capabilities.

pub mod classifier;
pub mod features;
pub mod version;

use serde::{Deserialize, Serialize};

pub use classifier::{classify, DeviceType};
pub use features::Features;
pub use version::{FirmwareVersion, VersionSource};

use crate::release::UpdateCategory;

/// Minimum touch firmware that supports the full resource re-upload.
pub const RESOURCE_REPAIR_MIN_VERSION: FirmwareVersion = FirmwareVersion::new(3, 4, 0);

/// A connected device as the console sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub connect_id: Option<String>,
    pub path: String,
    pub device_type: DeviceType,
    pub bootloader_mode: bool,
    pub firmware_version: FirmwareVersion,
    pub bootloader_version: FirmwareVersion,
    pub ble_version: FirmwareVersion,
    pub serial: Option<String>,
    pub label: Option<String>,
}

impl Device {
    /// Build the console view of a device from its SDK features.
    pub fn from_features(
        connect_id: Option<String>,
        path: impl Into<String>,
        features: &Features,
    ) -> Self {
        Self {
            connect_id,
            path: path.into(),
            device_type: classifier::classify(features),
            bootloader_mode: classifier::is_bootloader_mode(features),
            firmware_version: classifier::firmware_version(features),
            bootloader_version: classifier::bootloader_version(features),
            ble_version: classifier::ble_version(features),
            serial: features.serial().map(str::to_owned),
            label: features.label.clone(),
        }
    }

    pub fn display_label(&self) -> String {
        match self.label.as_deref().filter(|l| !l.is_empty()) {
            Some(label) => format!("{} ({})", label, self.device_type.display_name()),
            None => self.device_type.display_name().to_string(),
        }
    }

    /// Version currently installed for an update category.
    pub fn installed_version(&self, category: UpdateCategory) -> FirmwareVersion {
        match category {
            UpdateCategory::Firmware | UpdateCategory::Resource => self.firmware_version,
            UpdateCategory::Ble => self.ble_version,
            UpdateCategory::Bootloader => self.bootloader_version,
        }
    }

    /// Tabs the firmware page offers for this device.
    pub fn update_tabs(&self) -> Vec<UpdateCategory> {
        let mut tabs = vec![UpdateCategory::Firmware];
        if self.device_type.has_ble() {
            tabs.push(UpdateCategory::Ble);
        }
        if self.supports_bootloader_update() {
            tabs.push(UpdateCategory::Bootloader);
        }
        tabs
    }

    pub fn supports_bootloader_update(&self) -> bool {
        self.device_type.is_touch_family()
    }

    pub fn supports_reboot_to_bootloader(&self) -> bool {
        self.device_type.is_touch_family() && !self.bootloader_mode
    }

    /// Touch devices on 3.4.0 or newer can re-upload their full resource set.
    pub fn supports_resource_repair(&self) -> bool {
        self.device_type == DeviceType::Touch
            && !self.bootloader_mode
            && self.firmware_version >= RESOURCE_REPAIR_MIN_VERSION
    }

    /// Minis cannot reboot themselves and must be put into bootloader by hand.
    pub fn needs_manual_bootloader_entry(&self) -> bool {
        self.device_type == DeviceType::Mini && !self.bootloader_mode
    }

    pub fn is_v3_eligible(&self) -> bool {
        crate::release::selector::is_v3_eligible(self.device_type, self.bootloader_version)
    }
}
