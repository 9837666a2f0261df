//! The feature payload devices answer `getFeatures` with.

use serde::{Deserialize, Serialize};

use super::version::VersionSource;

/// Raw device features as delivered by the hardware SDK.
///
/// Every field is optional: which ones are populated depends on the device
/// family, the firmware generation and whether the device sits in bootloader
/// mode.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Features {
    pub vendor: Option<String>,
    pub model: Option<String>,
    pub label: Option<String>,
    pub device_id: Option<String>,
    pub serial_no: Option<String>,
    pub onekey_serial: Option<String>,
    pub onekey_device_type: Option<String>,
    pub bootloader_mode: Option<bool>,

    pub major_version: Option<u32>,
    pub minor_version: Option<u32>,
    pub patch_version: Option<u32>,
    pub onekey_version: Option<String>,
    pub onekey_firmware_version: Option<String>,

    pub bootloader_version: Option<String>,
    pub onekey_boot_version: Option<String>,

    pub ble_ver: Option<String>,
    pub onekey_ble_version: Option<String>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl Features {
    pub fn serial(&self) -> Option<&str> {
        non_empty(&self.onekey_serial).or_else(|| non_empty(&self.serial_no))
    }

    pub fn in_bootloader_mode(&self) -> bool {
        self.bootloader_mode.unwrap_or(false)
    }

    fn discrete(&self) -> VersionSource<'_> {
        VersionSource::Discrete {
            major: self.major_version,
            minor: self.minor_version,
            patch: self.patch_version,
        }
    }

    /// Firmware version source; unified strings win over discrete fields.
    pub fn firmware_version_source(&self) -> VersionSource<'_> {
        non_empty(&self.onekey_firmware_version)
            .or_else(|| non_empty(&self.onekey_version))
            .map(VersionSource::Unified)
            .unwrap_or_else(|| self.discrete())
    }

    /// Bootloader version source.
    ///
    /// The discrete fields only describe the bootloader while the device is in
    /// bootloader mode; otherwise they belong to the firmware.
    pub fn bootloader_version_source(&self) -> Option<VersionSource<'_>> {
        if let Some(text) =
            non_empty(&self.onekey_boot_version).or_else(|| non_empty(&self.bootloader_version))
        {
            return Some(VersionSource::Unified(text));
        }
        self.in_bootloader_mode().then(|| self.discrete())
    }

    pub fn ble_version_source(&self) -> Option<VersionSource<'_>> {
        non_empty(&self.onekey_ble_version)
            .or_else(|| non_empty(&self.ble_ver))
            .map(VersionSource::Unified)
    }
}
