use std::collections::BTreeMap;

use crate::device::{Device, DeviceType, Features, FirmwareVersion};
use crate::hardware::SearchDevice;
use crate::release::config::{Changelog, DeviceReleases, ReleaseConfig, ReleaseEntry};
use crate::release::BridgeRelease;

/// Builder for SDK feature payloads
#[derive(Default)]
pub struct FeaturesBuilder {
    features: Features,
}

impl FeaturesBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn device_type_tag(mut self, tag: &str) -> Self {
        self.features.onekey_device_type = Some(tag.to_string());
        self
    }

    pub fn serial(mut self, serial: &str) -> Self {
        self.features.onekey_serial = Some(serial.to_string());
        self
    }

    pub fn model(mut self, model: &str) -> Self {
        self.features.model = Some(model.to_string());
        self
    }

    pub fn label(mut self, label: &str) -> Self {
        self.features.label = Some(label.to_string());
        self
    }

    pub fn firmware(mut self, version: &str) -> Self {
        self.features.onekey_version = Some(version.to_string());
        self
    }

    pub fn bootloader(mut self, version: &str) -> Self {
        self.features.onekey_boot_version = Some(version.to_string());
        self
    }

    pub fn ble(mut self, version: &str) -> Self {
        self.features.onekey_ble_version = Some(version.to_string());
        self
    }

    pub fn bootloader_mode(mut self, value: bool) -> Self {
        self.features.bootloader_mode = Some(value);
        self
    }

    pub fn discrete_version(mut self, major: u32, minor: u32, patch: u32) -> Self {
        self.features.major_version = Some(major);
        self.features.minor_version = Some(minor);
        self.features.patch_version = Some(patch);
        self
    }

    pub fn build(self) -> Features {
        self.features
    }
}

/// Builder for console devices
pub struct DeviceBuilder {
    device: Device,
}

impl DeviceBuilder {
    pub fn new(device_type: DeviceType) -> Self {
        Self {
            device: Device {
                connect_id: Some("connect-1".to_string()),
                path: "usb-1".to_string(),
                device_type,
                bootloader_mode: false,
                firmware_version: FirmwareVersion::new(3, 0, 0),
                bootloader_version: FirmwareVersion::new(2, 0, 0),
                ble_version: FirmwareVersion::new(1, 0, 0),
                serial: None,
                label: None,
            },
        }
    }

    pub fn classic() -> Self {
        Self::new(DeviceType::Classic)
    }

    pub fn mini() -> Self {
        Self::new(DeviceType::Mini)
    }

    pub fn touch() -> Self {
        Self::new(DeviceType::Touch)
    }

    pub fn pro() -> Self {
        Self::new(DeviceType::Pro)
    }

    pub fn path(mut self, path: &str) -> Self {
        self.device.path = path.to_string();
        self
    }

    pub fn connect_id(mut self, connect_id: &str) -> Self {
        self.device.connect_id = Some(connect_id.to_string());
        self
    }

    pub fn firmware(mut self, version: FirmwareVersion) -> Self {
        self.device.firmware_version = version;
        self
    }

    pub fn bootloader(mut self, version: FirmwareVersion) -> Self {
        self.device.bootloader_version = version;
        self
    }

    pub fn bootloader_mode(mut self, value: bool) -> Self {
        self.device.bootloader_mode = value;
        self
    }

    pub fn build(self) -> Device {
        self.device
    }
}

/// Builder for release entries
pub struct ReleaseEntryBuilder {
    entry: ReleaseEntry,
}

impl ReleaseEntryBuilder {
    pub fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            entry: ReleaseEntry {
                version: FirmwareVersion::new(major, minor, patch),
                ..Default::default()
            },
        }
    }

    pub fn url(mut self, url: &str) -> Self {
        self.entry.url = Some(url.to_string());
        self
    }

    pub fn required(mut self, value: bool) -> Self {
        self.entry.required = value;
        self
    }

    pub fn changelog(mut self, locale: &str, text: &str) -> Self {
        self.entry.changelog.0.insert(locale.to_string(), text.to_string());
        self
    }

    pub fn resource(mut self, url: &str) -> Self {
        self.entry.resource = Some(url.to_string());
        self
    }

    pub fn bootloader(mut self, version: FirmwareVersion, url: &str) -> Self {
        self.entry.bootloader_version = Some(version);
        self.entry.bootloader_resource = Some(url.to_string());
        self.entry.bootloader_changelog = Some(Changelog::default());
        self
    }

    pub fn build(self) -> ReleaseEntry {
        self.entry
    }
}

/// Builder for whole release configs
#[derive(Default)]
pub struct ReleaseConfigBuilder {
    devices: BTreeMap<DeviceType, BTreeMap<String, Vec<ReleaseEntry>>>,
    bridge: Option<BridgeRelease>,
}

impl ReleaseConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn channel(mut self, device_type: DeviceType, channel: &str, entries: Vec<ReleaseEntry>) -> Self {
        self.devices
            .entry(device_type)
            .or_default()
            .insert(channel.to_string(), entries);
        self
    }

    pub fn bridge(mut self, bridge: BridgeRelease) -> Self {
        self.bridge = Some(bridge);
        self
    }

    pub fn build(self) -> ReleaseConfig {
        let devices = self
            .devices
            .into_iter()
            .map(|(device_type, channels)| (device_type, DeviceReleases::new(channels)))
            .collect();
        ReleaseConfig::new(devices, self.bridge)
    }
}

/// Search result for a device reachable at `path`
pub fn search_device(path: &str, features: Features) -> SearchDevice {
    SearchDevice {
        connect_id: Some(format!("connect-{}", path)),
        path: path.to_string(),
        features: Some(features),
    }
}
