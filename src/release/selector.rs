//! Channel selection for a device, category and installed version.
//!
//! Selection is a pure function of its inputs: the same device type,
//! category and installed version always yield the same ordered channel list.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::config::{Changelog, Locale, ReleaseConfig, ReleaseEntry};
use crate::device::{Device, DeviceType, FirmwareVersion};

pub const CHANNEL_FIRMWARE: &str = "firmware";
pub const CHANNEL_FIRMWARE_V2: &str = "firmware-v2";
pub const CHANNEL_FIRMWARE_V5: &str = "firmware-v5";
pub const CHANNEL_FIRMWARE_V7: &str = "firmware-v7";
pub const CHANNEL_FIRMWARE_V8: &str = "firmware-v8";
pub const CHANNEL_BLE: &str = "ble";

/// Touch firmware at exactly this version reads from the v2 channel.
pub const TOUCH_V2_VERSION: FirmwareVersion = FirmwareVersion::new(4, 0, 0);
/// Touch firmware below this version may need any historical channel.
pub const TOUCH_LEGACY_CEILING: FirmwareVersion = FirmwareVersion::new(3, 0, 0);
/// Minimum pro bootloader able to take multi-component updates.
pub const V3_MIN_BOOTLOADER: FirmwareVersion = FirmwareVersion::new(2, 8, 0);

/// What the user wants to update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateCategory {
    Firmware,
    Ble,
    Bootloader,
    Resource,
}

impl UpdateCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateCategory::Firmware => "firmware",
            UpdateCategory::Ble => "ble",
            UpdateCategory::Bootloader => "bootloader",
            UpdateCategory::Resource => "resource",
        }
    }
}

impl fmt::Display for UpdateCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered candidate channels, most preferred first.
pub fn select_channels(
    device_type: DeviceType,
    category: UpdateCategory,
    installed: Option<FirmwareVersion>,
) -> Vec<&'static str> {
    match category {
        UpdateCategory::Ble => vec![CHANNEL_BLE],
        UpdateCategory::Firmware => firmware_channels(device_type, installed),
        // Classic-family bootloaders are bumped by the firmware prerequisite
        // check, never from a channel of their own.
        UpdateCategory::Bootloader if device_type.is_classic_family() => Vec::new(),
        UpdateCategory::Bootloader => firmware_channels(device_type, installed),
        UpdateCategory::Resource if device_type == DeviceType::Pro => vec![CHANNEL_FIRMWARE_V7],
        UpdateCategory::Resource => Vec::new(),
    }
}

fn firmware_channels(device_type: DeviceType, installed: Option<FirmwareVersion>) -> Vec<&'static str> {
    match device_type {
        t if t.is_classic_family() => vec![CHANNEL_FIRMWARE_V8],
        DeviceType::Pro => vec![CHANNEL_FIRMWARE_V5],
        DeviceType::Touch => touch_channels(installed),
        _ => vec![CHANNEL_FIRMWARE],
    }
}

fn touch_channels(installed: Option<FirmwareVersion>) -> Vec<&'static str> {
    let version = installed.unwrap_or(FirmwareVersion::UNKNOWN);
    if version > TOUCH_V2_VERSION {
        vec![CHANNEL_FIRMWARE_V5, CHANNEL_FIRMWARE]
    } else if version == TOUCH_V2_VERSION {
        vec![CHANNEL_FIRMWARE_V2, CHANNEL_FIRMWARE]
    } else if version.is_unknown() || version < TOUCH_LEGACY_CEILING {
        vec![CHANNEL_FIRMWARE_V5, CHANNEL_FIRMWARE_V2, CHANNEL_FIRMWARE]
    } else {
        vec![CHANNEL_FIRMWARE]
    }
}

/// Channels that the SDK cannot fetch by version; their binaries must be
/// downloaded and handed over directly.
pub fn is_legacy_touch_channel(device_type: DeviceType, channel: &str) -> bool {
    device_type == DeviceType::Touch && (channel == CHANNEL_FIRMWARE || channel == CHANNEL_FIRMWARE_V2)
}

/// A channel chosen from the candidates together with its entries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedChannel<'a> {
    pub channel: &'static str,
    pub entries: &'a [ReleaseEntry],
}

impl<'a> ResolvedChannel<'a> {
    pub fn latest(&self) -> Option<&'a ReleaseEntry> {
        self.entries.first()
    }
}

/// First candidate channel that actually carries release data.
pub fn resolve<'a>(
    config: &'a ReleaseConfig,
    device_type: DeviceType,
    category: UpdateCategory,
    installed: Option<FirmwareVersion>,
) -> Option<ResolvedChannel<'a>> {
    select_channels(device_type, category, installed)
        .into_iter()
        .map(|channel| ResolvedChannel {
            channel,
            entries: config.entries(device_type, channel),
        })
        .find(|resolved| match category {
            UpdateCategory::Bootloader => resolved.entries.iter().any(|e| e.bootloader_url().is_some()),
            _ => !resolved.entries.is_empty(),
        })
}

pub fn is_v3_eligible(device_type: DeviceType, bootloader: FirmwareVersion) -> bool {
    device_type == DeviceType::Pro && !bootloader.is_unknown() && bootloader >= V3_MIN_BOOTLOADER
}

/// Newest release of one category, for the release table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseSummary {
    pub category: UpdateCategory,
    pub channel: String,
    pub version: FirmwareVersion,
    pub required: bool,
    pub changelog: String,
    pub is_newer: bool,
}

pub fn release_summary(
    config: &ReleaseConfig,
    device: &Device,
    category: UpdateCategory,
    locale: Locale,
) -> Option<ReleaseSummary> {
    let resolved = resolve(config, device.device_type, category, Some(device.firmware_version))?;
    let installed = device.installed_version(category);

    let (entry, version, changelog) = match category {
        UpdateCategory::Bootloader => {
            let entry = resolved.entries.iter().find(|e| e.bootloader_url().is_some())?;
            let version = entry.shown_bootloader_version()?;
            let changelog = entry.bootloader_changelog.as_ref().unwrap_or(&entry.changelog);
            (entry, version, changelog)
        }
        _ => {
            let entry = resolved.latest()?;
            (entry, entry.version, &entry.changelog)
        }
    };

    Some(ReleaseSummary {
        category,
        channel: resolved.channel.to_string(),
        version,
        required: entry.required,
        changelog: changelog.text(locale).to_string(),
        is_newer: installed.is_unknown() || version > installed,
    })
}

/// Pieces a multi-component update can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum V3Component {
    #[serde(rename = "fw")]
    Firmware,
    #[serde(rename = "ble")]
    Ble,
    #[serde(rename = "boot")]
    Bootloader,
    #[serde(rename = "resource")]
    Resource,
}

impl V3Component {
    pub const ALL: [V3Component; 4] = [
        V3Component::Firmware,
        V3Component::Ble,
        V3Component::Bootloader,
        V3Component::Resource,
    ];

    pub fn channel(&self) -> &'static str {
        match self {
            V3Component::Ble => CHANNEL_BLE,
            _ => CHANNEL_FIRMWARE_V7,
        }
    }
}

/// One row of the multi-component table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct V3ComponentRelease {
    pub component: V3Component,
    pub latest_version: String,
    pub versions: Vec<String>,
    pub changelog: String,
    pub download_url: String,
}

/// Components on offer for a V3-eligible device; empty otherwise.
pub fn v3_components(config: &ReleaseConfig, device: &Device, locale: Locale) -> Vec<V3ComponentRelease> {
    if !device.is_v3_eligible() {
        return Vec::new();
    }

    let firmware = config.entries(device.device_type, CHANNEL_FIRMWARE_V7);
    let ble = config.entries(device.device_type, CHANNEL_BLE);
    let mut rows = Vec::new();

    if let Some(latest) = firmware.first() {
        rows.push(component_row(
            V3Component::Firmware,
            firmware.iter().map(|e| e.version.to_string()).collect(),
            &latest.changelog,
            latest.download_url(),
            locale,
        ));
    }

    if let Some(latest) = ble.first() {
        rows.push(component_row(
            V3Component::Ble,
            ble.iter().map(|e| e.version.to_string()).collect(),
            &latest.changelog,
            latest.download_url(),
            locale,
        ));
    }

    let boot: Vec<&ReleaseEntry> = firmware.iter().filter(|e| e.bootloader_version.is_some()).collect();
    if let Some(latest) = boot.first() {
        let empty = Changelog::default();
        rows.push(component_row(
            V3Component::Bootloader,
            boot.iter()
                .filter_map(|e| e.bootloader_version)
                .map(|v| v.to_string())
                .collect(),
            latest.bootloader_changelog.as_ref().unwrap_or(&empty),
            latest.bootloader_url(),
            locale,
        ));
    }

    if let Some((latest, url)) = firmware
        .first()
        .and_then(|e| e.resource.as_deref().filter(|u| !u.is_empty()).map(|u| (e, u)))
    {
        let version = resource_version(url).unwrap_or_else(|| latest.version.to_string());
        rows.push(component_row(
            V3Component::Resource,
            vec![version],
            &latest.changelog,
            Some(url),
            locale,
        ));
    }

    rows
}

fn component_row(
    component: V3Component,
    versions: Vec<String>,
    changelog: &Changelog,
    url: Option<&str>,
    locale: Locale,
) -> V3ComponentRelease {
    V3ComponentRelease {
        component,
        latest_version: versions.first().cloned().unwrap_or_default(),
        versions,
        changelog: changelog.text(locale).to_string(),
        download_url: url.unwrap_or_default().to_string(),
    }
}

/// Extract the resource version embedded in a bundle URL such as
/// `.../res-1.0.2-4.10.0.bin`, which yields `1.0.2-4.10.0`.
pub fn resource_version(url: &str) -> Option<String> {
    let lower = url.to_ascii_lowercase();
    let mut search_from = 0;
    while let Some(offset) = lower[search_from..].find("res-") {
        let start = search_from + offset + "res-".len();
        let rest = &url[start..];
        if let Some(head) = dotted_number_len(rest) {
            if rest[head..].starts_with('-') {
                if let Some(tail) = dotted_number_len(&rest[head + 1..]) {
                    return Some(rest[..head + 1 + tail].to_string());
                }
            }
        }
        search_from = start;
    }
    None
}

/// Length of a leading `N(.N)*` run, if any.
fn dotted_number_len(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut end = 0;
    loop {
        let digits = bytes[end..].iter().take_while(|b| b.is_ascii_digit()).count();
        if digits == 0 {
            break;
        }
        end += digits;
        if bytes.get(end) == Some(&b'.') && bytes.get(end + 1).is_some_and(u8::is_ascii_digit) {
            end += 1;
        } else {
            break;
        }
    }
    (end > 0).then_some(end)
}
