//! Remote release configuration document.
//!
//! The document is a JSON object keyed by device-family tag, each holding a
//! set of named channels (`firmware`, `firmware-v5`, `ble`, ...) with release
//! entries ordered newest first, plus a `bridge` section describing the
//! desktop bridge installers.
//!
//! Parsing is tolerant: unknown device tags and channels whose entries do not
//! match the release-entry shape are skipped with a warning instead of
//! rejecting the whole document.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::device::{DeviceType, FirmwareVersion};
use crate::error::ConsoleResult;

/// UI languages carried in changelogs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Locale {
    #[serde(rename = "zh-CN")]
    ZhCn,
    #[default]
    #[serde(rename = "en-US")]
    EnUs,
}

impl Locale {
    pub fn as_str(&self) -> &'static str {
        match self {
            Locale::ZhCn => "zh-CN",
            Locale::EnUs => "en-US",
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Localized release notes keyed by locale tag.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Changelog(pub BTreeMap<String, String>);

impl Changelog {
    /// Text for `locale`, falling back to English and then to any language.
    pub fn text(&self, locale: Locale) -> &str {
        self.0
            .get(locale.as_str())
            .or_else(|| self.0.get(Locale::EnUs.as_str()))
            .or_else(|| self.0.values().next())
            .map(String::as_str)
            .unwrap_or("")
    }
}

/// One published artifact in a channel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseEntry {
    pub version: FirmwareVersion,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub url: Option<String>,
    /// BLE entries: STM-side update package used by the web flow.
    #[serde(default)]
    pub web_update: Option<String>,
    #[serde(default)]
    pub fingerprint: Option<String>,
    #[serde(default)]
    pub fingerprint_web: Option<String>,
    #[serde(default)]
    pub changelog: Changelog,
    /// Resource bundle URL; its file name carries the resource version.
    #[serde(default)]
    pub resource: Option<String>,
    #[serde(default)]
    pub bootloader_version: Option<FirmwareVersion>,
    #[serde(default)]
    pub display_bootloader_version: Option<FirmwareVersion>,
    #[serde(default)]
    pub bootloader_resource: Option<String>,
    #[serde(default)]
    pub bootloader_changelog: Option<Changelog>,
}

impl ReleaseEntry {
    pub fn download_url(&self) -> Option<&str> {
        self.url.as_deref().filter(|u| !u.is_empty())
    }

    pub fn bootloader_url(&self) -> Option<&str> {
        self.bootloader_resource.as_deref().filter(|u| !u.is_empty())
    }

    /// Bootloader version shown to users; the display field wins when set.
    pub fn shown_bootloader_version(&self) -> Option<FirmwareVersion> {
        self.display_bootloader_version.or(self.bootloader_version)
    }
}

/// Channels published for one device family.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceReleases {
    channels: BTreeMap<String, Vec<ReleaseEntry>>,
}

impl DeviceReleases {
    pub fn new(channels: BTreeMap<String, Vec<ReleaseEntry>>) -> Self {
        Self { channels }
    }

    /// Entries for a channel, newest first; empty when the channel is absent.
    pub fn channel(&self, name: &str) -> &[ReleaseEntry] {
        self.channels.get(name).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Bridge installers, one link per platform.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BridgeRelease {
    pub version: FirmwareVersion,
    pub linux32_rpm: String,
    pub linux64_rpm: String,
    pub linux32_deb: String,
    pub linux64_deb: String,
    pub win: String,
    pub mac: String,
    pub sha256sum_asc: String,
    pub changelog: Changelog,
}

/// Parsed release configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReleaseConfig {
    devices: BTreeMap<DeviceType, DeviceReleases>,
    bridge: Option<BridgeRelease>,
}

impl ReleaseConfig {
    pub fn new(devices: BTreeMap<DeviceType, DeviceReleases>, bridge: Option<BridgeRelease>) -> Self {
        Self { devices, bridge }
    }

    pub fn from_json(text: &str) -> ConsoleResult<Self> {
        let value: Value = serde_json::from_str(text)?;
        Ok(Self::from_value(value))
    }

    pub fn from_value(value: Value) -> Self {
        let mut devices = BTreeMap::new();
        let mut bridge = None;

        let Value::Object(root) = value else {
            warn!("Release config root is not an object; treating as empty");
            return Self::default();
        };

        for (key, section) in root {
            if key == "bridge" {
                match serde_json::from_value::<BridgeRelease>(section) {
                    Ok(parsed) => bridge = Some(parsed),
                    Err(e) => warn!("Skipping malformed bridge section: {}", e),
                }
                continue;
            }

            let Some(device_type) = DeviceType::from_tag(&key) else {
                continue;
            };
            let Value::Object(channel_map) = section else {
                warn!("Skipping non-object section for device '{}'", key);
                continue;
            };

            let mut channels = BTreeMap::new();
            for (channel, entries) in channel_map {
                match serde_json::from_value::<Vec<ReleaseEntry>>(entries) {
                    Ok(parsed) => {
                        channels.insert(channel, parsed);
                    }
                    Err(e) => warn!("Skipping channel {}/{}: {}", key, channel, e),
                }
            }
            devices.insert(device_type, DeviceReleases::new(channels));
        }

        Self { devices, bridge }
    }

    pub fn device(&self, device_type: DeviceType) -> Option<&DeviceReleases> {
        self.devices.get(&device_type)
    }

    pub fn entries(&self, device_type: DeviceType, channel: &str) -> &[ReleaseEntry] {
        self.device(device_type)
            .map(|d| d.channel(channel))
            .unwrap_or(&[])
    }

    /// Entry with an exact version, or the newest one when `version` is `None`.
    pub fn find_entry(
        &self,
        device_type: DeviceType,
        channel: &str,
        version: Option<FirmwareVersion>,
    ) -> Option<&ReleaseEntry> {
        let entries = self.entries(device_type, channel);
        match version {
            Some(v) => entries.iter().find(|e| e.version == v),
            None => entries.first(),
        }
    }

    pub fn bridge(&self) -> Option<&BridgeRelease> {
        self.bridge.as_ref()
    }
}
