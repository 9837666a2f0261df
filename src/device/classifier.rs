//! Derives device family, mode and versions from a feature payload.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::features::Features;
use super::version::FirmwareVersion;

/// Device family tag, as used for release-config lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    Classic,
    Classic1s,
    Mini,
    Touch,
    Pro,
    ClassicPure,
    Unknown,
}

impl DeviceType {
    pub const ALL: [DeviceType; 7] = [
        DeviceType::Classic,
        DeviceType::Classic1s,
        DeviceType::Mini,
        DeviceType::Touch,
        DeviceType::Pro,
        DeviceType::ClassicPure,
        DeviceType::Unknown,
    ];

    /// Release-config key for this family.
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceType::Classic => "classic",
            DeviceType::Classic1s => "classic1s",
            DeviceType::Mini => "mini",
            DeviceType::Touch => "touch",
            DeviceType::Pro => "pro",
            DeviceType::ClassicPure => "classicpure",
            DeviceType::Unknown => "unknown",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(tag.trim()))
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            DeviceType::Classic => "OneKey Classic",
            DeviceType::Classic1s => "OneKey Classic 1S",
            DeviceType::Mini => "OneKey Mini",
            DeviceType::Touch => "OneKey Touch",
            DeviceType::Pro => "OneKey Pro",
            DeviceType::ClassicPure => "OneKey Classic 1S Pure",
            DeviceType::Unknown => "Unknown device",
        }
    }

    /// Button-driven families sharing the legacy single firmware channel.
    pub fn is_classic_family(&self) -> bool {
        matches!(
            self,
            DeviceType::Classic | DeviceType::Classic1s | DeviceType::Mini | DeviceType::ClassicPure
        )
    }

    /// Families whose firmware update may first require a bootloader bump
    /// through the separate prerequisite check.
    pub fn requires_bootloader_prerequisite(&self) -> bool {
        matches!(
            self,
            DeviceType::Classic | DeviceType::Classic1s | DeviceType::Mini
        )
    }

    /// Touchscreen families with a standalone bootloader upgrade path.
    pub fn is_touch_family(&self) -> bool {
        matches!(self, DeviceType::Touch | DeviceType::Pro)
    }

    pub fn has_ble(&self) -> bool {
        !matches!(self, DeviceType::Mini | DeviceType::Unknown)
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Serial prefixes older firmware uses instead of an explicit type tag.
const SERIAL_PREFIXES: [(&str, DeviceType); 3] = [
    ("MI", DeviceType::Mini),
    ("TC", DeviceType::Touch),
    ("PR", DeviceType::Pro),
];

/// Determine the device family.
///
/// An explicit OneKey type tag wins. Otherwise the serial prefix decides, and
/// finally a model of `"1"` marks a classic. Anything else is `Unknown`.
pub fn classify(features: &Features) -> DeviceType {
    if let Some(tag) = features.onekey_device_type.as_deref() {
        let normalized = tag.trim().to_ascii_lowercase();
        let explicit = match normalized.as_str() {
            "classic" => Some(DeviceType::Classic),
            "classic1s" => Some(DeviceType::Classic1s),
            "mini" => Some(DeviceType::Mini),
            "touch" => Some(DeviceType::Touch),
            "pro" => Some(DeviceType::Pro),
            "pure" | "classicpure" | "classic1s_pure" => Some(DeviceType::ClassicPure),
            _ => None,
        };
        if let Some(device_type) = explicit {
            return device_type;
        }
    }

    if let Some(serial) = features.serial() {
        let upper = serial.to_ascii_uppercase();
        if let Some((_, device_type)) = SERIAL_PREFIXES
            .iter()
            .find(|(prefix, _)| upper.starts_with(prefix))
        {
            return *device_type;
        }
    }

    match features.model.as_deref().map(str::trim) {
        Some("1") => DeviceType::Classic,
        _ => DeviceType::Unknown,
    }
}

pub fn is_bootloader_mode(features: &Features) -> bool {
    features.in_bootloader_mode()
}

pub fn firmware_version(features: &Features) -> FirmwareVersion {
    features.firmware_version_source().resolve()
}

pub fn bootloader_version(features: &Features) -> FirmwareVersion {
    features
        .bootloader_version_source()
        .map(|source| source.resolve())
        .unwrap_or(FirmwareVersion::UNKNOWN)
}

pub fn ble_version(features: &Features) -> FirmwareVersion {
    features
        .ble_version_source()
        .map(|source| source.resolve())
        .unwrap_or(FirmwareVersion::UNKNOWN)
}
