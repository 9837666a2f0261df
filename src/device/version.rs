//! Three-part firmware version triples.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A `major.minor.patch` version as reported by devices and release configs.
///
/// `0.0.0` is the "unknown" sentinel: the classifier falls back to it whenever
/// a device reports nothing parseable.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(from = "[u32; 3]", into = "[u32; 3]")]
pub struct FirmwareVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl FirmwareVersion {
    pub const UNKNOWN: FirmwareVersion = FirmwareVersion::new(0, 0, 0);

    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    pub fn is_unknown(&self) -> bool {
        *self == Self::UNKNOWN
    }

    pub fn as_array(&self) -> [u32; 3] {
        [self.major, self.minor, self.patch]
    }

    /// Parse a dotted version string.
    ///
    /// Strict semver is tried first. Devices also report shortened forms such
    /// as `"2.8"` or build-suffixed ones such as `"3.4.0-beta"`, so the
    /// fallback keeps the numeric prefix of each of the first three segments
    /// and fills missing segments with zero.
    pub fn parse(input: &str) -> Option<Self> {
        let trimmed = input.trim().trim_start_matches(&['v', 'V'][..]);
        if trimmed.is_empty() {
            return None;
        }

        if let Ok(v) = semver::Version::parse(trimmed) {
            return Some(Self::new(
                u32::try_from(v.major).ok()?,
                u32::try_from(v.minor).ok()?,
                u32::try_from(v.patch).ok()?,
            ));
        }

        let mut parts = [0u32; 3];
        let mut seen = 0;
        for (slot, segment) in parts.iter_mut().zip(trimmed.split('.')) {
            let digits: String = segment.chars().take_while(|c| c.is_ascii_digit()).collect();
            if digits.is_empty() {
                break;
            }
            *slot = digits.parse().ok()?;
            seen += 1;
            if digits.len() != segment.len() {
                break;
            }
        }

        (seen > 0).then(|| Self::from(parts))
    }
}

impl From<[u32; 3]> for FirmwareVersion {
    fn from(parts: [u32; 3]) -> Self {
        Self::new(parts[0], parts[1], parts[2])
    }
}

impl From<FirmwareVersion> for [u32; 3] {
    fn from(version: FirmwareVersion) -> Self {
        version.as_array()
    }
}

impl fmt::Display for FirmwareVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Where a device reported a version from.
///
/// Newer firmware sends a single dotted string; older firmware and bootloader
/// mode only populate the three numeric fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionSource<'a> {
    Unified(&'a str),
    Discrete {
        major: Option<u32>,
        minor: Option<u32>,
        patch: Option<u32>,
    },
}

impl VersionSource<'_> {
    /// Resolve to a concrete version, or [`FirmwareVersion::UNKNOWN`].
    pub fn resolve(&self) -> FirmwareVersion {
        match *self {
            VersionSource::Unified(text) => {
                FirmwareVersion::parse(text).unwrap_or(FirmwareVersion::UNKNOWN)
            }
            VersionSource::Discrete {
                major: None,
                minor: None,
                patch: None,
            } => FirmwareVersion::UNKNOWN,
            VersionSource::Discrete {
                major,
                minor,
                patch,
            } => FirmwareVersion::new(
                major.unwrap_or(0),
                minor.unwrap_or(0),
                patch.unwrap_or(0),
            ),
        }
    }
}
