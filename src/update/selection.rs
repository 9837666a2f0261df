//! What the user picked to install.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::device::{Device, FirmwareVersion};
use crate::error::{ConsoleError, ConsoleResult};
use crate::release::selector::{self, V3Component};
use crate::release::{ReleaseConfig, UpdateCategory};

/// A firmware file supplied by the user, read fully into memory.
#[derive(Clone, PartialEq, Eq)]
pub struct LocalFirmware {
    pub file_name: String,
    pub data: Vec<u8>,
}

/// Name and size of a local file, for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalFileInfo {
    pub file_name: String,
    pub size: usize,
    pub kind: Option<String>,
}

impl LocalFirmware {
    pub fn new(file_name: impl Into<String>, data: Vec<u8>) -> ConsoleResult<Self> {
        let file_name = file_name.into();
        if data.is_empty() {
            return Err(ConsoleError::EmptyFile { file_name });
        }
        Ok(Self { file_name, data })
    }

    pub async fn read(path: &Path) -> ConsoleResult<Self> {
        let data = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self::new(file_name, data)
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Lowercased file extension, e.g. `bin`.
    pub fn kind(&self) -> Option<String> {
        Path::new(&self.file_name)
            .extension()
            .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
    }

    pub fn info(&self) -> LocalFileInfo {
        LocalFileInfo {
            file_name: self.file_name.clone(),
            size: self.size(),
            kind: self.kind(),
        }
    }
}

impl fmt::Debug for LocalFirmware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalFirmware")
            .field("file_name", &self.file_name)
            .field("size", &self.data.len())
            .finish()
    }
}

/// Where a single-target update takes its artifact from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateSource {
    /// A release entry, identified by channel and entry version.
    Remote {
        channel: String,
        version: FirmwareVersion,
    },
    Local(LocalFirmware),
}

/// Target of a single-artifact (V2) or standalone bootloader update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateSelection {
    pub category: UpdateCategory,
    pub source: UpdateSource,
}

impl UpdateSelection {
    pub fn remote(category: UpdateCategory, channel: impl Into<String>, version: FirmwareVersion) -> Self {
        Self {
            category,
            source: UpdateSource::Remote {
                channel: channel.into(),
                version,
            },
        }
    }

    pub fn local(category: UpdateCategory, firmware: LocalFirmware) -> Self {
        Self {
            category,
            source: UpdateSource::Local(firmware),
        }
    }

    /// Newest release of `category` available for `device`.
    pub fn latest(config: &ReleaseConfig, device: &Device, category: UpdateCategory) -> ConsoleResult<Self> {
        let no_artifact = || ConsoleError::NoArtifact {
            device_type: device.device_type,
            category,
        };
        let resolved = selector::resolve(config, device.device_type, category, Some(device.firmware_version))
            .ok_or_else(no_artifact)?;
        let entry = match category {
            UpdateCategory::Bootloader => resolved.entries.iter().find(|e| e.bootloader_url().is_some()),
            _ => resolved.latest(),
        }
        .ok_or_else(no_artifact)?;
        Ok(Self::remote(category, resolved.channel, entry.version))
    }

    pub fn is_local(&self) -> bool {
        matches!(self.source, UpdateSource::Local(_))
    }

    /// Version the device will run afterwards, when known up front.
    pub fn target_version(&self) -> Option<FirmwareVersion> {
        match &self.source {
            UpdateSource::Remote { version, .. } => Some(*version),
            UpdateSource::Local(_) => None,
        }
    }
}

/// Tab of the multi-component table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum V3Tab {
    #[serde(rename = "v3-remote")]
    Remote,
    #[serde(rename = "v3-local")]
    Local,
}

/// Source of one component in a multi-component update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComponentSource {
    /// A version from the release table. Only the resource bundle may
    /// omit it.
    Remote { version: Option<String> },
    Local(LocalFirmware),
}

impl ComponentSource {
    pub fn tab(&self) -> V3Tab {
        match self {
            ComponentSource::Remote { .. } => V3Tab::Remote,
            ComponentSource::Local(_) => V3Tab::Local,
        }
    }
}

/// Components ticked in the multi-component table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct V3Selections {
    selected: BTreeMap<V3Component, ComponentSource>,
}

impl V3Selections {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select `component`, replacing any earlier choice for it.
    pub fn select(&mut self, component: V3Component, source: ComponentSource) -> ConsoleResult<()> {
        if let ComponentSource::Remote { version } = &source {
            let missing = version.as_deref().map_or(true, str::is_empty);
            if missing && component != V3Component::Resource {
                return Err(ConsoleError::InvalidSelection {
                    reason: format!("remote {:?} selection needs a version", component),
                });
            }
        }
        self.selected.insert(component, source);
        Ok(())
    }

    pub fn deselect(&mut self, component: V3Component) {
        self.selected.remove(&component);
    }

    pub fn get(&self, component: V3Component) -> Option<&ComponentSource> {
        self.selected.get(&component)
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// Selections that belong to `tab`, in component order.
    pub fn for_tab(&self, tab: V3Tab) -> Vec<(V3Component, &ComponentSource)> {
        self.selected
            .iter()
            .filter(|(_, source)| source.tab() == tab)
            .map(|(component, source)| (*component, source))
            .collect()
    }
}
