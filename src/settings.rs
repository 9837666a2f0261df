//! Console settings with JSON persistence.
//!
//! Every field has a default, so a missing or partial settings file still
//! loads. New fields only need a default in [`ConsoleSettings::default`].

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::discovery::ScanOptions;
use crate::error::ConsoleResult;
use crate::hardware::{Platform, SdkSettings};
use crate::release::Locale;
use crate::update::SequencerConfig;

pub const DEFAULT_RELEASE_CONFIG_URL: &str = "https://data.onekey.so/config.json";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ConsoleSettings {
    /// Remote release document.
    pub release_config_url: String,
    pub poll_interval_ms: u64,
    /// Seconds without a device before the search-timeout page shows.
    /// Zero disables the timeout.
    pub search_timeout_secs: u64,
    /// Wait after a bootloader bump before the firmware is sent.
    pub bootloader_settle_secs: u64,
    pub progress_tick_ms: u64,
    pub platform: Platform,
    pub locale: Locale,
    /// Directory bundled firmware files are read from (desktop only).
    pub resource_dir: Option<PathBuf>,
    pub log_level: String,
    pub sdk_connect_src: String,
    pub sdk_debug: bool,
    pub pre_release: bool,
}

impl Default for ConsoleSettings {
    fn default() -> Self {
        let sdk = SdkSettings::default();
        Self {
            release_config_url: DEFAULT_RELEASE_CONFIG_URL.to_string(),
            poll_interval_ms: 3000,
            search_timeout_secs: 30,
            bootloader_settle_secs: 15,
            progress_tick_ms: 1000,
            platform: Platform::Web,
            locale: Locale::default(),
            resource_dir: None,
            log_level: "info".to_string(),
            sdk_connect_src: sdk.connect_src,
            sdk_debug: sdk.debug,
            pre_release: sdk.pre_release,
        }
    }
}

impl ConsoleSettings {
    pub fn to_sdk_settings(&self) -> SdkSettings {
        SdkSettings {
            debug: self.sdk_debug,
            connect_src: self.sdk_connect_src.clone(),
            pre_release: self.pre_release,
            ..SdkSettings::default()
        }
    }

    pub fn sequencer_config(&self) -> SequencerConfig {
        SequencerConfig {
            platform: self.platform,
            settle_delay: Duration::from_secs(self.bootloader_settle_secs),
            tick_interval: Duration::from_millis(self.progress_tick_ms.max(1)),
        }
    }

    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            interval: Duration::from_millis(self.poll_interval_ms.max(1)),
            timeout: (self.search_timeout_secs > 0).then(|| Duration::from_secs(self.search_timeout_secs)),
        }
    }

    /// Check if these settings differ from defaults.
    pub fn has_non_default_settings(&self) -> bool {
        *self != Self::default()
    }
}

/// Settings file name stored in app data directory.
const SETTINGS_FILENAME: &str = "console_settings.json";

/// Manages persistence of console settings to JSON file.
pub struct SettingsManager {
    settings_file_path: PathBuf,
}

impl SettingsManager {
    /// Create a new settings manager for the given app data directory.
    pub fn new(app_data_dir: &Path) -> Self {
        let settings_file_path = app_data_dir.join(SETTINGS_FILENAME);
        Self { settings_file_path }
    }

    /// Load settings from disk, returning defaults if file doesn't exist.
    pub fn load(&self) -> ConsoleResult<ConsoleSettings> {
        if !self.settings_file_path.exists() {
            return Ok(ConsoleSettings::default());
        }

        let contents = fs::read_to_string(&self.settings_file_path)?;

        // Handle empty file gracefully
        if contents.trim().is_empty() {
            return Ok(ConsoleSettings::default());
        }

        Ok(serde_json::from_str(&contents)?)
    }

    /// Save settings to disk.
    pub fn save(&self, settings: &ConsoleSettings) -> ConsoleResult<()> {
        if let Some(parent) = self.settings_file_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = serde_json::to_string_pretty(settings)?;
        fs::write(&self.settings_file_path, contents)?;
        Ok(())
    }

    /// Get the path where settings are stored.
    pub fn settings_path(&self) -> &Path {
        &self.settings_file_path
    }
}
