//! OneKey firmware update console.
//!
//! The library holds everything except the desktop window: device
//! classification, release selection, update sequencing, progress and
//! discovery. [`ConsoleContext`] wires them together around one hardware
//! SDK and one store.

pub mod device;
pub mod discovery;
pub mod error;
pub mod hardware;
pub mod logging;
pub mod release;
pub mod settings;
pub mod single_flight;
pub mod store;
pub mod update;

#[cfg(test)]
mod test_helpers;

use std::path::Path;
use std::sync::Arc;

use reqwest::Client;
use tracing::{info, warn};

use discovery::{DevicePoller, SearchState};
use error::{ConsoleError, ConsoleResult};
use hardware::{BridgeReleaseInfo, HardwareSdk, HardwareService, SearchOutcome};
use release::selector::{self, ReleaseSummary, V3ComponentRelease};
use release::{ArtifactCache, BridgeReleaseMap, HttpArtifactSource, ReleaseConfigCache, ResourceReader};
use settings::ConsoleSettings;
use store::{ConsoleStore, PageStatus};
use update::UpdateSequencer;

/// Everything a running console shares.
pub struct ConsoleContext {
    pub settings: ConsoleSettings,
    pub store: ConsoleStore,
    pub hardware: Arc<HardwareService>,
    pub releases: Arc<ReleaseConfigCache>,
    pub sequencer: UpdateSequencer,
    pub poller: DevicePoller,
    resources: Option<ResourceReader>,
}

impl ConsoleContext {
    /// Build a context. Caches and snapshots live under `app_data_dir`.
    pub fn new(settings: ConsoleSettings, sdk: Arc<dyn HardwareSdk>, app_data_dir: &Path) -> Self {
        let client = Client::new();
        let store = ConsoleStore::new();
        let hardware = Arc::new(HardwareService::new(sdk, settings.to_sdk_settings(), store.clone()));
        let releases = Arc::new(ReleaseConfigCache::new(
            client.clone(),
            settings.release_config_url.clone(),
            Some(app_data_dir),
        ));
        let artifacts = Arc::new(HttpArtifactSource::new(client, Some(ArtifactCache::new(app_data_dir))));
        Self::assemble(settings, store, hardware, releases, artifacts)
    }

    fn assemble(
        settings: ConsoleSettings,
        store: ConsoleStore,
        hardware: Arc<HardwareService>,
        releases: Arc<ReleaseConfigCache>,
        artifacts: Arc<dyn release::ArtifactSource>,
    ) -> Self {
        let sequencer = UpdateSequencer::new(
            hardware.clone(),
            store.clone(),
            releases.clone(),
            artifacts,
            settings.sequencer_config(),
        );
        let poller = DevicePoller::new(hardware.clone(), store.clone(), settings.scan_options());
        let resources = settings.resource_dir.clone().map(ResourceReader::new);
        Self {
            settings,
            store,
            hardware,
            releases,
            sequencer,
            poller,
            resources,
        }
    }

    /// Load release data and start looking for devices.
    pub async fn bootstrap<R, S>(&self, on_result: R, on_state_change: S)
    where
        R: Fn(&SearchOutcome) + Send + Sync + 'static,
        S: Fn(SearchState) + Send + Sync + 'static,
    {
        info!("Bootstrapping console");
        if let Err(e) = self.releases.get().await {
            warn!("Starting without release config [{}]: {}", e.error_code(), e);
        }
        self.poller.start_scanning(on_result, on_state_change);
    }

    /// Whether the desktop bridge runs; shows the install page if not.
    pub async fn check_bridge(&self) -> bool {
        let running = self.hardware.check_bridge_status().await;
        if !running {
            self.store.set_page_status(PageStatus::UninstallBridge);
        }
        running
    }

    pub async fn check_bridge_release(&self, will_update_firmware_version: String) -> BridgeReleaseInfo {
        self.hardware.check_bridge_release(will_update_firmware_version).await
    }

    /// Newest release for each tab the current device shows.
    pub async fn release_summaries(&self) -> ConsoleResult<Vec<ReleaseSummary>> {
        let Some(device) = self.store.snapshot().device else {
            return Ok(Vec::new());
        };
        let config = self.releases.get().await?;
        Ok(device
            .update_tabs()
            .into_iter()
            .filter_map(|category| selector::release_summary(&config, &device, category, self.settings.locale))
            .collect())
    }

    /// Rows of the multi-component table; empty unless the device qualifies.
    pub async fn v3_components(&self) -> ConsoleResult<Vec<V3ComponentRelease>> {
        let Some(device) = self.store.snapshot().device else {
            return Ok(Vec::new());
        };
        let config = self.releases.get().await?;
        Ok(selector::v3_components(&config, &device, self.settings.locale))
    }

    pub async fn bridge_links(&self) -> ConsoleResult<BridgeReleaseMap> {
        let config = self.releases.get().await?;
        Ok(config
            .bridge()
            .map(BridgeReleaseMap::from_release)
            .unwrap_or_default())
    }

    /// Read a bundled firmware file by name.
    pub async fn read_resource(&self, name: &str) -> ConsoleResult<Vec<u8>> {
        match &self.resources {
            Some(reader) => reader.read(name).await,
            None => Err(ConsoleError::InvalidResourceName { name: name.to_string() }),
        }
    }
}
