//! Drives one update session from confirmation to a result.
//!
//! Every public entry point classifies its own failures into an
//! [`UpdateOutcome`] and leaves the session in a terminal state; nothing is
//! returned as `Err`.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use super::messages::{self, failure_message};
use super::progress::spawn_ticker;
use super::selection::{ComponentSource, UpdateSelection, UpdateSource, V3Selections, V3Tab};
use super::session::{InstallType, UpdatePhase};
use crate::device::{Device, FirmwareVersion};
use crate::error::{ConsoleError, ConsoleResult};
use crate::hardware::{
    FirmwareUpdateV2Params, FirmwareUpdateV3Params, HardwareSdk, HardwareService, Platform, SdkResponse,
};
use crate::release::selector::{self, V3Component, CHANNEL_BLE, CHANNEL_FIRMWARE_V7};
use crate::release::{ArtifactSource, ReleaseConfig, ReleaseConfigCache, UpdateCategory};
use crate::single_flight::SingleFlight;
use crate::store::ConsoleStore;

/// Wait after a bootloader bump while the device reboots and re-enumerates.
pub const BOOTLOADER_SETTLE_DELAY: Duration = Duration::from_secs(15);

pub const PROGRESS_TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Why an update request never started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RejectReason {
    NoDevice,
    UpdateInProgress,
    NothingSelected,
    NothingToUpdate,
    Unsupported,
    ReleaseConfigUnavailable,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "message", rename_all = "kebab-case")]
pub enum UpdateOutcome {
    Succeeded(String),
    Failed(String),
    Rejected(RejectReason),
}

impl UpdateOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, UpdateOutcome::Succeeded(_))
    }
}

#[derive(Debug, Clone)]
pub struct SequencerConfig {
    pub platform: Platform,
    pub settle_delay: Duration,
    pub tick_interval: Duration,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            platform: Platform::Web,
            settle_delay: BOOTLOADER_SETTLE_DELAY,
            tick_interval: PROGRESS_TICK_INTERVAL,
        }
    }
}

pub struct UpdateSequencer {
    hardware: Arc<HardwareService>,
    store: ConsoleStore,
    releases: Arc<ReleaseConfigCache>,
    artifacts: Arc<dyn ArtifactSource>,
    config: SequencerConfig,
    reboot: SingleFlight<bool>,
}

impl UpdateSequencer {
    pub fn new(
        hardware: Arc<HardwareService>,
        store: ConsoleStore,
        releases: Arc<ReleaseConfigCache>,
        artifacts: Arc<dyn ArtifactSource>,
        config: SequencerConfig,
    ) -> Self {
        Self {
            hardware,
            store,
            releases,
            artifacts,
            config,
            reboot: SingleFlight::new(),
        }
    }

    /// Show the confirmation step for the current selection.
    pub fn confirm(&self) -> bool {
        self.store.update(|state| state.session.confirm())
    }

    /// Return a finished or unconfirmed session to idle.
    pub fn dismiss(&self) {
        self.store.update(|state| state.session.dismiss());
    }

    /// Single-artifact update of firmware or BLE.
    ///
    /// Classic, classic1s and mini devices first get a bootloader bump when
    /// the SDK says the target firmware needs one.
    pub async fn start_v2_update(&self, selection: UpdateSelection) -> UpdateOutcome {
        let device = match self.current_device() {
            Ok(device) => device,
            Err(reason) => return self.reject(reason),
        };
        let id = match self.begin(&device, InstallType::Firmware, UpdatePhase::CheckingBootloaderPrerequisite) {
            Ok(id) => id,
            Err(reason) => return self.reject(reason),
        };
        info!(
            "Starting {} update on {} (session {})",
            selection.category,
            device.display_label(),
            id
        );
        spawn_ticker(self.store.clone(), id, self.config.tick_interval);

        let result = self.run_v2(&device, selection).await;
        self.finish(result, messages::FIRMWARE_INSTALLED_FAILED)
    }

    /// Multi-component update from the table on `tab`.
    pub async fn start_v3_update(&self, tab: V3Tab, selections: &V3Selections) -> UpdateOutcome {
        let device = match self.current_device() {
            Ok(device) => device,
            Err(reason) => return self.reject(reason),
        };
        if !device.is_v3_eligible() {
            return self.reject(RejectReason::Unsupported);
        }

        let chosen = selections.for_tab(tab);
        if chosen.is_empty() {
            return self.reject(RejectReason::NothingSelected);
        }

        let mut params = match tab {
            V3Tab::Remote => match self.releases.get().await {
                Ok(config) => pack_remote(&config, &device, &chosen),
                Err(e) => {
                    warn!("Cannot resolve components without release config: {}", e);
                    return self.reject(RejectReason::ReleaseConfigUnavailable);
                }
            },
            V3Tab::Local => pack_local(&device, &chosen),
        };
        if !params.has_content() {
            return self.reject(RejectReason::NothingToUpdate);
        }
        params.platform = self.config.platform;

        let id = match self.begin(&device, InstallType::Firmware, UpdatePhase::Transferring) {
            Ok(id) => id,
            Err(reason) => return self.reject(reason),
        };
        info!(
            "Starting multi-component update on {} with {} component(s) (session {})",
            device.display_label(),
            chosen.len(),
            id
        );
        spawn_ticker(self.store.clone(), id, self.config.tick_interval);

        let result = self.run_v3(params).await;
        self.finish(result, messages::FIRMWARE_INSTALLED_FAILED)
    }

    /// Flash only the bootloader of a touch or pro device.
    pub async fn bootloader_standalone_update(&self, selection: UpdateSelection) -> UpdateOutcome {
        let device = match self.current_device() {
            Ok(device) => device,
            Err(reason) => return self.reject(reason),
        };
        if !device.supports_bootloader_update() {
            return self.reject(RejectReason::Unsupported);
        }
        let id = match self.begin(&device, InstallType::Bootloader, UpdatePhase::AcquiringArtifact) {
            Ok(id) => id,
            Err(reason) => return self.reject(reason),
        };
        info!("Starting bootloader update on {} (session {})", device.display_label(), id);
        spawn_ticker(self.store.clone(), id, self.config.tick_interval);

        let result = self.run_bootloader(&device, selection).await;
        self.finish(result, messages::BOOTLOADER_INSTALLED_FAILED)
    }

    /// Ask a touch or pro device to reboot into its bootloader.
    ///
    /// Calls made while a reboot is outstanding share its result.
    pub async fn reboot_to_bootloader(&self) -> bool {
        let device = match self.current_device() {
            Ok(device) if device.supports_reboot_to_bootloader() => device,
            Ok(device) => {
                warn!("{} cannot reboot into the bootloader", device.display_label());
                return false;
            }
            Err(_) => return false,
        };

        let hardware = self.hardware.clone();
        let connect_id = device.connect_id.clone();
        let flight = self
            .reboot
            .run(move || async move {
                info!("Rebooting device into bootloader");
                let response = match hardware.sdk().await {
                    Ok(sdk) => sdk.device_reboot_to_boardloader(connect_id).await,
                    Err(e) => Err(e),
                };
                match response {
                    Ok(SdkResponse::Success(())) => true,
                    Ok(SdkResponse::Unsuccessful(failure)) => {
                        warn!("Reboot to bootloader unsuccessful: {}", failure.error);
                        false
                    }
                    Err(e) => {
                        warn!("Reboot to bootloader failed: {}", e);
                        false
                    }
                }
            })
            .await;
        if !flight.leader {
            debug!("Joined outstanding reboot request");
        }
        flight.value
    }

    /// Re-upload the resource bundle of a touch device.
    pub async fn repair_resources(&self) -> bool {
        match self.current_device() {
            Ok(device) if device.supports_resource_repair() => {
                self.hardware.upload_full_resource(device.connect_id).await
            }
            _ => {
                warn!("Resource repair is not available for the current device");
                false
            }
        }
    }

    async fn run_v2(&self, device: &Device, selection: UpdateSelection) -> ConsoleResult<UpdateOutcome> {
        let sdk = self.hardware.sdk().await?;

        // Local binaries carry no known target version, so there is nothing
        // to check the bootloader against.
        if device.device_type.requires_bootloader_prerequisite() {
            if let Some(version) = selection.target_version() {
                if let Some(message) = self.bootloader_prerequisite(&sdk, device, version).await? {
                    return Ok(UpdateOutcome::Failed(message));
                }
            }
        }

        self.store.update(|state| {
            state.session.switch_install_type(InstallType::Firmware);
            state.session.enter(UpdatePhase::AcquiringArtifact);
        });

        let mut params = FirmwareUpdateV2Params {
            connect_id: device.connect_id.clone(),
            update_type: Some(selection.category),
            platform: self.config.platform,
            ..Default::default()
        };
        match selection.source {
            UpdateSource::Local(firmware) => {
                debug!("Using local file {} ({} bytes)", firmware.file_name, firmware.size());
                params.binary = Some(firmware.data);
            }
            UpdateSource::Remote { channel, version }
                if selector::is_legacy_touch_channel(device.device_type, &channel) =>
            {
                let config = self.releases.get().await?;
                params.binary = Some(self.download_firmware(&config, device, &channel, version).await?);
            }
            UpdateSource::Remote { version, .. } => params.version = Some(version),
        }

        self.enter(UpdatePhase::Transferring);
        match sdk.firmware_update_v2(params).await? {
            SdkResponse::Success(()) => {
                self.enter(UpdatePhase::Verifying);
                Ok(UpdateOutcome::Succeeded(messages::FIRMWARE_INSTALLED_SUCCESS.to_string()))
            }
            SdkResponse::Unsuccessful(failure) => Ok(UpdateOutcome::Failed(failure_message(&failure))),
        }
    }

    /// Bump the bootloader when the SDK says `target` needs a newer one.
    ///
    /// Returns the alert message when the bump itself fails.
    async fn bootloader_prerequisite(
        &self,
        sdk: &Arc<dyn HardwareSdk>,
        device: &Device,
        target: FirmwareVersion,
    ) -> ConsoleResult<Option<String>> {
        let check = sdk
            .check_bootloader_release(device.connect_id.clone(), target.to_string())
            .await?;
        match check {
            SdkResponse::Success(info) if info.should_update => {
                info!("Firmware {} needs a bootloader update first ({})", target, info.status);
            }
            SdkResponse::Success(_) => {
                debug!("Bootloader is compatible with firmware {}", target);
                return Ok(None);
            }
            SdkResponse::Unsuccessful(failure) => {
                warn!("Bootloader check unsuccessful, continuing: {}", failure.error);
                return Ok(None);
            }
        }

        self.store.update(|state| {
            state.session.switch_install_type(InstallType::Bootloader);
            state.session.enter(UpdatePhase::Transferring);
        });
        let response = sdk
            .firmware_update_v2(FirmwareUpdateV2Params {
                connect_id: device.connect_id.clone(),
                update_type: Some(UpdateCategory::Firmware),
                platform: self.config.platform,
                is_update_bootloader: true,
                ..Default::default()
            })
            .await?;
        if let SdkResponse::Unsuccessful(failure) = response {
            error!("Bootloader update failed: {}", failure.error);
            return Ok(Some(failure_message(&failure)));
        }

        info!("Bootloader updated; waiting {:?} for the device to settle", self.config.settle_delay);
        tokio::time::sleep(self.config.settle_delay).await;
        Ok(None)
    }

    async fn run_v3(&self, params: FirmwareUpdateV3Params) -> ConsoleResult<UpdateOutcome> {
        let sdk = self.hardware.sdk().await?;
        match sdk.firmware_update_v3(params).await? {
            SdkResponse::Success(()) => {
                self.enter(UpdatePhase::Verifying);
                Ok(UpdateOutcome::Succeeded(messages::FIRMWARE_INSTALLED_SUCCESS.to_string()))
            }
            SdkResponse::Unsuccessful(failure) => Ok(UpdateOutcome::Failed(failure_message(&failure))),
        }
    }

    async fn run_bootloader(&self, device: &Device, selection: UpdateSelection) -> ConsoleResult<UpdateOutcome> {
        let sdk = self.hardware.sdk().await?;
        let binary = match selection.source {
            UpdateSource::Local(firmware) => firmware.data,
            UpdateSource::Remote { channel, version } => {
                let config = self.releases.get().await?;
                let entry = config
                    .find_entry(device.device_type, &channel, Some(version))
                    .ok_or(ConsoleError::NoArtifact {
                        device_type: device.device_type,
                        category: UpdateCategory::Bootloader,
                    })?;
                let url = entry.bootloader_url().ok_or_else(|| ConsoleError::MissingArtifactUrl {
                    channel: channel.clone(),
                    version,
                })?;
                self.artifacts.download(url.to_string()).await?
            }
        };

        self.enter(UpdatePhase::Transferring);
        match sdk.device_update_bootloader(device.connect_id.clone(), binary).await? {
            SdkResponse::Success(()) => {
                self.enter(UpdatePhase::Verifying);
                Ok(UpdateOutcome::Succeeded(messages::BOOTLOADER_INSTALLED_SUCCESS.to_string()))
            }
            SdkResponse::Unsuccessful(failure) => Ok(UpdateOutcome::Failed(failure_message(&failure))),
        }
    }

    async fn download_firmware(
        &self,
        config: &ReleaseConfig,
        device: &Device,
        channel: &str,
        version: FirmwareVersion,
    ) -> ConsoleResult<Vec<u8>> {
        let entry = config
            .find_entry(device.device_type, channel, Some(version))
            .ok_or(ConsoleError::NoArtifact {
                device_type: device.device_type,
                category: UpdateCategory::Firmware,
            })?;
        let url = entry.download_url().ok_or_else(|| ConsoleError::MissingArtifactUrl {
            channel: channel.to_string(),
            version,
        })?;
        self.artifacts.download(url.to_string()).await
    }

    fn current_device(&self) -> Result<Device, RejectReason> {
        self.store.snapshot().device.ok_or(RejectReason::NoDevice)
    }

    fn begin(&self, device: &Device, install_type: InstallType, phase: UpdatePhase) -> Result<u64, RejectReason> {
        self.store
            .update(|state| state.session.begin(install_type, device.clone(), phase))
            .ok_or(RejectReason::UpdateInProgress)
    }

    fn enter(&self, phase: UpdatePhase) {
        self.store.update(|state| state.session.enter(phase));
    }

    fn reject(&self, reason: RejectReason) -> UpdateOutcome {
        let notice = match reason {
            RejectReason::NoDevice => messages::NO_DEVICE,
            RejectReason::UpdateInProgress => messages::UPDATE_IN_PROGRESS,
            RejectReason::NothingSelected => messages::NO_COMPONENTS_SELECTED,
            RejectReason::NothingToUpdate => messages::NO_FIRMWARE_TO_UPDATE,
            RejectReason::Unsupported => messages::UPDATE_UNSUPPORTED,
            RejectReason::ReleaseConfigUnavailable => messages::NO_FIRMWARE_AVAILABLE,
        };
        info!("Update request rejected: {:?}", reason);
        self.store.set_notice(Some(notice.to_string()));
        UpdateOutcome::Rejected(reason)
    }

    fn finish(&self, result: ConsoleResult<UpdateOutcome>, fallback: &str) -> UpdateOutcome {
        let outcome = result.unwrap_or_else(|e| {
            error!("Update aborted [{}]: {}", e.error_code(), e);
            UpdateOutcome::Failed(fallback.to_string())
        });
        self.store.update(|state| match &outcome {
            UpdateOutcome::Succeeded(message) => state.session.succeed(message.as_str()),
            UpdateOutcome::Failed(message) => state.session.fail(message.as_str()),
            UpdateOutcome::Rejected(_) => {}
        });
        match &outcome {
            UpdateOutcome::Succeeded(message) => info!("Update finished: {}", message),
            UpdateOutcome::Failed(message) => warn!("Update failed: {}", message),
            UpdateOutcome::Rejected(_) => {}
        }
        outcome
    }
}

/// Versions for the remote components that exist in the release config.
///
/// Components whose selected version cannot be found contribute nothing.
fn pack_remote(
    config: &ReleaseConfig,
    device: &Device,
    chosen: &[(V3Component, &ComponentSource)],
) -> FirmwareUpdateV3Params {
    let firmware = config.entries(device.device_type, CHANNEL_FIRMWARE_V7);
    let ble = config.entries(device.device_type, CHANNEL_BLE);
    let mut params = FirmwareUpdateV3Params {
        connect_id: device.connect_id.clone(),
        ..Default::default()
    };

    for (component, source) in chosen {
        let ComponentSource::Remote { version } = source else {
            continue;
        };
        let wanted = version.as_deref().and_then(FirmwareVersion::parse);
        match component {
            V3Component::Firmware => {
                if let Some(entry) = wanted.and_then(|v| firmware.iter().find(|e| e.version == v)) {
                    params.firmware_version = Some(entry.version);
                    params.forced_update_res = true;
                }
            }
            V3Component::Ble => {
                params.ble_version = wanted.and_then(|v| ble.iter().find(|e| e.version == v)).map(|e| e.version);
            }
            V3Component::Bootloader => {
                params.bootloader_version = wanted
                    .and_then(|v| firmware.iter().find_map(|e| e.bootloader_version.filter(|b| *b == v)));
            }
            V3Component::Resource => {
                let has_bundle = firmware
                    .first()
                    .and_then(|e| e.resource.as_deref())
                    .is_some_and(|url| !url.is_empty());
                if has_bundle {
                    params.forced_update_res = true;
                }
            }
        }
    }
    params
}

fn pack_local(device: &Device, chosen: &[(V3Component, &ComponentSource)]) -> FirmwareUpdateV3Params {
    let mut params = FirmwareUpdateV3Params {
        connect_id: device.connect_id.clone(),
        ..Default::default()
    };
    for (component, source) in chosen {
        let ComponentSource::Local(file) = source else {
            continue;
        };
        let binary = Some(file.data.clone());
        match component {
            V3Component::Firmware => params.firmware_binary = binary,
            V3Component::Ble => params.ble_binary = binary,
            V3Component::Bootloader => params.bootloader_binary = binary,
            V3Component::Resource => params.resource_binary = binary,
        }
    }
    params
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DeviceType;
    use crate::hardware::{SdkFailure, SdkSettings};
    use crate::release::artifacts::MockArtifactSource;
    use crate::release::selector::{CHANNEL_FIRMWARE_V2, CHANNEL_FIRMWARE_V5, CHANNEL_FIRMWARE_V8};
    use crate::test_helpers::{
        mock_sdk, DeviceBuilder, ReleaseConfigBuilder, ReleaseEntryBuilder, ScriptedSdk, SdkCall,
    };
    use crate::update::selection::LocalFirmware;
    use crate::update::session::SessionState;

    fn sequencer(
        sdk: Arc<dyn HardwareSdk>,
        config: ReleaseConfig,
        artifacts: MockArtifactSource,
        device: Device,
    ) -> (UpdateSequencer, ConsoleStore) {
        let store = ConsoleStore::new();
        store.set_discovered_device(Some(device));
        let hardware = Arc::new(HardwareService::new(sdk, SdkSettings::default(), store.clone()));
        let sequencer = UpdateSequencer::new(
            hardware,
            store.clone(),
            Arc::new(ReleaseConfigCache::preloaded(config)),
            Arc::new(artifacts),
            SequencerConfig::default(),
        );
        (sequencer, store)
    }

    fn pro_v7_config() -> ReleaseConfig {
        ReleaseConfigBuilder::new()
            .channel(
                DeviceType::Pro,
                CHANNEL_FIRMWARE_V7,
                vec![ReleaseEntryBuilder::new(4, 12, 0)
                    .bootloader(FirmwareVersion::new(2, 9, 1), "https://example.com/boot.bin")
                    .resource("https://example.com/res-1.0.2-4.12.0.bin")
                    .build()],
            )
            .channel(DeviceType::Pro, CHANNEL_BLE, vec![ReleaseEntryBuilder::new(2, 3, 4).build()])
            .build()
    }

    fn remote(version: &str) -> ComponentSource {
        ComponentSource::Remote {
            version: Some(version.to_string()),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_classic_bootloader_bump_runs_before_firmware() {
        let sdk = Arc::new(ScriptedSdk::new().with_bootloader_update_required(true));
        let (sequencer, store) = sequencer(
            sdk.clone(),
            ReleaseConfig::default(),
            MockArtifactSource::new(),
            DeviceBuilder::classic().build(),
        );

        let outcome = sequencer
            .start_v2_update(UpdateSelection::remote(
                UpdateCategory::Firmware,
                CHANNEL_FIRMWARE_V8,
                FirmwareVersion::new(5, 0, 0),
            ))
            .await;
        assert_eq!(
            outcome,
            UpdateOutcome::Succeeded(messages::FIRMWARE_INSTALLED_SUCCESS.to_string())
        );

        let calls = sdk.calls();
        let names: Vec<SdkCall> = calls.iter().map(|(call, _)| call.clone()).collect();
        assert_eq!(
            names,
            vec![
                SdkCall::CheckBootloaderRelease("5.0.0".to_string()),
                SdkCall::FirmwareUpdateV2(FirmwareUpdateV2Params {
                    connect_id: Some("connect-1".to_string()),
                    update_type: Some(UpdateCategory::Firmware),
                    is_update_bootloader: true,
                    ..Default::default()
                }),
                SdkCall::FirmwareUpdateV2(FirmwareUpdateV2Params {
                    connect_id: Some("connect-1".to_string()),
                    update_type: Some(UpdateCategory::Firmware),
                    version: Some(FirmwareVersion::new(5, 0, 0)),
                    ..Default::default()
                }),
            ]
        );
        assert!(calls[2].1 - calls[1].1 >= BOOTLOADER_SETTLE_DELAY);

        let session = store.snapshot().session;
        assert_eq!(session.state, SessionState::Succeeded);
        assert_eq!(session.install_type, InstallType::Firmware);
        assert_eq!(session.progress.progress, 100);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_bootloader_bump_skips_firmware() {
        let sdk = Arc::new(ScriptedSdk::new().with_bootloader_update_required(true));
        sdk.push_v2_response(SdkResponse::Unsuccessful(SdkFailure::new("Bootloader flash failed")));
        let (sequencer, store) = sequencer(
            sdk.clone(),
            ReleaseConfig::default(),
            MockArtifactSource::new(),
            DeviceBuilder::mini().build(),
        );

        let outcome = sequencer
            .start_v2_update(UpdateSelection::remote(
                UpdateCategory::Firmware,
                CHANNEL_FIRMWARE_V8,
                FirmwareVersion::new(3, 5, 0),
            ))
            .await;

        assert_eq!(outcome, UpdateOutcome::Failed("Bootloader flash failed".to_string()));
        assert_eq!(sdk.calls().len(), 2);
        assert_eq!(store.snapshot().session.state, SessionState::Failed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_local_binary_skips_bootloader_check() {
        let sdk = Arc::new(ScriptedSdk::new().with_bootloader_update_required(true));
        let (sequencer, _store) = sequencer(
            sdk.clone(),
            ReleaseConfig::default(),
            MockArtifactSource::new(),
            DeviceBuilder::classic().build(),
        );

        let firmware = LocalFirmware::new("classic.bin", vec![9; 16]).unwrap();
        let outcome = sequencer
            .start_v2_update(UpdateSelection::local(UpdateCategory::Firmware, firmware))
            .await;

        assert!(outcome.is_success());
        assert_eq!(
            sdk.call_names(),
            vec![SdkCall::FirmwareUpdateV2(FirmwareUpdateV2Params {
                connect_id: Some("connect-1".to_string()),
                update_type: Some(UpdateCategory::Firmware),
                binary: Some(vec![9; 16]),
                ..Default::default()
            })]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_payload_too_large_maps_to_desktop_message() {
        let sdk = Arc::new(ScriptedSdk::new());
        sdk.push_v2_response(SdkResponse::Unsuccessful(SdkFailure::with_code(
            "Request Entity Too Large",
            413,
        )));
        let (sequencer, store) = sequencer(
            sdk.clone(),
            ReleaseConfig::default(),
            MockArtifactSource::new(),
            DeviceBuilder::touch().firmware(FirmwareVersion::new(4, 2, 0)).build(),
        );

        let outcome = sequencer
            .start_v2_update(UpdateSelection::remote(
                UpdateCategory::Firmware,
                CHANNEL_FIRMWARE_V5,
                FirmwareVersion::new(4, 3, 0),
            ))
            .await;

        let expected = messages::USE_DESKTOP_CLIENT_TO_INSTALL.to_string();
        assert_eq!(outcome, UpdateOutcome::Failed(expected.clone()));
        assert_eq!(store.snapshot().session.result.unwrap().message, expected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_legacy_touch_channel_sends_downloaded_binary() {
        let config = ReleaseConfigBuilder::new()
            .channel(
                DeviceType::Touch,
                CHANNEL_FIRMWARE_V2,
                vec![ReleaseEntryBuilder::new(4, 0, 0)
                    .url("https://example.com/touch-4.0.0.bin")
                    .build()],
            )
            .build();
        let mut artifacts = MockArtifactSource::new();
        artifacts
            .expect_download()
            .withf(|url| url == "https://example.com/touch-4.0.0.bin")
            .times(1)
            .returning(|_| Ok(vec![7; 4]));
        let sdk = Arc::new(ScriptedSdk::new());
        let (sequencer, _store) = sequencer(
            sdk.clone(),
            config,
            artifacts,
            DeviceBuilder::touch().firmware(FirmwareVersion::new(4, 0, 0)).build(),
        );

        let outcome = sequencer
            .start_v2_update(UpdateSelection::remote(
                UpdateCategory::Firmware,
                CHANNEL_FIRMWARE_V2,
                FirmwareVersion::new(4, 0, 0),
            ))
            .await;

        assert!(outcome.is_success());
        match &sdk.call_names()[..] {
            [SdkCall::FirmwareUpdateV2(params)] => {
                assert_eq!(params.binary, Some(vec![7; 4]));
                assert_eq!(params.version, None);
            }
            other => panic!("unexpected calls: {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_download_error_fails_with_generic_message() {
        let config = ReleaseConfigBuilder::new()
            .channel(
                DeviceType::Touch,
                CHANNEL_FIRMWARE_V2,
                vec![ReleaseEntryBuilder::new(4, 0, 0).url("https://example.com/gone.bin").build()],
            )
            .build();
        let mut artifacts = MockArtifactSource::new();
        artifacts
            .expect_download()
            .returning(|url| Err(ConsoleError::DownloadFailed { url, status: 404 }));
        let sdk = Arc::new(ScriptedSdk::new());
        let (sequencer, store) = sequencer(sdk.clone(), config, artifacts, DeviceBuilder::touch().build());

        let outcome = sequencer
            .start_v2_update(UpdateSelection::remote(
                UpdateCategory::Firmware,
                CHANNEL_FIRMWARE_V2,
                FirmwareVersion::new(4, 0, 0),
            ))
            .await;

        assert_eq!(
            outcome,
            UpdateOutcome::Failed(messages::FIRMWARE_INSTALLED_FAILED.to_string())
        );
        assert_eq!(store.snapshot().session.state, SessionState::Failed);
        assert!(sdk.call_names().is_empty());
    }

    #[tokio::test]
    async fn test_v3_remote_packs_firmware_and_bootloader() {
        let mut sdk = mock_sdk();
        sdk.expect_firmware_update_v3()
            .withf(|params| {
                params.firmware_version == Some(FirmwareVersion::new(4, 12, 0))
                    && params.bootloader_version == Some(FirmwareVersion::new(2, 9, 1))
                    && params.ble_version.is_none()
            })
            .times(1)
            .returning(|_| Ok(SdkResponse::Success(())));
        let device = DeviceBuilder::pro().bootloader(FirmwareVersion::new(2, 9, 0)).build();
        let (sequencer, store) = sequencer(Arc::new(sdk), pro_v7_config(), MockArtifactSource::new(), device);

        let mut selections = V3Selections::new();
        selections.select(V3Component::Firmware, remote("4.12.0")).unwrap();
        selections.select(V3Component::Bootloader, remote("2.9.1")).unwrap();

        let outcome = sequencer.start_v3_update(V3Tab::Remote, &selections).await;
        assert!(outcome.is_success());
        assert_eq!(store.snapshot().session.state, SessionState::Succeeded);
    }

    #[tokio::test]
    async fn test_v3_without_resolvable_components_makes_no_call() {
        let mut sdk = mock_sdk();
        sdk.expect_firmware_update_v3().never();
        let device = DeviceBuilder::pro().bootloader(FirmwareVersion::new(2, 9, 0)).build();
        let (sequencer, store) = sequencer(Arc::new(sdk), pro_v7_config(), MockArtifactSource::new(), device);

        let mut selections = V3Selections::new();
        selections.select(V3Component::Firmware, remote("9.9.9")).unwrap();
        selections.select(V3Component::Ble, remote("0.0.1")).unwrap();

        let outcome = sequencer.start_v3_update(V3Tab::Remote, &selections).await;
        assert_eq!(outcome, UpdateOutcome::Rejected(RejectReason::NothingToUpdate));

        // Local tab has nothing selected at all.
        let outcome = sequencer.start_v3_update(V3Tab::Local, &selections).await;
        assert_eq!(outcome, UpdateOutcome::Rejected(RejectReason::NothingSelected));

        let state = store.snapshot();
        assert_eq!(state.session.state, SessionState::Idle);
        assert_eq!(state.notice.as_deref(), Some(messages::NO_COMPONENTS_SELECTED));
    }

    #[tokio::test]
    async fn test_v3_requires_eligible_bootloader() {
        let mut sdk = mock_sdk();
        sdk.expect_firmware_update_v3().never();
        let device = DeviceBuilder::pro().bootloader(FirmwareVersion::new(2, 7, 9)).build();
        let (sequencer, _store) = sequencer(Arc::new(sdk), pro_v7_config(), MockArtifactSource::new(), device);

        let mut selections = V3Selections::new();
        selections.select(V3Component::Firmware, remote("4.12.0")).unwrap();
        assert_eq!(
            sequencer.start_v3_update(V3Tab::Remote, &selections).await,
            UpdateOutcome::Rejected(RejectReason::Unsupported)
        );
    }

    #[test]
    fn test_pack_local_and_resource_flag() {
        let device = DeviceBuilder::pro().build();
        let firmware = ComponentSource::Local(LocalFirmware::new("fw.bin", vec![1, 2]).unwrap());
        let resource = ComponentSource::Local(LocalFirmware::new("res.bin", vec![3]).unwrap());
        let params = pack_local(
            &device,
            &[(V3Component::Firmware, &firmware), (V3Component::Resource, &resource)],
        );
        assert_eq!(params.firmware_binary, Some(vec![1, 2]));
        assert_eq!(params.resource_binary, Some(vec![3]));
        assert!(params.ble_binary.is_none());

        let bundle = ComponentSource::Remote { version: None };
        let params = pack_remote(&pro_v7_config(), &device, &[(V3Component::Resource, &bundle)]);
        assert!(params.forced_update_res);
        assert!(params.firmware_version.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_standalone_bootloader_update() {
        let config = ReleaseConfigBuilder::new()
            .channel(
                DeviceType::Pro,
                CHANNEL_FIRMWARE_V5,
                vec![ReleaseEntryBuilder::new(4, 11, 0)
                    .bootloader(FirmwareVersion::new(2, 6, 0), "https://example.com/boot-2.6.0.bin")
                    .build()],
            )
            .build();
        let mut artifacts = MockArtifactSource::new();
        artifacts
            .expect_download()
            .withf(|url| url == "https://example.com/boot-2.6.0.bin")
            .returning(|_| Ok(vec![0xAA; 32]));
        let sdk = Arc::new(ScriptedSdk::new());
        let (sequencer, store) = sequencer(sdk.clone(), config, artifacts, DeviceBuilder::pro().build());

        let outcome = sequencer
            .bootloader_standalone_update(UpdateSelection::remote(
                UpdateCategory::Bootloader,
                CHANNEL_FIRMWARE_V5,
                FirmwareVersion::new(4, 11, 0),
            ))
            .await;

        assert_eq!(
            outcome,
            UpdateOutcome::Succeeded(messages::BOOTLOADER_INSTALLED_SUCCESS.to_string())
        );
        assert_eq!(sdk.call_names(), vec![SdkCall::UpdateBootloader(32)]);
        assert_eq!(store.snapshot().session.install_type, InstallType::Bootloader);
    }

    #[tokio::test]
    async fn test_standalone_bootloader_rejected_for_classic() {
        let sdk = Arc::new(ScriptedSdk::new());
        let (sequencer, _store) = sequencer(
            sdk.clone(),
            ReleaseConfig::default(),
            MockArtifactSource::new(),
            DeviceBuilder::classic().build(),
        );
        let firmware = LocalFirmware::new("boot.bin", vec![1]).unwrap();
        let outcome = sequencer
            .bootloader_standalone_update(UpdateSelection::local(UpdateCategory::Bootloader, firmware))
            .await;
        assert_eq!(outcome, UpdateOutcome::Rejected(RejectReason::Unsupported));
        assert!(sdk.call_names().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reboot_requests_share_one_call() {
        let sdk = Arc::new(ScriptedSdk::new().with_reboot_delay(Duration::from_secs(5)));
        let (sequencer, _store) = sequencer(
            sdk.clone(),
            ReleaseConfig::default(),
            MockArtifactSource::new(),
            DeviceBuilder::touch().build(),
        );

        let (a, b) = tokio::join!(sequencer.reboot_to_bootloader(), sequencer.reboot_to_bootloader());
        assert!(a && b);
        assert_eq!(sdk.call_names(), vec![SdkCall::RebootToBootloader]);

        // A later request issues a fresh call.
        assert!(sequencer.reboot_to_bootloader().await);
        assert_eq!(sdk.call_names().len(), 2);
    }

    #[tokio::test]
    async fn test_update_rejected_while_another_runs() {
        let sdk = Arc::new(ScriptedSdk::new());
        let device = DeviceBuilder::touch().build();
        let (sequencer, store) = sequencer(sdk.clone(), ReleaseConfig::default(), MockArtifactSource::new(), device.clone());
        store.update(|state| {
            state
                .session
                .begin(InstallType::Firmware, device, UpdatePhase::Transferring)
        });

        let outcome = sequencer
            .start_v2_update(UpdateSelection::remote(
                UpdateCategory::Ble,
                CHANNEL_BLE,
                FirmwareVersion::new(2, 3, 4),
            ))
            .await;
        assert_eq!(outcome, UpdateOutcome::Rejected(RejectReason::UpdateInProgress));
        assert!(sdk.call_names().is_empty());
    }
}
