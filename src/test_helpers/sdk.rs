use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast;
use tokio::time::Instant;

use crate::device::Features;
use crate::hardware::sdk::{
    BootloaderReleaseInfo, BridgeReleaseInfo, FirmwareUpdateV2Params, FirmwareUpdateV3Params,
    HardwareError, HardwareSdk, MockHardwareSdk, SdkResponse, SdkResult, SdkSettings, SearchDevice,
    UiResponse,
};
use crate::hardware::UiEvent;

/// Mock SDK with the calls every service makes already expected.
pub fn mock_sdk() -> MockHardwareSdk {
    let mut sdk = MockHardwareSdk::new();
    sdk.expect_init().returning(|_| Ok(()));
    sdk.expect_subscribe()
        .returning(|| broadcast::channel::<UiEvent>(16).1);
    sdk
}

/// A recorded call into [`ScriptedSdk`].
#[derive(Debug, Clone, PartialEq)]
pub enum SdkCall {
    SearchDevices,
    CheckBootloaderRelease(String),
    FirmwareUpdateV2(FirmwareUpdateV2Params),
    FirmwareUpdateV3(FirmwareUpdateV3Params),
    UpdateBootloader(usize),
    RebootToBootloader,
    UploadResource,
}

/// Hand-written SDK fake for timing-sensitive tests.
///
/// Records every call with the (tokio) instant it was made and lets tests
/// emit UI events and shape responses.
pub struct ScriptedSdk {
    events: broadcast::Sender<UiEvent>,
    search_delay: Duration,
    reboot_delay: Duration,
    devices: Mutex<Vec<SearchDevice>>,
    bootloader_update_required: bool,
    v2_responses: Mutex<VecDeque<SdkResponse<()>>>,
    searches_in_flight: AtomicUsize,
    max_searches_in_flight: AtomicUsize,
    search_calls: AtomicUsize,
    calls: Mutex<Vec<(SdkCall, Instant)>>,
    ui_responses: Mutex<Vec<UiResponse>>,
}

impl ScriptedSdk {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            events,
            search_delay: Duration::ZERO,
            reboot_delay: Duration::ZERO,
            devices: Mutex::new(Vec::new()),
            bootloader_update_required: false,
            v2_responses: Mutex::new(VecDeque::new()),
            searches_in_flight: AtomicUsize::new(0),
            max_searches_in_flight: AtomicUsize::new(0),
            search_calls: AtomicUsize::new(0),
            calls: Mutex::new(Vec::new()),
            ui_responses: Mutex::new(Vec::new()),
        }
    }

    pub fn with_search_delay(mut self, delay: Duration) -> Self {
        self.search_delay = delay;
        self
    }

    pub fn with_reboot_delay(mut self, delay: Duration) -> Self {
        self.reboot_delay = delay;
        self
    }

    pub fn with_devices(self, devices: Vec<SearchDevice>) -> Self {
        *self.devices.lock().unwrap() = devices;
        self
    }

    pub fn with_bootloader_update_required(mut self, value: bool) -> Self {
        self.bootloader_update_required = value;
        self
    }

    /// Queue the answer for the next `firmware_update_v2` call.
    pub fn push_v2_response(&self, response: SdkResponse<()>) {
        self.v2_responses.lock().unwrap().push_back(response);
    }

    pub fn set_devices(&self, devices: Vec<SearchDevice>) {
        *self.devices.lock().unwrap() = devices;
    }

    pub fn emit(&self, event: UiEvent) {
        let _ = self.events.send(event);
    }

    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    pub fn max_concurrent_searches(&self) -> usize {
        self.max_searches_in_flight.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<(SdkCall, Instant)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_names(&self) -> Vec<SdkCall> {
        self.calls().into_iter().map(|(call, _)| call).collect()
    }

    pub fn ui_responses(&self) -> Vec<UiResponse> {
        self.ui_responses.lock().unwrap().clone()
    }

    fn record(&self, call: SdkCall) {
        self.calls.lock().unwrap().push((call, Instant::now()));
    }
}

impl Default for ScriptedSdk {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HardwareSdk for ScriptedSdk {
    async fn init(&self, _settings: SdkSettings) -> Result<(), HardwareError> {
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<UiEvent> {
        self.events.subscribe()
    }

    async fn search_devices(&self) -> SdkResult<Vec<SearchDevice>> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        let now = self.searches_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_searches_in_flight.fetch_max(now, Ordering::SeqCst);
        self.record(SdkCall::SearchDevices);

        tokio::time::sleep(self.search_delay).await;

        self.searches_in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(SdkResponse::Success(self.devices.lock().unwrap().clone()))
    }

    async fn get_features(&self, _connect_id: String) -> SdkResult<Features> {
        Ok(SdkResponse::Success(Features::default()))
    }

    async fn ui_response(&self, response: UiResponse) -> Result<(), HardwareError> {
        self.ui_responses.lock().unwrap().push(response);
        Ok(())
    }

    async fn check_bridge_status(&self) -> SdkResult<bool> {
        Ok(SdkResponse::Success(true))
    }

    async fn check_bridge_release(&self, _version: String) -> SdkResult<BridgeReleaseInfo> {
        Ok(SdkResponse::Success(BridgeReleaseInfo::default()))
    }

    async fn check_bootloader_release(
        &self,
        _connect_id: Option<String>,
        will_update_firmware_version: String,
    ) -> SdkResult<BootloaderReleaseInfo> {
        self.record(SdkCall::CheckBootloaderRelease(will_update_firmware_version));
        Ok(SdkResponse::Success(BootloaderReleaseInfo {
            should_update: self.bootloader_update_required,
            status: if self.bootloader_update_required {
                "outdated".to_string()
            } else {
                "valid".to_string()
            },
        }))
    }

    async fn firmware_update_v2(&self, params: FirmwareUpdateV2Params) -> SdkResult<()> {
        self.record(SdkCall::FirmwareUpdateV2(params));
        Ok(self
            .v2_responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(SdkResponse::Success(())))
    }

    async fn firmware_update_v3(&self, params: FirmwareUpdateV3Params) -> SdkResult<()> {
        self.record(SdkCall::FirmwareUpdateV3(params));
        Ok(SdkResponse::Success(()))
    }

    async fn device_update_bootloader(&self, _connect_id: Option<String>, binary: Vec<u8>) -> SdkResult<()> {
        self.record(SdkCall::UpdateBootloader(binary.len()));
        Ok(SdkResponse::Success(()))
    }

    async fn device_reboot_to_boardloader(&self, _connect_id: Option<String>) -> SdkResult<()> {
        self.record(SdkCall::RebootToBootloader);
        tokio::time::sleep(self.reboot_delay).await;
        Ok(SdkResponse::Success(()))
    }

    async fn device_fully_upload_resource(&self, _connect_id: Option<String>) -> SdkResult<()> {
        self.record(SdkCall::UploadResource);
        Ok(SdkResponse::Success(()))
    }
}
