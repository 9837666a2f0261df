//! The hardware SDK seam.
//!
//! Everything the console needs from the device SDK goes through
//! [`HardwareSdk`]. Calls return an envelope: [`SdkResponse::Unsuccessful`] is
//! an ordinary outcome the caller must inspect, while `Err(HardwareError)`
//! means the SDK itself threw.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::broadcast;

#[cfg(test)]
use mockall::automock;

use super::events::UiEvent;
use crate::device::{Features, FirmwareVersion};
use crate::release::UpdateCategory;

/// Failure code the SDK uses when the web transport cannot carry the payload.
pub const PAYLOAD_TOO_LARGE: u32 = 413;

/// PIN response meaning "the user types the PIN on the device".
pub const PIN_ON_DEVICE: &str = "@@ONEKEY_INPUT_PIN_IN_DEVICE";

/// SDK threw or could not be reached.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HardwareError {
    #[error("Hardware SDK initialisation failed: {0}")]
    Init(String),
    #[error("Hardware SDK call failed: {0}")]
    Transport(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SdkFailure {
    #[serde(default)]
    pub error: String,
    #[serde(default)]
    pub code: Option<u32>,
}

impl SdkFailure {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: None,
        }
    }

    pub fn with_code(error: impl Into<String>, code: u32) -> Self {
        Self {
            error: error.into(),
            code: Some(code),
        }
    }

    pub fn is_payload_too_large(&self) -> bool {
        self.code == Some(PAYLOAD_TOO_LARGE)
    }
}

/// Success/failure envelope every SDK call answers with.
#[derive(Debug, Clone, PartialEq)]
pub enum SdkResponse<T> {
    Success(T),
    Unsuccessful(SdkFailure),
}

pub type SdkResult<T> = Result<SdkResponse<T>, HardwareError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    #[default]
    Web,
    Desktop,
}

/// Settings passed to the SDK on initialisation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SdkSettings {
    pub debug: bool,
    pub connect_src: String,
    pub pre_release: bool,
    pub fetch_config: bool,
    pub env: String,
}

impl Default for SdkSettings {
    fn default() -> Self {
        Self {
            debug: false,
            connect_src: "https://jssdk.onekey.so/1.1.21/".to_string(),
            pre_release: false,
            fetch_config: true,
            env: "webusb".to_string(),
        }
    }
}

/// One entry of a device search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchDevice {
    pub connect_id: Option<String>,
    pub path: String,
    #[serde(default)]
    pub features: Option<Features>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BootloaderReleaseInfo {
    pub should_update: bool,
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeReleaseInfo {
    pub should_update: bool,
    pub status: String,
    pub release_version: String,
}

impl Default for BridgeReleaseInfo {
    fn default() -> Self {
        Self {
            should_update: false,
            status: "valid".to_string(),
            release_version: String::new(),
        }
    }
}

/// Single-target firmware update request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FirmwareUpdateV2Params {
    pub connect_id: Option<String>,
    pub update_type: Option<UpdateCategory>,
    pub platform: Platform,
    pub version: Option<FirmwareVersion>,
    pub binary: Option<Vec<u8>>,
    pub is_update_bootloader: bool,
}

/// Multi-component update request; at least one component must be present.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FirmwareUpdateV3Params {
    pub connect_id: Option<String>,
    pub platform: Platform,
    pub firmware_version: Option<FirmwareVersion>,
    pub ble_version: Option<FirmwareVersion>,
    pub bootloader_version: Option<FirmwareVersion>,
    pub firmware_binary: Option<Vec<u8>>,
    pub ble_binary: Option<Vec<u8>>,
    pub bootloader_binary: Option<Vec<u8>>,
    pub resource_binary: Option<Vec<u8>>,
    pub forced_update_res: bool,
}

impl FirmwareUpdateV3Params {
    /// Whether anything besides the platform and device id is set.
    pub fn has_content(&self) -> bool {
        self.firmware_version.is_some()
            || self.ble_version.is_some()
            || self.bootloader_version.is_some()
            || self.firmware_binary.is_some()
            || self.ble_binary.is_some()
            || self.bootloader_binary.is_some()
            || self.resource_binary.is_some()
            || self.forced_update_res
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiResponse {
    ReceivePin(String),
}

/// Operations the console drives on the device SDK.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait HardwareSdk: Send + Sync {
    async fn init(&self, settings: SdkSettings) -> Result<(), HardwareError>;

    /// Fresh receiver for the SDK's UI event stream.
    fn subscribe(&self) -> broadcast::Receiver<UiEvent>;

    async fn search_devices(&self) -> SdkResult<Vec<SearchDevice>>;

    async fn get_features(&self, connect_id: String) -> SdkResult<Features>;

    async fn ui_response(&self, response: UiResponse) -> Result<(), HardwareError>;

    async fn check_bridge_status(&self) -> SdkResult<bool>;

    async fn check_bridge_release(&self, will_update_firmware_version: String) -> SdkResult<BridgeReleaseInfo>;

    async fn check_bootloader_release(
        &self,
        connect_id: Option<String>,
        will_update_firmware_version: String,
    ) -> SdkResult<BootloaderReleaseInfo>;

    async fn firmware_update_v2(&self, params: FirmwareUpdateV2Params) -> SdkResult<()>;

    async fn firmware_update_v3(&self, params: FirmwareUpdateV3Params) -> SdkResult<()>;

    async fn device_update_bootloader(&self, connect_id: Option<String>, binary: Vec<u8>) -> SdkResult<()>;

    async fn device_reboot_to_boardloader(&self, connect_id: Option<String>) -> SdkResult<()>;

    async fn device_fully_upload_resource(&self, connect_id: Option<String>) -> SdkResult<()>;
}
