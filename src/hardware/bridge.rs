//! [`HardwareSdk`] over a request/response channel.
//!
//! The SDK itself runs elsewhere (in the desktop shell, inside the webview).
//! Each call becomes an [`SdkRequest`] handed to a [`RequestSink`]; the
//! other side answers with [`SdkBridge::respond`] using the SDK's own
//! `{success, payload}` envelope, and pushes UI events through
//! [`SdkBridge::emit`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::{broadcast, oneshot};
use tracing::{debug, warn};

use super::events::UiEvent;
use super::sdk::{
    BootloaderReleaseInfo, BridgeReleaseInfo, FirmwareUpdateV2Params, FirmwareUpdateV3Params, HardwareError,
    HardwareSdk, SdkFailure, SdkResponse, SdkResult, SdkSettings, SearchDevice, UiResponse,
};
use crate::device::{Features, FirmwareVersion};

/// UI response type the SDK expects for a PIN answer.
const RECEIVE_PIN: &str = "ui-receive_pin";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SdkRequest {
    pub id: u64,
    pub method: String,
    pub connect_id: Option<String>,
    pub params: Value,
}

/// The SDK's answer envelope.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SdkEnvelope {
    pub success: bool,
    #[serde(default)]
    pub payload: Value,
}

/// Delivers requests to wherever the SDK lives.
pub trait RequestSink: Send + Sync {
    fn send(&self, request: SdkRequest) -> Result<(), HardwareError>;
}

pub struct SdkBridge {
    sink: Box<dyn RequestSink>,
    next_id: AtomicU64,
    pending: Mutex<HashMap<u64, oneshot::Sender<SdkEnvelope>>>,
    events: broadcast::Sender<UiEvent>,
}

impl SdkBridge {
    pub fn new(sink: impl RequestSink + 'static) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            sink: Box::new(sink),
            next_id: AtomicU64::new(1),
            pending: Mutex::new(HashMap::new()),
            events,
        }
    }

    fn pending(&self) -> MutexGuard<'_, HashMap<u64, oneshot::Sender<SdkEnvelope>>> {
        self.pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Complete request `id`. Returns false for unknown or already
    /// answered ids.
    pub fn respond(&self, id: u64, envelope: SdkEnvelope) -> bool {
        match self.pending().remove(&id) {
            Some(waiter) => waiter.send(envelope).is_ok(),
            None => {
                warn!("Response for unknown SDK request {}", id);
                false
            }
        }
    }

    /// Publish a UI event to subscribers.
    pub fn emit(&self, event: UiEvent) {
        if self.events.send(event).is_err() {
            debug!("UI event dropped; no subscribers");
        }
    }

    pub fn pending_requests(&self) -> usize {
        self.pending().len()
    }

    async fn call(&self, method: &str, connect_id: Option<String>, params: Value) -> SdkResult<Value> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        self.pending().insert(id, tx);

        let request = SdkRequest {
            id,
            method: method.to_string(),
            connect_id,
            params,
        };
        if let Err(e) = self.sink.send(request) {
            self.pending().remove(&id);
            return Err(e);
        }

        let envelope = rx
            .await
            .map_err(|_| HardwareError::Transport(format!("{} was abandoned", method)))?;
        if envelope.success {
            return Ok(SdkResponse::Success(envelope.payload));
        }
        let mut failure = serde_json::from_value::<SdkFailure>(envelope.payload)
            .unwrap_or_else(|_| SdkFailure::new(""));
        if failure.error.is_empty() {
            failure.error = format!("{} failed", method);
        }
        Ok(SdkResponse::Unsuccessful(failure))
    }

    async fn call_typed<T: DeserializeOwned>(
        &self,
        method: &str,
        connect_id: Option<String>,
        params: Value,
    ) -> SdkResult<T> {
        match self.call(method, connect_id, params).await? {
            SdkResponse::Success(payload) => serde_json::from_value(payload)
                .map(SdkResponse::Success)
                .map_err(|e| HardwareError::Transport(format!("Malformed {} payload: {}", method, e))),
            SdkResponse::Unsuccessful(failure) => Ok(SdkResponse::Unsuccessful(failure)),
        }
    }

    /// For calls whose success payload carries nothing the console uses.
    async fn call_unit(&self, method: &str, connect_id: Option<String>, params: Value) -> SdkResult<()> {
        let response = self.call(method, connect_id, params).await?;
        Ok(match response {
            SdkResponse::Success(_) => SdkResponse::Success(()),
            SdkResponse::Unsuccessful(failure) => SdkResponse::Unsuccessful(failure),
        })
    }
}

fn version_param(version: Option<FirmwareVersion>) -> Value {
    version.map_or(Value::Null, |v| json!(v.as_array()))
}

#[async_trait]
impl HardwareSdk for SdkBridge {
    async fn init(&self, settings: SdkSettings) -> Result<(), HardwareError> {
        let params = serde_json::to_value(&settings).map_err(|e| HardwareError::Init(e.to_string()))?;
        match self.call("init", None, params).await {
            Ok(SdkResponse::Success(_)) => Ok(()),
            Ok(SdkResponse::Unsuccessful(failure)) => Err(HardwareError::Init(failure.error)),
            Err(e) => Err(HardwareError::Init(e.to_string())),
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<UiEvent> {
        self.events.subscribe()
    }

    async fn search_devices(&self) -> SdkResult<Vec<SearchDevice>> {
        self.call_typed("searchDevices", None, Value::Null).await
    }

    async fn get_features(&self, connect_id: String) -> SdkResult<Features> {
        self.call_typed("getFeatures", Some(connect_id), Value::Null).await
    }

    async fn ui_response(&self, response: UiResponse) -> Result<(), HardwareError> {
        let params = match response {
            UiResponse::ReceivePin(pin) => json!({ "type": RECEIVE_PIN, "payload": pin }),
        };
        match self.call("uiResponse", None, params).await? {
            SdkResponse::Success(_) => Ok(()),
            SdkResponse::Unsuccessful(failure) => Err(HardwareError::Transport(failure.error)),
        }
    }

    async fn check_bridge_status(&self) -> SdkResult<bool> {
        let response = self.call("checkBridgeStatus", None, Value::Null).await?;
        Ok(match response {
            SdkResponse::Success(payload) => SdkResponse::Success(payload.as_bool().unwrap_or(true)),
            SdkResponse::Unsuccessful(failure) => SdkResponse::Unsuccessful(failure),
        })
    }

    async fn check_bridge_release(&self, will_update_firmware_version: String) -> SdkResult<BridgeReleaseInfo> {
        let params = json!({ "willUpdateFirmwareVersion": will_update_firmware_version });
        self.call_typed("checkBridgeRelease", None, params).await
    }

    async fn check_bootloader_release(
        &self,
        connect_id: Option<String>,
        will_update_firmware_version: String,
    ) -> SdkResult<BootloaderReleaseInfo> {
        let params = json!({ "willUpdateFirmwareVersion": will_update_firmware_version });
        self.call_typed("checkBootloaderRelease", connect_id, params).await
    }

    async fn firmware_update_v2(&self, params: FirmwareUpdateV2Params) -> SdkResult<()> {
        let body = json!({
            "updateType": params.update_type.map(|c| c.as_str()),
            "platform": params.platform,
            "version": version_param(params.version),
            "binary": params.binary,
            "isUpdateBootloader": params.is_update_bootloader,
        });
        self.call_unit("firmwareUpdateV2", params.connect_id, body).await
    }

    async fn firmware_update_v3(&self, params: FirmwareUpdateV3Params) -> SdkResult<()> {
        let body = json!({
            "platform": params.platform,
            "firmwareVersion": version_param(params.firmware_version),
            "bleVersion": version_param(params.ble_version),
            "bootloaderVersion": version_param(params.bootloader_version),
            "firmwareBinary": params.firmware_binary,
            "bleBinary": params.ble_binary,
            "bootloaderBinary": params.bootloader_binary,
            "resourceBinary": params.resource_binary,
            "forcedUpdateRes": params.forced_update_res,
        });
        self.call_unit("firmwareUpdateV3", params.connect_id, body).await
    }

    async fn device_update_bootloader(&self, connect_id: Option<String>, binary: Vec<u8>) -> SdkResult<()> {
        self.call_unit("deviceUpdateBootloader", connect_id, json!({ "binary": binary }))
            .await
    }

    async fn device_reboot_to_boardloader(&self, connect_id: Option<String>) -> SdkResult<()> {
        self.call_unit("deviceRebootToBoardloader", connect_id, Value::Null).await
    }

    async fn device_fully_upload_resource(&self, connect_id: Option<String>) -> SdkResult<()> {
        self.call_unit("deviceFullyUploadResource", connect_id, json!({})).await
    }
}
