//! Console-facing wrapper around the SDK.

use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use super::events::UiEvent;
use super::instance::SdkHandle;
use super::sdk::{
    BridgeReleaseInfo, HardwareError, HardwareSdk, SdkResponse, SdkResult, SdkSettings, SearchDevice,
    UiResponse, PIN_ON_DEVICE,
};
use crate::device::Features;
use crate::single_flight::{Flight, SingleFlight};
use crate::store::ConsoleStore;

pub type SearchOutcome = Result<SdkResponse<Vec<SearchDevice>>, HardwareError>;

/// Owns the SDK handle, forwards SDK UI events into the store and keeps at
/// most one device search in flight.
pub struct HardwareService {
    handle: SdkHandle,
    store: ConsoleStore,
    events: OnceCell<()>,
    search: SingleFlight<SearchOutcome>,
}

impl HardwareService {
    pub fn new(sdk: Arc<dyn HardwareSdk>, settings: SdkSettings, store: ConsoleStore) -> Self {
        Self {
            handle: SdkHandle::new(sdk, settings),
            store,
            events: OnceCell::new(),
            search: SingleFlight::new(),
        }
    }

    /// Initialised SDK. The first successful call also starts the event pump.
    pub async fn sdk(&self) -> Result<Arc<dyn HardwareSdk>, HardwareError> {
        let sdk = self.handle.get().await?;
        self.events
            .get_or_init(|| async {
                spawn_event_pump(sdk.clone(), self.store.clone());
            })
            .await;
        Ok(sdk)
    }

    /// Search for devices, joining a search that is already running.
    ///
    /// `on_start` runs only when this call actually starts a search.
    pub async fn search_devices(&self, on_start: impl FnOnce() + Send) -> Flight<SearchOutcome> {
        let sdk = match self.sdk().await {
            Ok(sdk) => sdk,
            Err(e) => {
                return Flight {
                    value: Err(e),
                    leader: true,
                }
            }
        };

        self.search
            .run(move || {
                on_start();
                async move { sdk.search_devices().await }
            })
            .await
    }

    pub fn is_searching(&self) -> bool {
        self.search.is_in_flight()
    }

    pub async fn get_features(&self, connect_id: String) -> SdkResult<Features> {
        self.sdk().await?.get_features(connect_id).await
    }

    /// Whether the desktop bridge answers. Errors count as "not running".
    pub async fn check_bridge_status(&self) -> bool {
        let response = match self.sdk().await {
            Ok(sdk) => sdk.check_bridge_status().await,
            Err(e) => Err(e),
        };
        match response {
            Ok(SdkResponse::Success(running)) => running,
            Ok(SdkResponse::Unsuccessful(failure)) => {
                debug!("Bridge status check unsuccessful: {}", failure.error);
                false
            }
            Err(e) => {
                warn!("Bridge status check failed: {}", e);
                false
            }
        }
    }

    /// Bridge update advice; any failure reads as "bridge is fine".
    pub async fn check_bridge_release(&self, will_update_firmware_version: String) -> BridgeReleaseInfo {
        let response = match self.sdk().await {
            Ok(sdk) => sdk.check_bridge_release(will_update_firmware_version).await,
            Err(e) => Err(e),
        };
        match response {
            Ok(SdkResponse::Success(info)) => info,
            Ok(SdkResponse::Unsuccessful(failure)) => {
                debug!("Bridge release check unsuccessful: {}", failure.error);
                BridgeReleaseInfo::default()
            }
            Err(e) => {
                warn!("Bridge release check failed: {}", e);
                BridgeReleaseInfo::default()
            }
        }
    }

    /// Re-upload the full resource bundle to a touch device.
    pub async fn upload_full_resource(&self, connect_id: Option<String>) -> bool {
        let response = match self.sdk().await {
            Ok(sdk) => sdk.device_fully_upload_resource(connect_id).await,
            Err(e) => Err(e),
        };
        match response {
            Ok(SdkResponse::Success(())) => {
                info!("Resource upload completed");
                true
            }
            Ok(SdkResponse::Unsuccessful(failure)) => {
                warn!("Resource upload unsuccessful: {}", failure.error);
                false
            }
            Err(e) => {
                warn!("Resource upload failed: {}", e);
                false
            }
        }
    }
}

/// Forward SDK UI events into the store until the SDK closes its channel.
fn spawn_event_pump(sdk: Arc<dyn HardwareSdk>, store: ConsoleStore) {
    let mut events = sdk.subscribe();
    tokio::spawn(async move {
        loop {
            let event = match events.recv().await {
                Ok(event) => event,
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Dropped {} hardware UI events", skipped);
                    continue;
                }
                Err(RecvError::Closed) => {
                    debug!("Hardware UI event stream closed");
                    break;
                }
            };

            store.apply_ui_event(&event);
            if event == UiEvent::PinRequested {
                if let Err(e) = sdk
                    .ui_response(UiResponse::ReceivePin(PIN_ON_DEVICE.to_string()))
                    .await
                {
                    warn!("Failed to answer PIN request: {}", e);
                }
            }
        }
    });
}
