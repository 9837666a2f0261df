//! Tauri commands exposed to the console frontend.
//!
//! The library does the work; these wrappers pull the shared
//! [`ConsoleShell`] out of managed state and turn errors into strings.

pub mod device;
pub mod firmware;
pub mod settings;

use std::future::Future;
use std::sync::Arc;

use onekey_firmware_console::hardware::{HardwareError, RequestSink, SdkBridge, SdkRequest};
use onekey_firmware_console::store::{ConsoleState, ConsoleStore};
use onekey_firmware_console::ConsoleContext;
use tauri::ipc::Channel;
use tauri::{AppHandle, Emitter};
use tracing::debug;

/// Event carrying SDK calls to the webview.
pub const SDK_REQUEST_EVENT: &str = "sdk-request";
/// Event carrying every store snapshot.
pub const CONSOLE_STATE_EVENT: &str = "console-state";
pub const SEARCH_STATE_EVENT: &str = "search-state";

/// Managed state shared by all commands.
pub struct ConsoleShell {
    pub context: Arc<ConsoleContext>,
    pub bridge: Arc<SdkBridge>,
}

/// Hands SDK requests to the webview as Tauri events.
pub struct EventSink {
    app_handle: AppHandle,
}

impl EventSink {
    pub fn new(app_handle: AppHandle) -> Self {
        Self { app_handle }
    }
}

impl RequestSink for EventSink {
    fn send(&self, request: SdkRequest) -> Result<(), HardwareError> {
        debug!("SDK request {} -> {}", request.id, request.method);
        self.app_handle
            .emit(SDK_REQUEST_EVENT, &request)
            .map_err(|e| HardwareError::Transport(format!("Failed to reach webview: {}", e)))
    }
}

/// Publish store snapshots as `console-state` events for the app's lifetime.
pub fn forward_console_state(app_handle: AppHandle, store: &ConsoleStore) {
    let mut feed = store.subscribe();
    tauri::async_runtime::spawn(async move {
        while feed.changed().await.is_ok() {
            let snapshot = feed.borrow_and_update().clone();
            if let Err(e) = app_handle.emit(CONSOLE_STATE_EVENT, &snapshot) {
                debug!("Failed to emit console state: {}", e);
            }
        }
    });
}

/// Run `task` while streaming store snapshots to `progress`.
pub(crate) async fn with_progress<F, T>(store: &ConsoleStore, progress: Channel<ConsoleState>, task: F) -> T
where
    F: Future<Output = T>,
{
    let mut feed = store.subscribe();
    let progress_channel = progress.clone();
    let forward = tauri::async_runtime::spawn(async move {
        while feed.changed().await.is_ok() {
            let snapshot = feed.borrow_and_update().clone();
            if progress_channel.send(snapshot).is_err() {
                break;
            }
        }
    });

    let output = task.await;
    forward.abort();
    // The final snapshot can race the abort; send it directly.
    if let Err(e) = progress.send(store.snapshot()) {
        debug!("Final progress snapshot dropped: {}", e);
    }
    output
}
