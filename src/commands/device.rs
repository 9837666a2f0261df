//! Tauri commands for device discovery and device-level actions.

use onekey_firmware_console::discovery::SearchState;
use onekey_firmware_console::hardware::{SdkEnvelope, UiEvent};
use onekey_firmware_console::store::ConsoleState;
use tauri::{Emitter, State};
use tracing::{debug, warn};

use super::{ConsoleShell, SEARCH_STATE_EVENT};

/// Start polling for devices. Search start/stop is emitted as
/// `search-state`; device changes arrive with `console-state`.
#[tauri::command]
pub async fn start_device_scan(shell: State<'_, ConsoleShell>, app_handle: tauri::AppHandle) -> Result<(), String> {
    shell.context.poller.start_scanning(
        |outcome| {
            if let Err(e) = outcome {
                debug!("Search finished with error: {}", e);
            }
        },
        move |search_state: SearchState| {
            if let Err(e) = app_handle.emit(SEARCH_STATE_EVENT, search_state) {
                warn!("Failed to emit search state: {}", e);
            }
        },
    );
    Ok(())
}

#[tauri::command]
pub async fn stop_device_scan(shell: State<'_, ConsoleShell>) -> Result<(), String> {
    shell.context.poller.stop_scanning();
    Ok(())
}

/// Current console snapshot, for the first render.
#[tauri::command]
pub async fn get_console_state(shell: State<'_, ConsoleShell>) -> Result<ConsoleState, String> {
    Ok(shell.context.store.snapshot())
}

/// Check that the desktop bridge is running.
#[tauri::command]
pub async fn check_bridge(shell: State<'_, ConsoleShell>) -> Result<bool, String> {
    Ok(shell.context.check_bridge().await)
}

#[tauri::command]
pub async fn reboot_to_bootloader(shell: State<'_, ConsoleShell>) -> Result<bool, String> {
    Ok(shell.context.sequencer.reboot_to_bootloader().await)
}

/// Re-upload the full resource set of a touch device.
#[tauri::command]
pub async fn repair_resources(shell: State<'_, ConsoleShell>) -> Result<bool, String> {
    Ok(shell.context.sequencer.repair_resources().await)
}

/// Answer a pending `sdk-request` with the SDK's `{success, payload}`.
#[tauri::command]
pub async fn sdk_respond(id: u64, envelope: SdkEnvelope, shell: State<'_, ConsoleShell>) -> Result<bool, String> {
    Ok(shell.bridge.respond(id, envelope))
}

/// Forward a UI event raised by the SDK in the webview.
#[tauri::command]
pub async fn sdk_ui_event(event: UiEvent, shell: State<'_, ConsoleShell>) -> Result<(), String> {
    shell.bridge.emit(event);
    Ok(())
}
