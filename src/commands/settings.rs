//! Tauri commands for console settings.
//!
//! Settings are persisted to a JSON file in the app data directory and
//! take effect on the next start.

use onekey_firmware_console::settings::{ConsoleSettings, SettingsManager};
use tauri::Manager;
use tracing::info;

/// Get current console settings from disk.
///
/// Returns default settings if no settings file exists yet.
#[tauri::command]
pub async fn get_console_settings(app_handle: tauri::AppHandle) -> Result<ConsoleSettings, String> {
    let app_data_dir = app_handle
        .path()
        .app_data_dir()
        .map_err(|e| format!("Failed to get app data directory: {}", e))?;

    let manager = SettingsManager::new(&app_data_dir);
    manager
        .load()
        .map_err(|e| format!("Failed to load settings: {}", e))
}

/// Save console settings to disk.
#[tauri::command]
pub async fn save_console_settings(settings: ConsoleSettings, app_handle: tauri::AppHandle) -> Result<(), String> {
    let app_data_dir = app_handle
        .path()
        .app_data_dir()
        .map_err(|e| format!("Failed to get app data directory: {}", e))?;

    let manager = SettingsManager::new(&app_data_dir);
    manager
        .save(&settings)
        .map_err(|e| format!("Failed to save settings: {}", e))?;

    if settings.has_non_default_settings() {
        info!("Saved non-default settings to {}", manager.settings_path().display());
    }

    Ok(())
}
