// Prevents additional console window on Windows in release
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod commands;

use std::sync::Arc;

use onekey_firmware_console::hardware::{HardwareSdk, SdkBridge};
use onekey_firmware_console::logging;
use onekey_firmware_console::settings::{ConsoleSettings, SettingsManager};
use onekey_firmware_console::ConsoleContext;
use onekey_firmware_console::discovery::SearchState;
use tauri::{Emitter, Manager};
use tracing::{info, warn};

use commands::device::{
    check_bridge,
    get_console_state,
    reboot_to_bootloader,
    repair_resources,
    sdk_respond,
    sdk_ui_event,
    start_device_scan,
    stop_device_scan,
};
use commands::firmware::{
    check_bridge_release,
    confirm_update,
    dismiss_update,
    get_bridge_links,
    get_release_summaries,
    get_v3_components,
    inspect_local_firmware,
    read_resource_file,
    start_bootloader_update,
    start_firmware_update,
    start_v3_update,
};
use commands::settings::{get_console_settings, save_console_settings};
use commands::{forward_console_state, ConsoleShell, EventSink, SEARCH_STATE_EVENT};

fn main() {
    tauri::Builder::default()
        .plugin(tauri_plugin_fs::init())
        .plugin(tauri_plugin_dialog::init())
        .setup(|app| {
            let app_data_dir = app.path().app_data_dir()?;
            let settings = SettingsManager::new(&app_data_dir).load().unwrap_or_else(|e| {
                eprintln!("Failed to load settings, using defaults: {}", e);
                ConsoleSettings::default()
            });
            logging::init(&settings.log_level);
            info!("Console data directory: {}", app_data_dir.display());

            let bridge = Arc::new(SdkBridge::new(EventSink::new(app.handle().clone())));
            let sdk: Arc<dyn HardwareSdk> = bridge.clone();
            let context = Arc::new(ConsoleContext::new(settings, sdk, &app_data_dir));
            forward_console_state(app.handle().clone(), &context.store);

            let startup = context.clone();
            let app_handle = app.handle().clone();
            tauri::async_runtime::spawn(async move {
                if !startup.check_bridge().await {
                    warn!("Hardware bridge is not running");
                    return;
                }
                startup
                    .bootstrap(|_| {}, move |search_state: SearchState| {
                        if let Err(e) = app_handle.emit(SEARCH_STATE_EVENT, search_state) {
                            warn!("Failed to emit search state: {}", e);
                        }
                    })
                    .await;
            });

            app.manage(ConsoleShell { context, bridge });
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            // Device commands
            start_device_scan,
            stop_device_scan,
            get_console_state,
            check_bridge,
            reboot_to_bootloader,
            repair_resources,
            sdk_respond,
            sdk_ui_event,
            // Firmware commands
            get_release_summaries,
            get_v3_components,
            get_bridge_links,
            check_bridge_release,
            inspect_local_firmware,
            confirm_update,
            dismiss_update,
            start_firmware_update,
            start_v3_update,
            start_bootloader_update,
            read_resource_file,
            // Settings commands
            get_console_settings,
            save_console_settings
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
