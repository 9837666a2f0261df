//! Tauri commands for release data and firmware updates.

use std::path::Path;

use onekey_firmware_console::device::FirmwareVersion;
use onekey_firmware_console::hardware::BridgeReleaseInfo;
use onekey_firmware_console::release::selector::{ReleaseSummary, V3ComponentRelease};
use onekey_firmware_console::release::{BridgeReleaseMap, UpdateCategory, V3Component};
use onekey_firmware_console::store::ConsoleState;
use onekey_firmware_console::update::{
    ComponentSource, LocalFileInfo, LocalFirmware, UpdateOutcome, UpdateSelection, V3Selections, V3Tab,
};
use onekey_firmware_console::ConsoleContext;
use serde::Deserialize;
use tauri::ipc::Channel;
use tauri::State;

use super::{with_progress, ConsoleShell};

/// Single-target selection as sent by the frontend.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "source", rename_all = "camelCase")]
pub enum SelectionRequest {
    /// Newest release for the device.
    Latest { category: UpdateCategory },
    Remote {
        category: UpdateCategory,
        channel: String,
        version: String,
    },
    Local { category: UpdateCategory, path: String },
}

/// One ticked row of the multi-component table.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentRequest {
    pub component: V3Component,
    #[serde(default)]
    pub version: Option<String>,
    /// Local binary; takes precedence over `version`.
    #[serde(default)]
    pub path: Option<String>,
}

async fn resolve_selection(context: &ConsoleContext, request: SelectionRequest) -> Result<UpdateSelection, String> {
    match request {
        SelectionRequest::Latest { category } => {
            let device = context
                .store
                .snapshot()
                .device
                .ok_or_else(|| "No device connected".to_string())?;
            let config = context
                .releases
                .get()
                .await
                .map_err(|e| format!("Failed to load release config: {}", e))?;
            UpdateSelection::latest(&config, &device, category).map_err(|e| e.to_string())
        }
        SelectionRequest::Remote {
            category,
            channel,
            version,
        } => {
            let version =
                FirmwareVersion::parse(&version).ok_or_else(|| format!("Invalid firmware version: {}", version))?;
            Ok(UpdateSelection::remote(category, channel, version))
        }
        SelectionRequest::Local { category, path } => {
            let firmware = read_local(&path).await?;
            Ok(UpdateSelection::local(category, firmware))
        }
    }
}

async fn read_local(path: &str) -> Result<LocalFirmware, String> {
    LocalFirmware::read(Path::new(path))
        .await
        .map_err(|e| format!("Failed to read firmware file: {}", e))
}

#[tauri::command]
pub async fn get_release_summaries(shell: State<'_, ConsoleShell>) -> Result<Vec<ReleaseSummary>, String> {
    shell
        .context
        .release_summaries()
        .await
        .map_err(|e| format!("Failed to load releases: {}", e))
}

#[tauri::command]
pub async fn get_v3_components(shell: State<'_, ConsoleShell>) -> Result<Vec<V3ComponentRelease>, String> {
    shell
        .context
        .v3_components()
        .await
        .map_err(|e| format!("Failed to load releases: {}", e))
}

#[tauri::command]
pub async fn get_bridge_links(shell: State<'_, ConsoleShell>) -> Result<BridgeReleaseMap, String> {
    shell
        .context
        .bridge_links()
        .await
        .map_err(|e| format!("Failed to load bridge releases: {}", e))
}

#[tauri::command]
pub async fn check_bridge_release(
    will_update_firmware_version: String,
    shell: State<'_, ConsoleShell>,
) -> Result<BridgeReleaseInfo, String> {
    Ok(shell.context.check_bridge_release(will_update_firmware_version).await)
}

/// Name and size of a local firmware file before it is flashed.
#[tauri::command]
pub async fn inspect_local_firmware(path: String) -> Result<LocalFileInfo, String> {
    Ok(read_local(&path).await?.info())
}

#[tauri::command]
pub async fn confirm_update(shell: State<'_, ConsoleShell>) -> Result<bool, String> {
    Ok(shell.context.sequencer.confirm())
}

#[tauri::command]
pub async fn dismiss_update(shell: State<'_, ConsoleShell>) -> Result<(), String> {
    shell.context.sequencer.dismiss();
    Ok(())
}

/// Update firmware or BLE from one artifact.
///
/// # Arguments
/// * `selection` - What to install and where it comes from
/// * `progress` - Channel receiving console snapshots while the update runs
#[tauri::command]
pub async fn start_firmware_update(
    selection: SelectionRequest,
    progress: Channel<ConsoleState>,
    shell: State<'_, ConsoleShell>,
) -> Result<UpdateOutcome, String> {
    let context = &shell.context;
    let selection = resolve_selection(context, selection).await?;
    Ok(with_progress(&context.store, progress, context.sequencer.start_v2_update(selection)).await)
}

/// Install several components in one pass.
#[tauri::command]
pub async fn start_v3_update(
    tab: V3Tab,
    components: Vec<ComponentRequest>,
    progress: Channel<ConsoleState>,
    shell: State<'_, ConsoleShell>,
) -> Result<UpdateOutcome, String> {
    let mut selections = V3Selections::new();
    for request in components {
        let source = match request.path {
            Some(path) => ComponentSource::Local(read_local(&path).await?),
            None => ComponentSource::Remote {
                version: request.version,
            },
        };
        selections.select(request.component, source).map_err(|e| e.to_string())?;
    }

    let context = &shell.context;
    Ok(with_progress(&context.store, progress, context.sequencer.start_v3_update(tab, &selections)).await)
}

#[tauri::command]
pub async fn start_bootloader_update(
    selection: SelectionRequest,
    progress: Channel<ConsoleState>,
    shell: State<'_, ConsoleShell>,
) -> Result<UpdateOutcome, String> {
    let context = &shell.context;
    let selection = resolve_selection(context, selection).await?;
    Ok(with_progress(&context.store, progress, context.sequencer.bootloader_standalone_update(selection)).await)
}

/// Read a firmware file bundled with the app.
#[tauri::command]
pub async fn read_resource_file(name: String, shell: State<'_, ConsoleShell>) -> Result<Vec<u8>, String> {
    shell
        .context
        .read_resource(&name)
        .await
        .map_err(|e| format!("Failed to read resource {}: {}", name, e))
}
