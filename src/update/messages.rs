//! Fixed texts shown in the result alert.

use crate::hardware::SdkFailure;

pub const FIRMWARE_INSTALLED_SUCCESS: &str = "Firmware installed successfully";
pub const FIRMWARE_INSTALLED_FAILED: &str = "Firmware installation failed";
pub const BOOTLOADER_INSTALLED_SUCCESS: &str = "Bootloader installed successfully";
pub const BOOTLOADER_INSTALLED_FAILED: &str = "Bootloader installation failed";

/// Shown instead of the raw error when the web transport rejects a payload
/// as too large.
pub const USE_DESKTOP_CLIENT_TO_INSTALL: &str =
    "This firmware is too large to install from the browser. Please use the OneKey desktop client to install it.";

pub const NO_DEVICE: &str = "No device connected";
pub const UPDATE_IN_PROGRESS: &str = "An update is already in progress";
pub const NO_COMPONENTS_SELECTED: &str = "No components selected";
pub const NO_FIRMWARE_TO_UPDATE: &str = "No firmware to update";
pub const NO_FIRMWARE_AVAILABLE: &str = "No firmware available for this device";
pub const UPDATE_UNSUPPORTED: &str = "This update is not supported by the connected device";

/// Alert text for an unsuccessful SDK response.
pub fn failure_message(failure: &SdkFailure) -> String {
    if failure.is_payload_too_large() {
        USE_DESKTOP_CLIENT_TO_INSTALL.to_string()
    } else {
        failure.error.clone()
    }
}
