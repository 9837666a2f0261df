//! UI events the hardware SDK emits while talking to a device.

use serde::{Deserialize, Serialize};

/// Milestones reported through the SDK's firmware-tip channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StageTip {
    AutoRebootToBootloader,
    GoToBootloaderSuccess,
    DownloadFirmware,
    DownloadFirmwareSuccess,
    ConfirmOnDevice,
    FirmwareEraseSuccess,
    Other(String),
}

impl StageTip {
    pub fn from_message(message: &str) -> Self {
        match message {
            "AutoRebootToBootloader" => StageTip::AutoRebootToBootloader,
            "GoToBootloaderSuccess" => StageTip::GoToBootloaderSuccess,
            "DownloadFirmware" => StageTip::DownloadFirmware,
            "DownloadFirmwareSuccess" => StageTip::DownloadFirmwareSuccess,
            "ConfirmOnDevice" => StageTip::ConfirmOnDevice,
            "FirmwareEraseSuccess" => StageTip::FirmwareEraseSuccess,
            other => StageTip::Other(other.to_string()),
        }
    }
}

/// Which half of a phased update a progress report belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProgressPhase {
    TransferData,
    InstallingFirmware,
}

impl ProgressPhase {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "transferData" => Some(ProgressPhase::TransferData),
            "installingFirmware" => Some(ProgressPhase::InstallingFirmware),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum UiEvent {
    /// Device asks for a PIN; it is always entered on the device itself.
    PinRequested,
    /// Device waits for a physical confirmation.
    ButtonRequested,
    /// The SDK closed its prompt window.
    WindowClosed,
    StageTip { tip: StageTip },
    /// Raw percentage as reported by the SDK; range checks happen downstream.
    Progress {
        value: i64,
        phase: Option<ProgressPhase>,
    },
}

impl UiEvent {
    pub fn tip(message: &str) -> Self {
        UiEvent::StageTip {
            tip: StageTip::from_message(message),
        }
    }

    pub fn progress(value: i64, phase_tag: Option<&str>) -> Self {
        UiEvent::Progress {
            value,
            phase: phase_tag.and_then(ProgressPhase::from_tag),
        }
    }
}
