//! Turns SDK UI events into a monotonic progress display.
//!
//! Stage tips raise a ceiling; a ticker walks the shown progress toward that
//! ceiling one step at a time. Percentage reports from phased updates map
//! transfer into 0..50 and install into 50..99. Neither the ceiling nor the
//! shown progress ever moves backward within a session.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::hardware::{ProgressPhase, StageTip, UiEvent};
use crate::store::ConsoleStore;

/// Ceilings reached at each milestone.
pub const CEILING_GO_TO_BOOTLOADER: u8 = 5;
pub const CEILING_BOOTLOADER_READY: u8 = 10;
pub const CEILING_DOWNLOADING: u8 = 15;
pub const CEILING_DOWNLOADED: u8 = 25;
pub const CEILING_ERASED: u8 = 30;
pub const CEILING_TRANSFER: u8 = 50;
pub const CEILING_INSTALL: u8 = 99;
pub const CEILING_DONE: u8 = 100;

/// Label shown beneath the progress bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StageLabel {
    GoToBootloader,
    GoToBootloaderSuccess,
    DownloadFirmware,
    DownloadFirmwareSuccess,
    EraseSuccess,
    TransferData,
    Installing,
}

impl StageLabel {
    pub fn message_id(&self) -> &'static str {
        match self {
            StageLabel::GoToBootloader => "TR_GO_TO_BOOTLOADER",
            StageLabel::GoToBootloaderSuccess => "TR_GO_TO_BOOTLOADER_SUCCESS",
            StageLabel::DownloadFirmware => "TR_DOWNLOAD_FIRMWARE",
            StageLabel::DownloadFirmwareSuccess => "TR_DOWNLOAD_FIRMWARE_SUCCESS",
            StageLabel::EraseSuccess => "TR_ERASE_SUCCESS",
            StageLabel::TransferData => "TR_TRANSFER_DATA",
            StageLabel::Installing => "TR_INSTALLING",
        }
    }

    pub fn text(&self) -> &'static str {
        match self {
            StageLabel::GoToBootloader => "Rebooting into bootloader",
            StageLabel::GoToBootloaderSuccess => "Bootloader ready",
            StageLabel::DownloadFirmware => "Downloading firmware",
            StageLabel::DownloadFirmwareSuccess => "Firmware downloaded",
            StageLabel::EraseSuccess => "Erase complete",
            StageLabel::TransferData => "Transferring data",
            StageLabel::Installing => "Installing",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressState {
    pub progress: u8,
    pub ceiling: u8,
    pub stage: Option<StageLabel>,
    pub pin_alert: bool,
    pub button_alert: bool,
}

impl ProgressState {
    fn raise_ceiling(&mut self, ceiling: u8) {
        self.ceiling = self.ceiling.max(ceiling.min(CEILING_DONE));
    }

    fn advance_to(&mut self, progress: u8) {
        self.progress = self.progress.max(progress.min(CEILING_DONE));
        self.raise_ceiling(self.progress);
    }

    fn stage_tip(&mut self, ceiling: u8, label: StageLabel) {
        self.raise_ceiling(ceiling);
        self.stage = Some(label);
    }

    pub fn clear_alerts(&mut self) {
        self.pin_alert = false;
        self.button_alert = false;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Move the shown progress one step toward the ceiling.
    pub fn tick(&mut self) -> bool {
        if self.progress < self.ceiling {
            self.progress += 1;
            true
        } else {
            false
        }
    }

    /// Jump straight to a finished bar.
    pub fn complete(&mut self) {
        self.ceiling = CEILING_DONE;
        self.progress = CEILING_DONE;
        self.stage = None;
        self.clear_alerts();
    }

    pub fn apply(&mut self, event: &UiEvent) {
        match event {
            UiEvent::PinRequested => {
                self.pin_alert = true;
                self.button_alert = false;
            }
            UiEvent::ButtonRequested => {
                self.button_alert = true;
                self.pin_alert = false;
            }
            UiEvent::WindowClosed => self.clear_alerts(),
            UiEvent::StageTip { tip } => self.apply_tip(tip),
            UiEvent::Progress { value, phase } => self.apply_progress(*value, *phase),
        }
    }

    fn apply_tip(&mut self, tip: &StageTip) {
        match tip {
            StageTip::AutoRebootToBootloader => {
                self.stage_tip(CEILING_GO_TO_BOOTLOADER, StageLabel::GoToBootloader)
            }
            StageTip::GoToBootloaderSuccess => {
                self.stage_tip(CEILING_BOOTLOADER_READY, StageLabel::GoToBootloaderSuccess)
            }
            StageTip::DownloadFirmware => {
                self.stage_tip(CEILING_DOWNLOADING, StageLabel::DownloadFirmware)
            }
            StageTip::DownloadFirmwareSuccess => {
                self.stage_tip(CEILING_DOWNLOADED, StageLabel::DownloadFirmwareSuccess)
            }
            StageTip::FirmwareEraseSuccess => self.stage_tip(CEILING_ERASED, StageLabel::EraseSuccess),
            StageTip::ConfirmOnDevice => {
                self.button_alert = true;
                self.pin_alert = false;
                self.stage = None;
            }
            StageTip::Other(message) => debug!("Ignoring firmware tip '{}'", message),
        }
    }

    fn apply_progress(&mut self, value: i64, phase: Option<ProgressPhase>) {
        // Any progress report means the device is no longer waiting on a button.
        self.button_alert = false;

        let (ceiling, label) = match phase {
            Some(ProgressPhase::TransferData) => (CEILING_TRANSFER, StageLabel::TransferData),
            Some(ProgressPhase::InstallingFirmware) | None => (CEILING_INSTALL, StageLabel::Installing),
        };
        self.raise_ceiling(ceiling);

        let Ok(value) = u8::try_from(value) else {
            return;
        };
        if value > 100 {
            return;
        }

        match phase {
            Some(phase) => {
                if self.progress >= ceiling {
                    return;
                }
                let mapped = match phase {
                    ProgressPhase::TransferData => value / 2,
                    ProgressPhase::InstallingFirmware => {
                        CEILING_TRANSFER + (u16::from(value) * 49 / 100) as u8
                    }
                };
                self.advance_to(mapped);
                self.stage = (value < 100).then_some(label);
            }
            None if value < 100 => {
                if self.progress < ceiling {
                    self.stage = Some(label);
                }
            }
            None => {
                self.raise_ceiling(CEILING_DONE);
                self.stage = None;
            }
        }
    }
}

/// Pure form of [`ProgressState::apply`].
pub fn reduce(state: &ProgressState, event: &UiEvent) -> ProgressState {
    let mut next = state.clone();
    next.apply(event);
    next
}

/// Spawn the task that ticks an active session's progress forward.
///
/// The task exits once the session it was started for is no longer active.
pub fn spawn_ticker(store: ConsoleStore, session_id: u64, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let still_running = store.update(|state| {
                let session = &mut state.session;
                if session.id != session_id || !session.is_active() {
                    return false;
                }
                session.progress.tick();
                true
            });
            if !still_running {
                debug!("Progress ticker for session {} stopped", session_id);
                break;
            }
        }
    })
}
