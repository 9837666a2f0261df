//! State of the one update the console may run at a time.

use serde::{Deserialize, Serialize};

use super::progress::ProgressState;
use crate::device::Device;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstallType {
    #[default]
    Firmware,
    Bootloader,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UpdatePhase {
    CheckingBootloaderPrerequisite,
    AcquiringArtifact,
    Transferring,
    Installing,
    Verifying,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", content = "phase", rename_all = "kebab-case")]
pub enum SessionState {
    #[default]
    Idle,
    Confirming,
    Updating(UpdatePhase),
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultKind {
    Success,
    Error,
}

/// Message shown once a session ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateResult {
    pub kind: ResultKind,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSession {
    /// Increments on every begin so stale tickers can tell they are stale.
    pub id: u64,
    pub state: SessionState,
    pub install_type: InstallType,
    /// Device the session started with; discovery cannot replace it mid-flight.
    pub device: Option<Device>,
    pub progress: ProgressState,
    pub result: Option<UpdateResult>,
}

impl UpdateSession {
    pub fn is_active(&self) -> bool {
        matches!(self.state, SessionState::Updating(_))
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.state, SessionState::Succeeded | SessionState::Failed)
    }

    pub fn phase(&self) -> Option<UpdatePhase> {
        match self.state {
            SessionState::Updating(phase) => Some(phase),
            _ => None,
        }
    }

    /// Ask for confirmation; ignored while an update runs.
    pub fn confirm(&mut self) -> bool {
        if self.is_active() {
            return false;
        }
        self.state = SessionState::Confirming;
        self.result = None;
        true
    }

    /// Start a new session pinned to `device`. Returns the session id, or
    /// `None` if another update is still running.
    pub fn begin(&mut self, install_type: InstallType, device: Device, phase: UpdatePhase) -> Option<u64> {
        if self.is_active() {
            return None;
        }
        self.id += 1;
        self.state = SessionState::Updating(phase);
        self.install_type = install_type;
        self.device = Some(device);
        self.progress.reset();
        self.result = None;
        Some(self.id)
    }

    pub fn enter(&mut self, phase: UpdatePhase) {
        if self.is_active() {
            self.state = SessionState::Updating(phase);
        }
    }

    /// Switch what is being installed. The bar starts over only when the
    /// install type actually changes.
    pub fn switch_install_type(&mut self, install_type: InstallType) {
        if self.install_type == install_type {
            return;
        }
        self.install_type = install_type;
        self.progress.reset();
    }

    pub fn succeed(&mut self, message: impl Into<String>) {
        self.state = SessionState::Succeeded;
        self.progress.complete();
        self.result = Some(UpdateResult {
            kind: ResultKind::Success,
            message: message.into(),
        });
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        self.state = SessionState::Failed;
        self.progress.clear_alerts();
        self.progress.stage = None;
        self.result = Some(UpdateResult {
            kind: ResultKind::Error,
            message: message.into(),
        });
    }

    /// Back to idle; keeps the id counter.
    pub fn dismiss(&mut self) {
        if self.is_active() {
            return;
        }
        *self = Self {
            id: self.id,
            ..Self::default()
        };
    }
}
