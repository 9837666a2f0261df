//! Shared console state and its change feed.

use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::debug;

use crate::device::Device;
use crate::hardware::{ProgressPhase, UiEvent};
use crate::update::session::{UpdatePhase, UpdateSession};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PageStatus {
    #[default]
    Initialize,
    UninstallBridge,
    DownloadBridge,
    Searching,
    SearchTimeout,
    Connected,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsoleState {
    pub device: Option<Device>,
    pub page_status: PageStatus,
    pub session: UpdateSession,
    /// Informational message that is not an update result.
    pub notice: Option<String>,
}

/// Single source of truth for what the UI shows.
///
/// Mutations go through [`update`](Self::update); every change is published
/// as a snapshot to receivers from [`subscribe`](Self::subscribe).
#[derive(Clone)]
pub struct ConsoleStore {
    inner: Arc<Inner>,
}

struct Inner {
    state: Mutex<ConsoleState>,
    feed: watch::Sender<ConsoleState>,
}

impl Default for ConsoleStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsoleStore {
    pub fn new() -> Self {
        let (feed, _) = watch::channel(ConsoleState::default());
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(ConsoleState::default()),
                feed,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ConsoleState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn snapshot(&self) -> ConsoleState {
        self.lock().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ConsoleState> {
        self.inner.feed.subscribe()
    }

    /// Mutate the state and publish the result.
    pub fn update<R>(&self, f: impl FnOnce(&mut ConsoleState) -> R) -> R {
        let mut state = self.lock();
        let output = f(&mut state);
        self.inner.feed.send_replace(state.clone());
        output
    }

    pub fn set_page_status(&self, status: PageStatus) {
        self.update(|state| state.page_status = status);
    }

    pub fn set_notice(&self, notice: Option<String>) {
        self.update(|state| state.notice = notice);
    }

    /// Record what discovery found.
    ///
    /// Ignored while an update runs so the session keeps the device it
    /// started with. Returns whether the state changed.
    pub fn set_discovered_device(&self, device: Option<Device>) -> bool {
        self.update(|state| {
            if state.session.is_active() {
                debug!("Update in progress; keeping pinned device");
                return false;
            }
            if state.device == device {
                return false;
            }
            if device.is_some() {
                state.page_status = PageStatus::Connected;
            } else if state.page_status == PageStatus::Connected {
                state.page_status = PageStatus::Searching;
            }
            state.device = device;
            true
        })
    }

    /// Route an SDK UI event into the running session's progress.
    pub fn apply_ui_event(&self, event: &UiEvent) {
        self.update(|state| {
            let session = &mut state.session;
            if !session.is_active() {
                // Alerts still need clearing when the SDK closes its window.
                if matches!(event, UiEvent::WindowClosed) {
                    session.progress.clear_alerts();
                }
                return;
            }
            session.progress.apply(event);
            if let UiEvent::Progress { phase, .. } = event {
                if *phase != Some(ProgressPhase::TransferData)
                    && session.phase() == Some(UpdatePhase::Transferring)
                {
                    session.enter(UpdatePhase::Installing);
                }
            }
        });
    }
}
