//! Fixed-interval device discovery.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::device::Device;
use crate::hardware::{HardwareService, SdkResponse, SearchOutcome};
use crate::store::{ConsoleStore, PageStatus};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);
pub const DEFAULT_SEARCH_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SearchState {
    Start,
    Stop,
    TimedOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanOptions {
    pub interval: Duration,
    /// When set, the page switches to "search timed out" if no device has
    /// shown up by then. Polling carries on regardless.
    pub timeout: Option<Duration>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            timeout: Some(DEFAULT_SEARCH_TIMEOUT),
        }
    }
}

type ResultCallback = Arc<dyn Fn(&SearchOutcome) + Send + Sync>;
type StateCallback = Arc<dyn Fn(SearchState) + Send + Sync>;

/// Polls for devices and keeps the store's current device up to date.
///
/// Ticks that fire while a search is still outstanding are skipped, so at
/// most one search runs at a time.
pub struct DevicePoller {
    hardware: Arc<HardwareService>,
    store: ConsoleStore,
    options: ScanOptions,
    scanning: Arc<AtomicBool>,
    generation: Arc<AtomicU64>,
}

impl DevicePoller {
    pub fn new(hardware: Arc<HardwareService>, store: ConsoleStore, options: ScanOptions) -> Self {
        Self {
            hardware,
            store,
            options,
            scanning: Arc::new(AtomicBool::new(false)),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn is_scanning(&self) -> bool {
        self.scanning.load(Ordering::SeqCst)
    }

    /// Start polling. The first search runs right away.
    ///
    /// `on_result` sees every completed search; `on_state_change` sees
    /// `Start`/`Stop` around each search and `TimedOut` at most once.
    pub fn start_scanning<R, S>(&self, on_result: R, on_state_change: S)
    where
        R: Fn(&SearchOutcome) + Send + Sync + 'static,
        S: Fn(SearchState) + Send + Sync + 'static,
    {
        if self.scanning.swap(true, Ordering::SeqCst) {
            debug!("Device scanning already running");
            return;
        }
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        info!("Starting device scan every {:?}", self.options.interval);
        self.store.set_page_status(PageStatus::Searching);

        let scan = Scan {
            hardware: self.hardware.clone(),
            store: self.store.clone(),
            on_result: Arc::new(on_result),
            on_state_change: Arc::new(on_state_change),
        };

        if let Some(timeout) = self.options.timeout {
            let scan = scan.clone();
            let scanning = self.scanning.clone();
            let current = self.generation.clone();
            tokio::spawn(async move {
                tokio::time::sleep(timeout).await;
                let same_scan = current.load(Ordering::SeqCst) == generation;
                if same_scan && scanning.load(Ordering::SeqCst) && scan.store.snapshot().device.is_none() {
                    warn!("No device found within {:?}", timeout);
                    scan.store.set_page_status(PageStatus::SearchTimeout);
                    (scan.on_state_change)(SearchState::TimedOut);
                }
            });
        }

        let interval = self.options.interval;
        let scanning = self.scanning.clone();
        let current = self.generation.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if !scanning.load(Ordering::SeqCst) || current.load(Ordering::SeqCst) != generation {
                    debug!("Device scan loop exiting");
                    break;
                }
                if scan.hardware.is_searching() {
                    debug!("Previous search still running; skipping tick");
                    continue;
                }
                let scan = scan.clone();
                tokio::spawn(async move { scan.search_once().await });
            }
        });
    }

    /// Stop after the current tick. A search already running completes.
    pub fn stop_scanning(&self) {
        if self.scanning.swap(false, Ordering::SeqCst) {
            info!("Stopping device scan");
        }
    }
}

#[derive(Clone)]
struct Scan {
    hardware: Arc<HardwareService>,
    store: ConsoleStore,
    on_result: ResultCallback,
    on_state_change: StateCallback,
}

impl Scan {
    async fn search_once(&self) {
        let on_state_change = self.on_state_change.clone();
        let flight = self
            .hardware
            .search_devices(move || on_state_change(SearchState::Start))
            .await;
        if !flight.leader {
            return;
        }

        (self.on_result)(&flight.value);
        self.apply(&flight.value).await;
        (self.on_state_change)(SearchState::Stop);
    }

    /// Keep the device on the same path if it is still there, otherwise
    /// take the first one found.
    async fn apply(&self, outcome: &SearchOutcome) {
        let devices = match outcome {
            Ok(SdkResponse::Success(devices)) => devices,
            Ok(SdkResponse::Unsuccessful(failure)) => {
                debug!("Device search unsuccessful: {}", failure.error);
                return;
            }
            Err(e) => {
                warn!("Device search failed: {}", e);
                return;
            }
        };

        if devices.is_empty() {
            let previous = self.store.snapshot().device.map(|d| d.display_label());
            if self.store.set_discovered_device(None) {
                if let Some(label) = previous {
                    info!("Device disconnected: {}", label);
                }
            }
            return;
        }

        let current_path = self.store.snapshot().device.map(|d| d.path);
        let found = current_path
            .and_then(|path| devices.iter().find(|d| d.path == path))
            .or_else(|| devices.first());
        let Some(found) = found else {
            return;
        };

        let features = match (&found.features, &found.connect_id) {
            (Some(features), _) => features.clone(),
            (None, Some(connect_id)) => match self.hardware.get_features(connect_id.clone()).await {
                Ok(SdkResponse::Success(features)) => features,
                Ok(SdkResponse::Unsuccessful(failure)) => {
                    warn!("Could not read features of {}: {}", found.path, failure.error);
                    return;
                }
                Err(e) => {
                    warn!("Could not read features of {}: {}", found.path, e);
                    return;
                }
            },
            (None, None) => {
                debug!("Device at {} has no features yet", found.path);
                return;
            }
        };

        let device = Device::from_features(found.connect_id.clone(), found.path.clone(), &features);
        let label = device.display_label();
        if self.store.set_discovered_device(Some(device)) {
            info!("Device connected: {}", label);
        }
    }
}
