//! Lazily fetched, disk-backed release configuration.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use reqwest::Client;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use super::config::ReleaseConfig;
use crate::error::{ConsoleError, ConsoleResult};

/// Snapshot file name stored in the app data directory.
const SNAPSHOT_FILENAME: &str = "release_config.json";

/// Holds the current release configuration.
///
/// The first [`get`](Self::get) triggers a fetch; concurrent first callers
/// wait on the same request instead of issuing their own. The last good
/// document is written to disk and used when the network is unavailable.
pub struct ReleaseConfigCache {
    client: Client,
    url: String,
    snapshot_path: Option<PathBuf>,
    current: RwLock<Option<Arc<ReleaseConfig>>>,
    fetch_lock: Mutex<()>,
}

impl ReleaseConfigCache {
    pub fn new(client: Client, url: impl Into<String>, app_data_dir: Option<&Path>) -> Self {
        Self {
            client,
            url: url.into(),
            snapshot_path: app_data_dir.map(|dir| dir.join(SNAPSHOT_FILENAME)),
            current: RwLock::new(None),
            fetch_lock: Mutex::new(()),
        }
    }

    /// A cache that never touches the network.
    pub fn preloaded(config: ReleaseConfig) -> Self {
        Self {
            client: Client::new(),
            url: String::new(),
            snapshot_path: None,
            current: RwLock::new(Some(Arc::new(config))),
            fetch_lock: Mutex::new(()),
        }
    }

    /// Return the cached config, fetching it on first use.
    pub async fn get(&self) -> ConsoleResult<Arc<ReleaseConfig>> {
        if let Some(config) = self.current().await {
            return Ok(config);
        }

        let _guard = self.fetch_lock.lock().await;
        // Another caller may have completed the fetch while we waited.
        if let Some(config) = self.current().await {
            return Ok(config);
        }
        self.load_and_store().await
    }

    /// Re-fetch regardless of what is cached.
    pub async fn refresh(&self) -> ConsoleResult<Arc<ReleaseConfig>> {
        let _guard = self.fetch_lock.lock().await;
        self.load_and_store().await
    }

    /// Currently cached config without triggering a fetch.
    pub async fn current(&self) -> Option<Arc<ReleaseConfig>> {
        self.current.read().await.clone()
    }

    async fn load_and_store(&self) -> ConsoleResult<Arc<ReleaseConfig>> {
        let config = match self.fetch_remote().await {
            Ok(config) => config,
            Err(e) => {
                warn!("Failed to fetch release config: {}", e);
                self.load_snapshot()
                    .await?
                    .ok_or_else(|| ConsoleError::ReleaseConfigUnavailable {
                        reason: e.to_string(),
                    })?
            }
        };

        let config = Arc::new(config);
        *self.current.write().await = Some(config.clone());
        Ok(config)
    }

    fn request_url(&self) -> String {
        let separator = if self.url.contains('?') { '&' } else { '?' };
        format!("{}{}noCache={}", self.url, separator, Utc::now().timestamp_millis())
    }

    async fn fetch_remote(&self) -> ConsoleResult<ReleaseConfig> {
        if self.url.is_empty() {
            return Err(ConsoleError::ReleaseConfigUnavailable {
                reason: "no release config URL configured".into(),
            });
        }

        let url = self.request_url();
        info!("Fetching release config from {}", url);

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ConsoleError::DownloadFailed {
                url,
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        let config = ReleaseConfig::from_json(&body)?;
        self.save_snapshot(&body).await;
        Ok(config)
    }

    async fn save_snapshot(&self, body: &str) {
        let Some(path) = &self.snapshot_path else {
            return;
        };
        if let Some(parent) = path.parent() {
            if let Err(e) = tokio::fs::create_dir_all(parent).await {
                warn!("Failed to create snapshot directory: {}", e);
                return;
            }
        }
        match tokio::fs::write(path, body).await {
            Ok(()) => debug!("Saved release config snapshot to {}", path.display()),
            Err(e) => warn!("Failed to write release config snapshot: {}", e),
        }
    }

    async fn load_snapshot(&self) -> ConsoleResult<Option<ReleaseConfig>> {
        let Some(path) = &self.snapshot_path else {
            return Ok(None);
        };
        if !tokio::fs::try_exists(path).await? {
            return Ok(None);
        }
        let contents = tokio::fs::read_to_string(path).await?;
        info!("Using release config snapshot from {}", path.display());
        Ok(Some(ReleaseConfig::from_json(&contents)?))
    }
}
