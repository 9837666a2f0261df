//! Lazily initialised SDK handle.

use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::{error, info};

use super::sdk::{HardwareError, HardwareSdk, SdkSettings};

/// Wraps the SDK so it is initialised exactly once on first use.
///
/// Concurrent first callers wait on the same initialisation. A failed
/// initialisation leaves the handle uninitialised so the next caller retries.
pub struct SdkHandle {
    sdk: Arc<dyn HardwareSdk>,
    settings: SdkSettings,
    ready: OnceCell<()>,
}

impl SdkHandle {
    pub fn new(sdk: Arc<dyn HardwareSdk>, settings: SdkSettings) -> Self {
        Self {
            sdk,
            settings,
            ready: OnceCell::new(),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.ready.initialized()
    }

    pub async fn get(&self) -> Result<Arc<dyn HardwareSdk>, HardwareError> {
        self.ready
            .get_or_try_init(|| async {
                match self.sdk.init(self.settings.clone()).await {
                    Ok(()) => {
                        info!("Hardware SDK initialized (env: {})", self.settings.env);
                        Ok(())
                    }
                    Err(e) => {
                        error!("Hardware SDK initialization failed: {}", e);
                        Err(e)
                    }
                }
            })
            .await?;
        Ok(self.sdk.clone())
    }
}
