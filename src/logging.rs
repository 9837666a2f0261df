//! Log output setup.

use tracing_subscriber::EnvFilter;

/// Install the fmt subscriber. `RUST_LOG` takes precedence over `level`.
///
/// Safe to call more than once; later calls leave the first subscriber in
/// place and return false.
pub fn init(level: &str) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .is_ok()
}
