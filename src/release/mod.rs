//! Release metadata: remote config, channel selection and artifacts.

pub mod artifacts;
pub mod bridge;
pub mod cache;
pub mod config;
pub mod selector;

pub use artifacts::{ArtifactCache, ArtifactSource, HttpArtifactSource, ResourceReader};
pub use bridge::{BridgeReleaseMap, BridgeSystem};
pub use cache::ReleaseConfigCache;
pub use config::{BridgeRelease, Changelog, Locale, ReleaseConfig, ReleaseEntry};
pub use selector::{UpdateCategory, V3Component};
