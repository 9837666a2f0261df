//! Error types for the firmware console.

use thiserror::Error;

use crate::device::{DeviceType, FirmwareVersion};
use crate::hardware::HardwareError;
use crate::release::UpdateCategory;

/// Result type alias for console operations.
pub type ConsoleResult<T> = Result<T, ConsoleError>;

/// Errors that can occur while preparing or driving a firmware update.
#[derive(Debug, Error)]
pub enum ConsoleError {
    /// Standard I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error (release config, settings, cache index).
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP transport error from reqwest.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The hardware SDK threw instead of returning a response envelope.
    #[error(transparent)]
    Hardware(#[from] HardwareError),

    /// Remote release config could not be fetched and no snapshot exists.
    #[error("Release config unavailable: {reason}")]
    ReleaseConfigUnavailable { reason: String },

    /// A remote artifact download returned a non-success status.
    #[error("Download of {url} failed with HTTP status {status}")]
    DownloadFailed { url: String, status: u16 },

    /// No channel for this device type carries any release entries.
    #[error("No {category} release available for {device_type}")]
    NoArtifact {
        device_type: DeviceType,
        category: UpdateCategory,
    },

    /// The release entry exists but does not carry a downloadable artifact.
    #[error("Release {version} in channel '{channel}' has no downloadable artifact")]
    MissingArtifactUrl {
        channel: String,
        version: FirmwareVersion,
    },

    /// A component selection violates its invariants.
    #[error("Invalid selection: {reason}")]
    InvalidSelection { reason: String },

    /// A locally supplied firmware file has no content.
    #[error("Firmware file '{file_name}' is empty")]
    EmptyFile { file_name: String },

    /// Resource lookups must name a plain file inside the resource directory.
    #[error("Invalid resource name '{name}'")]
    InvalidResourceName { name: String },
}

impl ConsoleError {
    /// Whether the user can recover by retrying or switching context.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ConsoleError::Http(_)
                | ConsoleError::Hardware(_)
                | ConsoleError::ReleaseConfigUnavailable { .. }
                | ConsoleError::DownloadFailed { .. }
        )
    }

    /// Get a stable error code for support purposes.
    pub fn error_code(&self) -> &'static str {
        match self {
            ConsoleError::Io(_) => "OKC-001",
            ConsoleError::Json(_) => "OKC-002",
            ConsoleError::Http(_) => "OKC-003",
            ConsoleError::Hardware(_) => "OKC-010",
            ConsoleError::ReleaseConfigUnavailable { .. } => "OKC-020",
            ConsoleError::DownloadFailed { .. } => "OKC-021",
            ConsoleError::NoArtifact { .. } => "OKC-030",
            ConsoleError::MissingArtifactUrl { .. } => "OKC-031",
            ConsoleError::InvalidSelection { .. } => "OKC-040",
            ConsoleError::EmptyFile { .. } => "OKC-041",
            ConsoleError::InvalidResourceName { .. } => "OKC-042",
        }
    }
}
