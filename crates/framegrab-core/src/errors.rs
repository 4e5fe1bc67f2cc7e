use thiserror::Error;

use crate::types::Region;

/// Failures reported by a capture session and its platform collaborators.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("No compatible graphics device: {reason}")]
    BackendUnavailable { reason: String },

    #[error("Desktop duplication init failed: {reason}")]
    DuplicationInitFailed { reason: String },

    #[error("No frame within {ms}ms")]
    Timeout { ms: u64 },

    #[error("Capture failed: {reason}")]
    CaptureFailed { reason: String },

    #[error("No captured frame is held")]
    NoFrameHeld,

    #[error("Graphics device error: {reason}")]
    Device { reason: String },
}

/// Failures surfaced by `grab`.
#[derive(Error, Debug)]
pub enum GrabError {
    #[error("Invalid region {region}: {reason}")]
    InvalidRegion { region: Region, reason: String },

    #[error("No frame within {ms}ms")]
    Timeout { ms: u64 },

    #[error("Capture backend failure: {0}")]
    BackendFailure(CaptureError),

    #[error("Recovery re-init failed: {0}")]
    ReinitFailure(CaptureError),

    #[error("Unsupported output format code {code}")]
    UnsupportedFormat { code: i32 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl GrabError {
    /// `true` when the session is healthy and a later grab may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// `true` when the session was left partially torn down and must be reset.
    pub fn needs_reset(&self) -> bool {
        matches!(self, Self::ReinitFailure(_))
    }
}

impl From<CaptureError> for GrabError {
    fn from(err: CaptureError) -> Self {
        match err {
            CaptureError::Timeout { ms } => Self::Timeout { ms },
            other => Self::BackendFailure(other),
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Configuration invalid: {reason}")]
    Invalid { reason: String },
}
