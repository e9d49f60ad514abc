//! Error types module
//!
//! Failures inside the pipeline are contained at file granularity: classification
//! rejections and transport failures are recorded on the tracked file, not raised.
//! `UploadError` covers the remaining cases (bad configuration, a missing transport,
//! a closed pipeline) which are logged at the boundary and reported to callers that
//! explicitly ask for a `Result`.

use std::io;

use crate::transport::TransportError;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected outcomes like an unknown file id
    Debug,
    /// Warning level - for invalid invocations like an empty selection
    Warn,
    /// Error level - for configuration mistakes and unexpected failures
    Error,
}

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("No upload transport configured")]
    TransportMissing,

    #[error("There are no upload files")]
    NoFiles,

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid translation table: {0}")]
    Translations(String),

    #[error("Upload pipeline is closed")]
    PipelineClosed,
}

impl From<serde_json::Error> for UploadError {
    fn from(err: serde_json::Error) -> Self {
        UploadError::Translations(format!("JSON parsing error: {}", err))
    }
}

impl UploadError {
    /// Machine-readable error code (e.g., "INVALID_CONFIG")
    pub fn error_code(&self) -> &'static str {
        match self {
            UploadError::InvalidConfig(_) => "INVALID_CONFIG",
            UploadError::TransportMissing => "TRANSPORT_MISSING",
            UploadError::NoFiles => "NO_FILES",
            UploadError::Transport(_) => "TRANSPORT_ERROR",
            UploadError::Io(_) => "IO_ERROR",
            UploadError::Translations(_) => "INVALID_TRANSLATIONS",
            UploadError::PipelineClosed => "PIPELINE_CLOSED",
        }
    }

    /// Log level for this error
    pub fn log_level(&self) -> LogLevel {
        match self {
            UploadError::NoFiles => LogLevel::Warn,
            UploadError::Transport(_) => LogLevel::Warn,
            UploadError::PipelineClosed => LogLevel::Debug,
            UploadError::InvalidConfig(_)
            | UploadError::TransportMissing
            | UploadError::Io(_)
            | UploadError::Translations(_) => LogLevel::Error,
        }
    }

    /// Emit this error through `tracing` at its own log level.
    pub fn log(&self) {
        match self.log_level() {
            LogLevel::Debug => tracing::debug!(code = self.error_code(), "{}", self),
            LogLevel::Warn => tracing::warn!(code = self.error_code(), "{}", self),
            LogLevel::Error => tracing::error!(code = self.error_code(), "{}", self),
        }
    }
}
