//! Error types
//!
//! Per-session failures stay inside the session task and only surface as
//! status changes. The variants here are what callers see synchronously, from
//! `start()` and friends.

use std::path::PathBuf;

use crate::media::MediaError;

/// Result of session operations
pub type Result<T> = std::result::Result<T, Error>;

/// Session start failures
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A session was started without complete credentials
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Initial connect failed
    #[error("failed to connect to {stream}: {source}")]
    Connect {
        stream: String,
        #[source]
        source: MediaError,
    },

    /// Initial test read failed
    #[error("failed to read from {stream}: {source}")]
    Read {
        stream: String,
        #[source]
        source: MediaError,
    },

    /// `start()` called on a session that is already running
    #[error("session for {0} is already running")]
    AlreadyRunning(String),
}

/// Missing or invalid session settings
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigurationError {
    /// `start()` called before `configure()`
    #[error("no stream endpoint configured")]
    MissingEndpoint,

    /// A required credential field is empty
    #[error("stream field '{0}' is empty")]
    EmptyField(&'static str),

    /// The connection URL could not be built
    #[error("invalid connection url: {0}")]
    InvalidUrl(String),
}

/// Recorder failures
#[derive(Debug, thiserror::Error)]
pub enum RecorderError {
    #[error("output path is not set")]
    MissingOutputPath,

    #[error("target fps is not set")]
    MissingTargetFps,

    #[error("frame size is not set")]
    MissingFrameSize,

    #[error("recorder is already running")]
    AlreadyRunning,

    /// The output writer could not be created
    #[error("failed to open video writer for {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: MediaError,
    },
}
