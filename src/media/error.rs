//! Media backend error types

use std::time::Duration;

/// Error type for media backend operations
#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    /// The backend process could not be spawned
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Source could not be opened
    #[error("open failed: {0}")]
    Open(String),

    /// Source opened but its parameters could not be determined
    #[error("probe failed: {0}")]
    Probe(String),

    /// A frame read failed
    #[error("read failed: {0}")]
    Read(String),

    /// The source closed the stream
    #[error("end of stream")]
    EndOfStream,

    /// A frame could not be written
    #[error("write failed: {0}")]
    Write(String),

    /// Operation did not finish in time
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
