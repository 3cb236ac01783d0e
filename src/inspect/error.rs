use std::path::{Path, PathBuf};

use thiserror::Error;

/// Error type for loading snapshots and building reports.
#[derive(Debug, Error)]
pub enum InspectError {
    /// Snapshot file not found at the specified path.
    #[error("snapshot not found: {0}")]
    MissingSnapshot(PathBuf),
    /// Snapshot text is not valid JSON for the expected record.
    #[error("invalid snapshot {origin}: {source}")]
    Json {
        /// Path or other description of where the text came from.
        origin: String,
        /// Underlying decode error.
        #[source]
        source: serde_json::Error,
    },
    /// Health policy thresholds are inconsistent.
    #[error("invalid health policy: {0}")]
    InvalidPolicy(String),
    /// I/O error.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result type alias for inspect operations.
pub type Result<T> = std::result::Result<T, InspectError>;

impl InspectError {
    pub(crate) fn missing_snapshot(path: impl AsRef<Path>) -> Self {
        InspectError::MissingSnapshot(path.as_ref().to_path_buf())
    }

    pub(crate) fn json(origin: impl Into<String>, source: serde_json::Error) -> Self {
        InspectError::Json {
            origin: origin.into(),
            source,
        }
    }
}
