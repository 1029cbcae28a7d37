//! Error types for the timeline store.
//!
//! None of these are fatal to the host: a failed read yields an empty store
//! and a failed write leaves the in-memory state authoritative until the
//! next successful save.

use std::path::PathBuf;

/// Errors that can occur while reading or writing the timeline file.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Reading, writing, or renaming the timeline file failed.
    #[error("timeline file I/O error at {path}: {source}")]
    Io {
        /// File the operation targeted.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The timeline document could not be encoded or decoded.
    #[error("timeline serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
