//! Error types for the engine binary.
//!
//! [`EngineError`] wraps every failure mode of startup, the tick loop, and
//! shutdown so that `main` can propagate with `?`.

/// Top-level error for the engine binary.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: tomorrow_core::ConfigError,
    },

    /// The final timeline save failed.
    #[error("store error: {source}")]
    Store {
        /// The underlying store error.
        #[from]
        source: tomorrow_db::StoreError,
    },

    /// The tick loop failed.
    #[error("runner error: {source}")]
    Runner {
        /// The underlying runner error.
        #[from]
        source: crate::runner::RunnerError,
    },

    /// Unknown command-line command.
    #[error("unknown command `{command}` (expected `run` or `inspect`)")]
    Usage {
        /// The command that was given.
        command: String,
    },
}
