//! Error types for the replay harness.

use std::path::PathBuf;

use placement_core::PlacementError;
use thiserror::Error;

/// Result type for replay operations.
pub type ReplayResult<T> = Result<T, ReplayError>;

/// Errors that stop a replay before or between steps.
#[derive(Debug, Error)]
pub enum ReplayError {
    /// A config or trace file could not be read.
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The TOML engine configuration did not parse.
    #[error("Invalid config file: {0}")]
    Config(#[from] toml::de::Error),

    /// The JSON trace did not parse, or a report did not serialize.
    #[error("Invalid trace: {0}")]
    Trace(#[from] serde_json::Error),

    /// The engine rejected the configuration.
    #[error(transparent)]
    Placement(#[from] PlacementError),

    /// A command-line value is out of range.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}
