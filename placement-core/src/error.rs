//! Error types for placement operations.
//!
//! Tracking noise and input pathologies never surface here: a missing hit
//! hides the reticle, an invisible reticle turns a commit into a no-op and a
//! degenerate pinch is clamped. Only configuration mistakes and contract
//! violations by the caller become errors.

use thiserror::Error;

/// Result type for placement operations.
pub type PlacementResult<T> = Result<T, PlacementError>;

/// Errors that can occur in placement operations.
#[derive(Debug, Error)]
pub enum PlacementError {
    /// Engine configuration is out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A gesture delta was applied while no object is active.
    #[error("No active object to manipulate")]
    NoActiveObject,

    /// An operation required a running session.
    #[error("Session is not running")]
    SessionNotRunning,

    /// The collaborator reported that the tracking session failed to start.
    #[error("Session start failed: {0}")]
    SessionStart(String),

    /// State serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
