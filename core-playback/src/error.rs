//! # Playback Error Types
//!
//! Typed failures of session, render-target and cache operations. Every
//! public operation resolves with success or exactly one of these.

use bridge_traits::BridgeError;
use core_async::OwnerError;
use thiserror::Error;

/// Errors that can occur during playback operations.
#[derive(Error, Debug)]
pub enum PlaybackError {
    // ========================================================================
    // Request Errors (rejected before any state mutation)
    // ========================================================================
    /// A required argument is missing or out of range.
    #[error("Invalid argument: {0}")]
    Validation(String),

    /// No live session has this id (never created, or already released).
    #[error("Session not found: {0}")]
    NotFound(String),

    // ========================================================================
    // Surface Errors
    // ========================================================================
    /// The host window could not provide a surface for a required attach.
    #[error("Render surface unavailable: {0}")]
    SurfaceUnavailable(String),

    /// Attach requested for a render target owned by another session.
    #[error("Render target {target} is owned by another session")]
    TargetBusy { target: u64 },

    // ========================================================================
    // Engine Errors
    // ========================================================================
    /// The media engine or an I/O collaborator failed mid-operation. Not
    /// retried and not rolled back.
    #[error("Operation failed: {0}")]
    OperationFailed(String),

    // ========================================================================
    // Cache Errors
    // ========================================================================
    /// The cache directory cannot be created or measured. Fatal at startup.
    #[error("Cache storage unavailable: {0}")]
    StorageUnavailable(String),

    /// A cache read or write failed. Callers fall back to uncached fetches.
    #[error("Cache error: {0}")]
    Cache(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // ========================================================================
    // Runtime Errors
    // ========================================================================
    /// The owner thread has stopped; the registry was shut down.
    #[error("Playback core has shut down")]
    OwnerStopped,

    /// Internal error (should not occur in normal operation).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PlaybackError {
    /// Returns `true` for errors raised before anything was mutated.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            PlaybackError::Validation(_) | PlaybackError::NotFound(_)
        )
    }

    /// Returns `true` when the core cannot serve further requests.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            PlaybackError::StorageUnavailable(_) | PlaybackError::OwnerStopped
        )
    }

    pub(crate) fn not_found(id: impl std::fmt::Display) -> Self {
        PlaybackError::NotFound(id.to_string())
    }
}

impl From<BridgeError> for PlaybackError {
    fn from(err: BridgeError) -> Self {
        PlaybackError::OperationFailed(err.to_string())
    }
}

impl From<OwnerError> for PlaybackError {
    fn from(err: OwnerError) -> Self {
        match err {
            OwnerError::Stopped | OwnerError::SpawnFailed => PlaybackError::OwnerStopped,
            OwnerError::WouldDeadlock => PlaybackError::Internal(err.to_string()),
        }
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert!(PlaybackError::Validation("url".into()).is_rejection());
        assert!(PlaybackError::not_found("abc").is_rejection());
        assert!(!PlaybackError::OperationFailed("x".into()).is_rejection());

        assert!(PlaybackError::StorageUnavailable("ro".into()).is_fatal());
        assert!(PlaybackError::OwnerStopped.is_fatal());
        assert!(!PlaybackError::Cache("disk".into()).is_fatal());
    }

    #[test]
    fn test_bridge_error_becomes_operation_failed() {
        let err: PlaybackError = BridgeError::OperationFailed("decoder init".into()).into();
        assert!(matches!(err, PlaybackError::OperationFailed(msg) if msg.contains("decoder init")));
    }

    #[test]
    fn test_owner_error_mapping() {
        assert!(matches!(
            PlaybackError::from(OwnerError::Stopped),
            PlaybackError::OwnerStopped
        ));
        assert!(matches!(
            PlaybackError::from(OwnerError::WouldDeadlock),
            PlaybackError::Internal(_)
        ));
    }
}
