use core_playback::PlaybackError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Core initialization failed: {0}")]
    InitializationFailed(String),

    #[error("Capability missing: {capability} - {message}")]
    CapabilityMissing { capability: String, message: String },

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Player not found: {0}")]
    NotFound(String),

    #[error("Render surface unavailable: {0}")]
    SurfaceUnavailable(String),

    #[error("Operation failed: {0}")]
    OperationFailed(String),

    #[error("Cache storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Playback core has shut down")]
    ShutDown,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Stable identifier a transport can put on the wire.
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::InitializationFailed(_) => "INITIALIZATION_FAILED",
            CoreError::CapabilityMissing { .. } => "CAPABILITY_MISSING",
            CoreError::Validation(_) => "VALIDATION",
            CoreError::NotFound(_) => "NOT_FOUND",
            CoreError::SurfaceUnavailable(_) => "SURFACE_UNAVAILABLE",
            CoreError::OperationFailed(_) => "OPERATION_FAILED",
            CoreError::StorageUnavailable(_) => "STORAGE_UNAVAILABLE",
            CoreError::ShutDown => "SHUT_DOWN",
            CoreError::Internal(_) => "INTERNAL",
        }
    }
}

impl From<PlaybackError> for CoreError {
    fn from(err: PlaybackError) -> Self {
        match err {
            PlaybackError::Validation(msg) => CoreError::Validation(msg),
            PlaybackError::NotFound(id) => CoreError::NotFound(id),
            PlaybackError::SurfaceUnavailable(msg) => CoreError::SurfaceUnavailable(msg),
            PlaybackError::TargetBusy { .. } => CoreError::SurfaceUnavailable(err.to_string()),
            PlaybackError::OperationFailed(msg) => CoreError::OperationFailed(msg),
            PlaybackError::StorageUnavailable(msg) => CoreError::StorageUnavailable(msg),
            PlaybackError::Cache(_) | PlaybackError::Io(_) => {
                CoreError::OperationFailed(err.to_string())
            }
            PlaybackError::OwnerStopped => CoreError::ShutDown,
            PlaybackError::Internal(msg) => CoreError::Internal(msg),
        }
    }
}

impl From<core_runtime::Error> for CoreError {
    fn from(err: core_runtime::Error) -> Self {
        match err {
            core_runtime::Error::Config(msg) => CoreError::InitializationFailed(msg),
            core_runtime::Error::CapabilityMissing {
                capability,
                message,
            } => CoreError::CapabilityMissing {
                capability,
                message,
            },
            core_runtime::Error::Internal(msg) => CoreError::Internal(msg),
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_playback_errors_keep_their_code() {
        let cases = [
            (PlaybackError::Validation("url".into()), "VALIDATION"),
            (PlaybackError::NotFound("x".into()), "NOT_FOUND"),
            (
                PlaybackError::SurfaceUnavailable("gone".into()),
                "SURFACE_UNAVAILABLE",
            ),
            (PlaybackError::TargetBusy { target: 3 }, "SURFACE_UNAVAILABLE"),
            (PlaybackError::OperationFailed("decode".into()), "OPERATION_FAILED"),
            (PlaybackError::Cache("disk".into()), "OPERATION_FAILED"),
            (
                PlaybackError::StorageUnavailable("ro".into()),
                "STORAGE_UNAVAILABLE",
            ),
            (PlaybackError::OwnerStopped, "SHUT_DOWN"),
        ];
        for (err, code) in cases {
            assert_eq!(CoreError::from(err).code(), code);
        }
    }

    #[test]
    fn test_runtime_errors() {
        let err = CoreError::from(core_runtime::Error::Config("bad".into()));
        assert_eq!(err.code(), "INITIALIZATION_FAILED");

        let err = CoreError::from(core_runtime::Error::CapabilityMissing {
            capability: "WindowHost".into(),
            message: "required".into(),
        });
        assert!(matches!(err, CoreError::CapabilityMissing { ref capability, .. } if capability == "WindowHost"));
    }
}
