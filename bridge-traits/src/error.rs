use thiserror::Error;

/// Errors reported by host adapters.
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Bridge capability not available: {0}")]
    NotAvailable(String),

    #[error("Bridge operation failed: {0}")]
    OperationFailed(String),

    #[error("Surface {0} is no longer valid")]
    SurfaceGone(u64),

    #[error("HTTP {status} for {url}")]
    HttpStatus { status: u16, url: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    /// Returns `true` when the failure came from the remote side rather than
    /// the local host (transport errors, non-success status codes).
    pub fn is_remote(&self) -> bool {
        matches!(self, BridgeError::HttpStatus { .. })
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
