//! Error types shared across the framework.

use thiserror::Error;

/// Errors surfaced by transport API calls.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The transport has no live connection to the platform.
    #[error("transport is not connected")]
    NotConnected,

    /// The platform rejected the request.
    #[error("platform rejected request: {0}")]
    Rejected(String),

    /// The request never completed (network failure, timeout in the
    /// transport's own I/O layer, ...).
    #[error("transport I/O failure: {0}")]
    Io(String),
}

/// Result type for transport API calls.
pub type ApiResult<T> = Result<T, ApiError>;
