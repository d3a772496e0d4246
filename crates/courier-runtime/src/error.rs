//! Runtime error types.

use thiserror::Error;

use crate::config::ConfigError;
use courier_core::ApiError;

/// Errors that can occur during runtime operations.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Configuration loading or validation failed.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A transport operation the runtime itself performs failed.
    #[error("Transport error: {0}")]
    Api(#[from] ApiError),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
