//! Error types for the framework layer.

use thiserror::Error;

/// Type-erased error returned across the handler boundary.
///
/// Handlers are free to surface any error type; the routers catch, log, and
/// never propagate past their own boundary.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Result type every handler callback returns.
pub type HandlerResult = Result<(), BoxError>;

/// Reasons a discovered module is rejected during loading.
///
/// Rejection is always local: the loader logs the error, skips the module,
/// and continues with the next descriptor.
#[derive(Debug, Error)]
pub enum ModuleError {
    /// The module declared an empty name.
    #[error("module '{0}' declares an empty name")]
    EmptyName(&'static str),

    /// An event module declared no event kinds.
    #[error("event module '{0}' declares no event kinds")]
    NoEventKinds(&'static str),

    /// An event module has no invocation handler.
    #[error("event module '{0}' has no invocation handler")]
    MissingHandler(&'static str),

    /// The descriptor's build function itself failed.
    #[error("module '{unit}' failed to build: {source}")]
    Build {
        /// The descriptor's unit name.
        unit: &'static str,
        /// The underlying build error.
        source: BoxError,
    },
}
