//! # Courier Runtime
//!
//! Process-level orchestration for Courier bots: configuration loading,
//! logging setup, the startup sequence (validate, discover modules,
//! register menus), and the dispatch loop that drains the transport's
//! update stream until shutdown.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use courier_runtime::Runtime;
//! use courier_framework::HELP_MODULE;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut runtime = Runtime::new();
//!     runtime.register_module(HELP_MODULE);
//!     runtime.run(transport, source).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;

pub use config::{ConfigError, ConfigLoader, ConfigResult, CourierConfig};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::LoggingBuilder;
pub use runtime::{Runtime, RuntimeBuilder};
