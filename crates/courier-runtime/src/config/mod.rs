//! Configuration loading and schema.
//!
//! See [`ConfigLoader`] for the source layering rules and
//! [`CourierConfig`] for the schema.

mod error;
mod loader;
mod schema;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile};
pub use schema::{BotConfig, CourierConfig, LogFormat, LogLevel, LoggingConfig};
