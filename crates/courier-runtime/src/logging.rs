//! Logging setup built on `tracing` and `tracing-subscriber`.
//!
//! # Configuration-Based Initialization
//!
//! ```rust,ignore
//! use courier_runtime::config::ConfigLoader;
//! use courier_runtime::logging;
//!
//! let config = ConfigLoader::new().load()?;
//! logging::init_from_config(&config.logging);
//! ```
//!
//! # Manual Initialization
//!
//! ```rust,ignore
//! use courier_runtime::logging::LoggingBuilder;
//!
//! LoggingBuilder::new()
//!     .directive("courier_framework=debug")
//!     .init();
//! ```

use tracing_subscriber::prelude::*;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::{LogFormat, LoggingConfig};

/// Initialize logging from a [`LoggingConfig`].
///
/// Uses `try_init` internally, so calling it twice (or after a test harness
/// already installed a subscriber) is harmless.
pub fn init_from_config(config: &LoggingConfig) {
    let _ = LoggingBuilder::from_config(config).try_init();
}

/// A builder for configuring the tracing subscriber.
///
/// An existing `RUST_LOG` value takes priority over the configured base
/// level; explicit directives are added on top of either.
#[derive(Default)]
pub struct LoggingBuilder {
    directives: Vec<String>,
    level: Option<tracing::Level>,
    format: LogFormat,
}

impl LoggingBuilder {
    /// Creates a new logging builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder from a [`LoggingConfig`].
    pub fn from_config(config: &LoggingConfig) -> Self {
        let mut builder = Self::new();
        builder.level = Some(config.level.to_tracing_level());
        builder.format = config.format;
        for (target, level) in &config.filters {
            builder.directives.push(format!("{}={}", target, level));
        }
        builder
    }

    /// Sets the global log level.
    pub fn with_level(mut self, level: tracing::Level) -> Self {
        self.level = Some(level);
        self
    }

    /// Adds a filter directive, e.g. `"courier_runtime=debug"`.
    pub fn directive(mut self, directive: &str) -> Self {
        self.directives.push(directive.to_string());
        self
    }

    /// Sets the output format.
    pub fn format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Build the filter from the level and directives.
    fn build_filter(&self) -> EnvFilter {
        let base_level = self.level.unwrap_or(tracing::Level::INFO);
        let base_filter = base_level.to_string().to_lowercase();

        let mut filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&base_filter));

        for directive in &self.directives {
            if let Ok(d) = directive.parse() {
                filter = filter.add_directive(d);
            }
        }

        filter
    }

    /// Initialize the logging system, ignoring an already-set subscriber.
    pub fn init(self) {
        let _ = self.try_init();
    }

    /// Try to initialize the logging system, returning an error on failure.
    pub fn try_init(self) -> Result<(), TryInitError> {
        let filter = self.build_filter();

        match self.format {
            LogFormat::Compact => tracing_subscriber::registry()
                .with(fmt::layer().compact())
                .with(filter)
                .try_init(),
            LogFormat::Full => tracing_subscriber::registry()
                .with(fmt::layer())
                .with(filter)
                .try_init(),
            LogFormat::Pretty => tracing_subscriber::registry()
                .with(fmt::layer().pretty())
                .with(filter)
                .try_init(),
        }
    }
}
