//! Runtime orchestration.
//!
//! The runtime owns the startup sequence and the dispatch loop:
//!
//! 1. load and validate configuration (fatal on error);
//! 2. run module discovery through the [`ModuleLoader`] (per-module errors
//!    are skipped, never fatal);
//! 3. register the platform command menus from the loaded registries;
//! 4. drain the transport's update stream, dispatching each update on its
//!    own task, until the source closes or a shutdown signal arrives.
//!
//! Dispatch never begins before discovery has completed; the registries are
//! frozen by the time the first update is read.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use courier_runtime::Runtime;
//!
//! let mut runtime = Runtime::new();
//! runtime.register_module(HELP_MODULE);
//! runtime.register_module(PING_MODULE);
//! runtime.run(transport, source).await?;
//! ```

use std::sync::Arc;

use tokio::signal;
use tokio_util::task::TaskTracker;
use tracing::{info, warn};

use courier_core::{BoxedTransport, ChatKind, UpdateSource};
use courier_framework::module::ModuleDescriptor;
use courier_framework::{ModuleLoader, Router};

use crate::config::{ConfigLoader, ConfigResult, CourierConfig};
use crate::error::RuntimeResult;
use crate::logging;

/// The Courier runtime.
///
/// Collects module descriptors before start; consumed by
/// [`run`](Self::run), which drives the dispatch loop to completion.
pub struct Runtime {
    config: CourierConfig,
    descriptors: Vec<ModuleDescriptor>,
}

impl Runtime {
    /// Creates a runtime with automatic configuration loading.
    ///
    /// Searches the current directory and the user config directory for
    /// `courier.toml`; falls back to defaults when loading fails.
    pub fn new() -> Self {
        let config = ConfigLoader::new().load().unwrap_or_else(|e| {
            eprintln!("Warning: Failed to load config ({e}), using defaults");
            CourierConfig::default()
        });

        Self::from_config(config)
    }

    /// Creates a runtime builder for custom configuration sources.
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Creates a runtime from an already loaded configuration.
    ///
    /// Initializes logging from the configuration; harmless when a
    /// subscriber is already installed.
    pub fn from_config(config: CourierConfig) -> Self {
        logging::init_from_config(&config.logging);

        info!(
            log_level = %config.logging.level,
            modules_configured = config.modules.len(),
            "Runtime initialized from configuration"
        );

        Self {
            config,
            descriptors: Vec::new(),
        }
    }

    /// Returns a reference to the configuration.
    pub fn config(&self) -> &CourierConfig {
        &self.config
    }

    /// Registers a module descriptor for discovery at start.
    pub fn register_module(&mut self, descriptor: ModuleDescriptor) -> &mut Self {
        self.descriptors.push(descriptor);
        self
    }

    /// Registers several module descriptors at once.
    pub fn register_modules(
        &mut self,
        descriptors: impl IntoIterator<Item = ModuleDescriptor>,
    ) -> &mut Self {
        self.descriptors.extend(descriptors);
        self
    }

    /// Returns the number of registered descriptors.
    pub fn module_count(&self) -> usize {
        self.descriptors.len()
    }

    /// Runs the runtime until the update source closes or a shutdown signal
    /// (Ctrl+C or SIGTERM) arrives.
    pub async fn run<S: UpdateSource>(
        self,
        transport: BoxedTransport,
        source: S,
    ) -> RuntimeResult<()> {
        self.run_until(transport, source, wait_for_shutdown()).await
    }

    /// Runs the runtime with a custom shutdown future.
    pub async fn run_until<S, F>(
        self,
        transport: BoxedTransport,
        mut source: S,
        shutdown: F,
    ) -> RuntimeResult<()>
    where
        S: UpdateSource,
        F: Future<Output = ()>,
    {
        self.config.validate()?;

        let registries = ModuleLoader::new()
            .descriptors(self.descriptors)
            .configs(self.config.modules.clone())
            .load();

        // Menu registration is best-effort; a transport hiccup here must not
        // keep the bot from serving updates.
        for kind in [ChatKind::Private, ChatKind::GroupLike] {
            let entries = registries.commands.menu_for(kind);
            if let Err(err) = transport.set_command_menu(kind.into(), &entries).await {
                warn!(scope = ?kind, error = %err, "Failed to register command menu");
            }
        }

        let mut router = Router::new(Arc::new(registries), Arc::clone(&transport));
        if let Some(username) = &self.config.bot.username {
            router = router.bot_name(username.clone());
        }
        let router = Arc::new(router);

        info!("Courier runtime is now running. Press Ctrl+C to stop.");

        let tracker = TaskTracker::new();
        let mut shutdown = std::pin::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested");
                    break;
                }
                maybe_update = source.next_update() => match maybe_update {
                    Some(update) => {
                        let router = Arc::clone(&router);
                        tracker.spawn(async move {
                            router.dispatch(update).await;
                        });
                    }
                    None => {
                        info!("Update source closed");
                        break;
                    }
                },
            }
        }

        // Let in-flight dispatch cycles finish before returning.
        tracker.close();
        tracker.wait().await;

        info!("Runtime stopped");
        Ok(())
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

/// Waits for shutdown signals (Ctrl+C or SIGTERM).
async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to register SIGTERM handler");

        tokio::select! {
            _ = signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down");
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down");
            }
        }
    }

    #[cfg(not(unix))]
    {
        signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
        info!("Received Ctrl+C, shutting down");
    }
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder for creating a [`Runtime`] with custom configuration sources.
///
/// # Example
///
/// ```rust,ignore
/// let runtime = Runtime::builder()
///     .config_file("config/production.toml")
///     .profile("production")
///     .build()?;
/// ```
pub struct RuntimeBuilder {
    config_loader: ConfigLoader,
}

impl RuntimeBuilder {
    /// Creates a new runtime builder.
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new(),
        }
    }

    /// Sets a specific configuration file to load.
    pub fn config_file<P: AsRef<std::path::Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    /// Sets the configuration profile (e.g., "development", "production").
    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.config_loader = self.config_loader.profile(profile);
        self
    }

    /// Adds a search path for configuration files.
    pub fn search_path<P: AsRef<std::path::Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.search_path(path);
        self
    }

    /// Disables loading environment variables.
    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    /// Merges additional configuration programmatically.
    pub fn merge(mut self, config: CourierConfig) -> Self {
        self.config_loader = self.config_loader.merge(config);
        self
    }

    /// Builds the runtime.
    pub fn build(self) -> ConfigResult<Runtime> {
        let config = self.config_loader.load()?;
        Ok(Runtime::from_config(config))
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BotConfig, ConfigError};
    use crate::error::RuntimeError;
    use async_trait::async_trait;
    use courier_core::{
        ApiResult, ChannelUpdateSource, Chat, ChatId, MenuEntry, MenuScope, MessageContent,
        MessageId, Transport, Update,
    };
    use courier_framework::error::BoxError;
    use courier_framework::module::{CommandModule, ModuleDecl};
    use parking_lot::Mutex;

    #[derive(Default)]
    struct MockTransport {
        sent: Mutex<Vec<String>>,
        menus: Mutex<Vec<(MenuScope, Vec<MenuEntry>)>>,
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn send_message(&self, _chat: ChatId, text: &str) -> ApiResult<MessageId> {
            self.sent.lock().push(text.to_string());
            Ok(1)
        }

        async fn edit_message(
            &self,
            _chat: ChatId,
            _message: MessageId,
            _text: &str,
        ) -> ApiResult<()> {
            Ok(())
        }

        async fn answer_callback(&self, _callback_id: &str, _text: Option<&str>) -> ApiResult<()> {
            Ok(())
        }

        async fn set_command_menu(&self, scope: MenuScope, entries: &[MenuEntry]) -> ApiResult<()> {
            self.menus.lock().push((scope, entries.to_vec()));
            Ok(())
        }
    }

    fn ping_descriptor() -> ModuleDescriptor {
        fn build(_: &serde_json::Value) -> Result<ModuleDecl, BoxError> {
            Ok(ModuleDecl::Command(
                CommandModule::new("ping", "Health check").on_invoke(|ctx| async move {
                    ctx.reply("pong").await?;
                    Ok(())
                }),
            ))
        }
        ModuleDescriptor {
            unit: "ping",
            build,
        }
    }

    fn valid_config() -> CourierConfig {
        CourierConfig {
            bot: BotConfig {
                token: "123:abc".into(),
                username: Some("courier_bot".into()),
            },
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn run_refuses_a_config_without_a_token() {
        let runtime = Runtime::from_config(CourierConfig::default());
        let transport = Arc::new(MockTransport::default()) as BoxedTransport;
        let (_tx, source) = ChannelUpdateSource::new(1);

        let result = runtime
            .run_until(transport, source, std::future::pending())
            .await;

        assert!(matches!(
            result,
            Err(RuntimeError::Config(ConfigError::MissingField { .. }))
        ));
    }

    #[tokio::test]
    async fn startup_registers_menus_then_serves_updates_until_source_closes() {
        let mut runtime = Runtime::from_config(valid_config());
        runtime.register_module(ping_descriptor());

        let transport = Arc::new(MockTransport::default());
        let (tx, source) = ChannelUpdateSource::new(4);

        tx.send(Update::message(
            Chat::private(1),
            7,
            MessageContent::Text("/ping".into()),
        ))
        .await
        .unwrap();
        drop(tx);

        runtime
            .run_until(
                Arc::clone(&transport) as BoxedTransport,
                source,
                std::future::pending(),
            )
            .await
            .unwrap();

        assert_eq!(*transport.sent.lock(), ["pong"]);

        let menus = transport.menus.lock();
        assert_eq!(menus.len(), 2);
        assert!(menus.iter().any(|(scope, entries)| {
            *scope == MenuScope::Private && entries.iter().any(|e| e.command == "ping")
        }));
    }

    #[tokio::test]
    async fn shutdown_future_stops_the_loop() {
        let runtime = Runtime::from_config(valid_config());
        let transport = Arc::new(MockTransport::default()) as BoxedTransport;
        let (_tx, source) = ChannelUpdateSource::new(1);

        // Immediately resolved shutdown; run_until must return.
        runtime
            .run_until(transport, source, async {})
            .await
            .unwrap();
    }
}
