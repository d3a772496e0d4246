//! # Courier Framework
//!
//! The dispatch core of the Courier bot framework: handler modules, the
//! registries they load into, and the routers that bind registries to the
//! transport's update stream.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────┐   load()    ┌─────────────────────────┐
//! │  ModuleLoader  │────────────▶│ Registries              │
//! │  (descriptors) │             │  commands: by name      │
//! └────────────────┘             │  events:   by kind      │
//!                                └───────────┬─────────────┘
//!                                            │ Arc (immutable after load)
//! ┌────────────────┐  dispatch   ┌───────────▼─────────────┐
//! │ UpdateSource   │────────────▶│ Router                  │
//! │ (transport)    │             │  middleware chain       │
//! └────────────────┘             │  command / event route  │
//!                                │  callback-action route  │
//!                                └─────────────────────────┘
//! ```
//!
//! Module discovery is a one-shot phase: the loader builds every registered
//! [`ModuleDescriptor`] in deterministic (lexical) order, skips the ones that
//! fail validation, and returns fully populated [`Registries`]. Only then is
//! a [`Router`] constructed, so dispatch can never race a half-built table.
//!
//! ## Example
//!
//! ```rust,ignore
//! use courier_framework::{CommandModule, ModuleDecl, ModuleDescriptor, ModuleLoader, Router};
//!
//! fn build_ping(_cfg: &serde_json::Value) -> Result<ModuleDecl, BoxError> {
//!     Ok(ModuleDecl::Command(
//!         CommandModule::new("ping", "Health check")
//!             .on_invoke(|ctx| async move { ctx.reply("pong").await?; Ok(()) }),
//!     ))
//! }
//!
//! let registries = ModuleLoader::new()
//!     .descriptor(ModuleDescriptor { unit: "ping", build: build_ping })
//!     .load();
//! let router = Router::new(Arc::new(registries), transport);
//! ```

pub mod actions;
pub mod builtin;
pub mod context;
pub mod error;
pub mod loader;
pub mod module;
pub mod registry;
pub mod router;

pub use actions::{ActionMatcher, ActionRouter};
pub use builtin::HELP_MODULE;
pub use context::{CallbackContext, CommandSpec, InvocationContext};
pub use error::{BoxError, HandlerResult, ModuleError};
pub use loader::ModuleLoader;
pub use module::{CommandModule, EventModule, ModuleDecl, ModuleDescriptor, Permission};
pub use registry::{CommandRegistry, EventRegistry, Registries};
pub use router::{DispatchOutcome, Router};
