//! # Courier
//!
//! A modular command and event dispatch framework for chat bots.
//!
//! ## Overview
//!
//! Courier splits a bot into small handler modules: command modules keyed
//! by an invocation keyword and event modules keyed by content-type tags.
//! Modules are declared as static descriptors, discovered once at startup
//! in deterministic order, and routed to by a single dispatcher that also
//! runs every module's per-message middleware hook and resolves
//! interactive-button callbacks.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐    ┌──────────────┐    ┌────────────────────────────┐
//! │   Runtime   │───▶│ ModuleLoader │───▶│ Registries                 │
//! │ (config,    │    │ (descriptors)│    │  commands: by keyword      │
//! │  logging)   │    └──────────────┘    │  events:   by kind         │
//! └──────┬──────┘                        └─────────────┬──────────────┘
//!        │ update stream                               │
//!        ▼                                             ▼
//! ┌─────────────┐                        ┌────────────────────────────┐
//! │  Transport  │───────────────────────▶│ Router                     │
//! │ (platform)  │◀───────────────────────│  middleware, then routing  │
//! └─────────────┘   replies, acks, menus └────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use courier::prelude::*;
//!
//! fn build_ping(_cfg: &serde_json::Value) -> Result<ModuleDecl, BoxError> {
//!     Ok(ModuleDecl::Command(
//!         CommandModule::new("ping", "Health check").on_invoke(|ctx| async move {
//!             ctx.reply("pong").await?;
//!             Ok(())
//!         }),
//!     ))
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut runtime = Runtime::new();
//!     runtime.register_module(ModuleDescriptor { unit: "ping", build: build_ping });
//!     runtime.register_module(HELP_MODULE);
//!     runtime.run(transport, source).await?;
//!     Ok(())
//! }
//! ```

pub use courier_core as core;
pub use courier_framework as framework;
pub use courier_runtime as runtime;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use courier::prelude::*;
/// ```
pub mod prelude {
    // Runtime - main entry point
    pub use courier_runtime::{ConfigLoader, CourierConfig, Runtime};

    // Module system - the unit of bot functionality
    pub use courier_framework::{
        CommandModule, EventModule, ModuleDecl, ModuleDescriptor, ModuleLoader, Permission,
    };

    // Dispatch - contexts, routing, and outcomes
    pub use courier_framework::{
        ActionMatcher, BoxError, CallbackContext, DispatchOutcome, HandlerResult,
        InvocationContext, Router,
    };

    // Builtins
    pub use courier_framework::HELP_MODULE;

    // Transport-facing types
    pub use courier_core::{
        BoxedTransport, ChannelUpdateSource, Chat, ChatKind, EventKind, MessageContent, Transport,
        Update, UpdateSource,
    };
}
