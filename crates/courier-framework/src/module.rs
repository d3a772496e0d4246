//! Handler module contract.
//!
//! A handler module is the unit of functionality the loader discovers and the
//! registries index. Two variants exist:
//!
//! - [`CommandModule`]: keyed by an invocation keyword. May carry a primary
//!   handler, a per-message middleware hook, and a map of callback actions.
//!   A command module with no primary handler is middleware-only.
//! - [`EventModule`]: keyed by one or more [`EventKind`] tags; its handler
//!   runs once per matching inbound update.
//!
//! Modules are constructed once at startup from a [`ModuleDescriptor`] and
//! are immutable for the process lifetime; there is no hot reload.
//!
//! # Example
//!
//! ```rust,ignore
//! use courier_framework::{ActionMatcher, CommandModule, Permission};
//!
//! let module = CommandModule::new("translate", "Translate the replied message")
//!     .permission(Permission::Everywhere)
//!     .on_invoke(|ctx| async move {
//!         ctx.reply("pick a language:").await?;
//!         Ok(())
//!     })
//!     .action(ActionMatcher::pattern(r"^lang_([a-z]{2})$")?, |ctx| async move {
//!         let lang = ctx.capture(1).unwrap_or("en").to_string();
//!         ctx.answer(Some(&format!("translating to {lang}"))).await?;
//!         Ok(())
//!     });
//! ```

use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

use courier_core::{ChatKind, EventKind};

use crate::actions::ActionMatcher;
use crate::context::{CallbackContext, InvocationContext};
use crate::error::{BoxError, HandlerResult};

// ============================================================================
// Permission
// ============================================================================

/// Where a command is visible and invocable.
///
/// Governs both registration-time menu visibility and runtime gating: a
/// [`GroupOnly`](Permission::GroupOnly) command invoked in a private chat is
/// silently ignored rather than answered with an error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    /// Visible and invocable in every chat kind.
    #[default]
    Everywhere,
    /// Visible and invocable only in group-like chats.
    GroupOnly,
}

impl Permission {
    /// Returns whether a command with this permission is visible in `kind`.
    pub fn visible_in(self, kind: ChatKind) -> bool {
        match self {
            Permission::Everywhere => true,
            Permission::GroupOnly => kind == ChatKind::GroupLike,
        }
    }
}

// ============================================================================
// Handler function types
// ============================================================================

/// Type-erased primary command handler.
pub type CommandFn =
    Arc<dyn Fn(Arc<InvocationContext>) -> BoxFuture<'static, HandlerResult> + Send + Sync>;

/// Type-erased per-message middleware stage.
pub type MiddlewareFn =
    Arc<dyn Fn(Arc<InvocationContext>) -> BoxFuture<'static, HandlerResult> + Send + Sync>;

/// Type-erased event handler.
pub type EventFn =
    Arc<dyn Fn(Arc<InvocationContext>) -> BoxFuture<'static, HandlerResult> + Send + Sync>;

/// Type-erased callback-action handler.
pub type ActionFn =
    Arc<dyn Fn(Arc<CallbackContext>) -> BoxFuture<'static, HandlerResult> + Send + Sync>;

fn erase_invocation<F, Fut>(f: F) -> CommandFn
where
    F: Fn(Arc<InvocationContext>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    Arc::new(move |ctx| Box::pin(f(ctx)))
}

// ============================================================================
// CommandModule
// ============================================================================

/// A handler module invoked by a named command.
///
/// Built with a chained-builder API; all callbacks are optional. The loader
/// rejects a command module whose name is empty.
#[derive(Clone)]
pub struct CommandModule {
    name: String,
    description: String,
    permission: Permission,
    on_invoke: Option<CommandFn>,
    on_each_message: Option<MiddlewareFn>,
    actions: Vec<(ActionMatcher, ActionFn)>,
}

impl CommandModule {
    /// Creates a command module with the given invocation keyword and
    /// description. Permission defaults to [`Permission::Everywhere`].
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            permission: Permission::default(),
            on_invoke: None,
            on_each_message: None,
            actions: Vec::new(),
        }
    }

    /// Sets the permission rule.
    pub fn permission(mut self, permission: Permission) -> Self {
        self.permission = permission;
        self
    }

    /// Sets the primary invocation handler.
    pub fn on_invoke<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Arc<InvocationContext>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.on_invoke = Some(erase_invocation(f));
        self
    }

    /// Registers a middleware stage that runs on every inbound update,
    /// command-shaped or not, before routing.
    pub fn on_each_message<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Arc<InvocationContext>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.on_each_message = Some(erase_invocation(f));
        self
    }

    /// Binds a callback-action handler to a matcher.
    ///
    /// Actions are evaluated in insertion order within a module and in
    /// registration order across modules; first match wins.
    pub fn action<F, Fut>(mut self, matcher: ActionMatcher, f: F) -> Self
    where
        F: Fn(Arc<CallbackContext>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.actions
            .push((matcher, Arc::new(move |ctx| Box::pin(f(ctx)))));
        self
    }

    /// Returns the invocation keyword.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the listing description.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the permission rule.
    pub fn permission_rule(&self) -> Permission {
        self.permission
    }

    /// Returns the primary handler, when one was declared.
    pub fn handler(&self) -> Option<&CommandFn> {
        self.on_invoke.as_ref()
    }

    /// Returns the per-message middleware stage, when one was declared.
    pub fn middleware(&self) -> Option<&MiddlewareFn> {
        self.on_each_message.as_ref()
    }

    /// Returns the declared callback actions, in insertion order.
    pub fn actions(&self) -> &[(ActionMatcher, ActionFn)] {
        &self.actions
    }
}

impl std::fmt::Debug for CommandModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandModule")
            .field("name", &self.name)
            .field("permission", &self.permission)
            .field("has_on_invoke", &self.on_invoke.is_some())
            .field("has_on_each_message", &self.on_each_message.is_some())
            .field("action_count", &self.actions.len())
            .finish()
    }
}

// ============================================================================
// EventModule
// ============================================================================

/// A handler module subscribed to platform event-kind tags.
///
/// The handler runs once per inbound update whose derived [`EventKind`]
/// matches any of the declared kinds. The loader rejects an event module
/// with an empty name, no kinds, or no handler.
#[derive(Clone)]
pub struct EventModule {
    name: String,
    description: String,
    kinds: Vec<EventKind>,
    on_invoke: Option<EventFn>,
}

impl EventModule {
    /// Creates an event module with the given name and description.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            kinds: Vec::new(),
            on_invoke: None,
        }
    }

    /// Subscribes the module to an event kind.
    pub fn kind(mut self, kind: EventKind) -> Self {
        self.kinds.push(kind);
        self
    }

    /// Subscribes the module to several event kinds at once.
    pub fn kinds(mut self, kinds: impl IntoIterator<Item = EventKind>) -> Self {
        self.kinds.extend(kinds);
        self
    }

    /// Sets the invocation handler (required; enforced at load time).
    pub fn on_invoke<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Arc<InvocationContext>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.on_invoke = Some(erase_invocation(f));
        self
    }

    /// Returns the module name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the listing description.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the subscribed kinds, in declaration order.
    pub fn subscribed_kinds(&self) -> &[EventKind] {
        &self.kinds
    }

    /// Returns the invocation handler, when one was declared.
    pub fn handler(&self) -> Option<&EventFn> {
        self.on_invoke.as_ref()
    }
}

impl std::fmt::Debug for EventModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventModule")
            .field("name", &self.name)
            .field("kinds", &self.kinds)
            .field("has_on_invoke", &self.on_invoke.is_some())
            .finish()
    }
}

// ============================================================================
// Descriptors
// ============================================================================

/// What a descriptor's build function produced.
pub enum ModuleDecl {
    /// A command-variant module.
    Command(CommandModule),
    /// An event-variant module.
    Event(EventModule),
}

/// Build function stored inside a [`ModuleDescriptor`].
///
/// Receives the module's config section (an empty JSON object when the
/// config file has none) and returns the built module or a build error.
pub type BuildFn = fn(&serde_json::Value) -> Result<ModuleDecl, BoxError>;

/// A static, `Copy` descriptor that identifies and builds a handler module.
///
/// Descriptors form the compile-time registration table that replaces
/// runtime directory scanning: the set of discoverable units is fixed at
/// build time, and the loader orders them lexically by `unit` so discovery
/// order never depends on declaration order.
#[derive(Clone, Copy)]
pub struct ModuleDescriptor {
    /// Unit name, used for config lookup, ordering, and log attribution.
    pub unit: &'static str,
    /// Factory that builds the live module from its config section.
    pub build: BuildFn,
}

impl std::fmt::Debug for ModuleDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleDescriptor")
            .field("unit", &self.unit)
            .finish_non_exhaustive()
    }
}
