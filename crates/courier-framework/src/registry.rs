//! Command and event registries.
//!
//! Both registries are populated once by the [`ModuleLoader`] during the
//! discovery phase and are immutable afterwards; the dispatch layer only
//! ever reads them through an `Arc`. No locking is needed at dispatch time
//! because nothing mutates shared state after startup.
//!
//! [`ModuleLoader`]: crate::loader::ModuleLoader

use std::collections::HashMap;
use std::sync::Arc;

use tracing::warn;

use courier_core::{ChatKind, EventKind, MenuEntry};

use crate::context::CommandSpec;
use crate::module::{CommandModule, EventModule};

// ============================================================================
// CommandRegistry
// ============================================================================

/// The table of loaded command modules, indexed by invocation keyword.
///
/// # Collision policy
///
/// Names are unique: registering a second module under an existing name
/// replaces the first (last-write-wins) and moves the entry to the end of
/// the listing order. The collision is logged as a warning rather than
/// raised as an error, so an override never aborts discovery but is always
/// visible in the logs.
#[derive(Default)]
pub struct CommandRegistry {
    /// Registration order; resolution scans this, the table stays small.
    entries: Vec<Arc<CommandModule>>,
}

impl CommandRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a module, overwriting any existing module with the same name.
    pub fn register(&mut self, module: CommandModule) {
        if let Some(pos) = self.entries.iter().position(|m| m.name() == module.name()) {
            warn!(
                command = module.name(),
                "Duplicate command name - last registration wins"
            );
            self.entries.remove(pos);
        }
        self.entries.push(Arc::new(module));
    }

    /// Returns the public metadata of every registered command, in
    /// registration order.
    pub fn list(&self) -> Vec<CommandSpec> {
        self.entries
            .iter()
            .map(|m| CommandSpec {
                name: m.name().to_string(),
                description: m.description().to_string(),
                permission: m.permission_rule(),
            })
            .collect()
    }

    /// Resolves an exact keyword to its module. No fuzzy matching.
    pub fn resolve(&self, name: &str) -> Option<&Arc<CommandModule>> {
        self.entries.iter().find(|m| m.name() == name)
    }

    /// Returns the subsequence of [`list`](Self::list) visible in the given
    /// chat kind.
    pub fn filter_for(&self, kind: ChatKind) -> Vec<CommandSpec> {
        self.list()
            .into_iter()
            .filter(|spec| spec.visible_in(kind))
            .collect()
    }

    /// Returns the command-menu entries for the given chat kind, suitable
    /// for the transport's menu-registration operation.
    pub fn menu_for(&self, kind: ChatKind) -> Vec<MenuEntry> {
        self.filter_for(kind)
            .into_iter()
            .map(|spec| MenuEntry {
                command: spec.name,
                description: spec.description,
            })
            .collect()
    }

    /// Iterates modules in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<CommandModule>> {
        self.entries.iter()
    }

    /// Returns the number of registered commands.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandRegistry")
            .field("len", &self.len())
            .finish()
    }
}

// ============================================================================
// EventRegistry
// ============================================================================

/// The table of loaded event modules, indexed by event-kind tag.
///
/// A module with N declared kinds is indexed under all N. Multiple modules
/// may subscribe to the same tag; they run in registration order,
/// independently.
#[derive(Default)]
pub struct EventRegistry {
    handlers: HashMap<EventKind, Vec<Arc<EventModule>>>,
    len: usize,
}

impl EventRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a module to the handler list of each of its declared kinds.
    ///
    /// Declared kinds form a set: a kind listed twice indexes the module
    /// once, so its handler runs at most once per update.
    pub fn register(&mut self, module: EventModule) {
        let module = Arc::new(module);
        let mut seen: Vec<EventKind> = Vec::new();
        for kind in module.subscribed_kinds() {
            if seen.contains(kind) {
                continue;
            }
            seen.push(*kind);
            self.handlers
                .entry(*kind)
                .or_default()
                .push(Arc::clone(&module));
        }
        self.len += 1;
    }

    /// Returns the ordered (possibly empty) handler list for a tag.
    pub fn handlers_for(&self, kind: EventKind) -> &[Arc<EventModule>] {
        self.handlers.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Returns the number of registered event modules.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl std::fmt::Debug for EventRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventRegistry")
            .field("len", &self.len())
            .finish()
    }
}

// ============================================================================
// Registries
// ============================================================================

/// The pair of registries the discovery phase produces.
///
/// Wrapped in an `Arc` and handed to the [`Router`](crate::router::Router);
/// immutable from that point on.
#[derive(Debug, Default)]
pub struct Registries {
    /// Commands, by invocation keyword.
    pub commands: CommandRegistry,
    /// Event handlers, by event-kind tag.
    pub events: EventRegistry,
}
