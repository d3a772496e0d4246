//! Module discovery.
//!
//! Discovery is a one-shot, compile-time-table-driven phase: every
//! discoverable unit is a [`ModuleDescriptor`] registered with the
//! [`ModuleLoader`], and [`load`](ModuleLoader::load) turns the full set
//! into populated [`Registries`].
//!
//! # Determinism
//!
//! Descriptors are sorted lexically by unit name before building, so
//! discovery order (and with it command-overwrite outcomes and
//! callback-action match order) is identical on every platform and every
//! run, never a function of registration call order.
//!
//! # Failure isolation
//!
//! A build function that errors, or a module that fails contract
//! validation, is logged and skipped; discovery always continues with the
//! next unit. Nothing in this phase can abort startup.

use std::collections::HashMap;

use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::error::ModuleError;
use crate::module::{ModuleDecl, ModuleDescriptor};
use crate::registry::Registries;

/// Builds handler modules from a descriptor table and populates the
/// registries.
///
/// # Example
///
/// ```rust,ignore
/// let registries = ModuleLoader::new()
///     .descriptor(PING_MODULE)
///     .descriptor(HELP_MODULE)
///     .config("help", serde_json::json!({ "header": "Commands:" }))
///     .load();
/// ```
#[derive(Default)]
pub struct ModuleLoader {
    descriptors: Vec<ModuleDescriptor>,
    /// Per-unit config sections, keyed by unit name.
    configs: HashMap<String, Value>,
}

impl ModuleLoader {
    /// Creates an empty loader.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one descriptor to the discovery table.
    pub fn descriptor(mut self, descriptor: ModuleDescriptor) -> Self {
        self.descriptors.push(descriptor);
        self
    }

    /// Adds several descriptors at once.
    pub fn descriptors(mut self, descriptors: impl IntoIterator<Item = ModuleDescriptor>) -> Self {
        self.descriptors.extend(descriptors);
        self
    }

    /// Attaches a config section to a unit; passed to its build function.
    pub fn config(mut self, unit: impl Into<String>, value: Value) -> Self {
        self.configs.insert(unit.into(), value);
        self
    }

    /// Replaces the whole per-unit config map.
    pub fn configs(mut self, configs: HashMap<String, Value>) -> Self {
        self.configs = configs;
        self
    }

    /// Runs discovery: builds every descriptor, validates the contract,
    /// and registers survivors.
    ///
    /// Returns fully populated registries; callers must not begin
    /// dispatching before this returns.
    pub fn load(mut self) -> Registries {
        // Lexical order makes discovery deterministic across platforms.
        self.descriptors.sort_by(|a, b| a.unit.cmp(b.unit));

        for window in self.descriptors.windows(2) {
            if window[0].unit == window[1].unit {
                warn!(
                    unit = window[0].unit,
                    "Duplicate unit name in descriptor table - both will be built"
                );
            }
        }

        let empty = Value::Object(Map::default());
        let mut registries = Registries::default();
        let mut skipped = 0usize;

        for descriptor in &self.descriptors {
            let config = self.configs.get(descriptor.unit).unwrap_or(&empty);
            let decl = match (descriptor.build)(config) {
                Ok(decl) => decl,
                Err(source) => {
                    let err = ModuleError::Build {
                        unit: descriptor.unit,
                        source,
                    };
                    warn!(unit = descriptor.unit, error = %err, "Module failed to build - skipped");
                    skipped += 1;
                    continue;
                }
            };

            match validate(descriptor.unit, decl) {
                Ok(ModuleDecl::Command(module)) => registries.commands.register(module),
                Ok(ModuleDecl::Event(module)) => registries.events.register(module),
                Err(err) => {
                    warn!(unit = descriptor.unit, error = %err, "Module rejected - skipped");
                    skipped += 1;
                }
            }
        }

        info!(
            commands = registries.commands.len(),
            events = registries.events.len(),
            skipped,
            "Module discovery complete"
        );
        registries
    }
}

/// Enforces the handler contract on a freshly built module.
fn validate(unit: &'static str, decl: ModuleDecl) -> Result<ModuleDecl, ModuleError> {
    match &decl {
        ModuleDecl::Command(module) => {
            if module.name().trim().is_empty() {
                return Err(ModuleError::EmptyName(unit));
            }
        }
        ModuleDecl::Event(module) => {
            if module.name().trim().is_empty() {
                return Err(ModuleError::EmptyName(unit));
            }
            if module.subscribed_kinds().is_empty() {
                return Err(ModuleError::NoEventKinds(unit));
            }
            if module.handler().is_none() {
                return Err(ModuleError::MissingHandler(unit));
            }
        }
    }
    Ok(decl)
}
