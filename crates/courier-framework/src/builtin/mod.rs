//! Handler modules shipped with the framework.
//!
//! Builtins are ordinary [`ModuleDescriptor`]s; nothing distinguishes them
//! from application modules once loaded, and an application may override one
//! by registering its own module under the same command name.
//!
//! [`ModuleDescriptor`]: crate::module::ModuleDescriptor

mod help;

pub use help::HELP_MODULE;
