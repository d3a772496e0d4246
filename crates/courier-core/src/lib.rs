//! # Courier Core
//!
//! Foundation types for the Courier bot framework.
//!
//! This crate defines the data model shared by every other layer:
//!
//! - **Update model**: one inbound event delivered by the transport
//!   ([`Update`], [`MessageContent`], [`CallbackQuery`]) together with the
//!   coarse classifications the dispatch layer routes on ([`ChatKind`],
//!   [`EventKind`]).
//! - **Transport capability**: the [`Transport`] trait, the boundary behind
//!   which the actual messaging platform lives. The framework only ever
//!   consumes this trait; it never sees a wire format.
//! - **Update subscription**: the [`UpdateSource`] trait through which the
//!   transport hands updates to the dispatcher, one at a time, in arrival
//!   order per chat.
//!
//! Everything here is deliberately small and dependency-light; routing,
//! registries, and module loading live in `courier-framework`.

pub mod error;
pub mod transport;
pub mod update;

pub use error::{ApiError, ApiResult};
pub use transport::{BoxedTransport, ChannelUpdateSource, MenuEntry, MenuScope, Transport, UpdateSource};
pub use update::{
    CallbackQuery, Chat, ChatId, ChatKind, EventKind, MessageContent, MessageId, Update,
    UpdateKind, UserId,
};
