//! Transport client capability.
//!
//! The messaging platform itself - its wire format, long polling or webhook
//! delivery, API method encoding - lives entirely behind the [`Transport`]
//! trait. The framework consumes exactly four outbound operations (send,
//! edit, acknowledge, menu registration) plus one inbound subscription
//! ([`UpdateSource`]); everything else the platform offers is invisible here.
//!
//! # Example
//!
//! ```rust,ignore
//! use courier_core::{Transport, ApiResult, ChatId, MessageId};
//!
//! struct MyPlatformClient { /* ... */ }
//!
//! #[async_trait::async_trait]
//! impl Transport for MyPlatformClient {
//!     async fn send_message(&self, chat: ChatId, text: &str) -> ApiResult<MessageId> {
//!         /* HTTP call to the platform */
//!     }
//!     // ...
//! }
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::ApiResult;
use crate::update::{ChatId, ChatKind, MessageId, Update};

/// One {keyword, description} pair for the platform's command menu.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuEntry {
    /// Invocation keyword, without the leading slash.
    pub command: String,
    /// Short human-readable description.
    pub description: String,
}

/// Chat scope a command menu applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MenuScope {
    /// Menu shown in private chats.
    Private,
    /// Menu shown in group-like chats.
    GroupLike,
}

impl From<ChatKind> for MenuScope {
    fn from(kind: ChatKind) -> Self {
        match kind {
            ChatKind::Private => MenuScope::Private,
            ChatKind::GroupLike => MenuScope::GroupLike,
        }
    }
}

/// Outbound operations the framework requires from the messaging platform.
///
/// Implementations are expected to be cheap to share (`Arc`) and safe to call
/// concurrently; the dispatch layer may have several updates in flight.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends a text message to a chat, returning the new message's id.
    async fn send_message(&self, chat: ChatId, text: &str) -> ApiResult<MessageId>;

    /// Edits a previously sent message in place.
    async fn edit_message(&self, chat: ChatId, message: MessageId, text: &str) -> ApiResult<()>;

    /// Acknowledges an interactive-UI callback interaction.
    ///
    /// Clears the platform's "loading" indicator on the pressed element.
    /// `text`, when present, is shown to the user as a short notification.
    async fn answer_callback(&self, callback_id: &str, text: Option<&str>) -> ApiResult<()>;

    /// Registers the bot's command menu for one chat scope.
    async fn set_command_menu(&self, scope: MenuScope, entries: &[MenuEntry]) -> ApiResult<()>;
}

/// Shared handle to a transport implementation.
pub type BoxedTransport = Arc<dyn Transport>;

// ============================================================================
// Update subscription
// ============================================================================

/// Inbound side of the transport: a pull-based subscription to updates.
///
/// The runtime drains this source in a loop after module discovery has
/// completed; `None` signals that the transport has shut down and no further
/// updates will arrive.
#[async_trait]
pub trait UpdateSource: Send {
    /// Waits for the next inbound update.
    async fn next_update(&mut self) -> Option<Update>;
}

/// [`UpdateSource`] backed by a tokio mpsc channel.
///
/// The common shape for transports that push updates from their own I/O task,
/// and the shape every test in this workspace uses.
pub struct ChannelUpdateSource {
    rx: mpsc::Receiver<Update>,
}

impl ChannelUpdateSource {
    /// Creates a channel-backed source with the given buffer capacity,
    /// returning the sending half alongside it.
    pub fn new(capacity: usize) -> (mpsc::Sender<Update>, Self) {
        let (tx, rx) = mpsc::channel(capacity);
        (tx, Self { rx })
    }
}

impl From<mpsc::Receiver<Update>> for ChannelUpdateSource {
    fn from(rx: mpsc::Receiver<Update>) -> Self {
        Self { rx }
    }
}

#[async_trait]
impl UpdateSource for ChannelUpdateSource {
    async fn next_update(&mut self) -> Option<Update> {
        self.rx.recv().await
    }
}
