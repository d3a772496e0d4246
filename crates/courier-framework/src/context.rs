//! Invocation contexts handed to handlers.
//!
//! Two context types exist, one per handler family:
//!
//! - [`InvocationContext`] for command handlers, middleware stages, and
//!   event handlers: the triggering update, the resolved chat kind, the
//!   extracted argument string (commands only), reply/edit capabilities, and
//!   the registered-command listing accessor help-style features consume.
//! - [`CallbackContext`] for callback-action handlers: the interaction, any
//!   pattern captures, the same command-listing accessor, and an
//!   acknowledgment capability with exactly-once semantics.
//!
//! Both are ephemeral: one per inbound update, never persisted.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};

use courier_core::{
    ApiError, ApiResult, BoxedTransport, CallbackQuery, Chat, ChatKind, MessageId, Update,
};

use crate::module::Permission;

// ============================================================================
// Command listing metadata
// ============================================================================

/// Public metadata of one registered command, as returned by the registry
/// listing and exposed to handlers through [`InvocationContext::commands`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    /// Invocation keyword.
    pub name: String,
    /// Short human-readable description.
    pub description: String,
    /// Visibility rule.
    pub permission: Permission,
}

impl CommandSpec {
    /// Returns whether this command is visible in the given chat kind.
    pub fn visible_in(&self, kind: ChatKind) -> bool {
        self.permission.visible_in(kind)
    }
}

// ============================================================================
// InvocationContext
// ============================================================================

/// Per-update context for command, middleware, and event handlers.
pub struct InvocationContext {
    update: Update,
    /// Argument string following the command keyword, trimmed. Only present
    /// when the handler was invoked as a command.
    args: Option<String>,
    transport: BoxedTransport,
    /// Immutable snapshot of the registered-command listing.
    commands: Arc<[CommandSpec]>,
}

impl InvocationContext {
    pub(crate) fn new(
        update: Update,
        args: Option<String>,
        transport: BoxedTransport,
        commands: Arc<[CommandSpec]>,
    ) -> Self {
        Self {
            update,
            args,
            transport,
            commands,
        }
    }

    /// Returns the triggering update.
    pub fn update(&self) -> &Update {
        &self.update
    }

    /// Returns the chat the update originated in.
    pub fn chat(&self) -> Chat {
        self.update.chat
    }

    /// Returns the resolved chat kind.
    pub fn chat_kind(&self) -> ChatKind {
        self.update.chat.kind
    }

    /// Returns the extracted argument string.
    ///
    /// `Some` (possibly empty) when invoked as a command, `None` for
    /// middleware and event invocations.
    pub fn args(&self) -> Option<&str> {
        self.args.as_deref()
    }

    /// Returns the textual content of the update, when it has any.
    pub fn text(&self) -> Option<&str> {
        self.update.text()
    }

    /// Returns the public metadata of every registered command, in
    /// registration order.
    pub fn commands(&self) -> &[CommandSpec] {
        &self.commands
    }

    /// Returns the transport handle for operations the convenience methods
    /// below do not cover.
    pub fn transport(&self) -> &BoxedTransport {
        &self.transport
    }

    /// Sends a reply into the originating chat.
    pub async fn reply(&self, text: &str) -> ApiResult<MessageId> {
        self.transport.send_message(self.update.chat.id, text).await
    }

    /// Edits a previously sent message in the originating chat.
    pub async fn edit(&self, message: MessageId, text: &str) -> ApiResult<()> {
        self.transport
            .edit_message(self.update.chat.id, message, text)
            .await
    }
}

impl std::fmt::Debug for InvocationContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InvocationContext")
            .field("chat", &self.update.chat)
            .field("args", &self.args)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// CallbackContext
// ============================================================================

/// Per-interaction context for callback-action handlers.
///
/// The router guarantees exactly one acknowledgment per interaction: when
/// the handler never calls [`answer`](Self::answer), the router sends a
/// neutral acknowledgment itself after the handler returns, whatever the
/// outcome.
pub struct CallbackContext {
    query: CallbackQuery,
    chat: Chat,
    /// Capture groups from a pattern matcher, group 1 first. Empty for
    /// literal matchers.
    captures: Vec<String>,
    transport: BoxedTransport,
    /// Immutable snapshot of the registered-command listing.
    commands: Arc<[CommandSpec]>,
    /// Set by the first acknowledgment; later calls are no-ops.
    acked: AtomicBool,
}

impl CallbackContext {
    pub(crate) fn new(
        query: CallbackQuery,
        chat: Chat,
        captures: Vec<String>,
        transport: BoxedTransport,
        commands: Arc<[CommandSpec]>,
    ) -> Self {
        Self {
            query,
            chat,
            captures,
            transport,
            commands,
            acked: AtomicBool::new(false),
        }
    }

    /// Returns the callback identifier attached to the pressed element.
    pub fn data(&self) -> &str {
        &self.query.data
    }

    /// Returns the interaction.
    pub fn query(&self) -> &CallbackQuery {
        &self.query
    }

    /// Returns the chat the interactive element lives in.
    pub fn chat(&self) -> Chat {
        self.chat
    }

    /// Returns capture group `n` from the matched pattern (1-based, as in
    /// the pattern itself). Always `None` for literal matchers.
    pub fn capture(&self, n: usize) -> Option<&str> {
        if n == 0 {
            return None;
        }
        self.captures.get(n - 1).map(String::as_str)
    }

    /// Returns all capture groups, group 1 first.
    pub fn captures(&self) -> &[String] {
        &self.captures
    }

    /// Returns the public metadata of every registered command, in
    /// registration order.
    pub fn commands(&self) -> &[CommandSpec] {
        &self.commands
    }

    /// Acknowledges the interaction, optionally with a short notification.
    ///
    /// Only the first acknowledgment reaches the transport; the router's
    /// own finalizing acknowledgment is skipped once this has been called.
    pub async fn answer(&self, text: Option<&str>) -> ApiResult<()> {
        if self.acked.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.transport.answer_callback(&self.query.id, text).await
    }

    /// Acknowledges the interaction with no notification.
    pub async fn ack(&self) -> ApiResult<()> {
        self.answer(None).await
    }

    /// Edits the message the interactive element was attached to.
    pub async fn edit_message(&self, text: &str) -> ApiResult<()> {
        let message = self
            .query
            .message_id
            .ok_or_else(|| ApiError::Rejected("callback has no originating message".into()))?;
        self.transport.edit_message(self.chat.id, message, text).await
    }

    /// Returns whether the interaction has been acknowledged.
    pub fn has_acked(&self) -> bool {
        self.acked.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for CallbackContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackContext")
            .field("data", &self.query.data)
            .field("chat", &self.chat)
            .field("captures", &self.captures)
            .field("acked", &self.has_acked())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use courier_core::{ChatId, MenuEntry, MenuScope, Transport};
    use std::sync::atomic::AtomicUsize;

    #[derive(Default)]
    struct CountingTransport {
        acks: AtomicUsize,
    }

    #[async_trait]
    impl Transport for CountingTransport {
        async fn send_message(&self, _chat: ChatId, _text: &str) -> ApiResult<MessageId> {
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
            self.acks.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn set_command_menu(&self, _scope: MenuScope, _entries: &[MenuEntry]) -> ApiResult<()> {
            Ok(())
        }
    }

    fn callback_ctx(captures: Vec<String>, transport: Arc<CountingTransport>) -> CallbackContext {
        CallbackContext::new(
            CallbackQuery {
                id: "cb-1".to_string(),
                data: "page_2".to_string(),
                from: 7,
                message_id: None,
            },
            Chat::private(1),
            captures,
            transport,
            Vec::new().into(),
        )
    }

    #[test]
    fn capture_indexing_is_one_based() {
        let transport = Arc::new(CountingTransport::default());
        let ctx = callback_ctx(vec!["2".to_string()], transport);

        assert_eq!(ctx.capture(0), None);
        assert_eq!(ctx.capture(1), Some("2"));
        assert_eq!(ctx.capture(2), None);
    }

    #[test]
    fn only_the_first_answer_reaches_the_transport() {
        let transport = Arc::new(CountingTransport::default());
        let ctx = callback_ctx(Vec::new(), Arc::clone(&transport));

        tokio_test::block_on(async {
            ctx.answer(Some("first")).await.unwrap();
            ctx.answer(Some("second")).await.unwrap();
            ctx.ack().await.unwrap();
        });

        assert!(ctx.has_acked());
        assert_eq!(transport.acks.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn editing_without_an_originating_message_is_rejected() {
        let transport = Arc::new(CountingTransport::default());
        let ctx = callback_ctx(Vec::new(), transport);

        let result = tokio_test::block_on(ctx.edit_message("new text"));
        assert!(matches!(result, Err(ApiError::Rejected(_))));
    }
}
