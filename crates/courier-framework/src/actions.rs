//! Callback-action matching and routing.
//!
//! Interactive elements carry an opaque callback identifier; modules bind
//! handlers to those identifiers through an [`ActionMatcher`], either a
//! literal string or a regular expression with capture groups. The
//! [`ActionRouter`] flattens every loaded command module's action list into
//! one ordered route table and resolves each interaction against it, first
//! match wins.
//!
//! # Acknowledgment
//!
//! Every interaction is acknowledged exactly once. A handler may answer
//! explicitly through [`CallbackContext::answer`]; when it does not, the
//! router sends a neutral acknowledgment after the handler returns, and it
//! does the same for interactions no route matches. Unmatched or failed
//! interactions therefore never leave the client's element spinning.

use std::sync::Arc;

use regex::Regex;
use tracing::{debug, error, warn};

use courier_core::{BoxedTransport, CallbackQuery, Chat};

use crate::context::{CallbackContext, CommandSpec};
use crate::module::ActionFn;
use crate::registry::CommandRegistry;
use crate::router::DispatchOutcome;

// ============================================================================
// ActionMatcher
// ============================================================================

/// Decides whether a callback identifier belongs to a handler.
#[derive(Debug, Clone)]
pub enum ActionMatcher {
    /// Matches when the identifier equals the string exactly.
    Literal(String),
    /// Matches when the expression matches the identifier; capture groups
    /// are handed to the handler.
    Pattern(Regex),
}

impl ActionMatcher {
    /// Creates an exact-equality matcher.
    pub fn literal(value: impl Into<String>) -> Self {
        ActionMatcher::Literal(value.into())
    }

    /// Creates a pattern matcher from a regular expression.
    pub fn pattern(expression: &str) -> Result<Self, regex::Error> {
        Ok(ActionMatcher::Pattern(Regex::new(expression)?))
    }

    /// Tests the matcher against a callback identifier.
    ///
    /// `Some` carries the capture groups, group 1 first; a literal match and
    /// a pattern without groups both yield an empty vector. A group that
    /// participated in no match yields an empty string.
    pub fn matches(&self, data: &str) -> Option<Vec<String>> {
        match self {
            ActionMatcher::Literal(value) => (value == data).then(Vec::new),
            ActionMatcher::Pattern(re) => {
                let captures = re.captures(data)?;
                Some(
                    captures
                        .iter()
                        .skip(1)
                        .map(|group| group.map(|m| m.as_str().to_string()).unwrap_or_default())
                        .collect(),
                )
            }
        }
    }
}

// ============================================================================
// ActionRouter
// ============================================================================

struct ActionRoute {
    /// Owning module name, for log attribution.
    module: String,
    matcher: ActionMatcher,
    handler: ActionFn,
}

/// Routes callback interactions to the action handlers of loaded modules.
///
/// The route table is flattened once at construction: modules in
/// registration order, actions in declaration order within each module.
pub struct ActionRouter {
    routes: Vec<ActionRoute>,
    transport: BoxedTransport,
    /// Snapshot of the command listing, shared with every context.
    listing: Arc<[CommandSpec]>,
}

impl ActionRouter {
    /// Flattens the action declarations of every registered command module
    /// into an ordered route table.
    pub fn new(commands: &CommandRegistry, transport: BoxedTransport) -> Self {
        let mut routes = Vec::new();
        for module in commands.iter() {
            for (matcher, handler) in module.actions() {
                routes.push(ActionRoute {
                    module: module.name().to_string(),
                    matcher: matcher.clone(),
                    handler: Arc::clone(handler),
                });
            }
        }
        let listing: Arc<[CommandSpec]> = commands.list().into();
        Self {
            routes,
            transport,
            listing,
        }
    }

    /// Returns the number of flattened routes.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Returns whether the table has no routes.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Resolves and runs the handler for one interaction.
    ///
    /// The interaction is acknowledged exactly once whatever happens: by the
    /// handler itself, or by this router after the handler returns or when
    /// no route matches.
    pub async fn route(&self, chat: Chat, query: CallbackQuery) -> DispatchOutcome {
        let Some((route, captures)) = self
            .routes
            .iter()
            .find_map(|route| route.matcher.matches(&query.data).map(|caps| (route, caps)))
        else {
            debug!(data = %query.data, "No action route matched");
            if let Err(err) = self.transport.answer_callback(&query.id, None).await {
                warn!(error = %err, "Failed to acknowledge unmatched callback");
            }
            return DispatchOutcome::Ignored;
        };

        let ctx = Arc::new(CallbackContext::new(
            query,
            chat,
            captures,
            Arc::clone(&self.transport),
            Arc::clone(&self.listing),
        ));

        let outcome = match (route.handler)(Arc::clone(&ctx)).await {
            Ok(()) => DispatchOutcome::Completed,
            Err(err) => {
                error!(module = %route.module, data = %ctx.data(), error = %err, "Action handler failed");
                DispatchOutcome::Failed
            }
        };

        if !ctx.has_acked()
            && let Err(err) = ctx.ack().await
        {
            warn!(module = %route.module, error = %err, "Failed to acknowledge callback");
        }

        outcome
    }
}

impl std::fmt::Debug for ActionRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionRouter")
            .field("routes", &self.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::CommandModule;
    use async_trait::async_trait;
    use courier_core::{ApiResult, ChatId, MenuEntry, MenuScope, MessageId, Transport};
    use parking_lot::Mutex;

    #[derive(Default)]
    struct MockTransport {
        sent: Mutex<Vec<String>>,
        acks: Mutex<Vec<(String, Option<String>)>>,
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

        async fn answer_callback(&self, callback_id: &str, text: Option<&str>) -> ApiResult<()> {
            self.acks
                .lock()
                .push((callback_id.to_string(), text.map(str::to_string)));
            Ok(())
        }

        async fn set_command_menu(&self, _scope: MenuScope, _entries: &[MenuEntry]) -> ApiResult<()> {
            Ok(())
        }
    }

    fn query(data: &str) -> CallbackQuery {
        CallbackQuery {
            id: "cb-1".to_string(),
            data: data.to_string(),
            from: 7,
            message_id: Some(42),
        }
    }

    fn router_for(module: CommandModule, transport: Arc<MockTransport>) -> ActionRouter {
        let mut commands = CommandRegistry::new();
        commands.register(module);
        ActionRouter::new(&commands, transport)
    }

    #[test]
    fn literal_matcher_yields_no_captures() {
        let matcher = ActionMatcher::literal("confirm");
        assert_eq!(matcher.matches("confirm"), Some(Vec::new()));
        assert_eq!(matcher.matches("confirm_x"), None);
    }

    #[test]
    fn pattern_matcher_extracts_capture_groups() {
        let matcher = ActionMatcher::pattern(r"^lang_([a-z]{2})$").unwrap();
        assert_eq!(matcher.matches("lang_ko"), Some(vec!["ko".to_string()]));
        assert_eq!(matcher.matches("lang_KOR"), None);
    }

    #[tokio::test]
    async fn captures_reach_the_handler() {
        let transport = Arc::new(MockTransport::default());
        let module = CommandModule::new("translate", "").action(
            ActionMatcher::pattern(r"^lang_([a-z]{2})$").unwrap(),
            |ctx| async move {
                let lang = ctx.capture(1).unwrap_or("??").to_string();
                ctx.answer(Some(&format!("to {lang}"))).await?;
                Ok(())
            },
        );
        let router = router_for(module, Arc::clone(&transport));

        let outcome = router.route(Chat::private(1), query("lang_ko")).await;

        assert_eq!(outcome, DispatchOutcome::Completed);
        let acks = transport.acks.lock();
        assert_eq!(acks.len(), 1);
        assert_eq!(acks[0].1.as_deref(), Some("to ko"));
    }

    #[tokio::test]
    async fn first_matching_route_wins() {
        let transport = Arc::new(MockTransport::default());
        let module = CommandModule::new("menu", "")
            .action(ActionMatcher::pattern(r"^page_\d+$").unwrap(), |ctx| {
                async move {
                    ctx.answer(Some("pattern")).await?;
                    Ok(())
                }
            })
            .action(ActionMatcher::literal("page_2"), |ctx| async move {
                ctx.answer(Some("literal")).await?;
                Ok(())
            });
        let router = router_for(module, Arc::clone(&transport));

        router.route(Chat::private(1), query("page_2")).await;

        assert_eq!(transport.acks.lock()[0].1.as_deref(), Some("pattern"));
    }

    #[tokio::test]
    async fn silent_handler_gets_a_neutral_acknowledgment() {
        let transport = Arc::new(MockTransport::default());
        let module = CommandModule::new("quiet", "")
            .action(ActionMatcher::literal("noop"), |_ctx| async { Ok(()) });
        let router = router_for(module, Arc::clone(&transport));

        let outcome = router.route(Chat::private(1), query("noop")).await;

        assert_eq!(outcome, DispatchOutcome::Completed);
        let acks = transport.acks.lock();
        assert_eq!(acks.len(), 1);
        assert_eq!(acks[0].1, None);
    }

    #[tokio::test]
    async fn failed_handler_is_still_acknowledged_once() {
        let transport = Arc::new(MockTransport::default());
        let module = CommandModule::new("flaky", "")
            .action(ActionMatcher::literal("boom"), |_ctx| async {
                Err("handler exploded".into())
            });
        let router = router_for(module, Arc::clone(&transport));

        let outcome = router.route(Chat::private(1), query("boom")).await;

        assert_eq!(outcome, DispatchOutcome::Failed);
        assert_eq!(transport.acks.lock().len(), 1);
    }

    #[tokio::test]
    async fn unmatched_interaction_is_acknowledged_and_ignored() {
        let transport = Arc::new(MockTransport::default());
        let module = CommandModule::new("menu", "")
            .action(ActionMatcher::literal("known"), |_ctx| async { Ok(()) });
        let router = router_for(module, Arc::clone(&transport));

        let outcome = router.route(Chat::private(1), query("unknown")).await;

        assert_eq!(outcome, DispatchOutcome::Ignored);
        let acks = transport.acks.lock();
        assert_eq!(acks.len(), 1);
        assert_eq!(acks[0].1, None);
    }

    #[tokio::test]
    async fn action_handler_can_read_the_command_listing() {
        let transport = Arc::new(MockTransport::default());
        let module = CommandModule::new("menu", "Interactive menu")
            .action(ActionMatcher::literal("list"), |ctx| async move {
                let names: Vec<&str> = ctx.commands().iter().map(|s| s.name.as_str()).collect();
                ctx.answer(Some(&names.join(","))).await?;
                Ok(())
            });
        let router = router_for(module, Arc::clone(&transport));

        router.route(Chat::private(1), query("list")).await;

        assert_eq!(transport.acks.lock()[0].1.as_deref(), Some("menu"));
    }

    #[tokio::test]
    async fn explicit_answer_suppresses_the_finalizing_acknowledgment() {
        let transport = Arc::new(MockTransport::default());
        let module = CommandModule::new("menu", "")
            .action(ActionMatcher::literal("save"), |ctx| async move {
                ctx.answer(Some("saved")).await?;
                ctx.answer(Some("saved again")).await?;
                Ok(())
            });
        let router = router_for(module, Arc::clone(&transport));

        router.route(Chat::private(1), query("save")).await;

        let acks = transport.acks.lock();
        assert_eq!(acks.len(), 1);
        assert_eq!(acks[0].1.as_deref(), Some("saved"));
    }
}
