//! The dispatch router.
//!
//! One [`Router`] instance serves the whole process. For every inbound
//! update it runs, in order:
//!
//! 1. the middleware chain: every loaded command module's per-message hook,
//!    in registration order, for every update regardless of shape;
//! 2. routing proper: callback interactions go to the
//!    [`ActionRouter`](crate::actions::ActionRouter), command-shaped text
//!    goes to the command registry, and everything else fans out to the
//!    subscribed event modules.
//!
//! # Error containment
//!
//! A handler error never crosses the dispatch boundary. Each failing stage
//! is logged with its module name and the cycle continues; one module's
//! panic-free failure cannot starve another module of the same update.

use std::sync::Arc;

use tracing::{Instrument, Level, debug, error, span};

use courier_core::{BoxedTransport, MessageContent, Update, UpdateKind};

use crate::actions::ActionRouter;
use crate::context::{CommandSpec, InvocationContext};
use crate::registry::Registries;

/// Terminal state of one dispatch cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A handler ran and returned success.
    Completed,
    /// A handler ran and returned an error (already logged).
    Failed,
    /// No handler claimed the update.
    Ignored,
}

/// Binds the loaded registries to the transport and routes updates.
///
/// Construct one after [`ModuleLoader::load`](crate::loader::ModuleLoader::load)
/// returns; the registries are immutable from then on and the router is
/// `Send + Sync`, so cycles may run concurrently.
pub struct Router {
    registries: Arc<Registries>,
    transport: BoxedTransport,
    actions: ActionRouter,
    /// Snapshot of the command listing, shared with every context.
    listing: Arc<[CommandSpec]>,
    /// Our own username, for `/command@botname` resolution.
    bot_name: Option<String>,
}

impl Router {
    /// Builds a router over loaded registries.
    pub fn new(registries: Arc<Registries>, transport: BoxedTransport) -> Self {
        let actions = ActionRouter::new(&registries.commands, Arc::clone(&transport));
        let listing: Arc<[CommandSpec]> = registries.commands.list().into();
        Self {
            registries,
            transport,
            actions,
            listing,
            bot_name: None,
        }
    }

    /// Sets the bot's own username so `/command@botname` invocations resolve.
    ///
    /// Without this, any suffixed invocation is treated as addressed to some
    /// other bot and falls through to event routing.
    pub fn bot_name(mut self, name: impl Into<String>) -> Self {
        self.bot_name = Some(name.into());
        self
    }

    /// Runs one dispatch cycle for one inbound update.
    pub async fn dispatch(&self, update: Update) -> DispatchOutcome {
        let span = span!(
            Level::DEBUG,
            "dispatch",
            chat = update.chat.id,
            kind = match update.kind {
                UpdateKind::Message(_) => "message",
                UpdateKind::Callback(_) => "callback",
            }
        );
        self.dispatch_inner(update).instrument(span).await
    }

    async fn dispatch_inner(&self, update: Update) -> DispatchOutcome {
        let chat = update.chat;
        let ctx = Arc::new(InvocationContext::new(
            update.clone(),
            None,
            Arc::clone(&self.transport),
            Arc::clone(&self.listing),
        ));

        // Middleware chain runs first, for every update. A failing stage is
        // logged and the chain continues.
        for module in self.registries.commands.iter() {
            if let Some(stage) = module.middleware()
                && let Err(err) = stage(Arc::clone(&ctx)).await
            {
                error!(module = module.name(), error = %err, "Middleware stage failed");
            }
        }

        match &update.kind {
            UpdateKind::Callback(query) => self.actions.route(chat, query.clone()).await,
            UpdateKind::Message(content) => {
                // Only plain text can be a command candidate; a photo whose
                // caption is command-shaped stays an event candidate.
                let parsed = match content {
                    MessageContent::Text(text) => {
                        parse_command(text, self.bot_name.as_deref())
                    }
                    _ => None,
                };
                match parsed {
                    Some((keyword, args)) => self.run_command(&keyword, args, ctx).await,
                    None => self.run_events(content.event_kind(), ctx).await,
                }
            }
        }
    }

    async fn run_command(
        &self,
        keyword: &str,
        args: String,
        ctx: Arc<InvocationContext>,
    ) -> DispatchOutcome {
        let Some(module) = self.registries.commands.resolve(keyword) else {
            debug!(command = keyword, "Unknown command");
            return DispatchOutcome::Ignored;
        };

        // Permission misses are silent; the command is simply not there in
        // that chat kind.
        if !module.permission_rule().visible_in(ctx.chat_kind()) {
            debug!(command = keyword, chat_kind = ?ctx.chat_kind(), "Command not visible here");
            return DispatchOutcome::Ignored;
        }

        let Some(handler) = module.handler() else {
            // Middleware-only module; its hook already ran.
            return DispatchOutcome::Ignored;
        };

        let ctx = Arc::new(InvocationContext::new(
            ctx.update().clone(),
            Some(args),
            Arc::clone(&self.transport),
            Arc::clone(&self.listing),
        ));
        match handler(ctx).await {
            Ok(()) => DispatchOutcome::Completed,
            Err(err) => {
                error!(command = keyword, error = %err, "Command handler failed");
                DispatchOutcome::Failed
            }
        }
    }

    async fn run_events(
        &self,
        kind: courier_core::EventKind,
        ctx: Arc<InvocationContext>,
    ) -> DispatchOutcome {
        let handlers = self.registries.events.handlers_for(kind);
        if handlers.is_empty() {
            return DispatchOutcome::Ignored;
        }

        let mut failed = false;
        for module in handlers {
            if let Some(handler) = module.handler()
                && let Err(err) = handler(Arc::clone(&ctx)).await
            {
                error!(module = module.name(), event = %kind, error = %err, "Event handler failed");
                failed = true;
            }
        }
        if failed {
            DispatchOutcome::Failed
        } else {
            DispatchOutcome::Completed
        }
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("commands", &self.registries.commands.len())
            .field("events", &self.registries.events.len())
            .field("actions", &self.actions.len())
            .field("bot_name", &self.bot_name)
            .finish_non_exhaustive()
    }
}

/// Splits command-shaped text into `(keyword, args)`.
///
/// Text is command-shaped when it starts with `/` followed by a keyword.
/// The keyword is lowercased; the argument remainder keeps its case and is
/// trimmed. A `/keyword@botname` suffix resolves against `bot_name`
/// case-insensitively; a suffix naming some other bot (or any suffix when no
/// name is configured) makes the text not ours.
fn parse_command(text: &str, bot_name: Option<&str>) -> Option<(String, String)> {
    let rest = text.strip_prefix('/')?;
    let (token, args) = match rest.split_once(char::is_whitespace) {
        Some((token, args)) => (token, args),
        None => (rest, ""),
    };
    if token.is_empty() {
        return None;
    }

    let keyword = match token.split_once('@') {
        Some((keyword, suffix)) => {
            let ours = bot_name.is_some_and(|name| name.eq_ignore_ascii_case(suffix));
            if !ours {
                return None;
            }
            keyword
        }
        None => token,
    };
    if keyword.is_empty() {
        return None;
    }

    Some((keyword.to_lowercase(), args.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::ActionMatcher;
    use crate::module::{CommandModule, EventModule, Permission};
    use async_trait::async_trait;
    use courier_core::{
        ApiResult, CallbackQuery, Chat, ChatId, EventKind, MenuEntry, MenuScope, MessageContent,
        MessageId, Transport,
    };
    use parking_lot::Mutex;

    #[derive(Default)]
    struct MockTransport {
        sent: Mutex<Vec<String>>,
        acks: Mutex<Vec<String>>,
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

        async fn answer_callback(&self, callback_id: &str, _text: Option<&str>) -> ApiResult<()> {
            self.acks.lock().push(callback_id.to_string());
            Ok(())
        }

        async fn set_command_menu(&self, _scope: MenuScope, _entries: &[MenuEntry]) -> ApiResult<()> {
            Ok(())
        }
    }

    fn router(modules: Vec<CommandModule>, events: Vec<EventModule>) -> (Router, Arc<MockTransport>) {
        let mut registries = Registries::default();
        for module in modules {
            registries.commands.register(module);
        }
        for module in events {
            registries.events.register(module);
        }
        let transport = Arc::new(MockTransport::default());
        let router = Router::new(Arc::new(registries), Arc::clone(&transport) as BoxedTransport);
        (router, transport)
    }

    fn text_update(chat: Chat, text: &str) -> Update {
        Update::message(chat, 7, MessageContent::Text(text.to_string()))
    }

    #[test]
    fn command_parsing_lowercases_keyword_and_trims_args() {
        assert_eq!(
            parse_command("/Echo   hello World ", None),
            Some(("echo".to_string(), "hello World".to_string()))
        );
        assert_eq!(
            parse_command("/ping", None),
            Some(("ping".to_string(), String::new()))
        );
        assert_eq!(parse_command("plain text", None), None);
        assert_eq!(parse_command("/", None), None);
        assert_eq!(parse_command("/ spaced", None), None);
    }

    #[test]
    fn botname_suffix_resolves_case_insensitively() {
        assert_eq!(
            parse_command("/ping@Courier_Bot", Some("courier_bot")),
            Some(("ping".to_string(), String::new()))
        );
        assert_eq!(parse_command("/ping@other_bot", Some("courier_bot")), None);
        assert_eq!(parse_command("/ping@courier_bot", None), None);
        assert_eq!(parse_command("/@courier_bot", Some("courier_bot")), None);
    }

    #[tokio::test]
    async fn command_invocation_reaches_exactly_one_handler() {
        let ping = CommandModule::new("ping", "Health check").on_invoke(|ctx| async move {
            ctx.reply("pong").await?;
            Ok(())
        });
        let (router, transport) = router(vec![ping], vec![]);

        let outcome = router.dispatch(text_update(Chat::private(1), "/ping")).await;

        assert_eq!(outcome, DispatchOutcome::Completed);
        assert_eq!(*transport.sent.lock(), ["pong"]);
    }

    #[tokio::test]
    async fn group_only_command_is_silently_ignored_in_private_chats() {
        let kick = CommandModule::new("kick", "Remove a member")
            .permission(Permission::GroupOnly)
            .on_invoke(|ctx| async move {
                ctx.reply("kicked").await?;
                Ok(())
            });
        let (router, transport) = router(vec![kick], vec![]);

        let private = router.dispatch(text_update(Chat::private(1), "/kick")).await;
        assert_eq!(private, DispatchOutcome::Ignored);
        assert!(transport.sent.lock().is_empty());

        let group = router.dispatch(text_update(Chat::group(2), "/kick")).await;
        assert_eq!(group, DispatchOutcome::Completed);
        assert_eq!(*transport.sent.lock(), ["kicked"]);
    }

    #[tokio::test]
    async fn unknown_command_is_ignored_without_replies() {
        let (router, transport) = router(vec![], vec![]);

        let outcome = router.dispatch(text_update(Chat::private(1), "/nope")).await;

        assert_eq!(outcome, DispatchOutcome::Ignored);
        assert!(transport.sent.lock().is_empty());
    }

    #[tokio::test]
    async fn command_handler_receives_the_argument_string() {
        let echo = CommandModule::new("echo", "Echo arguments").on_invoke(|ctx| async move {
            let args = ctx.args().unwrap_or("").to_string();
            ctx.reply(&args).await?;
            Ok(())
        });
        let (router, transport) = router(vec![echo], vec![]);

        router
            .dispatch(text_update(Chat::private(1), "/echo  Hello World "))
            .await;

        assert_eq!(*transport.sent.lock(), ["Hello World"]);
    }

    #[tokio::test]
    async fn event_update_fans_out_to_every_subscriber_in_order() {
        let first = EventModule::new("first", "")
            .kind(EventKind::Photo)
            .on_invoke(|ctx| async move {
                ctx.reply("first saw it").await?;
                Ok(())
            });
        let second = EventModule::new("second", "")
            .kind(EventKind::Photo)
            .on_invoke(|ctx| async move {
                ctx.reply("second saw it").await?;
                Ok(())
            });
        let (router, transport) = router(vec![], vec![first, second]);

        let update = Update::message(Chat::group(5), 7, MessageContent::Photo { caption: None });
        let outcome = router.dispatch(update).await;

        assert_eq!(outcome, DispatchOutcome::Completed);
        assert_eq!(*transport.sent.lock(), ["first saw it", "second saw it"]);
    }

    #[tokio::test]
    async fn command_shaped_photo_caption_routes_as_a_photo_event() {
        let ping = CommandModule::new("ping", "").on_invoke(|ctx| async move {
            ctx.reply("pong").await?;
            Ok(())
        });
        let gallery = EventModule::new("gallery", "")
            .kind(EventKind::Photo)
            .on_invoke(|ctx| async move {
                ctx.reply("archived").await?;
                Ok(())
            });
        let (router, transport) = router(vec![ping], vec![gallery]);

        let update = Update::message(
            Chat::private(1),
            7,
            MessageContent::Photo {
                caption: Some("/ping".into()),
            },
        );
        let outcome = router.dispatch(update).await;

        assert_eq!(outcome, DispatchOutcome::Completed);
        assert_eq!(*transport.sent.lock(), ["archived"]);
    }

    #[tokio::test]
    async fn failing_event_handler_does_not_starve_the_next_one() {
        let flaky = EventModule::new("flaky", "")
            .kind(EventKind::Sticker)
            .on_invoke(|_ctx| async { Err("sticker allergy".into()) });
        let steady = EventModule::new("steady", "")
            .kind(EventKind::Sticker)
            .on_invoke(|ctx| async move {
                ctx.reply("still here").await?;
                Ok(())
            });
        let (router, transport) = router(vec![], vec![flaky, steady]);

        let update = Update::message(Chat::group(5), 7, MessageContent::Sticker);
        let outcome = router.dispatch(update).await;

        assert_eq!(outcome, DispatchOutcome::Failed);
        assert_eq!(*transport.sent.lock(), ["still here"]);
    }

    #[tokio::test]
    async fn middleware_runs_for_every_update_and_survives_stage_failures() {
        let grumpy = CommandModule::new("grumpy", "")
            .on_each_message(|_ctx| async { Err("had a bad day".into()) });
        let counter = CommandModule::new("counter", "").on_each_message(|ctx| async move {
            ctx.reply("counted").await?;
            Ok(())
        });
        let (router, transport) = router(vec![grumpy, counter], vec![]);

        // Not command-shaped; routing itself ignores it.
        let outcome = router
            .dispatch(text_update(Chat::private(1), "just chatting"))
            .await;

        assert_eq!(outcome, DispatchOutcome::Ignored);
        assert_eq!(*transport.sent.lock(), ["counted"]);
    }

    #[tokio::test]
    async fn middleware_also_runs_for_callback_updates() {
        let watcher = CommandModule::new("watcher", "")
            .on_each_message(|ctx| async move {
                ctx.reply("saw an update").await?;
                Ok(())
            })
            .action(ActionMatcher::literal("tap"), |ctx| async move {
                ctx.ack().await?;
                Ok(())
            });
        let (router, transport) = router(vec![watcher], vec![]);

        let update = Update::callback(
            Chat::private(1),
            CallbackQuery {
                id: "cb-9".to_string(),
                data: "tap".to_string(),
                from: 7,
                message_id: None,
            },
        );
        let outcome = router.dispatch(update).await;

        assert_eq!(outcome, DispatchOutcome::Completed);
        assert_eq!(*transport.sent.lock(), ["saw an update"]);
        assert_eq!(*transport.acks.lock(), ["cb-9"]);
    }

    #[tokio::test]
    async fn suffixed_command_for_another_bot_falls_through_to_events() {
        let ping = CommandModule::new("ping", "").on_invoke(|ctx| async move {
            ctx.reply("pong").await?;
            Ok(())
        });
        let (router, transport) = router(vec![ping], vec![]);
        let router = router.bot_name("courier_bot");

        let ours = router
            .dispatch(text_update(Chat::group(3), "/ping@courier_bot"))
            .await;
        assert_eq!(ours, DispatchOutcome::Completed);

        let theirs = router
            .dispatch(text_update(Chat::group(3), "/ping@other_bot"))
            .await;
        assert_eq!(theirs, DispatchOutcome::Ignored);
        assert_eq!(*transport.sent.lock(), ["pong"]);
    }

    #[tokio::test]
    async fn failing_command_handler_reports_failure() {
        let broken = CommandModule::new("broken", "")
            .on_invoke(|_ctx| async { Err("out of order".into()) });
        let (router, _transport) = router(vec![broken], vec![]);

        let outcome = router
            .dispatch(text_update(Chat::private(1), "/broken"))
            .await;

        assert_eq!(outcome, DispatchOutcome::Failed);
    }
}
