//! Scripted demo: a handful of modules behind a console transport.
//!
//! Feeds a fixed sequence of updates through the full pipeline (discovery,
//! menu registration, middleware, command/event/callback routing) and prints
//! every outbound operation. Run with `cargo run -p ping_bot`.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;

use courier::core::{ApiResult, CallbackQuery, ChatId, MenuEntry, MenuScope, MessageId};
use courier::prelude::*;
use courier::runtime::config::BotConfig;

/// Prints every outbound operation instead of calling a real platform.
#[derive(Default)]
struct ConsoleTransport {
    next_message_id: AtomicI64,
}

#[async_trait]
impl Transport for ConsoleTransport {
    async fn send_message(&self, chat: ChatId, text: &str) -> ApiResult<MessageId> {
        let id = self.next_message_id.fetch_add(1, Ordering::Relaxed);
        println!("[send -> chat {chat}] {text}");
        Ok(id)
    }

    async fn edit_message(&self, chat: ChatId, message: MessageId, text: &str) -> ApiResult<()> {
        println!("[edit -> chat {chat}, message {message}] {text}");
        Ok(())
    }

    async fn answer_callback(&self, callback_id: &str, text: Option<&str>) -> ApiResult<()> {
        match text {
            Some(text) => println!("[ack {callback_id}] {text}"),
            None => println!("[ack {callback_id}]"),
        }
        Ok(())
    }

    async fn set_command_menu(&self, scope: MenuScope, entries: &[MenuEntry]) -> ApiResult<()> {
        let listing: Vec<String> = entries
            .iter()
            .map(|e| format!("/{} ({})", e.command, e.description))
            .collect();
        println!("[menu {scope:?}] {}", listing.join(", "));
        Ok(())
    }
}

fn build_ping(_cfg: &serde_json::Value) -> Result<ModuleDecl, BoxError> {
    Ok(ModuleDecl::Command(
        CommandModule::new("ping", "Health check").on_invoke(|ctx| async move {
            ctx.reply("pong").await?;
            Ok(())
        }),
    ))
}

fn build_echo(_cfg: &serde_json::Value) -> Result<ModuleDecl, BoxError> {
    Ok(ModuleDecl::Command(
        CommandModule::new("echo", "Repeat the arguments").on_invoke(|ctx| async move {
            let args = ctx.args().unwrap_or("");
            let reply = if args.is_empty() { "(nothing to echo)" } else { args };
            ctx.reply(reply).await?;
            Ok(())
        }),
    ))
}

fn build_kick(_cfg: &serde_json::Value) -> Result<ModuleDecl, BoxError> {
    Ok(ModuleDecl::Command(
        CommandModule::new("kick", "Remove a member (groups only)")
            .permission(Permission::GroupOnly)
            .on_invoke(|ctx| async move {
                ctx.reply("pretending to kick someone").await?;
                Ok(())
            }),
    ))
}

fn build_translate(_cfg: &serde_json::Value) -> Result<ModuleDecl, BoxError> {
    Ok(ModuleDecl::Command(
        CommandModule::new("translate", "Pick a target language")
            .on_invoke(|ctx| async move {
                ctx.reply("press a language button: lang_ko / lang_fr").await?;
                Ok(())
            })
            .action(
                ActionMatcher::pattern(r"^lang_([a-z]{2})$")?,
                |ctx| async move {
                    let lang = ctx.capture(1).unwrap_or("en").to_string();
                    ctx.answer(Some(&format!("translating to {lang}"))).await?;
                    Ok(())
                },
            ),
    ))
}

fn build_media_log(_cfg: &serde_json::Value) -> Result<ModuleDecl, BoxError> {
    Ok(ModuleDecl::Event(
        EventModule::new("media_log", "Counts media messages")
            .kind(EventKind::Photo)
            .kind(EventKind::Sticker)
            .on_invoke(|ctx| async move {
                ctx.reply("nice media!").await?;
                Ok(())
            }),
    ))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = CourierConfig {
        bot: BotConfig {
            token: "demo-token".into(),
            username: Some("courier_demo_bot".into()),
        },
        ..Default::default()
    };

    let mut runtime = Runtime::from_config(config);
    runtime.register_modules([
        ModuleDescriptor { unit: "ping", build: build_ping },
        ModuleDescriptor { unit: "echo", build: build_echo },
        ModuleDescriptor { unit: "kick", build: build_kick },
        ModuleDescriptor { unit: "translate", build: build_translate },
        ModuleDescriptor { unit: "media_log", build: build_media_log },
        HELP_MODULE,
    ]);

    let transport = Arc::new(ConsoleTransport::default());
    let (tx, source) = ChannelUpdateSource::new(16);

    // Scripted session; the runtime stops when the sender drops.
    tokio::spawn(async move {
        let private = Chat::private(100);
        let group = Chat::group(200);
        let updates = [
            Update::message(private, 1, MessageContent::Text("/help".into())),
            Update::message(private, 1, MessageContent::Text("/ping".into())),
            Update::message(private, 1, MessageContent::Text("/echo hello there".into())),
            // Silently ignored: group-only command in a private chat.
            Update::message(private, 1, MessageContent::Text("/kick".into())),
            Update::message(group, 2, MessageContent::Text("/kick".into())),
            Update::message(group, 2, MessageContent::Text("/ping@courier_demo_bot".into())),
            Update::message(group, 2, MessageContent::Sticker),
            Update::message(private, 1, MessageContent::Text("/translate".into())),
            Update::callback(
                private,
                CallbackQuery {
                    id: "cb-1".into(),
                    data: "lang_ko".into(),
                    from: 1,
                    message_id: Some(8),
                },
            ),
        ];
        for update in updates {
            if tx.send(update).await.is_err() {
                break;
            }
        }
    });

    runtime.run(transport, source).await?;
    Ok(())
}
