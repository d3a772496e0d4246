//! The builtin `/help` command.

use serde::Deserialize;

use crate::error::BoxError;
use crate::module::{CommandModule, ModuleDecl, ModuleDescriptor};

/// Lists the registered commands visible in the current chat.
///
/// Accepts an optional `header` line in its config section:
///
/// ```toml
/// [modules.help]
/// header = "What this bot can do:"
/// ```
pub static HELP_MODULE: ModuleDescriptor = ModuleDescriptor {
    unit: "help",
    build: build_help,
};

#[derive(Debug, Default, Deserialize)]
struct HelpConfig {
    header: Option<String>,
}

fn build_help(config: &serde_json::Value) -> Result<ModuleDecl, BoxError> {
    let config: HelpConfig = serde_json::from_value(config.clone())?;
    let header = config.header;

    Ok(ModuleDecl::Command(
        CommandModule::new("help", "List available commands").on_invoke(move |ctx| {
            let header = header.clone();
            async move {
                let mut lines = Vec::new();
                if let Some(header) = header {
                    lines.push(header);
                }
                for spec in ctx.commands() {
                    if spec.visible_in(ctx.chat_kind()) {
                        lines.push(format!("/{} - {}", spec.name, spec.description));
                    }
                }
                ctx.reply(&lines.join("\n")).await?;
                Ok(())
            }
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::ModuleLoader;
    use crate::module::{CommandModule, Permission};
    use crate::registry::Registries;
    use crate::router::Router;
    use async_trait::async_trait;
    use courier_core::{
        ApiResult, BoxedTransport, Chat, ChatId, MenuEntry, MenuScope, MessageContent, MessageId,
        Transport, Update,
    };
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[derive(Default)]
    struct MockTransport {
        sent: Mutex<Vec<String>>,
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

        async fn answer_callback(&self, _callback_id: &str, _text: Option<&str>) -> ApiResult<()> {
            Ok(())
        }

        async fn set_command_menu(&self, _scope: MenuScope, _entries: &[MenuEntry]) -> ApiResult<()> {
            Ok(())
        }
    }

    fn registries_with_help() -> Registries {
        let mut registries = ModuleLoader::new().descriptor(HELP_MODULE).load();
        registries
            .commands
            .register(CommandModule::new("ping", "Health check").on_invoke(|_ctx| async { Ok(()) }));
        registries.commands.register(
            CommandModule::new("kick", "Remove a member")
                .permission(Permission::GroupOnly)
                .on_invoke(|_ctx| async { Ok(()) }),
        );
        registries
    }

    #[tokio::test]
    async fn help_lists_only_commands_visible_in_the_chat() {
        let transport = Arc::new(MockTransport::default());
        let router = Router::new(
            Arc::new(registries_with_help()),
            Arc::clone(&transport) as BoxedTransport,
        );

        router
            .dispatch(Update::message(
                Chat::private(1),
                7,
                MessageContent::Text("/help".into()),
            ))
            .await;

        let sent = transport.sent.lock();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].contains("/help"));
        assert!(sent[0].contains("/ping - Health check"));
        assert!(!sent[0].contains("/kick"));
    }

    #[tokio::test]
    async fn configured_header_leads_the_listing() {
        let registries = ModuleLoader::new()
            .descriptor(HELP_MODULE)
            .config("help", serde_json::json!({ "header": "What I can do:" }))
            .load();
        let transport = Arc::new(MockTransport::default());
        let router = Router::new(Arc::new(registries), Arc::clone(&transport) as BoxedTransport);

        router
            .dispatch(Update::message(
                Chat::private(1),
                7,
                MessageContent::Text("/help".into()),
            ))
            .await;

        let sent = transport.sent.lock();
        assert!(sent[0].starts_with("What I can do:\n"));
    }
}
