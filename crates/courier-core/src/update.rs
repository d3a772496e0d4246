//! Inbound update model.
//!
//! This module provides the data types that describe one inbound event as
//! delivered by the transport:
//!
//! - [`Update`] - the envelope: which chat, which user, what happened
//! - [`UpdateKind`] - message vs. interactive-callback discrimination
//! - [`MessageContent`] - the platform-classified content of a message
//! - [`EventKind`] - the content-type tag event modules subscribe to
//! - [`ChatKind`] - the `group-like` / `private` split permission rules key on
//!
//! The framework layer classifies an update exactly once, at the start of a
//! dispatch cycle, and never mutates it afterwards.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Numeric chat identifier, as assigned by the platform.
pub type ChatId = i64;

/// Numeric user identifier, as assigned by the platform.
pub type UserId = i64;

/// Numeric message identifier, unique within a chat.
pub type MessageId = i64;

// ============================================================================
// Chat classification
// ============================================================================

/// Coarse classification of the conversation an update originated in.
///
/// Permission rules and menu scoping only ever distinguish these two cases;
/// the platform's finer-grained chat taxonomy (basic group, supergroup,
/// channel, ...) is collapsed by the transport before updates reach the
/// framework.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatKind {
    /// A one-on-one conversation with the bot.
    Private,
    /// Any multi-user conversation (group, supergroup, and the like).
    GroupLike,
}

/// The conversation context an update belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chat {
    /// Platform chat identifier.
    pub id: ChatId,
    /// Coarse chat classification.
    pub kind: ChatKind,
}

impl Chat {
    /// Creates a private chat reference.
    pub fn private(id: ChatId) -> Self {
        Self {
            id,
            kind: ChatKind::Private,
        }
    }

    /// Creates a group-like chat reference.
    pub fn group(id: ChatId) -> Self {
        Self {
            id,
            kind: ChatKind::GroupLike,
        }
    }
}

// ============================================================================
// Event kind tags
// ============================================================================

/// Platform-defined content-type tag of a non-command message.
///
/// Event modules subscribe to one or more of these tags; the dispatch router
/// derives the tag from [`MessageContent`] and fans the update out to every
/// subscribed module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Plain text message (that is not a command invocation).
    Text,
    /// Photo message.
    Photo,
    /// Sticker message.
    Sticker,
    /// Voice note.
    Voice,
    /// Video message.
    Video,
    /// Document / file attachment.
    Document,
    /// One or more users joined the chat.
    NewChatMembers,
    /// A user left (or was removed from) the chat.
    LeftChatMember,
    /// Anything the transport delivered but the model does not distinguish.
    Other,
}

impl EventKind {
    /// Returns the canonical tag string for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Text => "text",
            EventKind::Photo => "photo",
            EventKind::Sticker => "sticker",
            EventKind::Voice => "voice",
            EventKind::Video => "video",
            EventKind::Document => "document",
            EventKind::NewChatMembers => "new_chat_members",
            EventKind::LeftChatMember => "left_chat_member",
            EventKind::Other => "other",
        }
    }
}

impl FromStr for EventKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_str() {
            "text" => EventKind::Text,
            "photo" => EventKind::Photo,
            "sticker" => EventKind::Sticker,
            "voice" => EventKind::Voice,
            "video" => EventKind::Video,
            "document" => EventKind::Document,
            "new_chat_members" => EventKind::NewChatMembers,
            "left_chat_member" => EventKind::LeftChatMember,
            _ => EventKind::Other,
        })
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Message content
// ============================================================================

/// Platform-classified content of an inbound message.
///
/// Exactly one variant per message; the transport performs this
/// classification before handing the update over.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageContent {
    /// Plain text. Command invocations arrive as this variant too; the
    /// router decides whether the text is command-shaped.
    Text(String),
    /// A photo, optionally captioned.
    Photo {
        /// Caption text, when present.
        caption: Option<String>,
    },
    /// A sticker.
    Sticker,
    /// A voice note.
    Voice,
    /// A video.
    Video,
    /// A document attachment.
    Document {
        /// Original file name, when the platform provides one.
        file_name: Option<String>,
    },
    /// Users joined the chat.
    NewChatMembers(Vec<UserId>),
    /// A user left the chat.
    LeftChatMember(UserId),
    /// Content the model does not distinguish further.
    Other,
}

impl MessageContent {
    /// Returns the event-kind tag this content is classified under.
    pub fn event_kind(&self) -> EventKind {
        match self {
            MessageContent::Text(_) => EventKind::Text,
            MessageContent::Photo { .. } => EventKind::Photo,
            MessageContent::Sticker => EventKind::Sticker,
            MessageContent::Voice => EventKind::Voice,
            MessageContent::Video => EventKind::Video,
            MessageContent::Document { .. } => EventKind::Document,
            MessageContent::NewChatMembers(_) => EventKind::NewChatMembers,
            MessageContent::LeftChatMember(_) => EventKind::LeftChatMember,
            MessageContent::Other => EventKind::Other,
        }
    }

    /// Returns the textual content, when this message has any.
    pub fn text(&self) -> Option<&str> {
        match self {
            MessageContent::Text(t) => Some(t),
            MessageContent::Photo { caption } => caption.as_deref(),
            _ => None,
        }
    }
}

// ============================================================================
// Callback queries
// ============================================================================

/// An interaction with a previously sent interactive UI element.
///
/// Emitted when a user presses an inline button; the `data` payload is the
/// callback identifier the callback-action router matches against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackQuery {
    /// Platform-assigned identifier of this interaction, used to acknowledge it.
    pub id: String,
    /// The callback identifier attached to the pressed element.
    pub data: String,
    /// The user who interacted.
    pub from: UserId,
    /// The message the interactive element was attached to, when known.
    pub message_id: Option<MessageId>,
}

// ============================================================================
// Update envelope
// ============================================================================

/// What an [`Update`] carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpdateKind {
    /// An inbound message (command candidate or event candidate).
    Message(MessageContent),
    /// An interactive-UI callback interaction.
    Callback(CallbackQuery),
}

/// One inbound event delivered by the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Update {
    /// The chat the update originated in.
    pub chat: Chat,
    /// The sending user, when the platform attributes one.
    pub from: Option<UserId>,
    /// The payload.
    pub kind: UpdateKind,
}

impl Update {
    /// Creates a message update.
    pub fn message(chat: Chat, from: UserId, content: MessageContent) -> Self {
        Self {
            chat,
            from: Some(from),
            kind: UpdateKind::Message(content),
        }
    }

    /// Creates a callback-interaction update.
    pub fn callback(chat: Chat, query: CallbackQuery) -> Self {
        Self {
            chat,
            from: Some(query.from),
            kind: UpdateKind::Callback(query),
        }
    }

    /// Returns the textual content of this update, when it has any.
    pub fn text(&self) -> Option<&str> {
        match &self.kind {
            UpdateKind::Message(content) => content.text(),
            UpdateKind::Callback(_) => None,
        }
    }
}
