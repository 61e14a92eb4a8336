//! Channel Types
//!
//! Transport-neutral message types exchanged with a messaging gateway.

use serde::{Deserialize, Serialize};

/// Kind of conversation a message arrived in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatType {
    #[default]
    Private,
    Group,
    Supergroup,
    Channel,
}

impl ChatType {
    pub fn is_private(&self) -> bool {
        matches!(self, Self::Private)
    }

    pub fn parse(raw: &str) -> Self {
        match raw {
            "group" => Self::Group,
            "supergroup" => Self::Supergroup,
            "channel" => Self::Channel,
            _ => Self::Private,
        }
    }
}

/// What produced an inbound event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundKind {
    /// A plain text message.
    Text,
    /// A press on an inline keyboard button. `content` holds the button's
    /// callback data and `id` the message the keyboard is attached to.
    Callback { callback_id: String },
}

/// Inbound event from a channel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Message ID (`tg_<n>` for Telegram)
    pub id: String,
    pub kind: InboundKind,
    /// Sender identifier (user ID in the channel)
    pub sender_id: String,
    /// Sender display name (if available)
    pub sender_name: Option<String>,
    /// Conversation identifier (chat_id)
    pub conversation_id: String,
    pub chat_type: ChatType,
    /// Message text or callback data
    pub content: String,
    /// Timestamp (milliseconds since epoch)
    pub timestamp: i64,
}

impl InboundMessage {
    /// Create a new text message
    pub fn new(
        id: impl Into<String>,
        sender_id: impl Into<String>,
        conversation_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            kind: InboundKind::Text,
            sender_id: sender_id.into(),
            sender_name: None,
            conversation_id: conversation_id.into(),
            chat_type: ChatType::Private,
            content: content.into(),
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Create a callback event for a button attached to `message_id`.
    pub fn callback(
        callback_id: impl Into<String>,
        message_id: impl Into<String>,
        sender_id: impl Into<String>,
        conversation_id: impl Into<String>,
        data: impl Into<String>,
    ) -> Self {
        let mut message = Self::new(message_id, sender_id, conversation_id, data);
        message.kind = InboundKind::Callback {
            callback_id: callback_id.into(),
        };
        message
    }

    pub fn with_chat_type(mut self, chat_type: ChatType) -> Self {
        self.chat_type = chat_type;
        self
    }

    pub fn with_sender_name(mut self, name: impl Into<String>) -> Self {
        self.sender_name = Some(name.into());
        self
    }

    /// Display name when known, otherwise the sender id.
    pub fn sender_label(&self) -> &str {
        self.sender_name.as_deref().unwrap_or(&self.sender_id)
    }

    pub fn callback_id(&self) -> Option<&str> {
        match &self.kind {
            InboundKind::Callback { callback_id } => Some(callback_id),
            InboundKind::Text => None,
        }
    }

    /// Whether the message was sent in the sender's own private chat.
    pub fn is_private_with_sender(&self) -> bool {
        self.chat_type.is_private() && self.conversation_id == self.sender_id
    }
}

/// One inline keyboard button.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InlineButton {
    Url { label: String, url: String },
    Callback { label: String, data: String },
}

impl InlineButton {
    pub fn url(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self::Url {
            label: label.into(),
            url: url.into(),
        }
    }

    pub fn callback(label: impl Into<String>, data: impl Into<String>) -> Self {
        Self::Callback {
            label: label.into(),
            data: data.into(),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Url { label, .. } | Self::Callback { label, .. } => label,
        }
    }
}

/// Rows of inline buttons rendered under a message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineKeyboard {
    pub rows: Vec<Vec<InlineButton>>,
}

impl InlineKeyboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn row(mut self, buttons: Vec<InlineButton>) -> Self {
        self.rows.push(buttons);
        self
    }
}

/// Outbound message to a channel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub conversation_id: String,
    /// Message content (plain text or markdown)
    pub content: String,
    /// Reply to specific message
    pub reply_to: Option<String>,
    /// Parse mode (Markdown, HTML, or None for plain)
    pub parse_mode: Option<String>,
    pub keyboard: Option<InlineKeyboard>,
    /// Deliver without a notification sound
    pub silent: bool,
}

impl OutboundMessage {
    pub fn new(conversation_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            content: content.into(),
            reply_to: None,
            parse_mode: Some("Markdown".to_string()),
            keyboard: None,
            silent: false,
        }
    }

    pub fn with_reply_to(mut self, reply_to: impl Into<String>) -> Self {
        self.reply_to = Some(reply_to.into());
        self
    }

    pub fn with_keyboard(mut self, keyboard: InlineKeyboard) -> Self {
        self.keyboard = Some(keyboard);
        self
    }

    pub fn plain(mut self) -> Self {
        self.parse_mode = None;
        self
    }

    pub fn silent(mut self) -> Self {
        self.silent = true;
        self
    }
}

/// In-place replacement of a previously sent message's text and keyboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditMessage {
    pub conversation_id: String,
    pub message_id: String,
    pub content: String,
    pub parse_mode: Option<String>,
    pub keyboard: Option<InlineKeyboard>,
}

impl EditMessage {
    pub fn new(
        conversation_id: impl Into<String>,
        message_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            message_id: message_id.into(),
            content: content.into(),
            parse_mode: Some("Markdown".to_string()),
            keyboard: None,
        }
    }

    pub fn with_keyboard(mut self, keyboard: InlineKeyboard) -> Self {
        self.keyboard = Some(keyboard);
        self
    }
}

/// Who the bot is on the channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotIdentity {
    pub id: String,
    /// Username without the leading `@`
    pub handle: String,
}

impl BotIdentity {
    /// `@handle`, as it appears when users mention the bot.
    pub fn mention(&self) -> String {
        format!("@{}", self.handle)
    }

    /// Deep link that opens a private chat with the bot.
    pub fn deep_link(&self) -> String {
        format!("https://t.me/{}", self.handle)
    }
}
