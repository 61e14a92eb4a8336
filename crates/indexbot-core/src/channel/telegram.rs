//! Telegram Channel Implementation
//!
//! Talks to the Telegram Bot API directly over HTTPS. Messages and inline
//! keyboard callbacks are received via long-polling.

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use tokio::sync::{OnceCell, mpsc};
use tracing::{debug, error, info, warn};

use super::traits::{Channel, InboundStream};
use super::types::{
    BotIdentity, ChatType, EditMessage, InboundMessage, InlineButton, InlineKeyboard,
    OutboundMessage,
};

const TELEGRAM_API_BASE: &str = "https://api.telegram.org/bot";
/// Default timeout for Telegram API calls (seconds)
const API_TIMEOUT_SECS: u64 = 30;
const POLL_ERROR_BACKOFF_SECS: u64 = 5;
const MESSAGE_ID_PREFIX: &str = "tg_";

/// Telegram channel configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Bot token from @BotFather
    pub bot_token: String,
    /// Polling timeout in seconds (default: 30)
    #[serde(default = "default_polling_timeout")]
    pub polling_timeout: u32,
}

pub(crate) fn default_polling_timeout() -> u32 {
    30
}

impl TelegramConfig {
    pub fn new(bot_token: impl Into<String>) -> Self {
        Self {
            bot_token: bot_token.into(),
            polling_timeout: default_polling_timeout(),
        }
    }

    pub fn with_polling_timeout(mut self, timeout: u32) -> Self {
        self.polling_timeout = timeout;
        self
    }
}

/// Telegram channel implementation
pub struct TelegramChannel {
    config: TelegramConfig,
    client: Client,
    identity: OnceCell<BotIdentity>,
    /// Whether polling is active
    polling_active: Arc<AtomicBool>,
    /// Last update ID for long-polling
    last_update_id: Arc<AtomicI64>,
    /// Persist Telegram offset when it changes.
    offset_persister: Option<Arc<dyn Fn(i64) + Send + Sync>>,
}

impl TelegramChannel {
    pub fn new(config: TelegramConfig) -> Self {
        Self {
            config,
            client: Client::new(),
            identity: OnceCell::new(),
            polling_active: Arc::new(AtomicBool::new(false)),
            last_update_id: Arc::new(AtomicI64::new(0)),
            offset_persister: None,
        }
    }

    pub fn with_token(bot_token: impl Into<String>) -> Self {
        Self::new(TelegramConfig::new(bot_token))
    }

    /// Restore the last processed Telegram update ID.
    pub fn with_last_update_id(self, update_id: i64) -> Self {
        self.last_update_id.store(update_id, Ordering::SeqCst);
        self
    }

    /// Persist offset after each successful polling batch.
    pub fn with_offset_persister(mut self, persister: Arc<dyn Fn(i64) + Send + Sync>) -> Self {
        self.offset_persister = Some(persister);
        self
    }

    pub fn last_update_id(&self) -> i64 {
        self.last_update_id.load(Ordering::SeqCst)
    }

    /// Ask the polling task to exit after its current request.
    pub fn stop_polling(&self) {
        self.polling_active.store(false, Ordering::SeqCst);
    }

    fn api_url(&self, method: &str) -> String {
        format!("{}{}/{}", TELEGRAM_API_BASE, self.config.bot_token, method)
    }

    /// "tg_12345" -> 12345
    fn parse_message_id(message_id: &str) -> Option<i64> {
        message_id
            .strip_prefix(MESSAGE_ID_PREFIX)
            .unwrap_or(message_id)
            .parse::<i64>()
            .ok()
    }

    fn format_message_id(message_id: i64) -> String {
        format!("{}{}", MESSAGE_ID_PREFIX, message_id)
    }

    fn keyboard_markup(keyboard: &InlineKeyboard) -> serde_json::Value {
        let rows: Vec<Vec<serde_json::Value>> = keyboard
            .rows
            .iter()
            .map(|row| {
                row.iter()
                    .map(|button| match button {
                        InlineButton::Url { label, url } => {
                            serde_json::json!({ "text": label, "url": url })
                        }
                        InlineButton::Callback { label, data } => {
                            serde_json::json!({ "text": label, "callback_data": data })
                        }
                    })
                    .collect()
            })
            .collect();
        serde_json::json!({ "inline_keyboard": rows })
    }

    fn send_params(message: &OutboundMessage) -> serde_json::Value {
        let mut params = serde_json::json!({
            "chat_id": message.conversation_id,
            "text": message.content,
        });

        if let Some(mode) = &message.parse_mode {
            params["parse_mode"] = serde_json::Value::String(mode.clone());
        }

        if let Some(reply_id) = message.reply_to.as_deref()
            && let Some(id) = Self::parse_message_id(reply_id)
        {
            params["reply_to_message_id"] = serde_json::Value::Number(id.into());
            params["allow_sending_without_reply"] = serde_json::Value::Bool(true);
        }

        if let Some(keyboard) = &message.keyboard {
            params["reply_markup"] = Self::keyboard_markup(keyboard);
        }

        if message.silent {
            params["disable_notification"] = serde_json::Value::Bool(true);
        }

        params
    }

    fn edit_params(message: &EditMessage) -> Result<serde_json::Value> {
        let message_id = Self::parse_message_id(&message.message_id)
            .ok_or_else(|| anyhow!("Invalid Telegram message id: {}", message.message_id))?;

        let mut params = serde_json::json!({
            "chat_id": message.conversation_id,
            "message_id": message_id,
            "text": message.content,
        });

        if let Some(mode) = &message.parse_mode {
            params["parse_mode"] = serde_json::Value::String(mode.clone());
        }

        if let Some(keyboard) = &message.keyboard {
            params["reply_markup"] = Self::keyboard_markup(keyboard);
        }

        Ok(params)
    }

    /// POST a Bot API method and unwrap the `{ok, result, description}` envelope.
    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: &serde_json::Value,
    ) -> Result<T> {
        let response = self
            .client
            .post(self.api_url(method))
            .json(params)
            .timeout(std::time::Duration::from_secs(API_TIMEOUT_SECS))
            .send()
            .await?;

        if !response.status().is_success() {
            let error = response.text().await.unwrap_or_default();
            return Err(anyhow!("Telegram HTTP error on {}: {}", method, error));
        }

        let body: TelegramResponse<T> = response.json().await?;
        if body.ok {
            body.result
                .ok_or_else(|| anyhow!("Telegram returned ok but no result"))
        } else {
            Err(anyhow!(
                "Telegram API error on {}: {}",
                method,
                body.description.unwrap_or_default()
            ))
        }
    }

    /// Poll for updates using long-polling
    async fn poll_updates(&self) -> Result<Vec<TelegramUpdate>> {
        let offset = self.last_update_id.load(Ordering::SeqCst);
        let params = serde_json::json!({
            "offset": if offset > 0 { offset + 1 } else { 0 },
            "timeout": self.config.polling_timeout,
            "allowed_updates": ["message", "callback_query"],
        });

        let response = self
            .client
            .post(self.api_url("getUpdates"))
            .json(&params)
            .timeout(std::time::Duration::from_secs(
                self.config.polling_timeout as u64 + 10,
            ))
            .send()
            .await?;

        let body: TelegramResponse<Vec<TelegramUpdate>> = response.json().await?;

        if !body.ok {
            return Err(anyhow!(
                "Telegram API error: {:?}",
                body.description.unwrap_or_default()
            ));
        }

        let updates = body.result.unwrap_or_default();

        if let Some(last) = updates.last() {
            self.last_update_id.store(last.update_id, Ordering::SeqCst);
            if let Some(persister) = &self.offset_persister {
                persister(last.update_id);
            }
        }

        Ok(updates)
    }

    /// Convert Telegram update to InboundMessage
    fn convert_update(update: TelegramUpdate) -> Option<InboundMessage> {
        if let Some(query) = update.callback_query {
            // Callbacks from messages too old to be delivered carry no message.
            let message = query.message?;
            let data = query.data?;
            return Some(
                InboundMessage::callback(
                    query.id,
                    Self::format_message_id(message.message_id),
                    query.from.id.to_string(),
                    message.chat.id.to_string(),
                    data,
                )
                .with_chat_type(ChatType::parse(&message.chat.r#type)),
            );
        }

        let message = update.message?;
        let from = message.from?;
        let text = message.text?;

        let sender_name = from
            .username
            .clone()
            .or_else(|| {
                Some(format!(
                    "{}{}",
                    from.first_name.as_deref().unwrap_or(""),
                    from.last_name
                        .as_ref()
                        .map(|l| format!(" {}", l))
                        .unwrap_or_default()
                ))
            })
            .filter(|s| !s.is_empty());

        let mut inbound = InboundMessage::new(
            Self::format_message_id(message.message_id),
            from.id.to_string(),
            message.chat.id.to_string(),
            text,
        )
        .with_chat_type(ChatType::parse(&message.chat.r#type));

        if let Some(name) = sender_name {
            inbound = inbound.with_sender_name(name);
        }

        Some(inbound)
    }

    /// Test the connection by calling getMe
    pub async fn test_connection(&self) -> Result<TelegramUser> {
        let response = self
            .client
            .get(self.api_url("getMe"))
            .timeout(std::time::Duration::from_secs(API_TIMEOUT_SECS))
            .send()
            .await?;

        let body: TelegramResponse<TelegramUser> = response.json().await?;

        if body.ok {
            body.result
                .ok_or_else(|| anyhow!("Telegram returned ok but no result"))
        } else {
            Err(anyhow!(
                "Telegram API error: {}",
                body.description.unwrap_or_default()
            ))
        }
    }
}

#[async_trait]
impl Channel for TelegramChannel {
    fn name(&self) -> &str {
        "Telegram"
    }

    fn is_configured(&self) -> bool {
        !self.config.bot_token.is_empty()
    }

    async fn identity(&self) -> Result<BotIdentity> {
        let identity = self
            .identity
            .get_or_try_init(|| async {
                let user = self.test_connection().await?;
                let handle = user
                    .username
                    .ok_or_else(|| anyhow!("Telegram bot has no username"))?;
                Ok::<_, anyhow::Error>(BotIdentity {
                    id: user.id.to_string(),
                    handle,
                })
            })
            .await?;
        Ok(identity.clone())
    }

    async fn send(&self, message: OutboundMessage) -> Result<String> {
        let params = Self::send_params(&message);
        let sent: TelegramMessageResponse = self.call("sendMessage", &params).await?;
        Ok(Self::format_message_id(sent.message_id))
    }

    async fn edit(&self, message: EditMessage) -> Result<()> {
        let params = Self::edit_params(&message)?;
        // Result is the edited Message, or `true` for inline messages.
        let _: serde_json::Value = self.call("editMessageText", &params).await?;
        Ok(())
    }

    async fn delete(&self, conversation_id: &str, message_id: &str) -> Result<()> {
        let message_id = Self::parse_message_id(message_id)
            .ok_or_else(|| anyhow!("Invalid Telegram message id: {}", message_id))?;
        let params = serde_json::json!({
            "chat_id": conversation_id,
            "message_id": message_id,
        });
        let _: bool = self.call("deleteMessage", &params).await?;
        Ok(())
    }

    async fn answer_callback(&self, callback_id: &str) -> Result<()> {
        let params = serde_json::json!({ "callback_query_id": callback_id });
        let _: bool = self.call("answerCallbackQuery", &params).await?;
        Ok(())
    }

    fn start_receiving(&self) -> Option<InboundStream> {
        if !self.is_configured() {
            return None;
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let polling_active = self.polling_active.clone();
        let last_update_id = self.last_update_id.clone();
        let offset_persister = self.offset_persister.clone();
        let config = self.config.clone();
        let client = self.client.clone();

        polling_active.store(true, Ordering::SeqCst);

        tokio::spawn(async move {
            info!("Starting Telegram polling");

            let channel = TelegramChannel {
                config,
                client,
                identity: OnceCell::new(),
                polling_active: polling_active.clone(),
                last_update_id,
                offset_persister,
            };

            while polling_active.load(Ordering::SeqCst) {
                match channel.poll_updates().await {
                    Ok(updates) => {
                        for update in updates {
                            if let Some(message) = Self::convert_update(update) {
                                debug!(
                                    "Received Telegram update: {} from {}",
                                    message.id, message.sender_id
                                );
                                if tx.send(message).is_err() {
                                    warn!("Message receiver dropped, stopping polling");
                                    polling_active.store(false, Ordering::SeqCst);
                                    break;
                                }
                            }
                        }
                    }
                    Err(e) => {
                        error!("Telegram polling error: {}", e);
                        tokio::time::sleep(std::time::Duration::from_secs(
                            POLL_ERROR_BACKOFF_SECS,
                        ))
                        .await;
                    }
                }
            }

            info!("Telegram polling stopped");
        });

        Some(Box::pin(
            tokio_stream::wrappers::UnboundedReceiverStream::new(rx),
        ))
    }
}

// ============================================================================
// Telegram API Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct TelegramResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TelegramUpdate {
    update_id: i64,
    message: Option<TelegramMessage>,
    callback_query: Option<TelegramCallbackQuery>,
}

#[derive(Debug, Deserialize)]
struct TelegramCallbackQuery {
    id: String,
    from: TelegramUser,
    message: Option<TelegramMessage>,
    data: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TelegramMessage {
    message_id: i64,
    from: Option<TelegramUser>,
    chat: TelegramChat,
    text: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TelegramUser {
    pub id: i64,
    pub is_bot: bool,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TelegramChat {
    id: i64,
    r#type: String,
}

#[derive(Debug, Deserialize)]
struct TelegramMessageResponse {
    message_id: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicI64;

    fn user(id: i64, username: Option<&str>) -> TelegramUser {
        TelegramUser {
            id,
            is_bot: false,
            first_name: Some("John".to_string()),
            last_name: Some("Doe".to_string()),
            username: username.map(str::to_string),
        }
    }

    fn text_update(chat_type: &str, chat_id: i64, text: Option<&str>) -> TelegramUpdate {
        TelegramUpdate {
            update_id: 12345,
            message: Some(TelegramMessage {
                message_id: 100,
                from: Some(user(42, Some("johndoe"))),
                chat: TelegramChat {
                    id: chat_id,
                    r#type: chat_type.to_string(),
                },
                text: text.map(str::to_string),
            }),
            callback_query: None,
        }
    }

    #[test]
    fn test_telegram_channel_is_configured() {
        assert!(TelegramChannel::with_token("test-token").is_configured());
        assert!(!TelegramChannel::with_token("").is_configured());
    }

    #[test]
    fn test_config_builder() {
        let config = TelegramConfig::new("t").with_polling_timeout(60);
        assert_eq!(config.polling_timeout, 60);
    }

    #[test]
    fn test_restore_last_update_id_and_persister() {
        let observed = Arc::new(AtomicI64::new(0));
        let observer = observed.clone();
        let persister: Arc<dyn Fn(i64) + Send + Sync> =
            Arc::new(move |value| observer.store(value, Ordering::SeqCst));

        let channel = TelegramChannel::with_token("test")
            .with_offset_persister(persister)
            .with_last_update_id(88);

        assert_eq!(channel.last_update_id(), 88);
        if let Some(callback) = &channel.offset_persister {
            callback(321);
        }
        assert_eq!(observed.load(Ordering::SeqCst), 321);
    }

    #[test]
    fn test_api_url() {
        let channel = TelegramChannel::with_token("123:ABC");
        assert_eq!(
            channel.api_url("sendMessage"),
            "https://api.telegram.org/bot123:ABC/sendMessage"
        );
    }

    #[test]
    fn test_parse_message_id() {
        assert_eq!(TelegramChannel::parse_message_id("tg_77"), Some(77));
        assert_eq!(TelegramChannel::parse_message_id("77"), Some(77));
        assert_eq!(TelegramChannel::parse_message_id("tg_x"), None);
    }

    #[test]
    fn test_send_params_with_keyboard_and_reply() {
        let message = OutboundMessage::new("999", "hello")
            .with_reply_to("tg_5")
            .with_keyboard(
                InlineKeyboard::new()
                    .row(vec![InlineButton::url("Site", "https://example.com")])
                    .row(vec![InlineButton::callback("x", "noop")]),
            )
            .silent();

        let params = TelegramChannel::send_params(&message);
        assert_eq!(params["chat_id"], "999");
        assert_eq!(params["reply_to_message_id"], 5);
        assert_eq!(params["disable_notification"], true);
        assert_eq!(params["parse_mode"], "Markdown");
        let rows = &params["reply_markup"]["inline_keyboard"];
        assert_eq!(rows[0][0]["url"], "https://example.com");
        assert_eq!(rows[1][0]["callback_data"], "noop");
    }

    #[test]
    fn test_edit_params_requires_numeric_id() {
        let ok = TelegramChannel::edit_params(&EditMessage::new("1", "tg_9", "x")).unwrap();
        assert_eq!(ok["message_id"], 9);
        assert!(TelegramChannel::edit_params(&EditMessage::new("1", "tg_bad", "x")).is_err());
    }

    #[test]
    fn test_convert_text_update() {
        let inbound =
            TelegramChannel::convert_update(text_update("private", 42, Some("Hello"))).unwrap();
        assert_eq!(inbound.id, "tg_100");
        assert_eq!(inbound.sender_id, "42");
        assert_eq!(inbound.conversation_id, "42");
        assert_eq!(inbound.content, "Hello");
        assert_eq!(inbound.sender_name.as_deref(), Some("johndoe"));
        assert!(inbound.is_private_with_sender());
        assert!(inbound.callback_id().is_none());
    }

    #[test]
    fn test_convert_group_update() {
        let inbound =
            TelegramChannel::convert_update(text_update("supergroup", -100, Some("/add_index")))
                .unwrap();
        assert_eq!(inbound.chat_type, ChatType::Supergroup);
        assert!(!inbound.is_private_with_sender());
    }

    #[test]
    fn test_convert_update_without_text_is_skipped() {
        assert!(TelegramChannel::convert_update(text_update("private", 42, None)).is_none());
    }

    #[test]
    fn test_convert_callback_update() {
        let update = TelegramUpdate {
            update_id: 1,
            message: None,
            callback_query: Some(TelegramCallbackQuery {
                id: "cb-9".to_string(),
                from: user(42, None),
                message: Some(TelegramMessage {
                    message_id: 55,
                    from: None,
                    chat: TelegramChat {
                        id: -100,
                        r#type: "group".to_string(),
                    },
                    text: Some("results".to_string()),
                }),
                data: Some("?rust page 1".to_string()),
            }),
        };

        let inbound = TelegramChannel::convert_update(update).unwrap();
        assert_eq!(inbound.callback_id(), Some("cb-9"));
        assert_eq!(inbound.id, "tg_55");
        assert_eq!(inbound.conversation_id, "-100");
        assert_eq!(inbound.content, "?rust page 1");
    }

    #[test]
    fn test_deserialize_update_json() {
        let raw = r#"{
            "update_id": 7,
            "message": {
                "message_id": 3,
                "from": {"id": 42, "is_bot": false, "first_name": "Ada"},
                "chat": {"id": 42, "type": "private"},
                "date": 1700000000,
                "text": "?rust"
            }
        }"#;
        let update: TelegramUpdate = serde_json::from_str(raw).unwrap();
        let inbound = TelegramChannel::convert_update(update).unwrap();
        assert_eq!(inbound.content, "?rust");
        assert_eq!(inbound.sender_name.as_deref(), Some("Ada"));
    }
}
