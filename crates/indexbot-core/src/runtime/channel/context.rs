//! Shared state for handling inbound events.

use std::sync::Arc;
use tracing::warn;

use crate::channel::{BotIdentity, Channel, EditMessage, OutboundMessage};
use crate::config::BotConfig;
use crate::storage::IndexStore;

use super::banned::BannedWordFilter;
use super::interaction_store::InteractionStore;
use super::router::MessageRouter;

/// Everything a handler needs, built once when the runtime starts.
pub struct BotContext {
    pub channel: Arc<dyn Channel>,
    pub store: Arc<dyn IndexStore>,
    pub config: BotConfig,
    pub identity: BotIdentity,
    pub interactions: InteractionStore,
    pub banned: BannedWordFilter,
    pub(crate) router: MessageRouter,
}

impl BotContext {
    pub fn new(
        channel: Arc<dyn Channel>,
        store: Arc<dyn IndexStore>,
        config: BotConfig,
        identity: BotIdentity,
    ) -> Self {
        let router = MessageRouter::new(&identity.handle);
        Self {
            channel,
            store,
            config,
            identity,
            interactions: InteractionStore::new(),
            banned: BannedWordFilter::new(),
            router,
        }
    }

    pub fn now(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }

    // Gateway calls below are best-effort: failures are logged, not returned.

    pub(crate) async fn send(&self, message: OutboundMessage) -> Option<String> {
        let conversation_id = message.conversation_id.clone();
        match self.channel.send(message).await {
            Ok(id) => Some(id),
            Err(e) => {
                warn!("Failed to send message to {}: {}", conversation_id, e);
                None
            }
        }
    }

    pub(crate) async fn edit(&self, message: EditMessage) {
        let target = format!("{}/{}", message.conversation_id, message.message_id);
        if let Err(e) = self.channel.edit(message).await {
            warn!("Failed to edit message {}: {}", target, e);
        }
    }

    pub(crate) async fn delete(&self, conversation_id: &str, message_id: &str) {
        if let Err(e) = self.channel.delete(conversation_id, message_id).await {
            warn!(
                "Failed to delete message {}/{}: {}",
                conversation_id, message_id, e
            );
        }
    }

    pub(crate) async fn answer_callback(&self, callback_id: &str) {
        if let Err(e) = self.channel.answer_callback(callback_id).await {
            warn!("Failed to answer callback {}: {}", callback_id, e);
        }
    }
}
