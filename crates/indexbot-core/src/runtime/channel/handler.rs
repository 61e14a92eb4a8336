//! Channel Message Handler
//!
//! Pulls inbound events off the channel stream and dispatches each one on its
//! own task. Text goes through the banned word filter first and is then
//! routed to a command, a search or the sender's pending dialog; button
//! presses are acknowledged and, when they carry a search payload, turn into
//! an edit of the message they belong to.

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::channel::{Channel, InboundKind, InboundMessage};
use crate::config::BotConfig;
use crate::storage::IndexStore;

use super::commands::{NOOP_CALLBACK, handle_command};
use super::context::BotContext;
use super::router::RouteDecision;
use super::search::{self, SearchRequest};
use super::wizard;

#[cfg(test)]
const STREAM_RECONNECT_DELAY: Duration = Duration::from_millis(20);
#[cfg(not(test))]
const STREAM_RECONNECT_DELAY: Duration = Duration::from_secs(2);

/// Handle one inbound event to completion.
pub async fn handle_message(ctx: &BotContext, message: &InboundMessage) {
    debug!(
        "Received {:?} from {} in {}",
        message.kind, message.sender_id, message.conversation_id
    );

    match &message.kind {
        InboundKind::Text => handle_text(ctx, message).await,
        InboundKind::Callback { callback_id } => handle_callback(ctx, callback_id, message).await,
    }
}

async fn handle_text(ctx: &BotContext, message: &InboundMessage) {
    if ctx.banned.is_banned(&message.content) {
        info!(
            "Deleting banned message {} in {}",
            message.id, message.conversation_id
        );
        ctx.delete(&message.conversation_id, &message.id).await;
    }

    match ctx.router.route(&message.content) {
        RouteDecision::Command(command) => handle_command(ctx, message, command).await,
        RouteDecision::Search(request) => {
            search::reply_with_results(ctx, message, &request).await
        }
        RouteDecision::Continue => wizard::continue_interaction(ctx, message).await,
        RouteDecision::Ignore => debug!("Ignoring empty message {}", message.id),
    }
}

async fn handle_callback(ctx: &BotContext, callback_id: &str, message: &InboundMessage) {
    ctx.answer_callback(callback_id).await;

    if message.content == NOOP_CALLBACK {
        return;
    }

    match SearchRequest::parse(&message.content) {
        Some(request) => {
            search::edit_with_results(ctx, &message.conversation_id, &message.id, &request).await
        }
        None => debug!("Ignoring callback data {:?}", message.content),
    }
}

/// Running bot: one receive loop plus a task per inbound event.
pub struct BotRuntime {
    context: Arc<BotContext>,
    shutdown: CancellationToken,
    receive_loop: Mutex<Option<JoinHandle<()>>>,
}

impl BotRuntime {
    /// Resolve the bot identity, load the banned word cache and start
    /// listening on `channel`.
    pub async fn start(
        channel: Arc<dyn Channel>,
        store: Arc<dyn IndexStore>,
        config: BotConfig,
    ) -> Result<Self> {
        let identity = channel.identity().await?;
        info!("Starting bot runtime as @{} on {}", identity.handle, channel.name());

        let context = Arc::new(BotContext::new(channel, store, config, identity));
        let banned = context.banned.refresh(context.store.as_ref()).await?;
        debug!("Loaded {} banned word(s)", banned);

        let shutdown = CancellationToken::new();
        let receive_loop = tokio::spawn(receive_loop(context.clone(), shutdown.clone()));

        Ok(Self {
            context,
            shutdown,
            receive_loop: Mutex::new(Some(receive_loop)),
        })
    }

    pub fn context(&self) -> Arc<BotContext> {
        self.context.clone()
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Stop receiving and wait for the loop to exit. In-flight events are
    /// left to finish on their own tasks.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        if let Some(handle) = self.receive_loop.lock().await.take()
            && let Err(e) = handle.await
        {
            warn!("Receive loop ended abnormally: {}", e);
        }
        info!("Bot runtime stopped");
    }
}

async fn receive_loop(ctx: Arc<BotContext>, shutdown: CancellationToken) {
    let channel_name = ctx.channel.name().to_string();
    info!("Listening for messages on {}", channel_name);

    loop {
        let Some(mut stream) = ctx.channel.start_receiving() else {
            warn!(
                "Failed to start message stream for {}, retrying in {:?}",
                channel_name, STREAM_RECONNECT_DELAY
            );
            if wait_for_reconnect(&shutdown).await {
                return;
            }
            continue;
        };

        loop {
            let message = tokio::select! {
                _ = shutdown.cancelled() => return,
                next = stream.next() => match next {
                    Some(message) => message,
                    None => {
                        warn!(
                            "Message stream ended for {}, restarting in {:?}",
                            channel_name, STREAM_RECONNECT_DELAY
                        );
                        break;
                    }
                },
            };

            let ctx = ctx.clone();
            tokio::spawn(async move {
                handle_message(&ctx, &message).await;
            });
        }

        if wait_for_reconnect(&shutdown).await {
            return;
        }
    }
}

/// Sleep before reconnecting; true when shutdown came first.
async fn wait_for_reconnect(shutdown: &CancellationToken) -> bool {
    tokio::select! {
        _ = shutdown.cancelled() => true,
        _ = sleep(STREAM_RECONNECT_DELAY) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::mock::MockChannel;
    use crate::channel::{ChatType, InlineButton};
    use crate::models::{IndexEntry, NewIndexEntry, PendingInteraction};
    use crate::runtime::channel::search::navigation_payload;
    use crate::storage::Storage;
    use async_trait::async_trait;
    use std::collections::BTreeSet;
    use tokio::time::timeout;

    const USER: &str = "42";

    struct Harness {
        channel: Arc<MockChannel>,
        storage: Arc<Storage>,
        ctx: BotContext,
    }

    async fn harness_with(config: BotConfig) -> Harness {
        let channel = Arc::new(MockChannel::new());
        let storage = Arc::new(Storage::in_memory().unwrap());
        let identity = channel.identity().await.unwrap();
        let ctx = BotContext::new(channel.clone(), storage.clone(), config, identity);
        Harness {
            channel,
            storage,
            ctx,
        }
    }

    async fn harness() -> Harness {
        harness_with(BotConfig::default()).await
    }

    fn private(id: &str, text: &str) -> InboundMessage {
        InboundMessage::new(id, USER, USER, text)
    }

    impl Harness {
        async fn say(&self, text: &str) {
            handle_message(&self.ctx, &private("tg_100", text)).await;
        }

        async fn last_sent(&self) -> String {
            self.channel
                .get_sent_messages()
                .await
                .last()
                .map(|m| m.content.clone())
                .unwrap_or_default()
        }

        async fn add_entry(&self, url: &str, title: &str, keywords: &str) {
            self.storage
                .upsert_entry(NewIndexEntry {
                    url: url.to_string(),
                    title: title.to_string(),
                    keywords: keywords.to_string(),
                    creator_id: USER.to_string(),
                })
                .await
                .unwrap();
        }
    }

    /// Store whose writes always fail.
    struct FailingStore;

    #[async_trait]
    impl IndexStore for FailingStore {
        async fn upsert_entry(&self, _entry: NewIndexEntry) -> Result<IndexEntry> {
            anyhow::bail!("disk full")
        }

        async fn query(&self, _: &str, _: usize, _: usize) -> Result<Vec<IndexEntry>> {
            Ok(Vec::new())
        }

        async fn list_banned_words(&self) -> Result<BTreeSet<String>> {
            Ok(BTreeSet::new())
        }

        async fn add_banned_words(&self, _: &BTreeSet<String>) -> Result<usize> {
            anyhow::bail!("disk full")
        }

        async fn delete_banned_words(&self, _: &BTreeSet<String>) -> Result<usize> {
            anyhow::bail!("disk full")
        }
    }

    #[tokio::test]
    async fn test_full_add_index_flow() {
        let h = harness().await;

        h.say("/add_index").await;
        assert!(h.last_sent().await.contains("https://"));

        h.say("https://rust-lang.org").await;
        assert!(h.last_sent().await.contains("title"));

        h.say("Rust").await;
        assert!(h.last_sent().await.contains("keywords"));

        h.say("rust lang aa bb cc dd ee").await;
        assert!(h.last_sent().await.contains("saved"));

        let found = h.storage.query("rust", 0, 10).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].url, "rust-lang.org");
        assert_eq!(found[0].title, "Rust");
        assert_eq!(found[0].keywords, "rust lang aa bb cc");
        assert_eq!(found[0].creator_id, USER);

        assert!(h.storage.query("dd", 0, 10).await.unwrap().is_empty());
        assert!(h.ctx.interactions.get(USER).await.is_none());
        assert_eq!(h.ctx.interactions.slot_count(), 0);
    }

    #[tokio::test]
    async fn test_short_keyword_is_not_persisted() {
        let h = harness().await;
        h.say("/add_index").await;
        h.say("https://x.com/a").await;
        h.say("Title").await;

        h.say("ab c").await;
        assert!(h.last_sent().await.contains("\"c\""));
        assert!(h.storage.query("ab", 0, 10).await.unwrap().is_empty());

        let pending = h.ctx.interactions.get(USER).await.unwrap();
        assert_eq!(pending.step, 2);
    }

    #[tokio::test]
    async fn test_expired_interaction_is_dropped_silently() {
        let h = harness().await;
        h.ctx
            .interactions
            .put(PendingInteraction::add_index(USER, 0, 1))
            .await;

        h.say("https://x.com/a").await;

        assert!(h.channel.get_sent_messages().await.is_empty());
        assert!(h.ctx.interactions.get(USER).await.is_none());
        assert_eq!(h.ctx.interactions.slot_count(), 0);
    }

    #[tokio::test]
    async fn test_text_without_interaction_is_ignored() {
        let h = harness().await;
        h.say("hello there").await;
        assert!(h.channel.get_sent_messages().await.is_empty());
        assert_eq!(h.ctx.interactions.slot_count(), 0);
    }

    #[tokio::test]
    async fn test_cancel_confirms_without_pending() {
        let h = harness().await;
        h.say("/cancel").await;
        assert_eq!(h.last_sent().await, "Cancelled.");

        h.say("/add_index").await;
        h.say("/cancel").await;
        assert!(h.ctx.interactions.get(USER).await.is_none());
        h.say("https://x.com/a").await;
        assert_eq!(h.last_sent().await, "Cancelled.");
    }

    #[tokio::test]
    async fn test_add_index_in_group_points_to_private_chat() {
        let h = harness().await;
        let message =
            InboundMessage::new("tg_5", USER, "-100", "/add_index@index_bot").with_chat_type(ChatType::Supergroup);
        handle_message(&h.ctx, &message).await;

        let sent = h.channel.get_sent_messages().await;
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].conversation_id, "-100");
        let keyboard = sent[0].keyboard.as_ref().unwrap();
        assert_eq!(
            keyboard.rows[0][0],
            InlineButton::url("@index_bot", "https://t.me/index_bot")
        );
        assert_eq!(sent[1].conversation_id, USER);
        assert!(h.ctx.interactions.get(USER).await.is_some());
    }

    #[tokio::test]
    async fn test_group_text_does_not_feed_interaction() {
        let h = harness().await;
        h.say("/add_index").await;
        h.channel.clear().await;

        let message = InboundMessage::new("tg_6", USER, "-100", "https://x.com/a")
            .with_chat_type(ChatType::Group);
        handle_message(&h.ctx, &message).await;

        assert!(h.channel.get_sent_messages().await.is_empty());
        assert_eq!(h.ctx.interactions.get(USER).await.unwrap().step, 0);
    }

    #[tokio::test]
    async fn test_persistence_failure_keeps_interaction() {
        let channel = Arc::new(MockChannel::new());
        let identity = channel.identity().await.unwrap();
        let ctx = BotContext::new(
            channel.clone(),
            Arc::new(FailingStore),
            BotConfig::default(),
            identity,
        );

        for text in ["/add_index", "https://x.com/a", "Title", "ab cd"] {
            handle_message(&ctx, &private("tg_1", text)).await;
        }

        let sent = channel.get_sent_messages().await;
        assert!(sent.last().unwrap().content.contains("could not be saved"));
        assert_eq!(ctx.interactions.get(USER).await.unwrap().step, 2);
    }

    #[tokio::test]
    async fn test_banned_message_is_deleted_and_still_routed() {
        let h = harness().await;
        h.add_entry("x.com/a", "Alpha", "rust").await;
        h.storage
            .add_banned_words(&["?rust".to_string()].into_iter().collect())
            .await
            .unwrap();
        h.ctx.banned.refresh(h.storage.as_ref()).await.unwrap();

        let message =
            InboundMessage::new("tg_9", USER, "-100", "?rust").with_chat_type(ChatType::Group);
        handle_message(&h.ctx, &message).await;

        assert_eq!(
            h.channel.get_deleted_messages().await,
            vec![("-100".to_string(), "tg_9".to_string())]
        );
        assert!(h.last_sent().await.contains("Alpha"));
    }

    #[tokio::test]
    async fn test_search_then_navigate() {
        let h = harness().await;
        for i in 0..12 {
            h.add_entry(&format!("x.com/{}", i), &format!("Entry {}", i), "rust")
                .await;
        }

        h.say("？rust").await;
        let sent = h.channel.get_sent_messages().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].reply_to.as_deref(), Some("tg_100"));
        assert_eq!(sent[0].content.lines().count(), 10);
        assert!(sent[0].content.starts_with("1. ["));
        assert!(sent[0].keyboard.is_some());

        let press = InboundMessage::callback(
            "cb_1",
            "tg_1",
            USER,
            USER,
            navigation_payload("rust", 1),
        );
        handle_message(&h.ctx, &press).await;

        assert_eq!(h.channel.get_answered_callbacks().await, vec!["cb_1"]);
        let edited = h.channel.get_edited_messages().await;
        assert_eq!(edited.len(), 1);
        assert_eq!(edited[0].message_id, "tg_1");
        assert_eq!(edited[0].content.lines().count(), 2);
        assert!(edited[0].content.starts_with("11. ["));
    }

    #[tokio::test]
    async fn test_search_without_matches() {
        let h = harness().await;
        h.say("?nothing").await;
        assert_eq!(h.last_sent().await, "No matching entries.");
    }

    #[tokio::test]
    async fn test_search_far_past_last_page() {
        let h = harness().await;
        h.add_entry("x.com/a", "Alpha", "rust").await;

        h.say("?rust page 1000000000").await;
        assert_eq!(h.last_sent().await, "No matching entries.");

        h.say(&format!("?rust page {}", i64::MAX)).await;
        assert_eq!(h.last_sent().await, "No matching entries.");
    }

    #[tokio::test]
    async fn test_help_and_noop_button() {
        let h = harness().await;
        h.say("/start").await;

        let sent = h.channel.get_sent_messages().await;
        assert!(sent[0].silent);
        let keyboard = sent[0].keyboard.as_ref().unwrap();
        assert_eq!(keyboard.rows.len(), 2);
        assert_eq!(keyboard.rows[1], vec![InlineButton::callback("x", "noop")]);

        let press = InboundMessage::callback("cb_2", "tg_1", USER, USER, "noop");
        handle_message(&h.ctx, &press).await;
        assert_eq!(h.channel.get_answered_callbacks().await, vec!["cb_2"]);
        assert!(h.channel.get_edited_messages().await.is_empty());
    }

    #[tokio::test]
    async fn test_banned_word_admin_commands() {
        let config = BotConfig {
            admin_ids: vec![USER.to_string()],
            ..BotConfig::default()
        };
        let h = harness_with(config).await;

        let outsider = InboundMessage::new("tg_2", "7", "7", "/ban_words spam");
        handle_message(&h.ctx, &outsider).await;
        assert!(h.channel.get_sent_messages().await.is_empty());

        h.say("/ban_words spam casino").await;
        assert_eq!(h.last_sent().await, "Added 2 banned word(s).");
        assert!(h.ctx.banned.is_banned("casino"));

        h.say("/unban_words casino nope").await;
        assert_eq!(h.last_sent().await, "Removed 1 banned word(s).");
        assert!(!h.ctx.banned.is_banned("casino"));

        h.say("/banned_words").await;
        assert_eq!(h.last_sent().await, "Banned words:\nspam");

        h.say("/ban_words").await;
        assert!(h.last_sent().await.starts_with("Usage:"));
    }

    #[tokio::test]
    async fn test_runtime_processes_stream_until_shutdown() {
        let channel = Arc::new(MockChannel::new());
        let tx = channel.enable_receiving();
        let storage = Arc::new(Storage::in_memory().unwrap());

        let runtime = BotRuntime::start(channel.clone(), storage, BotConfig::default())
            .await
            .unwrap();
        assert_eq!(runtime.context().identity.handle, "index_bot");

        tx.send(private("tg_1", "/help")).unwrap();

        timeout(Duration::from_secs(2), async {
            while channel.get_sent_messages().await.is_empty() {
                sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("help reply should be sent");

        runtime.shutdown().await;
        assert!(runtime.shutdown_token().is_cancelled());
    }
}
