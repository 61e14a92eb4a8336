//! Channel Trait Definitions

use anyhow::Result;
use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

use super::types::{BotIdentity, EditMessage, InboundMessage, OutboundMessage};

pub type InboundStream = Pin<Box<dyn Stream<Item = InboundMessage> + Send>>;

/// Messaging gateway the bot talks through.
///
/// Every call is best-effort from the bot's point of view: failures are
/// logged by the caller and never retried.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Channel display name
    fn name(&self) -> &str;

    /// Check if channel is properly configured
    fn is_configured(&self) -> bool;

    /// Who the bot is on this channel.
    async fn identity(&self) -> Result<BotIdentity>;

    /// Send a message, returns the id of the sent message.
    async fn send(&self, message: OutboundMessage) -> Result<String>;

    /// Replace the text (and keyboard) of a message the bot sent earlier.
    async fn edit(&self, message: EditMessage) -> Result<()>;

    async fn delete(&self, conversation_id: &str, message_id: &str) -> Result<()>;

    /// Acknowledge a button press so the client stops its spinner.
    async fn answer_callback(&self, callback_id: &str) -> Result<()>;

    /// Start receiving messages (returns None if channel doesn't support receiving)
    ///
    /// Messages are yielded as they arrive from the channel.
    fn start_receiving(&self) -> Option<InboundStream>;
}

/// Test/mock channel for unit testing
#[cfg(any(test, feature = "test-utils"))]
pub mod mock {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
    use tokio::sync::Mutex;
    use tokio::sync::mpsc;

    /// Records every gateway call instead of talking to a network.
    pub struct MockChannel {
        identity: BotIdentity,
        fail_sends: AtomicBool,
        next_message_id: AtomicU64,
        sent_messages: Arc<Mutex<Vec<OutboundMessage>>>,
        edited_messages: Arc<Mutex<Vec<EditMessage>>>,
        deleted_messages: Arc<Mutex<Vec<(String, String)>>>,
        answered_callbacks: Arc<Mutex<Vec<String>>>,
        inbound_rx: parking_lot::Mutex<Option<mpsc::UnboundedReceiver<InboundMessage>>>,
    }

    impl MockChannel {
        pub fn new() -> Self {
            Self {
                identity: BotIdentity {
                    id: "1000".to_string(),
                    handle: "index_bot".to_string(),
                },
                fail_sends: AtomicBool::new(false),
                next_message_id: AtomicU64::new(1),
                sent_messages: Arc::new(Mutex::new(Vec::new())),
                edited_messages: Arc::new(Mutex::new(Vec::new())),
                deleted_messages: Arc::new(Mutex::new(Vec::new())),
                answered_callbacks: Arc::new(Mutex::new(Vec::new())),
                inbound_rx: parking_lot::Mutex::new(None),
            }
        }

        /// Make every `send` fail, to exercise best-effort paths.
        pub fn failing_sends(self) -> Self {
            self.fail_sends.store(true, Ordering::SeqCst);
            self
        }

        /// Enable receiving and return a sender to inject messages
        pub fn enable_receiving(&self) -> mpsc::UnboundedSender<InboundMessage> {
            let (tx, rx) = mpsc::unbounded_channel();
            *self.inbound_rx.lock() = Some(rx);
            tx
        }

        pub async fn get_sent_messages(&self) -> Vec<OutboundMessage> {
            self.sent_messages.lock().await.clone()
        }

        pub async fn get_edited_messages(&self) -> Vec<EditMessage> {
            self.edited_messages.lock().await.clone()
        }

        pub async fn get_deleted_messages(&self) -> Vec<(String, String)> {
            self.deleted_messages.lock().await.clone()
        }

        pub async fn get_answered_callbacks(&self) -> Vec<String> {
            self.answered_callbacks.lock().await.clone()
        }

        pub async fn clear(&self) {
            self.sent_messages.lock().await.clear();
            self.edited_messages.lock().await.clear();
            self.deleted_messages.lock().await.clear();
            self.answered_callbacks.lock().await.clear();
        }
    }

    impl Default for MockChannel {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl Channel for MockChannel {
        fn name(&self) -> &str {
            "Mock"
        }

        fn is_configured(&self) -> bool {
            true
        }

        async fn identity(&self) -> Result<BotIdentity> {
            Ok(self.identity.clone())
        }

        async fn send(&self, message: OutboundMessage) -> Result<String> {
            if self.fail_sends.load(Ordering::SeqCst) {
                anyhow::bail!("mock send failure");
            }
            self.sent_messages.lock().await.push(message);
            let id = self.next_message_id.fetch_add(1, Ordering::SeqCst);
            Ok(format!("tg_{}", id))
        }

        async fn edit(&self, message: EditMessage) -> Result<()> {
            self.edited_messages.lock().await.push(message);
            Ok(())
        }

        async fn delete(&self, conversation_id: &str, message_id: &str) -> Result<()> {
            self.deleted_messages
                .lock()
                .await
                .push((conversation_id.to_string(), message_id.to_string()));
            Ok(())
        }

        async fn answer_callback(&self, callback_id: &str) -> Result<()> {
            self.answered_callbacks
                .lock()
                .await
                .push(callback_id.to_string());
            Ok(())
        }

        fn start_receiving(&self) -> Option<InboundStream> {
            let rx = self.inbound_rx.lock().take()?;
            Some(Box::pin(
                tokio_stream::wrappers::UnboundedReceiverStream::new(rx),
            ))
        }
    }
}
