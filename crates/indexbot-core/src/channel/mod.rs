//! Messaging Channel Layer
//!
//! The bot only talks to users through the [`Channel`] trait. Telegram is the
//! shipped implementation; tests use [`mock::MockChannel`].
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │              BotRuntime                 │
//! │  - routes each inbound event            │
//! └─────────────────────────────────────────┘
//!              │
//!              ▼
//! ┌─────────────────────────────────────────┐
//! │         trait Channel                   │
//! │  - send / edit / delete                 │
//! │  - answer_callback                      │
//! │  - start_receiving() -> Stream          │
//! └─────────────────────────────────────────┘
//!              │
//!              ▼
//!          Telegram
//! ```

pub mod telegram;
mod traits;
mod types;

pub use telegram::{TelegramChannel, TelegramConfig};
pub use traits::{Channel, InboundStream};
pub use types::{
    BotIdentity, ChatType, EditMessage, InboundKind, InboundMessage, InlineButton,
    InlineKeyboard, OutboundMessage,
};

#[cfg(any(test, feature = "test-utils"))]
pub use traits::mock;
