//! Channel runtime: everything between an inbound event and the replies it
//! produces.

mod banned;
mod commands;
mod context;
mod handler;
mod interaction_store;
mod router;
pub mod search;
pub mod wizard;

pub use banned::BannedWordFilter;
pub use commands::{NOOP_CALLBACK, handle_command, help_keyboard};
pub use context::BotContext;
pub use handler::{BotRuntime, handle_message};
pub use interaction_store::{InteractionGuard, InteractionStore, Pending};
pub use router::{BotCommand, MessageRouter, RouteDecision};
pub use search::{PAGE_SIZE, RenderedPage, SearchRequest};
