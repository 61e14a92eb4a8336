pub mod channel;

pub use channel::{
    BannedWordFilter, BotCommand, BotContext, BotRuntime, InteractionStore, MessageRouter,
    RouteDecision, SearchRequest, handle_message,
};
