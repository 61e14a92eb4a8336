//! Bot command handlers (/help, /add_index, /cancel and banned word admin).

use std::collections::BTreeSet;
use tracing::{debug, error, info};

use crate::channel::{InboundMessage, InlineButton, InlineKeyboard, OutboundMessage};

use super::context::BotContext;
use super::router::BotCommand;
use super::wizard;

/// Callback data of the inert help button.
pub const NOOP_CALLBACK: &str = "noop";

const HELP_TEXT: &str = r#"*Try these commands:*
/help - Show this help
/add\_index - Submit a link to the index
/cancel - Abort the current submission

Search by sending `?keyword`, add `page N` to jump to a page."#;

pub async fn handle_command(ctx: &BotContext, message: &InboundMessage, command: BotCommand) {
    debug!("Handling command {:?} from {}", command, message.sender_id);

    if command.is_admin_only() && !ctx.config.is_admin(&message.sender_id) {
        debug!("Ignoring admin command from {}", message.sender_id);
        return;
    }

    match command {
        BotCommand::Help => cmd_help(ctx, message).await,
        BotCommand::AddIndex => wizard::start(ctx, message).await,
        BotCommand::Cancel => wizard::cancel(ctx, message).await,
        BotCommand::BanWords(words) => cmd_ban_words(ctx, message, words).await,
        BotCommand::UnbanWords(words) => cmd_unban_words(ctx, message, words).await,
        BotCommand::ListBannedWords => cmd_list_banned_words(ctx, message).await,
    }
}

pub fn help_keyboard(ctx: &BotContext) -> InlineKeyboard {
    let links = ctx
        .config
        .help
        .links
        .iter()
        .map(|link| InlineButton::url(&link.label, &link.url))
        .collect();
    InlineKeyboard::new()
        .row(links)
        .row(vec![InlineButton::callback("x", NOOP_CALLBACK)])
}

async fn cmd_help(ctx: &BotContext, message: &InboundMessage) {
    let response = OutboundMessage::new(&message.conversation_id, HELP_TEXT)
        .with_reply_to(&message.id)
        .with_keyboard(help_keyboard(ctx))
        .silent();
    ctx.send(response).await;
}

fn reply(message: &InboundMessage, text: impl Into<String>) -> OutboundMessage {
    OutboundMessage::new(&message.conversation_id, text)
        .plain()
        .with_reply_to(&message.id)
}

async fn refresh_banned(ctx: &BotContext) {
    match ctx.banned.refresh(ctx.store.as_ref()).await {
        Ok(count) => debug!("Banned word cache reloaded ({} words)", count),
        Err(e) => error!("Failed to reload banned words: {}", e),
    }
}

async fn cmd_ban_words(ctx: &BotContext, message: &InboundMessage, words: Vec<String>) {
    if words.is_empty() {
        ctx.send(reply(message, "Usage: /ban_words word1 word2 ..."))
            .await;
        return;
    }

    let words: BTreeSet<String> = words.into_iter().collect();
    let text = match ctx.store.add_banned_words(&words).await {
        Ok(added) => {
            info!("{} banned {} new word(s)", message.sender_id, added);
            refresh_banned(ctx).await;
            format!("Added {} banned word(s).", added)
        }
        Err(e) => {
            error!("Failed to add banned words: {}", e);
            "Could not update banned words.".to_string()
        }
    };
    ctx.send(reply(message, text)).await;
}

async fn cmd_unban_words(ctx: &BotContext, message: &InboundMessage, words: Vec<String>) {
    if words.is_empty() {
        ctx.send(reply(message, "Usage: /unban_words word1 word2 ..."))
            .await;
        return;
    }

    let words: BTreeSet<String> = words.into_iter().collect();
    let text = match ctx.store.delete_banned_words(&words).await {
        Ok(removed) => {
            info!("{} unbanned {} word(s)", message.sender_id, removed);
            refresh_banned(ctx).await;
            format!("Removed {} banned word(s).", removed)
        }
        Err(e) => {
            error!("Failed to remove banned words: {}", e);
            "Could not update banned words.".to_string()
        }
    };
    ctx.send(reply(message, text)).await;
}

async fn cmd_list_banned_words(ctx: &BotContext, message: &InboundMessage) {
    let words = ctx.banned.snapshot();
    let text = if words.is_empty() {
        "No banned words.".to_string()
    } else {
        let list = words.into_iter().collect::<Vec<_>>().join("\n");
        format!("Banned words:\n{}", list)
    };
    ctx.send(reply(message, text)).await;
}
