use anyhow::Result;
use indexbot_core::AppCore;
use indexbot_core::channel::{TelegramChannel, TelegramConfig};
use indexbot_core::config::BotConfig;
use std::sync::Arc;
use tracing::warn;

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Command line (or environment) token first, then the config file.
pub fn resolve_token(cli_token: Option<&str>, config: &BotConfig) -> Option<String> {
    non_empty(cli_token).or_else(|| non_empty(config.telegram.bot_token.as_deref()))
}

/// Telegram channel that resumes from, and keeps saving, the stored offset.
pub fn build_telegram_channel(core: &AppCore, token: &str) -> Result<TelegramChannel> {
    let offset = core.storage.bot_state.telegram_offset()?;
    let state = core.storage.bot_state.clone();

    let config =
        TelegramConfig::new(token).with_polling_timeout(core.config.telegram.polling_timeout);
    let channel = TelegramChannel::new(config)
        .with_last_update_id(offset)
        .with_offset_persister(Arc::new(move |update_id: i64| {
            if let Err(e) = state.set_telegram_offset(update_id) {
                warn!("Failed to persist Telegram offset {}: {}", update_id, e);
            }
        }));

    Ok(channel)
}
