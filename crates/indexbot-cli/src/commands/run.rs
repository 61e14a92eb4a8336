use anyhow::{Result, anyhow};

use crate::cli::RunArgs;
use crate::daemon::{self, telegram::resolve_token};
use indexbot_core::AppCore;
use indexbot_core::config::BotConfig;

pub async fn run(config: BotConfig, args: RunArgs) -> Result<()> {
    let token = resolve_token(args.token.as_deref(), &config).ok_or_else(|| {
        anyhow!("No bot token configured (use --token, INDEXBOT_BOT_TOKEN or telegram.bot_token)")
    })?;

    let core = AppCore::open_default(config)?;
    daemon::run_bot(core, token).await
}
