pub mod telegram;

use anyhow::Result;
use colored::Colorize;
use std::sync::Arc;
use tracing::info;

use indexbot_core::AppCore;
use indexbot_core::runtime::BotRuntime;

/// Run the bot on Telegram until Ctrl+C.
pub async fn run_bot(core: AppCore, token: String) -> Result<()> {
    let channel = Arc::new(telegram::build_telegram_channel(&core, &token)?);

    let runtime = BotRuntime::start(channel.clone(), core.storage.clone(), core.config.clone()).await?;
    let handle = runtime.context().identity.handle.clone();
    println!(
        "{} @{} is running. Press Ctrl+C to stop.",
        "●".green(),
        handle
    );

    tokio::signal::ctrl_c().await?;
    info!("Shutdown requested");

    channel.stop_polling();
    runtime.shutdown().await;
    println!("Stopped.");
    Ok(())
}
