mod cli;
mod commands;
mod completions;
mod daemon;
mod error;
mod output;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use indexbot_core::config::BotConfig;
use indexbot_core::{AppCore, paths};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        error::handle_error(err);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let command = match cli.command {
        Commands::Completions { shell } => {
            completions::generate_completions(shell);
            return Ok(());
        }
        command => command,
    };

    let _guard = init_logging(cli.verbose)?;

    let config = match &cli.config {
        Some(path) => BotConfig::load_from_path(path)?,
        None => BotConfig::load()?,
    };

    match command {
        Commands::Run(args) => commands::run::run(config, args).await,
        Commands::Banned { command } => {
            let core = AppCore::open_default(config)?;
            commands::banned::run(&core, command, cli.format).await
        }
        Commands::Entry { command } => {
            let core = AppCore::open_default(config)?;
            commands::entry::run(&core, command, cli.format).await
        }
        Commands::Completions { .. } => Ok(()),
    }
}

/// Always log to a daily file; mirror to stderr with --verbose.
fn init_logging(verbose: bool) -> Result<WorkerGuard> {
    let log_dir = paths::logs_dir()?;
    let file_appender = tracing_appender::rolling::daily(log_dir, "indexbot.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(false)
        .with_level(true);
    let stderr_layer = verbose.then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer)
        .init();

    Ok(guard)
}
