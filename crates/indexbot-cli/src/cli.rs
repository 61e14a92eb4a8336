use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

use crate::output::OutputFormat;

#[derive(Parser)]
#[command(name = "indexbot")]
#[command(version, about = "IndexBot - Telegram link index and keyword search bot")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (defaults to ~/.config/indexbot/config.toml)
    #[arg(long, global = true, env = "INDEXBOT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Start the bot and poll Telegram until interrupted
    Run(RunArgs),

    /// Banned word management
    Banned {
        #[command(subcommand)]
        command: BannedCommands,
    },

    /// Index entry operations
    Entry {
        #[command(subcommand)]
        command: EntryCommands,
    },
}

#[derive(Args)]
pub struct RunArgs {
    /// Bot token from @BotFather (overrides the config file)
    #[arg(long, env = "INDEXBOT_BOT_TOKEN", hide_env_values = true)]
    pub token: Option<String>,
}

#[derive(Subcommand)]
pub enum BannedCommands {
    /// List banned words
    List,

    /// Ban one or more words
    Add {
        #[arg(required = true)]
        words: Vec<String>,
    },

    /// Remove one or more banned words
    Remove {
        #[arg(required = true)]
        words: Vec<String>,
    },
}

#[derive(Subcommand)]
pub enum EntryCommands {
    /// Search entries the way the bot does
    Search {
        query: String,

        /// Zero-based result page
        #[arg(long, default_value_t = 0)]
        page: u64,
    },

    /// Rebuild the keyword index from stored entries
    Reindex,
}
