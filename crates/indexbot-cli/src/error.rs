use colored::Colorize;

pub fn handle_error(err: anyhow::Error) -> ! {
    eprintln!("{} {:#}", "Error:".red().bold(), err);

    let msg = format!("{:#}", err).to_lowercase();

    if msg.contains("no bot token") {
        eprintln!("\n{}", "Suggestion:".yellow().bold());
        eprintln!("  Pass a token or export it:");
        eprintln!("  {} indexbot run --token <token>", "$".dimmed());
        eprintln!("  {} export INDEXBOT_BOT_TOKEN=<token>", "$".dimmed());
    }

    if msg.contains("config file") || msg.contains("wizard.") || msg.contains("help.links") {
        eprintln!("\n{}", "Suggestion:".yellow().bold());
        eprintln!("  Check the config file, or point at another one with --config.");
    }

    if msg.contains("database already open") || msg.contains("lock") {
        eprintln!("\n{}", "Suggestion:".yellow().bold());
        eprintln!("  Another indexbot process is using the data directory. Stop it first.");
    }

    if msg.contains("unauthorized") {
        eprintln!("\n{}", "Suggestion:".yellow().bold());
        eprintln!("  The bot token was rejected by Telegram. Check it with @BotFather.");
    }

    if msg.contains("connection refused") || msg.contains("network") {
        eprintln!("\n{}", "Suggestion:".yellow().bold());
        eprintln!("  Check your internet connection and try again.");
    }

    std::process::exit(1);
}
