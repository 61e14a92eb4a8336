use anyhow::Result;
use colored::Colorize;
use serde_json::json;
use std::collections::BTreeSet;

use crate::cli::BannedCommands;
use crate::output::{OutputFormat, json::print_json};
use indexbot_core::AppCore;
use indexbot_core::storage::IndexStore;

pub async fn run(core: &AppCore, command: BannedCommands, format: OutputFormat) -> Result<()> {
    match command {
        BannedCommands::List => list_words(core, format).await,
        BannedCommands::Add { words } => add_words(core, words, format).await,
        BannedCommands::Remove { words } => remove_words(core, words, format).await,
    }
}

async fn list_words(core: &AppCore, format: OutputFormat) -> Result<()> {
    let words = core.storage.list_banned_words().await?;

    if format.is_json() {
        return print_json(&json!({ "words": words }));
    }

    if words.is_empty() {
        println!("No banned words.");
        return Ok(());
    }
    for word in words {
        println!("{word}");
    }
    Ok(())
}

async fn add_words(core: &AppCore, words: Vec<String>, format: OutputFormat) -> Result<()> {
    let words: BTreeSet<String> = words.into_iter().filter(|w| !w.is_empty()).collect();
    let added = core.storage.add_banned_words(&words).await?;

    if format.is_json() {
        return print_json(&json!({ "added": added }));
    }

    println!("{} Added {} banned word(s)", "✓".green(), added);
    Ok(())
}

async fn remove_words(core: &AppCore, words: Vec<String>, format: OutputFormat) -> Result<()> {
    let words: BTreeSet<String> = words.into_iter().collect();
    let removed = core.storage.delete_banned_words(&words).await?;

    if format.is_json() {
        return print_json(&json!({ "removed": removed }));
    }

    println!("{} Removed {} banned word(s)", "✓".green(), removed);
    Ok(())
}
