use anyhow::Result;
use colored::Colorize;
use comfy_table::{Cell, Table};
use serde_json::json;

use crate::cli::EntryCommands;
use crate::commands::utils::{format_timestamp, preview_text};
use crate::output::{OutputFormat, json::print_json};
use indexbot_core::AppCore;
use indexbot_core::runtime::SearchRequest;
use indexbot_core::storage::IndexStore;

pub async fn run(core: &AppCore, command: EntryCommands, format: OutputFormat) -> Result<()> {
    match command {
        EntryCommands::Search { query, page } => search_entries(core, query, page, format).await,
        EntryCommands::Reindex => reindex(core, format),
    }
}

async fn search_entries(core: &AppCore, query: String, page: u64, format: OutputFormat) -> Result<()> {
    let request = SearchRequest { key: query, page };
    let entries = core
        .storage
        .query(&request.key, request.offset(), request.limit())
        .await?;

    if format.is_json() {
        return print_json(&entries);
    }

    if entries.is_empty() {
        println!("No matching entries.");
        return Ok(());
    }

    let prefix = &core.config.wizard.url_prefix;
    let mut table = Table::new();
    table.set_header(vec!["#", "ID", "Title", "URL", "Keywords", "Updated"]);

    for (i, entry) in entries.into_iter().enumerate() {
        table.add_row(vec![
            Cell::new(request.offset() + i + 1),
            Cell::new(entry.id),
            Cell::new(preview_text(&entry.title, 32)),
            Cell::new(format!("{}{}", prefix, entry.url)),
            Cell::new(&entry.keywords),
            Cell::new(format_timestamp(entry.updated_at)),
        ]);
    }

    crate::output::table::print_table(table)
}

fn reindex(core: &AppCore, format: OutputFormat) -> Result<()> {
    let count = core.storage.entries.reindex()?;

    if format.is_json() {
        return print_json(&json!({ "reindexed": count }));
    }

    println!("{} Reindexed {} entries", "✓".green(), count);
    Ok(())
}
