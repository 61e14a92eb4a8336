//! Storage layer with typed wrappers around indexbot-storage.
//!
//! [`Storage`] owns the redb database and the keyword index. The bot runtime
//! only sees it through the async [`IndexStore`] trait.

pub mod index_entry;

use anyhow::Result;
use async_trait::async_trait;
use indexbot_storage::KeywordIndex;
use redb::Database;
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use crate::models::{IndexEntry, NewIndexEntry};

// Re-export types that are self-contained in indexbot-storage
pub use indexbot_storage::{BannedWordStorage, BotStateStorage};

pub use index_entry::IndexEntryStorage;

/// Persistence and search contract the bot depends on.
#[async_trait]
pub trait IndexStore: Send + Sync {
    /// Insert or update by url and index the result.
    async fn upsert_entry(&self, entry: NewIndexEntry) -> Result<IndexEntry>;

    /// One page of matches for `keyword`, in ranking order.
    async fn query(&self, keyword: &str, offset: usize, limit: usize) -> Result<Vec<IndexEntry>>;

    async fn list_banned_words(&self) -> Result<BTreeSet<String>>;

    /// Returns how many words were new.
    async fn add_banned_words(&self, words: &BTreeSet<String>) -> Result<usize>;

    /// Returns how many words were present.
    async fn delete_banned_words(&self, words: &BTreeSet<String>) -> Result<usize>;
}

/// Central storage manager that initializes all storage subsystems.
pub struct Storage {
    db: Arc<Database>,
    pub entries: IndexEntryStorage,
    pub banned_words: BannedWordStorage,
    pub bot_state: BotStateStorage,
}

impl Storage {
    /// Open (or create) the database at `db_path` and the keyword index in
    /// `index_dir`.
    pub fn new(db_path: impl AsRef<Path>, index_dir: impl AsRef<Path>) -> Result<Self> {
        let raw = indexbot_storage::Storage::new(db_path)?;
        let index = Arc::new(KeywordIndex::open(index_dir.as_ref())?);
        Self::from_raw(raw, index)
    }

    /// Storage that lives only in memory.
    pub fn in_memory() -> Result<Self> {
        let raw = indexbot_storage::Storage::in_memory()?;
        let index = Arc::new(KeywordIndex::in_memory()?);
        Self::from_raw(raw, index)
    }

    fn from_raw(raw: indexbot_storage::Storage, index: Arc<KeywordIndex>) -> Result<Self> {
        let db = raw.get_db();
        let entries = IndexEntryStorage::new(db.clone(), index)?;

        Ok(Self {
            db,
            entries,
            banned_words: raw.banned_words,
            bot_state: raw.bot_state,
        })
    }

    /// Get a reference to the underlying database
    pub fn get_db(&self) -> Arc<Database> {
        self.db.clone()
    }
}

#[async_trait]
impl IndexStore for Storage {
    async fn upsert_entry(&self, entry: NewIndexEntry) -> Result<IndexEntry> {
        let entries = self.entries.clone();
        tokio::task::spawn_blocking(move || entries.upsert(entry)).await?
    }

    async fn query(&self, keyword: &str, offset: usize, limit: usize) -> Result<Vec<IndexEntry>> {
        let entries = self.entries.clone();
        let keyword = keyword.to_string();
        tokio::task::spawn_blocking(move || entries.search(&keyword, offset, limit)).await?
    }

    async fn list_banned_words(&self) -> Result<BTreeSet<String>> {
        let banned = self.banned_words.clone();
        tokio::task::spawn_blocking(move || banned.list()).await?
    }

    async fn add_banned_words(&self, words: &BTreeSet<String>) -> Result<usize> {
        let banned = self.banned_words.clone();
        let words = words.clone();
        tokio::task::spawn_blocking(move || banned.add(words.iter().map(String::as_str))).await?
    }

    async fn delete_banned_words(&self, words: &BTreeSet<String>) -> Result<usize> {
        let banned = self.banned_words.clone();
        let words = words.clone();
        tokio::task::spawn_blocking(move || banned.remove(words.iter().map(String::as_str)))
            .await?
    }
}
