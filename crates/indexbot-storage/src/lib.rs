//! IndexBot Storage - Low-level storage layer
//!
//! Persists index entries, banned words and bot runtime state in a redb
//! database, and keeps a tantivy full-text index over entry keywords and
//! titles. The APIs here are byte-level (JSON payloads); typed wrappers live
//! in `indexbot-core::storage`.
//!
//! # Tables
//!
//! - `index_entries` - url -> JSON entry
//! - `index_entry_ids` - entry id -> url
//! - `index_url_ids` - url -> entry id
//! - `index_meta` - counters (next entry id)
//! - `banned_words` - word -> added-at timestamp
//! - `bot_state` - polling offsets and other small runtime values

pub mod banned_word;
pub mod bot_state;
pub mod index_entry;
pub mod keyword_index;
pub mod paths;
mod simple_storage;

use anyhow::Result;
use redb::Database;
use redb::backends::InMemoryBackend;
use std::path::Path;
use std::sync::Arc;

pub use banned_word::BannedWordStorage;
pub use bot_state::BotStateStorage;
pub use index_entry::IndexEntryStorage;
pub use keyword_index::{IndexableEntry, KeywordIndex, SearchHit};
pub use simple_storage::SimpleStorage;

/// Opens the redb database and initializes every table.
pub struct Storage {
    db: Arc<Database>,
    pub entries: IndexEntryStorage,
    pub banned_words: BannedWordStorage,
    pub bot_state: BotStateStorage,
}

impl Storage {
    /// Create a new storage instance at the given path.
    ///
    /// This will create the database file if it doesn't exist and initialize
    /// all required tables.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let db = Arc::new(Database::create(path.as_ref())?);
        Self::from_db(db)
    }

    /// Storage backed by memory only, nothing touches disk.
    pub fn in_memory() -> Result<Self> {
        let db = Database::builder().create_with_backend(InMemoryBackend::new())?;
        Self::from_db(Arc::new(db))
    }

    fn from_db(db: Arc<Database>) -> Result<Self> {
        let entries = IndexEntryStorage::new(db.clone())?;
        let banned_words = BannedWordStorage::new(db.clone())?;
        let bot_state = BotStateStorage::new(db.clone())?;

        Ok(Self {
            db,
            entries,
            banned_words,
            bot_state,
        })
    }

    /// Get a reference to the underlying database
    pub fn get_db(&self) -> Arc<Database> {
        self.db.clone()
    }
}
