//! Typed index entry storage.

use crate::models::{IndexEntry, NewIndexEntry};
use anyhow::Result;
use indexbot_storage::{IndexableEntry, KeywordIndex};
use redb::Database;
use std::sync::Arc;
use tracing::{debug, warn};

/// Typed wrapper around `indexbot_storage::IndexEntryStorage` that keeps the
/// keyword index in step with the rows.
#[derive(Clone)]
pub struct IndexEntryStorage {
    inner: indexbot_storage::IndexEntryStorage,
    index: Arc<KeywordIndex>,
}

impl IndexEntryStorage {
    pub fn new(db: Arc<Database>, index: Arc<KeywordIndex>) -> Result<Self> {
        Ok(Self {
            inner: indexbot_storage::IndexEntryStorage::new(db)?,
            index,
        })
    }

    /// Insert a new entry, or replace the keywords of the entry with the same url.
    pub fn upsert(&self, new_entry: NewIndexEntry) -> Result<IndexEntry> {
        let now = chrono::Utc::now().timestamp_millis();
        let url = new_entry.url.clone();

        let (_, bytes) = self.inner.upsert_with(&url, move |existing, id| {
            let existing = existing
                .map(serde_json::from_slice::<IndexEntry>)
                .transpose()?;
            let entry = new_entry.into_entry(existing, id, now);
            Ok(serde_json::to_vec(&entry)?)
        })?;
        let entry: IndexEntry = serde_json::from_slice(&bytes)?;

        self.index.index_entry(&to_indexable(&entry))?;
        debug!("Upserted index entry {} ({})", entry.id, entry.url);
        Ok(entry)
    }

    pub fn get(&self, id: u64) -> Result<Option<IndexEntry>> {
        self.inner
            .get_by_id(id)?
            .map(|bytes| serde_json::from_slice(&bytes))
            .transpose()
            .map_err(Into::into)
    }

    pub fn get_by_url(&self, url: &str) -> Result<Option<IndexEntry>> {
        self.inner
            .get_by_url(url)?
            .map(|bytes| serde_json::from_slice(&bytes))
            .transpose()
            .map_err(Into::into)
    }

    /// All entries, ordered by url.
    pub fn list(&self) -> Result<Vec<IndexEntry>> {
        let mut entries = Vec::new();
        for bytes in self.inner.list_raw()? {
            entries.push(serde_json::from_slice(&bytes)?);
        }
        Ok(entries)
    }

    /// Delete by url, returns whether a row existed.
    pub fn delete(&self, url: &str) -> Result<bool> {
        let Some(id) = self.inner.delete_by_url(url)? else {
            return Ok(false);
        };
        self.index.remove_entry(id)?;
        Ok(true)
    }

    /// Keyword search returning one page of entries in index order.
    pub fn search(&self, query: &str, offset: usize, limit: usize) -> Result<Vec<IndexEntry>> {
        let hits = self.index.search(query, offset, limit)?;
        let mut entries = Vec::with_capacity(hits.len());
        for hit in hits {
            match self.get(hit.entry_id)? {
                Some(entry) => entries.push(entry),
                None => warn!("Search hit {} has no stored entry", hit.entry_id),
            }
        }
        Ok(entries)
    }

    /// Rebuild the keyword index from the stored rows.
    pub fn reindex(&self) -> Result<usize> {
        let entries = self.list()?;
        self.index.rebuild(entries.iter().map(to_indexable))
    }

    pub fn indexed_count(&self) -> Result<u64> {
        self.index.doc_count()
    }
}

fn to_indexable(entry: &IndexEntry) -> IndexableEntry {
    IndexableEntry {
        id: entry.id,
        title: entry.title.clone(),
        keywords: entry.keyword_list(),
    }
}
