//! Index entry storage - byte-level API for submitted links.
//!
//! Entries are keyed by their (prefix-stripped) URL, which is also the upsert
//! key. A secondary table maps numeric ids back to URLs so search hits from
//! the keyword index can be resolved.

use anyhow::Result;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use std::sync::Arc;

/// url -> JSON entry
const ENTRIES_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("index_entries");
/// id -> url
const ENTRY_IDS_TABLE: TableDefinition<u64, &str> = TableDefinition::new("index_entry_ids");
/// url -> id
const URL_IDS_TABLE: TableDefinition<&str, u64> = TableDefinition::new("index_url_ids");
/// Counters
const META_TABLE: TableDefinition<&str, u64> = TableDefinition::new("index_meta");

const NEXT_ID_KEY: &str = "next_entry_id";

/// Low-level index entry storage
#[derive(Debug, Clone)]
pub struct IndexEntryStorage {
    db: Arc<Database>,
}

impl IndexEntryStorage {
    pub fn new(db: Arc<Database>) -> Result<Self> {
        let write_txn = db.begin_write()?;
        write_txn.open_table(ENTRIES_TABLE)?;
        write_txn.open_table(ENTRY_IDS_TABLE)?;
        write_txn.open_table(URL_IDS_TABLE)?;
        write_txn.open_table(META_TABLE)?;
        write_txn.commit()?;
        Ok(Self { db })
    }

    /// Insert or replace the row for `url`, keeping the id mapping in sync.
    ///
    /// `build` receives the existing row (if any) and the id to use: the
    /// existing id when the url is already stored, otherwise a freshly
    /// allocated one. Both writes and the id allocation share one transaction.
    pub fn upsert_with<F>(&self, url: &str, build: F) -> Result<(u64, Vec<u8>)>
    where
        F: FnOnce(Option<&[u8]>, u64) -> Result<Vec<u8>>,
    {
        let write_txn = self.db.begin_write()?;
        let result = {
            let mut entries = write_txn.open_table(ENTRIES_TABLE)?;
            let mut ids = write_txn.open_table(ENTRY_IDS_TABLE)?;
            let mut url_ids = write_txn.open_table(URL_IDS_TABLE)?;
            let mut meta = write_txn.open_table(META_TABLE)?;

            let existing = entries.get(url)?.map(|value| value.value().to_vec());
            let existing_id = url_ids.get(url)?.map(|value| value.value());

            let id = match existing_id {
                Some(id) => id,
                None => {
                    let next = meta.get(NEXT_ID_KEY)?.map(|v| v.value()).unwrap_or(1);
                    meta.insert(NEXT_ID_KEY, next + 1)?;
                    next
                }
            };

            let data = build(existing.as_deref(), id)?;
            entries.insert(url, data.as_slice())?;
            ids.insert(id, url)?;
            url_ids.insert(url, id)?;
            (id, data)
        };
        write_txn.commit()?;
        Ok(result)
    }

    pub fn get_by_url(&self, url: &str) -> Result<Option<Vec<u8>>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ENTRIES_TABLE)?;
        Ok(table.get(url)?.map(|v| v.value().to_vec()))
    }

    pub fn get_by_id(&self, id: u64) -> Result<Option<Vec<u8>>> {
        let read_txn = self.db.begin_read()?;
        let ids = read_txn.open_table(ENTRY_IDS_TABLE)?;
        let Some(url) = ids.get(id)? else {
            return Ok(None);
        };
        let entries = read_txn.open_table(ENTRIES_TABLE)?;
        Ok(entries.get(url.value())?.map(|v| v.value().to_vec()))
    }

    /// Remove the row for `url`, returns the id it had.
    pub fn delete_by_url(&self, url: &str) -> Result<Option<u64>> {
        let write_txn = self.db.begin_write()?;
        let removed = {
            let mut entries = write_txn.open_table(ENTRIES_TABLE)?;
            let mut ids = write_txn.open_table(ENTRY_IDS_TABLE)?;
            let mut url_ids = write_txn.open_table(URL_IDS_TABLE)?;
            entries.remove(url)?;
            let id = url_ids.remove(url)?.map(|value| value.value());
            if let Some(id) = id {
                ids.remove(id)?;
            }
            id
        };
        write_txn.commit()?;
        Ok(removed)
    }

    /// List all entries as raw JSON, ordered by url.
    pub fn list_raw(&self) -> Result<Vec<Vec<u8>>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ENTRIES_TABLE)?;
        let mut result = Vec::new();
        for row in table.iter()? {
            let (_, value) = row?;
            result.push(value.value().to_vec());
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn setup() -> (tempfile::TempDir, IndexEntryStorage) {
        let temp_dir = tempdir().unwrap();
        let db = Arc::new(Database::create(temp_dir.path().join("entries.db")).unwrap());
        (temp_dir, IndexEntryStorage::new(db).unwrap())
    }

    fn put(storage: &IndexEntryStorage, url: &str, body: &str) -> (u64, Vec<u8>) {
        let body = body.to_string();
        storage
            .upsert_with(url, move |_, _| Ok(body.into_bytes()))
            .unwrap()
    }

    #[test]
    fn test_new_urls_get_sequential_ids() {
        let (_dir, storage) = setup();
        let (first, _) = put(&storage, "x.com/a", "a");
        let (second, _) = put(&storage, "x.com/b", "b");
        assert_eq!(first, 1);
        assert_eq!(second, 2);
    }

    #[test]
    fn test_upsert_same_url_keeps_id_and_sees_previous_row() {
        let (_dir, storage) = setup();
        let (id, _) = put(&storage, "x.com/a", "old");

        let (again, data) = storage
            .upsert_with("x.com/a", |existing, id| {
                assert_eq!(existing, Some(b"old".as_slice()));
                Ok(format!("new-{}", id).into_bytes())
            })
            .unwrap();

        assert_eq!(again, id);
        assert_eq!(data, b"new-1".to_vec());
        assert_eq!(storage.list_raw().unwrap().len(), 1);
        assert_eq!(storage.get_by_id(id).unwrap(), Some(b"new-1".to_vec()));
    }

    #[test]
    fn test_build_failure_rolls_back() {
        let (_dir, storage) = setup();
        let result = storage.upsert_with("x.com/a", |_, _| Err(anyhow::anyhow!("boom")));
        assert!(result.is_err());
        assert!(storage.get_by_url("x.com/a").unwrap().is_none());

        // The aborted allocation must not burn an id.
        let (id, _) = put(&storage, "x.com/a", "ok");
        assert_eq!(id, 1);
    }

    #[test]
    fn test_delete_by_url() {
        let (_dir, storage) = setup();
        let (id, _) = put(&storage, "x.com/a", "a");
        assert_eq!(storage.delete_by_url("x.com/a").unwrap(), Some(id));
        assert!(storage.get_by_id(id).unwrap().is_none());
        assert_eq!(storage.delete_by_url("x.com/a").unwrap(), None);
    }
}
