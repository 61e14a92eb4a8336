//! Bot runtime state persistence.
//!
//! Holds small values that must survive restarts, such as the Telegram
//! long-polling offset.

use crate::{SimpleStorage, define_simple_storage};
use anyhow::Result;

const TELEGRAM_OFFSET_KEY: &str = "telegram_last_update_id";

define_simple_storage! {
    /// Runtime key-value state stored as little-endian integers.
    pub struct BotStateStorage { table: "bot_state" }
}

impl BotStateStorage {
    pub fn set_i64(&self, key: &str, value: i64) -> Result<()> {
        self.put_raw(key, &value.to_le_bytes())
    }

    /// Returns 0 when the key is absent or malformed.
    pub fn get_i64(&self, key: &str) -> Result<i64> {
        let value = self
            .get_raw(key)?
            .and_then(|bytes| <[u8; 8]>::try_from(bytes.as_slice()).ok())
            .map(i64::from_le_bytes)
            .unwrap_or(0);
        Ok(value)
    }

    pub fn telegram_offset(&self) -> Result<i64> {
        self.get_i64(TELEGRAM_OFFSET_KEY)
    }

    pub fn set_telegram_offset(&self, update_id: i64) -> Result<()> {
        self.set_i64(TELEGRAM_OFFSET_KEY, update_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use redb::Database;
    use std::sync::Arc;
    use tempfile::tempdir;

    #[test]
    fn test_telegram_offset_roundtrip() {
        let temp_dir = tempdir().unwrap();
        let db = Arc::new(Database::create(temp_dir.path().join("state.db")).unwrap());
        let storage = BotStateStorage::new(db).unwrap();

        assert_eq!(storage.telegram_offset().unwrap(), 0);
        storage.set_telegram_offset(4242).unwrap();
        assert_eq!(storage.telegram_offset().unwrap(), 4242);
    }

    #[test]
    fn test_malformed_value_reads_as_zero() {
        let temp_dir = tempdir().unwrap();
        let db = Arc::new(Database::create(temp_dir.path().join("state.db")).unwrap());
        let storage = BotStateStorage::new(db).unwrap();

        storage.put_raw("broken", &[1, 2, 3]).unwrap();
        assert_eq!(storage.get_i64("broken").unwrap(), 0);
    }
}
