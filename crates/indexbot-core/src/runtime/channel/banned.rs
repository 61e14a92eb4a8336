//! Banned word cache.
//!
//! Loaded once at startup and reloaded after every add/delete. Matching is
//! exact equality with the whole message text, never substring.

use anyhow::Result;
use parking_lot::RwLock;
use std::collections::BTreeSet;

use crate::storage::IndexStore;

#[derive(Default)]
pub struct BannedWordFilter {
    words: RwLock<BTreeSet<String>>,
}

impl BannedWordFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reload from the store, returns the number of cached words.
    pub async fn refresh(&self, store: &dyn IndexStore) -> Result<usize> {
        let words = store.list_banned_words().await?;
        let count = words.len();
        *self.words.write() = words;
        Ok(count)
    }

    pub fn is_banned(&self, text: &str) -> bool {
        self.words.read().contains(text)
    }

    pub fn snapshot(&self) -> BTreeSet<String> {
        self.words.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Storage;

    #[tokio::test]
    async fn test_exact_match_only() {
        let storage = Storage::in_memory().unwrap();
        storage
            .add_banned_words(&["spam".to_string()].into_iter().collect())
            .await
            .unwrap();

        let filter = BannedWordFilter::new();
        assert!(!filter.is_banned("spam"));
        assert_eq!(filter.refresh(&storage).await.unwrap(), 1);

        assert!(filter.is_banned("spam"));
        assert!(!filter.is_banned("spam!"));
        assert!(!filter.is_banned("some spam here"));
    }

    #[tokio::test]
    async fn test_refresh_drops_removed_words() {
        let storage = Storage::in_memory().unwrap();
        let words: BTreeSet<String> = ["a1".to_string()].into_iter().collect();
        storage.add_banned_words(&words).await.unwrap();

        let filter = BannedWordFilter::new();
        filter.refresh(&storage).await.unwrap();
        storage.delete_banned_words(&words).await.unwrap();
        filter.refresh(&storage).await.unwrap();

        assert!(filter.snapshot().is_empty());
    }
}
