//! Banned word storage - literal strings whose exact appearance as a chat
//! message gets that message deleted.

use crate::{SimpleStorage, define_simple_storage};
use anyhow::Result;
use std::collections::BTreeSet;

define_simple_storage! {
    /// Banned words keyed by the literal word, valued by the time it was added.
    pub struct BannedWordStorage { table: "banned_words" }
}

impl BannedWordStorage {
    /// All banned words, sorted.
    pub fn list(&self) -> Result<BTreeSet<String>> {
        Ok(self.list_keys()?.into_iter().collect())
    }

    /// Add words, skipping empty strings. Returns how many were new.
    pub fn add<'a, I>(&self, words: I) -> Result<usize>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let added_at = chrono::Utc::now().timestamp_millis().to_le_bytes();
        let words: Vec<&str> = words.into_iter().filter(|w| !w.is_empty()).collect();
        self.put_raw_batch(words.into_iter().map(|w| (w, added_at.as_slice())))
    }

    /// Remove words. Returns how many were present.
    pub fn remove<'a, I>(&self, words: I) -> Result<usize>
    where
        I: IntoIterator<Item = &'a str>,
    {
        self.delete_batch(words)
    }

    pub fn contains(&self, word: &str) -> Result<bool> {
        Ok(self.get_raw(word)?.is_some())
    }
}
