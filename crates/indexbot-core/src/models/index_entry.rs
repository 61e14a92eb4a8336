use serde::{Deserialize, Serialize};

/// Keywords kept per entry; extra tokens are dropped.
pub const MAX_KEYWORDS: usize = 5;
/// Shortest keyword accepted, in characters.
pub const MIN_KEYWORD_CHARS: usize = 2;

/// A submitted link. `url` never carries the configured prefix.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexEntry {
    pub id: u64,
    pub url: String,
    pub title: String,
    /// Keywords joined by single spaces
    pub keywords: String,
    pub creator_id: String,
    /// Unix timestamp (milliseconds)
    pub created_at: i64,
    /// Unix timestamp (milliseconds)
    pub updated_at: i64,
}

impl IndexEntry {
    pub fn keyword_list(&self) -> Vec<String> {
        self.keywords
            .split(' ')
            .filter(|k| !k.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Finalized wizard output, ready to be upserted by url.
#[derive(Debug, Clone, PartialEq)]
pub struct NewIndexEntry {
    pub url: String,
    pub title: String,
    pub keywords: String,
    pub creator_id: String,
}

impl NewIndexEntry {
    /// Merge into an existing row for the same url, or build a fresh one.
    ///
    /// Re-submitting a url only replaces its keywords; id, title, creator and
    /// creation time stay as first recorded.
    pub fn into_entry(self, existing: Option<IndexEntry>, id: u64, now: i64) -> IndexEntry {
        match existing {
            Some(mut entry) => {
                entry.keywords = self.keywords;
                entry.updated_at = now;
                entry
            }
            None => IndexEntry {
                id,
                url: self.url,
                title: self.title,
                keywords: self.keywords,
                creator_id: self.creator_id,
                created_at: now,
                updated_at: now,
            },
        }
    }
}
