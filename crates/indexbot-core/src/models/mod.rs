pub mod index_entry;
pub mod interaction;

pub use index_entry::{IndexEntry, MAX_KEYWORDS, MIN_KEYWORD_CHARS, NewIndexEntry};
pub use interaction::{AddIndexDraft, InteractionKind, InteractionPayload, PendingInteraction};
