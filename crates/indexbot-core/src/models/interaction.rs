use serde::{Deserialize, Serialize};

/// Kind of multi-step dialog a user can have pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    AddIndex,
}

/// Data collected by the AddIndex wizard so far.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AddIndexDraft {
    /// Url with the prefix already stripped
    pub url: Option<String>,
    pub title: Option<String>,
    pub creator_id: Option<String>,
}

/// Accumulator payload, one variant per interaction kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InteractionPayload {
    AddIndex(AddIndexDraft),
}

impl InteractionPayload {
    pub fn kind(&self) -> InteractionKind {
        match self {
            Self::AddIndex(_) => InteractionKind::AddIndex,
        }
    }
}

/// A user's unfinished dialog. At most one exists per user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingInteraction {
    pub user_id: String,
    pub step: u32,
    /// Unix timestamp (milliseconds)
    pub expires_at: i64,
    pub payload: InteractionPayload,
}

impl PendingInteraction {
    pub fn add_index(user_id: impl Into<String>, now: i64, ttl_ms: i64) -> Self {
        Self {
            user_id: user_id.into(),
            step: 0,
            expires_at: now.saturating_add(ttl_ms),
            payload: InteractionPayload::AddIndex(AddIndexDraft::default()),
        }
    }

    pub fn kind(&self) -> InteractionKind {
        self.payload.kind()
    }

    pub fn is_expired(&self, now: i64) -> bool {
        now >= self.expires_at
    }

    /// Move to the next step and push the expiry out by `ttl_ms`.
    pub fn advance(&mut self, now: i64, ttl_ms: i64) {
        self.step += 1;
        self.expires_at = now.saturating_add(ttl_ms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expiry_is_inclusive() {
        let interaction = PendingInteraction::add_index("1", 1_000, 60_000);
        assert!(!interaction.is_expired(60_999));
        assert!(interaction.is_expired(61_000));
        assert!(interaction.is_expired(70_000));
    }

    #[test]
    fn test_advance_resets_expiry() {
        let mut interaction = PendingInteraction::add_index("1", 0, 60_000);
        interaction.advance(30_000, 60_000);
        assert_eq!(interaction.step, 1);
        assert_eq!(interaction.expires_at, 90_000);
        assert_eq!(interaction.kind(), InteractionKind::AddIndex);
    }

    #[test]
    fn test_expiry_saturates() {
        let mut interaction = PendingInteraction::add_index("1", 1_000, i64::MAX);
        assert_eq!(interaction.expires_at, i64::MAX);
        interaction.advance(2_000, i64::MAX);
        assert!(!interaction.is_expired(2_000));
    }

    #[test]
    fn test_payload_serializes_with_kind_tag() {
        let payload = InteractionPayload::AddIndex(AddIndexDraft {
            url: Some("x.com".to_string()),
            ..Default::default()
        });
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["kind"], "add_index");
        assert_eq!(json["url"], "x.com");
    }
}
