//! Interaction Store - pending multi-step dialogs keyed by user.
//!
//! Each user owns one slot guarded by an async mutex. Holding the guard is
//! what serializes step transitions for that user: two quick messages from
//! the same person are processed one after the other, never interleaved.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::models::PendingInteraction;

type Slot = Arc<Mutex<Option<PendingInteraction>>>;

/// Outcome of looking up a user's interaction at a given instant.
#[derive(Debug)]
pub enum Pending<'a> {
    /// Nothing pending.
    Missing,
    /// The interaction had expired and was removed.
    Expired(PendingInteraction),
    Live(&'a mut PendingInteraction),
}

/// Exclusive access to one user's slot.
pub struct InteractionGuard {
    user_id: String,
    slot: OwnedMutexGuard<Option<PendingInteraction>>,
}

impl InteractionGuard {
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn get(&self) -> Option<&PendingInteraction> {
        self.slot.as_ref()
    }

    /// Store `interaction`, replacing whatever was pending.
    pub fn put(&mut self, interaction: PendingInteraction) -> Option<PendingInteraction> {
        self.slot.replace(interaction)
    }

    pub fn remove(&mut self) -> Option<PendingInteraction> {
        self.slot.take()
    }

    /// Return the live interaction, dropping it first if it expired at `now`.
    pub fn take_live(&mut self, now: i64) -> Pending<'_> {
        let expired = self
            .slot
            .as_ref()
            .is_some_and(|interaction| interaction.is_expired(now));

        if expired {
            return match self.slot.take() {
                Some(interaction) => Pending::Expired(interaction),
                None => Pending::Missing,
            };
        }

        match self.slot.as_mut() {
            Some(interaction) => Pending::Live(interaction),
            None => Pending::Missing,
        }
    }
}

/// In-process map of pending interactions.
#[derive(Default)]
pub struct InteractionStore {
    slots: DashMap<String, Slot>,
}

impl InteractionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock the user's slot, creating it if needed.
    pub async fn lock(&self, user_id: &str) -> InteractionGuard {
        let slot = self
            .slots
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(None)))
            .clone();
        InteractionGuard {
            user_id: user_id.to_string(),
            slot: slot.lock_owned().await,
        }
    }

    /// Lock the user's slot only if one exists.
    pub async fn lock_existing(&self, user_id: &str) -> Option<InteractionGuard> {
        let slot = self.slots.get(user_id)?.clone();
        Some(InteractionGuard {
            user_id: user_id.to_string(),
            slot: slot.lock_owned().await,
        })
    }

    pub async fn get(&self, user_id: &str) -> Option<PendingInteraction> {
        self.lock_existing(user_id).await?.get().cloned()
    }

    pub async fn put(&self, interaction: PendingInteraction) -> Option<PendingInteraction> {
        let user_id = interaction.user_id.clone();
        self.lock(&user_id).await.put(interaction)
    }

    pub async fn remove(&self, user_id: &str) -> Option<PendingInteraction> {
        let removed = self.lock_existing(user_id).await?.remove();
        self.prune(user_id);
        removed
    }

    /// Drop the user's slot when it is empty and nobody else holds it.
    pub fn prune(&self, user_id: &str) {
        self.slots.remove_if(user_id, |_, slot| {
            Arc::strong_count(slot) == 1
                && slot
                    .try_lock()
                    .map(|interaction| interaction.is_none())
                    .unwrap_or(false)
        });
    }

    /// Number of users with a slot, pending or not yet pruned.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }
}
