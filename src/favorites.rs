//! Favorites: an ordered, duplicate-free set of ids persisted locally.
//!
//! Toggling is optimistic. The new membership is persisted and shown at once,
//! then a [`FavoriteConfirmer`] is asked to confirm it in the background. A
//! failed confirmation is compensated with [`FavoritesStore::rollback`], which
//! only undoes the flip when no later toggle of the same id has happened.
use std::collections::HashMap;
use std::time::Duration;

use anyhow::Result;
use futures::future::BoxFuture;
use thiserror::Error;

use crate::storage::{Database, StoredValueError, FAVORITES_KEY};

/// Default fixed delay of [`SimulatedConfirmer`].
pub const DEFAULT_CONFIRM_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FavoriteError {
    #[error("Failed to update favorite. Please try again.")]
    ConfirmFailed(String),
}

// ============================================================================
// FavoriteSet
// ============================================================================

/// Ordered favorite ids. Order is insertion order; no id appears twice.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FavoriteSet {
    ids: Vec<i64>,
}

impl FavoriteSet {
    /// Parse the stored JSON array. Duplicates are dropped, keeping the first.
    pub fn parse(raw: &str) -> Result<Self, StoredValueError> {
        let values: Vec<i64> = serde_json::from_str(raw)
            .map_err(|e| StoredValueError::new(FAVORITES_KEY, e.to_string()))?;
        let mut set = Self::default();
        for id in values {
            set.insert(id);
        }
        Ok(set)
    }

    /// Parse, falling back to an empty set. Absent means empty too.
    pub fn parse_or_empty(raw: Option<&str>) -> Self {
        match raw.map(Self::parse) {
            None => Self::default(),
            Some(Ok(set)) => set,
            Some(Err(e)) => {
                tracing::warn!(error = %e, "Ignoring stored favorites");
                Self::default()
            }
        }
    }

    pub fn to_json(&self) -> String {
        // Serializing a Vec<i64> cannot fail
        serde_json::to_string(&self.ids).unwrap_or_else(|_| "[]".to_string())
    }

    pub fn contains(&self, id: i64) -> bool {
        self.ids.contains(&id)
    }

    /// Append `id`. Returns false if it was already present.
    pub fn insert(&mut self, id: i64) -> bool {
        if self.contains(id) {
            return false;
        }
        self.ids.push(id);
        true
    }

    /// Remove `id`. Returns false if it was not present.
    pub fn remove(&mut self, id: i64) -> bool {
        let before = self.ids.len();
        self.ids.retain(|&x| x != id);
        self.ids.len() != before
    }

    pub fn ids(&self) -> &[i64] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

// ============================================================================
// FavoritesStore
// ============================================================================

/// A tentative membership flip awaiting confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FavoriteChange {
    pub id: i64,
    /// True if the toggle added the id.
    pub added: bool,
    /// Per-store sequence number; only the latest change of an id can roll back.
    pub seq: u64,
}

/// In-memory favorites backed by the `favorites` storage key.
pub struct FavoritesStore {
    db: Database,
    set: FavoriteSet,
    latest: HashMap<i64, u64>,
    next_seq: u64,
}

impl FavoritesStore {
    /// Load from storage. A missing or malformed value yields an empty set.
    pub async fn load(db: Database) -> Result<Self> {
        let raw = db.get_item(FAVORITES_KEY).await?;
        let set = FavoriteSet::parse_or_empty(raw.as_deref());
        tracing::debug!(count = set.len(), "Favorites loaded");
        Ok(Self {
            db,
            set,
            latest: HashMap::new(),
            next_seq: 0,
        })
    }

    pub fn contains(&self, id: i64) -> bool {
        self.set.contains(id)
    }

    pub fn ids(&self) -> &[i64] {
        self.set.ids()
    }

    pub fn set(&self) -> &FavoriteSet {
        &self.set
    }

    /// Flip membership of `id` and persist immediately.
    ///
    /// If the write fails the in-memory flip is undone and the error returned.
    pub async fn toggle(&mut self, id: i64) -> Result<FavoriteChange> {
        let added = !self.set.contains(id);
        self.flip(id, added);

        if let Err(e) = self.persist().await {
            self.flip(id, !added);
            return Err(e);
        }

        self.next_seq = self.next_seq.wrapping_add(1);
        self.latest.insert(id, self.next_seq);
        tracing::debug!(id, added, seq = self.next_seq, "Favorite toggled");
        Ok(FavoriteChange {
            id,
            added,
            seq: self.next_seq,
        })
    }

    /// Undo `change` after a failed confirmation.
    ///
    /// Returns `Ok(false)` without touching anything when the id was toggled
    /// again since, or the set was replaced by another context.
    pub async fn rollback(&mut self, change: FavoriteChange) -> Result<bool> {
        if self.latest.get(&change.id) != Some(&change.seq) {
            tracing::debug!(id = change.id, seq = change.seq, "Stale rollback dropped");
            return Ok(false);
        }
        self.latest.remove(&change.id);

        self.flip(change.id, !change.added);
        self.persist().await?;
        tracing::info!(id = change.id, "Favorite change rolled back");
        Ok(true)
    }

    /// Replace the set from another context's write. Never persists.
    pub fn apply_external(&mut self, new_value: Option<&str>) {
        self.set = FavoriteSet::parse_or_empty(new_value);
        // Pending confirmations refer to a state that no longer exists
        self.latest.clear();
        tracing::debug!(count = self.set.len(), "Favorites replaced by external write");
    }

    /// Re-read the stored value, e.g. after missing change notifications.
    pub async fn reload(&mut self) -> Result<()> {
        let raw = self.db.get_item(FAVORITES_KEY).await?;
        self.apply_external(raw.as_deref());
        Ok(())
    }

    fn flip(&mut self, id: i64, add: bool) {
        if add {
            self.set.insert(id);
        } else {
            self.set.remove(id);
        }
    }

    async fn persist(&self) -> Result<()> {
        self.db.set_item(FAVORITES_KEY, &self.set.to_json()).await
    }
}

// ============================================================================
// Confirmation
// ============================================================================

/// Server-side confirmation of a favorite change.
pub trait FavoriteConfirmer: Send + Sync {
    fn confirm(&self, change: FavoriteChange) -> BoxFuture<'static, Result<(), FavoriteError>>;
}

/// Confirmer with no backend: waits a fixed delay and succeeds.
#[derive(Debug, Clone)]
pub struct SimulatedConfirmer {
    delay: Duration,
}

impl SimulatedConfirmer {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Default for SimulatedConfirmer {
    fn default() -> Self {
        Self::new(DEFAULT_CONFIRM_DELAY)
    }
}

impl FavoriteConfirmer for SimulatedConfirmer {
    fn confirm(&self, change: FavoriteChange) -> BoxFuture<'static, Result<(), FavoriteError>> {
        let delay = self.delay;
        Box::pin(async move {
            tokio::time::sleep(delay).await;
            tracing::trace!(id = change.id, "Favorite change confirmed");
            Ok(())
        })
    }
}
