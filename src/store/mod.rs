//! Persistence interface for engine-owned records
//!
//! The trait is deliberately small: per-key loads and atomic per-key
//! writes. The ledger and challenge manager serialize mutations per
//! user above this layer, so implementations only need each method to
//! be atomic on its own, plus one real primitive: create-if-absent for
//! challenge sets, which is what makes concurrent first-access on a
//! fresh day safe.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use chrono::NaiveDate;

use crate::challenges::DailyChallengeSet;
use crate::error::StoreError;
use crate::model::{UserId, UserProgress};

/// Atomic per-key persistence for progress and challenge records
pub trait ProgressStore: Send + Sync {
    /// Load a user's progress record; None if the user has none yet.
    fn load_progress(&self, user: &UserId) -> Result<Option<UserProgress>, StoreError>;

    /// Replace a user's progress record as a whole.
    fn save_progress(&self, user: &UserId, progress: &UserProgress) -> Result<(), StoreError>;

    /// Load the challenge set for (user, date).
    fn load_challenge_set(
        &self,
        user: &UserId,
        date: NaiveDate,
    ) -> Result<Option<DailyChallengeSet>, StoreError>;

    /// Persist `set` for (user, set.date) unless a set already exists.
    /// Returns the set that won, which may be a concurrent writer's.
    fn create_challenge_set_if_absent(
        &self,
        user: &UserId,
        set: DailyChallengeSet,
    ) -> Result<DailyChallengeSet, StoreError>;

    /// Replace an existing challenge set.
    fn save_challenge_set(&self, user: &UserId, set: &DailyChallengeSet)
        -> Result<(), StoreError>;
}
