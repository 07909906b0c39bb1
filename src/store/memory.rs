//! In-memory progress store
//!
//! DashMap-backed store for single-process deployments and tests. It
//! doubles as the failure-injection harness: `fail_times` makes the
//! next N operations return a transient error, which is how the
//! ledger's retry loop gets exercised.

use std::sync::atomic::{AtomicU32, Ordering};

use chrono::NaiveDate;
use dashmap::DashMap;

use super::ProgressStore;
use crate::challenges::DailyChallengeSet;
use crate::error::StoreError;
use crate::model::{UserId, UserProgress};

#[derive(Default)]
pub struct MemoryStore {
    progress: DashMap<UserId, UserProgress>,
    challenges: DashMap<(UserId, NaiveDate), DailyChallengeSet>,
    fail_remaining: AtomicU32,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `n` store operations fail with a transient error.
    pub fn fail_times(&self, n: u32) {
        self.fail_remaining.store(n, Ordering::SeqCst);
    }

    fn check_fault(&self) -> Result<(), StoreError> {
        let fault = self
            .fail_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if fault {
            Err(StoreError::unavailable("injected fault"))
        } else {
            Ok(())
        }
    }
}

impl ProgressStore for MemoryStore {
    fn load_progress(&self, user: &UserId) -> Result<Option<UserProgress>, StoreError> {
        self.check_fault()?;
        Ok(self.progress.get(user).map(|p| p.clone()))
    }

    fn save_progress(&self, user: &UserId, progress: &UserProgress) -> Result<(), StoreError> {
        self.check_fault()?;
        self.progress.insert(user.clone(), progress.clone());
        Ok(())
    }

    fn load_challenge_set(
        &self,
        user: &UserId,
        date: NaiveDate,
    ) -> Result<Option<DailyChallengeSet>, StoreError> {
        self.check_fault()?;
        Ok(self
            .challenges
            .get(&(user.clone(), date))
            .map(|s| s.clone()))
    }

    fn create_challenge_set_if_absent(
        &self,
        user: &UserId,
        set: DailyChallengeSet,
    ) -> Result<DailyChallengeSet, StoreError> {
        self.check_fault()?;
        // DashMap's entry API gives the atomic create-if-absent: under
        // a racing first access, exactly one insert wins and everyone
        // gets the winner back.
        let entry = self.challenges.entry((user.clone(), set.date)).or_insert(set);
        Ok(entry.clone())
    }

    fn save_challenge_set(
        &self,
        user: &UserId,
        set: &DailyChallengeSet,
    ) -> Result<(), StoreError> {
        self.check_fault()?;
        self.challenges.insert((user.clone(), set.date), set.clone());
        Ok(())
    }
}
