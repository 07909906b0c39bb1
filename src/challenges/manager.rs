//! Challenge lifecycle: generation, progress tracking, completion
//!
//! One set of three challenges per user per day, rolled on first
//! access. Mutations share the ledger's per-user locks; completion XP
//! is awarded through the ledger after the set is saved and the lock
//! released, so the award commit never nests inside a challenge
//! mutation.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tracing::warn;
use uuid::Uuid;

use super::catalog::{ChallengeKind, DailyChallengeSet};
use crate::cache::ViewCache;
use crate::error::EngineError;
use crate::event::{ActivityEvent, ActivitySignal};
use crate::ledger::{LedgerReceipt, ProgressLedger, UserLocks};
use crate::model::UserId;
use crate::store::ProgressStore;
use crate::xp::XpAward;

/// Result of an explicit challenge completion
#[derive(Debug, Clone, Copy)]
pub struct ChallengeCompletion {
    pub xp_earned: u32,
    pub receipt: LedgerReceipt,
}

/// Manages per-user daily challenge sets
pub struct ChallengeManager {
    store: Arc<dyn ProgressStore>,
    ledger: Arc<ProgressLedger>,
    cache: Arc<ViewCache>,
    locks: Arc<UserLocks>,
}

impl ChallengeManager {
    pub(crate) fn new(
        store: Arc<dyn ProgressStore>,
        ledger: Arc<ProgressLedger>,
        cache: Arc<ViewCache>,
        locks: Arc<UserLocks>,
    ) -> Self {
        Self {
            store,
            ledger,
            cache,
            locks,
        }
    }

    /// Return the challenge set for (user, date), rolling and
    /// persisting one if none exists yet. Concurrent first access
    /// yields the same set for every caller.
    pub async fn get_or_create(
        &self,
        user: &UserId,
        date: NaiveDate,
    ) -> Result<DailyChallengeSet, EngineError> {
        if let Some(set) = self.store.load_challenge_set(user, date)? {
            return Ok(set);
        }
        // The store arbitrates the race: whoever inserts first wins
        // and everyone gets the winner back.
        let set = self
            .store
            .create_challenge_set_if_absent(user, DailyChallengeSet::roll(date))?;
        // A new set is a mutation: cached views listing challenges are
        // stale now.
        self.cache.invalidate_user(user);
        Ok(set)
    }

    /// Feed an activity signal to every incomplete challenge in the
    /// day's set. Challenges that complete are awarded their XP
    /// through the ledger.
    pub async fn record_activity(
        &self,
        user: &UserId,
        date: NaiveDate,
        signal: &ActivitySignal,
    ) -> Result<DailyChallengeSet, EngineError> {
        let lock = self.locks.lock_for(user);
        let guard = lock.lock().await;

        let mut created = false;
        let mut set = match self.store.load_challenge_set(user, date)? {
            Some(set) => set,
            None => {
                created = true;
                self.store
                    .create_challenge_set_if_absent(user, DailyChallengeSet::roll(date))?
            }
        };

        let mut changed = false;
        let mut completions: Vec<(ChallengeKind, u32)> = Vec::new();
        for inst in set.challenges.iter_mut() {
            let before = inst.progress;
            if inst.observe(signal) {
                completions.push((inst.kind, inst.xp_reward));
                changed = true;
            } else if inst.progress != before {
                changed = true;
            }
        }

        if changed {
            set.recompute_totals();
            self.store.save_challenge_set(user, &set)?;
        }

        drop(guard);
        if changed || created {
            self.cache.invalidate_user(user);
        }

        // Award after the lock is released: the ledger takes the same
        // per-user lock.
        for (kind, xp_reward) in completions {
            let award = XpAward::for_event(&ActivityEvent::ChallengeCompleted { xp_reward });
            if let Err(e) = self
                .ledger
                .commit_fixed(user, &award, &format!("challenge: {}", kind.as_str()))
                .await
            {
                warn!(
                    "Challenge '{}' completed for {} but XP award failed: {}",
                    kind.as_str(),
                    user,
                    e
                );
            }
        }

        Ok(set)
    }

    /// Explicitly complete one challenge. Fails with `AlreadyCompleted`
    /// if it was completed before, `NotFound` if the set or challenge
    /// does not exist for that date.
    pub async fn complete_challenge(
        &self,
        user: &UserId,
        date: NaiveDate,
        challenge_id: Uuid,
        progress: Option<u32>,
    ) -> Result<ChallengeCompletion, EngineError> {
        let lock = self.locks.lock_for(user);
        let guard = lock.lock().await;

        let mut set = self
            .store
            .load_challenge_set(user, date)?
            .ok_or_else(|| EngineError::not_found(format!("no challenge set for {date}")))?;

        let inst = set
            .challenges
            .iter_mut()
            .find(|c| c.id == challenge_id)
            .ok_or_else(|| EngineError::not_found(format!("no challenge {challenge_id}")))?;

        if inst.completed {
            return Err(EngineError::AlreadyCompleted(challenge_id));
        }

        inst.progress = progress.unwrap_or(inst.target);
        inst.completed = true;
        inst.completed_at = Some(Utc::now());
        let kind = inst.kind;
        let xp_earned = inst.xp_reward;

        set.recompute_totals();
        self.store.save_challenge_set(user, &set)?;

        drop(guard);
        self.cache.invalidate_user(user);

        let award = XpAward::for_event(&ActivityEvent::ChallengeCompleted {
            xp_reward: xp_earned,
        });
        let receipt = self
            .ledger
            .commit_fixed(user, &award, &format!("challenge: {}", kind.as_str()))
            .await?;

        Ok(ChallengeCompletion { xp_earned, receipt })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::challenges::catalog::ChallengeInstance;
    use crate::counts::StaticCounts;
    use crate::event::EntryAttributes;
    use crate::notify::NullNotifier;
    use crate::store::{MemoryStore, ProgressStore};

    fn day(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn manager_with(store: Arc<MemoryStore>) -> ChallengeManager {
        let cache = Arc::new(ViewCache::new(Duration::from_secs(60)));
        let locks = Arc::new(UserLocks::new());
        let ledger = Arc::new(ProgressLedger::new(
            store.clone(),
            Arc::new(StaticCounts::new()),
            Arc::new(NullNotifier),
            cache.clone(),
            locks.clone(),
            3,
        ));
        ChallengeManager::new(store, ledger, cache, locks)
    }

    fn fixed_set(date: NaiveDate, kinds: &[ChallengeKind]) -> DailyChallengeSet {
        DailyChallengeSet {
            date,
            challenges: kinds.iter().map(|k| ChallengeInstance::new(*k)).collect(),
            completed_count: 0,
            total_xp_earned: 0,
        }
    }

    #[tokio::test]
    async fn test_get_or_create_is_stable() {
        let store = Arc::new(MemoryStore::new());
        let manager = manager_with(store);
        let user = UserId::from("u1");
        let date = day("2025-03-01");

        let first = manager.get_or_create(&user, date).await.unwrap();
        let second = manager.get_or_create(&user, date).await.unwrap();

        assert_eq!(first.challenges.len(), 3);
        let first_ids: Vec<Uuid> = first.challenges.iter().map(|c| c.id).collect();
        let second_ids: Vec<Uuid> = second.challenges.iter().map(|c| c.id).collect();
        assert_eq!(first_ids, second_ids);
    }

    #[tokio::test]
    async fn test_record_activity_tracks_progress_and_awards_on_completion() {
        let store = Arc::new(MemoryStore::new());
        let user = UserId::from("u1");
        let date = day("2025-03-01");
        store
            .create_challenge_set_if_absent(
                &user,
                fixed_set(date, &[ChallengeKind::Wordsmith, ChallengeKind::TripleEntry]),
            )
            .unwrap();
        let manager = manager_with(store.clone());

        let signal = ActivitySignal::Entry {
            attrs: EntryAttributes {
                word_count: 120,
                ..Default::default()
            },
            hour: 12,
            text: String::new(),
        };
        let set = manager.record_activity(&user, date, &signal).await.unwrap();

        let wordsmith = set
            .challenges
            .iter()
            .find(|c| c.kind == ChallengeKind::Wordsmith)
            .unwrap();
        assert_eq!(wordsmith.progress, 120);
        assert!(!wordsmith.completed);
        let triple = set
            .challenges
            .iter()
            .find(|c| c.kind == ChallengeKind::TripleEntry)
            .unwrap();
        assert_eq!(triple.progress, 1);
        assert_eq!(set.completed_count, 0);

        // 250 words pushes Wordsmith over its 200 target.
        let signal = ActivitySignal::Entry {
            attrs: EntryAttributes {
                word_count: 250,
                ..Default::default()
            },
            hour: 12,
            text: String::new(),
        };
        let set = manager.record_activity(&user, date, &signal).await.unwrap();
        let wordsmith = set
            .challenges
            .iter()
            .find(|c| c.kind == ChallengeKind::Wordsmith)
            .unwrap();
        assert!(wordsmith.completed);
        assert_eq!(set.completed_count, 1);
        assert_eq!(set.total_xp_earned, wordsmith.xp_reward);

        // Completion XP reached the progress record through the ledger.
        let progress = store.load_progress(&user).unwrap().unwrap();
        assert_eq!(progress.xp, wordsmith.xp_reward as u64);
    }

    #[tokio::test]
    async fn test_completed_challenge_is_never_reevaluated() {
        let store = Arc::new(MemoryStore::new());
        let user = UserId::from("u1");
        let date = day("2025-03-01");
        store
            .create_challenge_set_if_absent(&user, fixed_set(date, &[ChallengeKind::Gratitude]))
            .unwrap();
        let manager = manager_with(store.clone());

        let signal = ActivitySignal::Entry {
            attrs: Default::default(),
            hour: 12,
            text: "so grateful for today".to_string(),
        };
        manager.record_activity(&user, date, &signal).await.unwrap();
        let set = manager.record_activity(&user, date, &signal).await.unwrap();

        assert_eq!(set.completed_count, 1);
        // XP was awarded exactly once.
        let progress = store.load_progress(&user).unwrap().unwrap();
        assert_eq!(progress.xp, set.total_xp_earned as u64);
    }

    #[tokio::test]
    async fn test_complete_challenge_rejects_double_completion() {
        let store = Arc::new(MemoryStore::new());
        let user = UserId::from("u1");
        let date = day("2025-03-01");
        let set = store
            .create_challenge_set_if_absent(&user, fixed_set(date, &[ChallengeKind::DeepFocus]))
            .unwrap();
        let id = set.challenges[0].id;
        let manager = manager_with(store.clone());

        let completion = manager
            .complete_challenge(&user, date, id, None)
            .await
            .unwrap();
        assert_eq!(completion.xp_earned, set.challenges[0].xp_reward);

        let err = manager
            .complete_challenge(&user, date, id, None)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::AlreadyCompleted(found) if found == id));
    }

    #[tokio::test]
    async fn test_complete_challenge_not_found() {
        let store = Arc::new(MemoryStore::new());
        let user = UserId::from("u1");
        let date = day("2025-03-01");
        let manager = manager_with(store.clone());

        // No set for the date at all.
        let err = manager
            .complete_challenge(&user, date, Uuid::new_v4(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));

        // Set exists but the id does not.
        store
            .create_challenge_set_if_absent(&user, fixed_set(date, &[ChallengeKind::Explorer]))
            .unwrap();
        let err = manager
            .complete_challenge(&user, date, Uuid::new_v4(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_complete_with_explicit_progress() {
        let store = Arc::new(MemoryStore::new());
        let user = UserId::from("u1");
        let date = day("2025-03-01");
        let set = store
            .create_challenge_set_if_absent(&user, fixed_set(date, &[ChallengeKind::DeepFocus]))
            .unwrap();
        let id = set.challenges[0].id;
        let manager = manager_with(store.clone());

        manager
            .complete_challenge(&user, date, id, Some(25))
            .await
            .unwrap();
        let saved = store.load_challenge_set(&user, date).unwrap().unwrap();
        assert_eq!(saved.challenges[0].progress, 25);
        assert!(saved.challenges[0].completed);
        assert!(saved.challenges[0].completed_at.is_some());
    }
}
