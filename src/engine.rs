//! Engine facade: wires the ledger, challenge manager and view cache
//!
//! This is the surface the embedding application talks to. Construct
//! one engine per process with the store and collaborator
//! implementations, then clone it freely; all clones share the same
//! locks, cache and counters.

use std::sync::Arc;

use chrono::{Local, NaiveDate};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::cache::ViewCache;
use crate::challenges::{ChallengeCompletion, ChallengeManager, DailyChallengeSet};
use crate::config::EngineConfig;
use crate::counts::RecordCounts;
use crate::error::{EngineError, StoreError};
use crate::event::{ActivityEvent, ActivitySignal, EntryAttributes};
use crate::ledger::{EntryOutcome, GrantedBadge, LedgerReceipt, ProgressLedger, UserLocks};
use crate::levels::LevelSnapshot;
use crate::model::{UserId, UserProgress};
use crate::notify::Notifier;
use crate::store::ProgressStore;
use crate::streaks::StreakOutcome;
use crate::xp::XpAward;

/// Outcome of awarding any activity event
#[derive(Debug, Clone)]
pub struct AwardOutcome {
    pub award: XpAward,
    /// Present only for entry events; fixed awards do not touch the streak.
    pub streak: Option<StreakOutcome>,
    pub new_badges: Vec<GrantedBadge>,
    pub receipt: LedgerReceipt,
}

/// The engagement progression engine
#[derive(Clone)]
pub struct ProgressEngine {
    store: Arc<dyn ProgressStore>,
    counts: Arc<dyn RecordCounts>,
    ledger: Arc<ProgressLedger>,
    challenges: Arc<ChallengeManager>,
    cache: Arc<ViewCache>,
}

impl ProgressEngine {
    pub fn new(
        store: Arc<dyn ProgressStore>,
        counts: Arc<dyn RecordCounts>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self::with_config(store, counts, notifier, EngineConfig::default())
    }

    pub fn with_config(
        store: Arc<dyn ProgressStore>,
        counts: Arc<dyn RecordCounts>,
        notifier: Arc<dyn Notifier>,
        config: EngineConfig,
    ) -> Self {
        let cache = Arc::new(ViewCache::new(config.cache_ttl()));
        let locks = Arc::new(UserLocks::new());
        let ledger = Arc::new(ProgressLedger::new(
            store.clone(),
            counts.clone(),
            notifier,
            cache.clone(),
            locks.clone(),
            config.store_retries,
        ));
        let challenges = Arc::new(ChallengeManager::new(
            store.clone(),
            ledger.clone(),
            cache.clone(),
            locks,
        ));
        Self {
            store,
            counts,
            ledger,
            challenges,
            cache,
        }
    }

    // === AWARDS ===

    /// Award XP for a newly created journal entry, dated today.
    pub async fn award_for_entry(
        &self,
        user: &UserId,
        attrs: EntryAttributes,
    ) -> Result<EntryOutcome, EngineError> {
        self.award_for_entry_on(user, attrs, Local::now().date_naive())
            .await
    }

    /// Award XP for a journal entry on an explicit activity date.
    pub async fn award_for_entry_on(
        &self,
        user: &UserId,
        attrs: EntryAttributes,
        day: NaiveDate,
    ) -> Result<EntryOutcome, EngineError> {
        self.ledger.commit_entry(user, attrs, day).await
    }

    /// Award XP for any activity event.
    pub async fn award_for_event(
        &self,
        user: &UserId,
        event: &ActivityEvent,
    ) -> Result<AwardOutcome, EngineError> {
        match event {
            ActivityEvent::EntryCreated(attrs) => {
                let outcome = self.award_for_entry(user, *attrs).await?;
                Ok(AwardOutcome {
                    award: outcome.award,
                    streak: Some(outcome.streak),
                    new_badges: outcome.new_badges,
                    receipt: outcome.receipt,
                })
            }
            other => {
                let award = XpAward::for_event(other);
                let receipt = self
                    .ledger
                    .commit_fixed(user, &award, other.kind_str())
                    .await?;
                Ok(AwardOutcome {
                    award,
                    streak: None,
                    new_badges: Vec::new(),
                    receipt,
                })
            }
        }
    }

    /// Award a fixed amount of XP with a free-form reason.
    pub async fn award_fixed(
        &self,
        user: &UserId,
        amount: u32,
        reason: &str,
    ) -> Result<LedgerReceipt, EngineError> {
        self.ledger
            .commit_fixed(user, &XpAward::fixed(amount), reason)
            .await
    }

    /// Adjust a user's XP by a signed delta (support tooling).
    pub async fn apply_correction(
        &self,
        user: &UserId,
        delta: i64,
        reason: &str,
    ) -> Result<LedgerReceipt, EngineError> {
        self.ledger.apply_correction(user, delta, reason).await
    }

    // === CHALLENGES ===

    /// Fetch the challenge set for (user, date), rolling one if absent.
    pub async fn get_or_create_today_challenges(
        &self,
        user: &UserId,
        date: NaiveDate,
    ) -> Result<DailyChallengeSet, EngineError> {
        self.challenges.get_or_create(user, date).await
    }

    /// Feed an activity signal to the day's incomplete challenges.
    pub async fn record_challenge_activity(
        &self,
        user: &UserId,
        date: NaiveDate,
        signal: &ActivitySignal,
    ) -> Result<DailyChallengeSet, EngineError> {
        self.challenges.record_activity(user, date, signal).await
    }

    /// Explicitly complete a single challenge.
    pub async fn complete_challenge(
        &self,
        user: &UserId,
        date: NaiveDate,
        challenge_id: Uuid,
        progress: Option<u32>,
    ) -> Result<ChallengeCompletion, EngineError> {
        self.challenges
            .complete_challenge(user, date, challenge_id, progress)
            .await
    }

    // === READS ===

    /// Current progress record for a user (default if none exists yet).
    pub fn progress(&self, user: &UserId) -> Result<UserProgress, EngineError> {
        Ok(self.store.load_progress(user)?.unwrap_or_default())
    }

    /// Cached dashboard summary for a user.
    pub async fn dashboard(&self, user: &UserId) -> Result<Value, EngineError> {
        self.cache
            .get_or_compute("dashboard", user, || self.build_dashboard(user))
            .await
    }

    /// Drop every cached view for a user. For mutations of user-owned
    /// records that do not go through the engine.
    pub fn invalidate(&self, user: &UserId) {
        self.cache.invalidate_user(user);
    }

    pub fn cache(&self) -> &ViewCache {
        &self.cache
    }

    async fn build_dashboard(&self, user: &UserId) -> Result<Value, EngineError> {
        let progress = self.store.load_progress(user)?.unwrap_or_default();
        let snapshot = LevelSnapshot::new(progress.xp);
        let entry_count = self
            .counts
            .entry_count(user)
            .await
            .map_err(|e| EngineError::Store(StoreError::unavailable(e)))?;

        // Read-only: a dashboard view does not roll a challenge set.
        let today = self.store.load_challenge_set(user, Local::now().date_naive())?;

        Ok(json!({
            "xp": snapshot.xp,
            "level": snapshot.level,
            "title": snapshot.title,
            "level_progress": snapshot.progress_to_next(),
            "next_level_xp": snapshot.next_level_xp,
            "streak": progress.streak,
            "best_streak": progress.best_streak,
            "badges_earned": progress.badges.len(),
            "entries": entry_count,
            "challenges": today.map(|set| json!({
                "completed": set.completed_count,
                "total": set.challenges.len(),
                "xp_earned": set.total_xp_earned,
            })),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::counts::StaticCounts;
    use crate::event::SessionKind;
    use crate::notify::NullNotifier;
    use crate::store::MemoryStore;

    fn engine() -> (ProgressEngine, Arc<MemoryStore>, Arc<StaticCounts>) {
        let store = Arc::new(MemoryStore::new());
        let counts = Arc::new(StaticCounts::new());
        let engine = ProgressEngine::new(
            store.clone(),
            counts.clone(),
            Arc::new(NullNotifier),
        );
        (engine, store, counts)
    }

    fn day(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn test_fixed_event_awards() {
        let (engine, _, _) = engine();
        let user = UserId::from("u1");

        let outcome = engine
            .award_for_event(&user, &ActivityEvent::GoalMilestoneCompleted { xp_reward: 40 })
            .await
            .unwrap();
        assert_eq!(outcome.award.total, 40);
        assert!(outcome.streak.is_none());
        assert!(outcome.new_badges.is_empty());

        let outcome = engine
            .award_for_event(
                &user,
                &ActivityEvent::SessionCompleted {
                    kind: SessionKind::Focus,
                    minutes: 25,
                },
            )
            .await
            .unwrap();
        assert_eq!(outcome.award.total, 20);
        assert_eq!(outcome.receipt.xp_after, 60);
    }

    #[tokio::test]
    async fn test_entry_event_routes_through_entry_path() {
        let (engine, store, _) = engine();
        let user = UserId::from("u1");

        let attrs = EntryAttributes {
            word_count: 150,
            tag_count: 3,
            has_title: true,
            has_geo: true,
        };
        let outcome = engine
            .award_for_event(&user, &ActivityEvent::EntryCreated(attrs))
            .await
            .unwrap();
        assert_eq!(outcome.award.total, 95);
        let streak = outcome.streak.expect("entry events advance the streak");
        assert_eq!(streak.current_streak, 1);

        let progress = store.load_progress(&user).unwrap().unwrap();
        assert_eq!(progress.xp, 95);
        assert_eq!(progress.level, 1);
    }

    #[tokio::test]
    async fn test_dashboard_is_cached_and_invalidated_on_award() {
        let (engine, _, _) = engine();
        let user = UserId::from("u1");

        let first = engine.dashboard(&user).await.unwrap();
        assert_eq!(first["xp"], 0);
        let second = engine.dashboard(&user).await.unwrap();
        assert_eq!(second, first);
        assert_eq!(engine.cache().hit_count(), 1);

        engine.award_fixed(&user, 120, "test").await.unwrap();

        let after = engine.dashboard(&user).await.unwrap();
        assert_eq!(after["xp"], 120);
        assert_eq!(after["level"], 2);
    }

    #[tokio::test]
    async fn test_manual_invalidate_drops_cached_views() {
        let (engine, _, counts) = engine();
        let user = UserId::from("u1");

        let before = engine.dashboard(&user).await.unwrap();
        assert_eq!(before["entries"], 0);

        // An entry created outside the engine: caller must invalidate.
        counts.set_entries(4);
        engine.invalidate(&user);

        let after = engine.dashboard(&user).await.unwrap();
        assert_eq!(after["entries"], 4);
    }

    #[tokio::test]
    async fn test_progress_defaults_for_new_user() {
        let (engine, _, _) = engine();
        let progress = engine.progress(&UserId::from("nobody")).unwrap();
        assert_eq!(progress.xp, 0);
        assert_eq!(progress.level, 1);
        assert!(progress.badges.is_empty());
    }

    #[tokio::test]
    async fn test_challenge_flow_through_engine() {
        let (engine, _, _) = engine();
        let user = UserId::from("u1");
        let date = day("2025-03-01");

        let set = engine
            .get_or_create_today_challenges(&user, date)
            .await
            .unwrap();
        assert_eq!(set.challenges.len(), 3);

        let id = set.challenges[0].id;
        let completion = engine
            .complete_challenge(&user, date, id, None)
            .await
            .unwrap();
        assert_eq!(completion.xp_earned, set.challenges[0].xp_reward);

        let progress = engine.progress(&user).unwrap();
        assert_eq!(progress.xp, completion.xp_earned as u64);

        let err = engine
            .complete_challenge(&user, date, id, None)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::AlreadyCompleted(_)));
    }
}
