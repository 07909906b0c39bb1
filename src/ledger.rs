//! Progress ledger - atomic per-user award commits
//!
//! Every mutation of a user's XP, level, streak and badge state goes
//! through here, serialized behind a per-user lock. Concurrent awards
//! for the same user never lose updates, and the streak and badge
//! consequences of an event land in the same commit as its XP or not
//! at all. Transient store failures retry the whole unit.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::badges::{newly_satisfied, pass_xp, Badge, BadgeContext};
use crate::cache::ViewCache;
use crate::counts::RecordCounts;
use crate::error::{EngineError, StoreError};
use crate::event::{ActivityEvent, EntryAttributes};
use crate::levels::Level;
use crate::model::{EarnedBadge, UserId};
use crate::notify::{Notification, Notifier};
use crate::store::ProgressStore;
use crate::streaks::{self, StreakOutcome};
use crate::xp::XpAward;

/// Per-user commit locks, created on first use and never reclaimed.
///
/// The Arc is cloned out of the map so no shard stays borrowed across
/// an await point.
#[derive(Default)]
pub(crate) struct UserLocks {
    locks: DashMap<UserId, Arc<Mutex<()>>>,
}

impl UserLocks {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn lock_for(&self, user: &UserId) -> Arc<Mutex<()>> {
        self.locks
            .entry(user.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

/// XP and level before and after a committed award
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LedgerReceipt {
    pub xp_before: u64,
    pub xp_after: u64,
    pub level_before: u32,
    pub level_after: u32,
}

impl LedgerReceipt {
    pub fn leveled_up(&self) -> bool {
        self.level_after > self.level_before
    }
}

/// A badge granted during a commit
#[derive(Debug, Clone)]
pub struct GrantedBadge {
    pub badge: &'static Badge,
    pub earned_at: DateTime<Utc>,
}

/// Everything a single entry commit produced
#[derive(Debug, Clone)]
pub struct EntryOutcome {
    pub award: XpAward,
    pub streak: StreakOutcome,
    pub new_badges: Vec<GrantedBadge>,
    pub receipt: LedgerReceipt,
}

/// Serializes all progress mutations for a user
pub struct ProgressLedger {
    store: Arc<dyn ProgressStore>,
    counts: Arc<dyn RecordCounts>,
    notifier: Arc<dyn Notifier>,
    cache: Arc<ViewCache>,
    locks: Arc<UserLocks>,
    max_attempts: u32,
}

impl ProgressLedger {
    pub(crate) fn new(
        store: Arc<dyn ProgressStore>,
        counts: Arc<dyn RecordCounts>,
        notifier: Arc<dyn Notifier>,
        cache: Arc<ViewCache>,
        locks: Arc<UserLocks>,
        max_attempts: u32,
    ) -> Self {
        Self {
            store,
            counts,
            notifier,
            cache,
            locks,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Commit a journal entry: entry XP, streak advance and a badge
    /// pass, applied as one unit.
    pub async fn commit_entry(
        &self,
        user: &UserId,
        attrs: EntryAttributes,
        day: NaiveDate,
    ) -> Result<EntryOutcome, EngineError> {
        let lock = self.locks.lock_for(user);
        let guard = lock.lock().await;

        let mut attempt = 1;
        let outcome = loop {
            match self.entry_once(user, attrs, day).await {
                Ok(outcome) => break outcome,
                Err(e) if e.is_retryable() && attempt < self.max_attempts => {
                    warn!(
                        "Retrying entry commit for {} after store failure (attempt {}): {}",
                        user, attempt, e
                    );
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        };

        drop(guard);
        debug!(
            "Committed entry award of {} XP for {}",
            outcome.award.total, user
        );
        self.cache.invalidate_user(user);

        if let Some(days) = outcome.streak.milestone {
            info!(
                "{} reached a {}-day streak (+{} XP)",
                user, days, outcome.streak.bonus_xp
            );
        }
        if outcome.receipt.leveled_up() {
            info!(
                "{} leveled up: {} -> {}",
                user, outcome.receipt.level_before, outcome.receipt.level_after
            );
        }
        for granted in &outcome.new_badges {
            info!(
                "{} earned badge '{}' (+{} XP)",
                user, granted.badge.name, granted.badge.xp_reward
            );
        }
        self.dispatch(user, self.entry_notifications(&outcome)).await;

        Ok(outcome)
    }

    /// Commit a fixed award (goal milestone, session, challenge).
    pub async fn commit_fixed(
        &self,
        user: &UserId,
        award: &XpAward,
        reason: &str,
    ) -> Result<LedgerReceipt, EngineError> {
        let lock = self.locks.lock_for(user);
        let guard = lock.lock().await;

        let mut attempt = 1;
        let receipt = loop {
            match self.fixed_once(user, award) {
                Ok(receipt) => break receipt,
                Err(e) if e.is_retryable() && attempt < self.max_attempts => {
                    warn!(
                        "Retrying fixed award for {} after store failure (attempt {}): {}",
                        user, attempt, e
                    );
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        };

        drop(guard);
        debug!("Awarded {} XP to {} for {}", award.total, user, reason);
        self.cache.invalidate_user(user);

        if receipt.leveled_up() {
            info!(
                "{} leveled up: {} -> {}",
                user, receipt.level_before, receipt.level_after
            );
            let title = Level::for_xp(receipt.xp_after).title.to_string();
            self.dispatch(
                user,
                vec![Notification::LevelUp {
                    old_level: receipt.level_before,
                    new_level: receipt.level_after,
                    title,
                }],
            )
            .await;
        }

        Ok(receipt)
    }

    /// Adjust XP by a signed delta, clamping at zero. Level is
    /// recomputed in the same write. No notifications are sent.
    pub async fn apply_correction(
        &self,
        user: &UserId,
        delta: i64,
        reason: &str,
    ) -> Result<LedgerReceipt, EngineError> {
        let lock = self.locks.lock_for(user);
        let _guard = lock.lock().await;

        let mut attempt = 1;
        let receipt = loop {
            match self.correction_once(user, delta) {
                Ok(receipt) => break receipt,
                Err(e) if e.is_retryable() && attempt < self.max_attempts => {
                    warn!(
                        "Retrying XP correction for {} after store failure (attempt {}): {}",
                        user, attempt, e
                    );
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        };

        info!(
            "Corrected XP for {} by {} ({}): {} -> {}",
            user, delta, reason, receipt.xp_before, receipt.xp_after
        );
        self.cache.invalidate_user(user);
        Ok(receipt)
    }

    /// One attempt at an entry commit. Reloads state from the store so
    /// a retry starts from scratch.
    async fn entry_once(
        &self,
        user: &UserId,
        attrs: EntryAttributes,
        day: NaiveDate,
    ) -> Result<EntryOutcome, EngineError> {
        let award = XpAward::for_event(&ActivityEvent::EntryCreated(attrs));

        let mut progress = self.store.load_progress(user)?.unwrap_or_default();
        let xp_before = progress.xp;
        let level_before = Level::for_xp(xp_before).level;

        let (streak_state, streak) = streaks::advance(progress.streak_state(), day);

        // Count queries are part of the atomic unit: if they fail the
        // whole commit retries.
        let entry_count = self
            .counts
            .entry_count(user)
            .await
            .map_err(|e| EngineError::Store(StoreError::unavailable(e)))?;
        let session_count = self
            .counts
            .session_count(user)
            .await
            .map_err(|e| EngineError::Store(StoreError::unavailable(e)))?;

        // Badges see the state this event is about to produce. XP from
        // the badges themselves lands after the pass, so one badge
        // firing cannot enable another within the same pass.
        let prospective_xp = xp_before + award.total as u64 + streak.bonus_xp as u64;
        let ctx = BadgeContext {
            entry_count,
            session_count,
            current_streak: streak.current_streak,
            best_streak: streak_state.best,
            level: Level::for_xp(prospective_xp).level,
            xp: prospective_xp,
        };

        let earned = progress.earned_badge_ids();
        let new_badges = newly_satisfied(&ctx, &earned);
        let badge_xp = pass_xp(&new_badges);

        let xp_after = prospective_xp + badge_xp as u64;
        let level_after = Level::for_xp(xp_after).level;

        let now = Utc::now();
        let granted: Vec<GrantedBadge> = new_badges
            .into_iter()
            .map(|badge| GrantedBadge {
                badge,
                earned_at: now,
            })
            .collect();

        progress.xp = xp_after;
        progress.level = level_after;
        progress.apply_streak(streak_state);
        for g in &granted {
            progress.badges.push(EarnedBadge {
                id: g.badge.id,
                earned_at: g.earned_at,
                xp_awarded: g.badge.xp_reward,
            });
        }

        self.store.save_progress(user, &progress)?;

        Ok(EntryOutcome {
            award,
            streak,
            new_badges: granted,
            receipt: LedgerReceipt {
                xp_before,
                xp_after,
                level_before,
                level_after,
            },
        })
    }

    fn fixed_once(&self, user: &UserId, award: &XpAward) -> Result<LedgerReceipt, EngineError> {
        let mut progress = self.store.load_progress(user)?.unwrap_or_default();
        let xp_before = progress.xp;
        let level_before = Level::for_xp(xp_before).level;

        let xp_after = xp_before + award.total as u64;
        let level_after = Level::for_xp(xp_after).level;
        progress.xp = xp_after;
        progress.level = level_after;

        self.store.save_progress(user, &progress)?;

        Ok(LedgerReceipt {
            xp_before,
            xp_after,
            level_before,
            level_after,
        })
    }

    fn correction_once(&self, user: &UserId, delta: i64) -> Result<LedgerReceipt, EngineError> {
        let mut progress = self.store.load_progress(user)?.unwrap_or_default();
        let xp_before = progress.xp;
        let level_before = Level::for_xp(xp_before).level;

        let xp_after = if delta >= 0 {
            xp_before + delta as u64
        } else {
            xp_before.saturating_sub(delta.unsigned_abs())
        };
        let level_after = Level::for_xp(xp_after).level;
        progress.xp = xp_after;
        progress.level = level_after;

        self.store.save_progress(user, &progress)?;

        Ok(LedgerReceipt {
            xp_before,
            xp_after,
            level_before,
            level_after,
        })
    }

    fn entry_notifications(&self, outcome: &EntryOutcome) -> Vec<Notification> {
        let mut notes = Vec::new();
        if let Some(days) = outcome.streak.milestone {
            notes.push(Notification::StreakMilestone {
                days,
                bonus_xp: outcome.streak.bonus_xp,
            });
        }
        if outcome.receipt.leveled_up() {
            notes.push(Notification::LevelUp {
                old_level: outcome.receipt.level_before,
                new_level: outcome.receipt.level_after,
                title: Level::for_xp(outcome.receipt.xp_after).title.to_string(),
            });
        }
        for granted in &outcome.new_badges {
            notes.push(Notification::BadgeEarned {
                id: granted.badge.id,
                name: granted.badge.name.to_string(),
                xp: granted.badge.xp_reward,
            });
        }
        notes
    }

    /// Best-effort delivery: failures are logged, never propagated.
    async fn dispatch(&self, user: &UserId, notes: Vec<Notification>) {
        for note in notes {
            if let Err(e) = self.notifier.notify(user, note).await {
                warn!("Failed to deliver notification for {}: {}", user, e);
            }
        }
    }
}
