//! Core progression records
//!
//! The per-user progress record is the unit of atomicity: every
//! awarding event rewrites it as a whole through the ledger, never
//! field-by-field from multiple places.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::badges::BadgeId;
use crate::streaks::StreakState;

/// Opaque user identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for UserId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A badge the user holds, with when and for how much it was granted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EarnedBadge {
    pub id: BadgeId,
    pub earned_at: DateTime<Utc>,
    pub xp_awarded: u32,
}

/// Per-user progression record.
///
/// `level` is always the level table applied to `xp`; the ledger
/// recomputes it on every committed mutation so the pair can never
/// disagree. `badges` is append-only and unique by badge id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProgress {
    pub xp: u64,
    pub level: u32,
    pub streak: u32,
    pub best_streak: u32,
    pub last_active_day: Option<NaiveDate>,
    pub badges: Vec<EarnedBadge>,
}

impl Default for UserProgress {
    fn default() -> Self {
        Self {
            xp: 0,
            level: 1,
            streak: 0,
            best_streak: 0,
            last_active_day: None,
            badges: Vec::new(),
        }
    }
}

impl UserProgress {
    pub fn has_badge(&self, id: BadgeId) -> bool {
        self.badges.iter().any(|b| b.id == id)
    }

    pub fn earned_badge_ids(&self) -> Vec<BadgeId> {
        self.badges.iter().map(|b| b.id).collect()
    }

    /// Streak fields as the streak machine consumes them.
    pub fn streak_state(&self) -> StreakState {
        StreakState {
            current: self.streak,
            best: self.best_streak,
            last_active_day: self.last_active_day,
        }
    }

    pub(crate) fn apply_streak(&mut self, state: StreakState) {
        self.streak = state.current;
        self.best_streak = state.best;
        self.last_active_day = state.last_active_day;
    }
}
