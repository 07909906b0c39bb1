//! Badge definitions and metadata
//!
//! All badges are defined here with their unlock predicates and rewards.
//! The catalog is append-only: ids of retired badges must never be
//! reused, since earned sets reference them forever.

use serde::{Deserialize, Serialize};

/// Unique identifier for each badge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BadgeId {
    // Entry milestones
    FirstEntry,
    TenEntries,
    FiftyEntries,
    HundredEntries,

    // Streak badges
    WeekStreak,
    MonthStreak,
    HundredDayStreak,

    // Level badges
    LevelFive,
    LevelTen,

    // Session badges
    TenSessions,
}

impl BadgeId {
    /// Get the string ID for database storage
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FirstEntry => "first_entry",
            Self::TenEntries => "ten_entries",
            Self::FiftyEntries => "fifty_entries",
            Self::HundredEntries => "hundred_entries",
            Self::WeekStreak => "week_streak",
            Self::MonthStreak => "month_streak",
            Self::HundredDayStreak => "hundred_day_streak",
            Self::LevelFive => "level_five",
            Self::LevelTen => "level_ten",
            Self::TenSessions => "ten_sessions",
        }
    }

    /// Parse from database string
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "first_entry" => Some(Self::FirstEntry),
            "ten_entries" => Some(Self::TenEntries),
            "fifty_entries" => Some(Self::FiftyEntries),
            "hundred_entries" => Some(Self::HundredEntries),
            "week_streak" => Some(Self::WeekStreak),
            "month_streak" => Some(Self::MonthStreak),
            "hundred_day_streak" => Some(Self::HundredDayStreak),
            "level_five" => Some(Self::LevelFive),
            "level_ten" => Some(Self::LevelTen),
            "ten_sessions" => Some(Self::TenSessions),
            _ => None,
        }
    }

    /// Get all badge IDs
    pub fn all() -> &'static [BadgeId] {
        &[
            Self::FirstEntry,
            Self::TenEntries,
            Self::FiftyEntries,
            Self::HundredEntries,
            Self::WeekStreak,
            Self::MonthStreak,
            Self::HundredDayStreak,
            Self::LevelFive,
            Self::LevelTen,
            Self::TenSessions,
        ]
    }
}

/// Badge category for grouping in UI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadgeCategory {
    Milestone,
    Streak,
    Level,
    Session,
}

impl BadgeCategory {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Milestone => "Milestones",
            Self::Streak => "Streaks",
            Self::Level => "Levels",
            Self::Session => "Sessions",
        }
    }
}

/// Aggregate user state badge predicates are evaluated against.
///
/// Counts come from the record-count collaborator; the rest is the
/// prospective progress record of the awarding pass (post-streak,
/// pre-badge-XP).
#[derive(Debug, Clone, Copy, Default)]
pub struct BadgeContext {
    pub entry_count: u64,
    pub session_count: u64,
    pub current_streak: u32,
    pub best_streak: u32,
    pub level: u32,
    pub xp: u64,
}

/// Badge definition with unlock predicate
#[derive(Debug, Clone)]
pub struct Badge {
    pub id: BadgeId,
    pub name: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
    pub category: BadgeCategory,
    pub xp_reward: u32,
    pub predicate: fn(&BadgeContext) -> bool,
}

fn earned_first_entry(ctx: &BadgeContext) -> bool {
    ctx.entry_count >= 1
}

fn earned_ten_entries(ctx: &BadgeContext) -> bool {
    ctx.entry_count >= 10
}

fn earned_fifty_entries(ctx: &BadgeContext) -> bool {
    ctx.entry_count >= 50
}

fn earned_hundred_entries(ctx: &BadgeContext) -> bool {
    ctx.entry_count >= 100
}

fn earned_week_streak(ctx: &BadgeContext) -> bool {
    ctx.best_streak >= 7
}

fn earned_month_streak(ctx: &BadgeContext) -> bool {
    ctx.best_streak >= 30
}

fn earned_hundred_day_streak(ctx: &BadgeContext) -> bool {
    ctx.best_streak >= 100
}

fn earned_level_five(ctx: &BadgeContext) -> bool {
    ctx.level >= 5
}

fn earned_level_ten(ctx: &BadgeContext) -> bool {
    ctx.level >= 10
}

fn earned_ten_sessions(ctx: &BadgeContext) -> bool {
    ctx.session_count >= 10
}

/// All badge definitions, in evaluation (and display) order
pub static BADGES: &[Badge] = &[
    // === MILESTONE ===
    Badge {
        id: BadgeId::FirstEntry,
        name: "First Words",
        description: "Write your first journal entry",
        icon: "✍️",
        category: BadgeCategory::Milestone,
        xp_reward: 10,
        predicate: earned_first_entry,
    },
    Badge {
        id: BadgeId::TenEntries,
        name: "Finding a Rhythm",
        description: "Write 10 journal entries",
        icon: "📓",
        category: BadgeCategory::Milestone,
        xp_reward: 25,
        predicate: earned_ten_entries,
    },
    Badge {
        id: BadgeId::FiftyEntries,
        name: "Dedicated Diarist",
        description: "Write 50 journal entries",
        icon: "📚",
        category: BadgeCategory::Milestone,
        xp_reward: 75,
        predicate: earned_fifty_entries,
    },
    Badge {
        id: BadgeId::HundredEntries,
        name: "Century of Pages",
        description: "Write 100 journal entries",
        icon: "💯",
        category: BadgeCategory::Milestone,
        xp_reward: 150,
        predicate: earned_hundred_entries,
    },
    // === STREAK ===
    Badge {
        id: BadgeId::WeekStreak,
        name: "Week of Flame",
        description: "Reach a 7-day streak",
        icon: "🔥",
        category: BadgeCategory::Streak,
        xp_reward: 40,
        predicate: earned_week_streak,
    },
    Badge {
        id: BadgeId::MonthStreak,
        name: "Month of Momentum",
        description: "Reach a 30-day streak",
        icon: "📅",
        category: BadgeCategory::Streak,
        xp_reward: 150,
        predicate: earned_month_streak,
    },
    Badge {
        id: BadgeId::HundredDayStreak,
        name: "Hundred Day Flame",
        description: "Reach a 100-day streak",
        icon: "👑",
        category: BadgeCategory::Streak,
        xp_reward: 500,
        predicate: earned_hundred_day_streak,
    },
    // === LEVEL ===
    Badge {
        id: BadgeId::LevelFive,
        name: "Rising Voice",
        description: "Reach level 5",
        icon: "🌱",
        category: BadgeCategory::Level,
        xp_reward: 50,
        predicate: earned_level_five,
    },
    Badge {
        id: BadgeId::LevelTen,
        name: "Sage",
        description: "Reach level 10",
        icon: "🦉",
        category: BadgeCategory::Level,
        xp_reward: 200,
        predicate: earned_level_ten,
    },
    // === SESSION ===
    Badge {
        id: BadgeId::TenSessions,
        name: "Mindful Ten",
        description: "Complete 10 sessions",
        icon: "🧘",
        category: BadgeCategory::Session,
        xp_reward: 30,
        predicate: earned_ten_sessions,
    },
];

impl Badge {
    /// Get badge definition by ID
    pub fn get(id: BadgeId) -> &'static Badge {
        BADGES
            .iter()
            .find(|b| b.id == id)
            .expect("All badges should be defined")
    }

    /// Get total number of badges
    pub fn total_count() -> usize {
        BADGES.len()
    }

    /// Get total possible XP from all badges
    pub fn total_xp() -> u32 {
        BADGES.iter().map(|b| b.xp_reward).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_id_has_a_definition() {
        for id in BadgeId::all() {
            let badge = Badge::get(*id);
            assert_eq!(badge.id, *id);
        }
        assert_eq!(Badge::total_count(), BadgeId::all().len());
    }

    #[test]
    fn test_string_round_trip() {
        for id in BadgeId::all() {
            assert_eq!(BadgeId::from_str(id.as_str()), Some(*id));
        }
        assert_eq!(BadgeId::from_str("unknown_badge"), None);
    }

    #[test]
    fn test_serde_matches_storage_strings() {
        for id in BadgeId::all() {
            let json = serde_json::to_value(id).unwrap();
            assert_eq!(json, serde_json::Value::String(id.as_str().to_string()));
        }
    }

    #[test]
    fn test_predicates_against_empty_context() {
        let ctx = BadgeContext::default();
        for badge in BADGES {
            assert!(
                !(badge.predicate)(&ctx),
                "badge {} unlocked with no activity",
                badge.id.as_str()
            );
        }
    }
}
