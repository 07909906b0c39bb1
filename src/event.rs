//! Activity events and challenge signals
//!
//! Callers translate whatever happened in the application (an entry was
//! written, a session finished, a goal milestone was hit) into one of
//! these payloads. Events are ephemeral: each one is consumed exactly
//! once by the engine and carries no identity of its own.

use serde::{Deserialize, Serialize};

/// Scoring-relevant attributes of a journal entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryAttributes {
    pub word_count: u32,
    pub tag_count: u32,
    pub has_title: bool,
    pub has_geo: bool,
}

/// Kind of timed session the user completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionKind {
    Focus,
    Meditation,
    Breathing,
}

impl SessionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Focus => "focus",
            Self::Meditation => "meditation",
            Self::Breathing => "breathing",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "focus" => Some(Self::Focus),
            "meditation" => Some(Self::Meditation),
            "breathing" => Some(Self::Breathing),
            _ => None,
        }
    }

    /// Fixed XP for finishing a session of this kind.
    pub fn xp_reward(&self) -> u32 {
        match self {
            Self::Focus => 20,
            Self::Meditation => 15,
            Self::Breathing => 10,
        }
    }
}

/// Something the user did that can earn XP.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActivityEvent {
    /// A journal entry was created. The richest case: scored by the
    /// XP calculator and the only kind that advances the daily streak.
    EntryCreated(EntryAttributes),
    /// A goal milestone was reached; the reward is set by the caller.
    GoalMilestoneCompleted { xp_reward: u32 },
    /// A timed session finished.
    SessionCompleted { kind: SessionKind, minutes: u32 },
    /// A daily challenge was completed; the reward comes off the
    /// challenge instance.
    ChallengeCompleted { xp_reward: u32 },
}

impl ActivityEvent {
    pub fn kind_str(&self) -> &'static str {
        match self {
            Self::EntryCreated(_) => "entry_created",
            Self::GoalMilestoneCompleted { .. } => "goal_milestone_completed",
            Self::SessionCompleted { .. } => "session_completed",
            Self::ChallengeCompleted { .. } => "challenge_completed",
        }
    }
}

/// Activity as seen by the daily challenge rules.
///
/// Separate from [`ActivityEvent`] because challenge rules need context
/// the awarding path never looks at (local hour, entry text for keyword
/// rules).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActivitySignal {
    Entry {
        attrs: EntryAttributes,
        /// Local hour of day (0-23) the entry was written.
        hour: u32,
        /// Entry body, used by keyword-based challenges.
        text: String,
    },
    Session {
        kind: SessionKind,
        minutes: u32,
    },
}
