//! Daily challenge catalog
//!
//! Nine challenge types; every user gets a random three per day. Each
//! definition carries the rule its instances are evaluated with, the
//! completion target, and the XP paid on completion.

use chrono::{DateTime, NaiveDate, Utc};
use once_cell::sync::Lazy;
use rand::seq::SliceRandom;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::event::ActivitySignal;

/// Number of challenges rolled per user per day
pub const DAILY_CHALLENGE_COUNT: usize = 3;

static GRATITUDE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(grateful|gratitude|thankful|thankfulness|appreciate|appreciation)\b")
        .expect("valid gratitude pattern")
});

/// Unique identifier for each challenge type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeKind {
    Wordsmith,
    TripleEntry,
    EarlyBird,
    NightOwl,
    TagCollector,
    Gratitude,
    Explorer,
    Headline,
    DeepFocus,
}

impl ChallengeKind {
    /// Get the string ID for storage
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Wordsmith => "wordsmith",
            Self::TripleEntry => "triple_entry",
            Self::EarlyBird => "early_bird",
            Self::NightOwl => "night_owl",
            Self::TagCollector => "tag_collector",
            Self::Gratitude => "gratitude",
            Self::Explorer => "explorer",
            Self::Headline => "headline",
            Self::DeepFocus => "deep_focus",
        }
    }

    /// Parse from storage string
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "wordsmith" => Some(Self::Wordsmith),
            "triple_entry" => Some(Self::TripleEntry),
            "early_bird" => Some(Self::EarlyBird),
            "night_owl" => Some(Self::NightOwl),
            "tag_collector" => Some(Self::TagCollector),
            "gratitude" => Some(Self::Gratitude),
            "explorer" => Some(Self::Explorer),
            "headline" => Some(Self::Headline),
            "deep_focus" => Some(Self::DeepFocus),
            _ => None,
        }
    }

    /// Get all challenge kinds
    pub fn all() -> &'static [ChallengeKind] {
        &[
            Self::Wordsmith,
            Self::TripleEntry,
            Self::EarlyBird,
            Self::NightOwl,
            Self::TagCollector,
            Self::Gratitude,
            Self::Explorer,
            Self::Headline,
            Self::DeepFocus,
        ]
    }
}

/// Completion rule for a challenge type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeRule {
    /// A single entry with at least N words
    EntryWords(u32),
    /// N entries written during the day
    EntriesToday(u32),
    /// An entry written before local hour H
    EntryBeforeHour(u32),
    /// An entry written at or after local hour H
    EntryAfterHour(u32),
    /// A single entry carrying at least N tags
    EntryTags(u32),
    /// An entry mentioning gratitude
    GratitudeKeyword,
    /// An entry with a location attached
    GeoTagged,
    /// An entry with a title
    Titled,
    /// A session of at least N minutes
    SessionMinutes(u32),
}

impl ChallengeRule {
    /// Fold one activity signal into a progress value.
    ///
    /// Threshold rules record the best measurement seen so far;
    /// counting rules accumulate; gate rules jump straight to 1 when
    /// the signal qualifies. Signals a rule does not care about leave
    /// progress untouched.
    pub fn advance(&self, signal: &ActivitySignal, progress: u32) -> u32 {
        match (self, signal) {
            (Self::EntryWords(_), ActivitySignal::Entry { attrs, .. }) => {
                progress.max(attrs.word_count)
            }
            (Self::EntriesToday(_), ActivitySignal::Entry { .. }) => progress + 1,
            (Self::EntryBeforeHour(h), ActivitySignal::Entry { hour, .. }) if hour < h => 1,
            (Self::EntryAfterHour(h), ActivitySignal::Entry { hour, .. }) if hour >= h => 1,
            (Self::EntryTags(_), ActivitySignal::Entry { attrs, .. }) => {
                progress.max(attrs.tag_count)
            }
            (Self::GratitudeKeyword, ActivitySignal::Entry { text, .. })
                if GRATITUDE_RE.is_match(text) =>
            {
                1
            }
            (Self::GeoTagged, ActivitySignal::Entry { attrs, .. }) if attrs.has_geo => 1,
            (Self::Titled, ActivitySignal::Entry { attrs, .. }) if attrs.has_title => 1,
            (Self::SessionMinutes(_), ActivitySignal::Session { minutes, .. }) => {
                progress.max(*minutes)
            }
            _ => progress,
        }
    }
}

/// Challenge definition with all metadata
#[derive(Debug, Clone)]
pub struct Challenge {
    pub kind: ChallengeKind,
    pub name: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
    pub target: u32,
    pub xp_reward: u32,
    pub rule: ChallengeRule,
}

/// All challenge definitions
pub static CHALLENGES: &[Challenge] = &[
    Challenge {
        kind: ChallengeKind::Wordsmith,
        name: "Wordsmith",
        description: "Write 200 words in a single entry",
        icon: "✒️",
        target: 200,
        xp_reward: 20,
        rule: ChallengeRule::EntryWords(200),
    },
    Challenge {
        kind: ChallengeKind::TripleEntry,
        name: "Triple Entry",
        description: "Write 3 entries today",
        icon: "📝",
        target: 3,
        xp_reward: 30,
        rule: ChallengeRule::EntriesToday(3),
    },
    Challenge {
        kind: ChallengeKind::EarlyBird,
        name: "Early Bird",
        description: "Write an entry before 9 AM",
        icon: "🌅",
        target: 1,
        xp_reward: 15,
        rule: ChallengeRule::EntryBeforeHour(9),
    },
    Challenge {
        kind: ChallengeKind::NightOwl,
        name: "Night Owl",
        description: "Write an entry after 9 PM",
        icon: "🌙",
        target: 1,
        xp_reward: 15,
        rule: ChallengeRule::EntryAfterHour(21),
    },
    Challenge {
        kind: ChallengeKind::TagCollector,
        name: "Tag Collector",
        description: "Tag an entry with 3 or more tags",
        icon: "🏷️",
        target: 3,
        xp_reward: 15,
        rule: ChallengeRule::EntryTags(3),
    },
    Challenge {
        kind: ChallengeKind::Gratitude,
        name: "Gratitude",
        description: "Write about something you are grateful for",
        icon: "🙏",
        target: 1,
        xp_reward: 20,
        rule: ChallengeRule::GratitudeKeyword,
    },
    Challenge {
        kind: ChallengeKind::Explorer,
        name: "Explorer",
        description: "Attach a location to an entry",
        icon: "📍",
        target: 1,
        xp_reward: 10,
        rule: ChallengeRule::GeoTagged,
    },
    Challenge {
        kind: ChallengeKind::Headline,
        name: "Headline",
        description: "Give an entry a title",
        icon: "📰",
        target: 1,
        xp_reward: 10,
        rule: ChallengeRule::Titled,
    },
    Challenge {
        kind: ChallengeKind::DeepFocus,
        name: "Deep Focus",
        description: "Complete a 10-minute session",
        icon: "🧘",
        target: 10,
        xp_reward: 25,
        rule: ChallengeRule::SessionMinutes(10),
    },
];

impl Challenge {
    /// Get challenge definition by kind
    pub fn get(kind: ChallengeKind) -> &'static Challenge {
        CHALLENGES
            .iter()
            .find(|c| c.kind == kind)
            .expect("All challenge kinds should be defined")
    }

    /// Get total number of challenge types
    pub fn total_count() -> usize {
        CHALLENGES.len()
    }
}

/// A challenge materialized into one user's daily set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChallengeInstance {
    pub id: Uuid,
    pub kind: ChallengeKind,
    pub target: u32,
    pub progress: u32,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub xp_reward: u32,
}

impl ChallengeInstance {
    pub fn new(kind: ChallengeKind) -> Self {
        let def = Challenge::get(kind);
        Self {
            id: Uuid::new_v4(),
            kind,
            target: def.target,
            progress: 0,
            completed: false,
            completed_at: None,
            xp_reward: def.xp_reward,
        }
    }

    /// Calculate progress percentage (0.0 - 1.0)
    pub fn progress_percent(&self) -> f32 {
        if self.completed || self.target == 0 {
            1.0
        } else {
            (self.progress as f32 / self.target as f32).min(1.0)
        }
    }

    /// Fold one signal in. Returns true when this call completed the
    /// challenge; completed instances are never re-evaluated.
    pub(crate) fn observe(&mut self, signal: &ActivitySignal) -> bool {
        if self.completed {
            return false;
        }
        self.progress = Challenge::get(self.kind).rule.advance(signal, self.progress);
        if self.progress >= self.target {
            self.completed = true;
            self.completed_at = Some(Utc::now());
            true
        } else {
            false
        }
    }
}

/// One user's challenge set for one calendar day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyChallengeSet {
    pub date: NaiveDate,
    pub challenges: Vec<ChallengeInstance>,
    pub completed_count: u32,
    pub total_xp_earned: u32,
}

impl DailyChallengeSet {
    /// Roll a fresh set: three distinct kinds drawn uniformly without
    /// replacement.
    pub(crate) fn roll(date: NaiveDate) -> Self {
        let mut rng = rand::thread_rng();
        let challenges: Vec<ChallengeInstance> = ChallengeKind::all()
            .choose_multiple(&mut rng, DAILY_CHALLENGE_COUNT)
            .map(|kind| ChallengeInstance::new(*kind))
            .collect();

        Self {
            date,
            challenges,
            completed_count: 0,
            total_xp_earned: 0,
        }
    }

    /// Recompute the summary counters as folds over the challenge
    /// list. Always called after a mutation instead of nudging the
    /// stored counters, so they can never drift.
    pub(crate) fn recompute_totals(&mut self) {
        self.completed_count = self.challenges.iter().filter(|c| c.completed).count() as u32;
        self.total_xp_earned = self
            .challenges
            .iter()
            .filter(|c| c.completed)
            .map(|c| c.xp_reward)
            .sum();
    }

    pub fn challenge(&self, id: Uuid) -> Option<&ChallengeInstance> {
        self.challenges.iter().find(|c| c.id == id)
    }

    pub fn is_complete(&self) -> bool {
        self.completed_count as usize == self.challenges.len()
    }
}
