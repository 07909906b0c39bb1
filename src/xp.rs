//! XP calculator
//!
//! Turns an activity event into an itemized, immutable award. Entry
//! creation is the richest case: a fixed base plus independent additive
//! bonuses. Every other event kind carries a fixed or caller-supplied
//! reward and bypasses the bonus logic.

use serde::Serialize;

use crate::event::{ActivityEvent, EntryAttributes};

/// XP amounts and thresholds for scoring
pub struct XpRewards;

impl XpRewards {
    /// Base XP for creating a journal entry
    pub const ENTRY_BASE: u32 = 50;

    /// Bonus for a long-form entry
    pub const LONG_ENTRY_BONUS: u32 = 25;
    pub const LONG_ENTRY_WORDS: u32 = 100;

    /// Bonus for a well-tagged entry
    pub const TAGGED_BONUS: u32 = 10;
    pub const TAGGED_COUNT: u32 = 3;

    /// Bonus for attaching a location
    pub const GEO_BONUS: u32 = 5;

    /// Bonus for giving the entry a title
    pub const TITLE_BONUS: u32 = 5;

    /// Bonus XP granted when the streak first reaches a milestone day
    /// count (milestone day 7 pays 35, day 14 pays 70, ...)
    pub fn milestone_bonus(streak_days: u32) -> u32 {
        streak_days * 5
    }
}

/// One line in an itemized award breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BonusLine {
    pub reason: &'static str,
    pub amount: u32,
}

/// Itemized XP award for a single event. Computed once, never mutated.
#[derive(Debug, Clone, Serialize)]
pub struct XpAward {
    pub base: u32,
    pub bonus_lines: Vec<BonusLine>,
    pub total: u32,
}

impl XpAward {
    /// Score an event. Total, pure and deterministic.
    pub fn for_event(event: &ActivityEvent) -> Self {
        match event {
            ActivityEvent::EntryCreated(attrs) => Self::for_entry(attrs),
            ActivityEvent::GoalMilestoneCompleted { xp_reward } => Self::fixed(*xp_reward),
            ActivityEvent::SessionCompleted { kind, .. } => Self::fixed(kind.xp_reward()),
            ActivityEvent::ChallengeCompleted { xp_reward } => Self::fixed(*xp_reward),
        }
    }

    /// An award with no bonus breakdown.
    pub fn fixed(amount: u32) -> Self {
        Self {
            base: amount,
            bonus_lines: Vec::new(),
            total: amount,
        }
    }

    /// Bonuses are independent of each other and of evaluation order;
    /// the breakdown lists them in catalog order for stable display.
    fn for_entry(attrs: &EntryAttributes) -> Self {
        let mut bonus_lines = Vec::new();

        if attrs.word_count >= XpRewards::LONG_ENTRY_WORDS {
            bonus_lines.push(BonusLine {
                reason: "long_entry",
                amount: XpRewards::LONG_ENTRY_BONUS,
            });
        }
        if attrs.tag_count >= XpRewards::TAGGED_COUNT {
            bonus_lines.push(BonusLine {
                reason: "tags",
                amount: XpRewards::TAGGED_BONUS,
            });
        }
        if attrs.has_geo {
            bonus_lines.push(BonusLine {
                reason: "geo",
                amount: XpRewards::GEO_BONUS,
            });
        }
        if attrs.has_title {
            bonus_lines.push(BonusLine {
                reason: "title",
                amount: XpRewards::TITLE_BONUS,
            });
        }

        let total = XpRewards::ENTRY_BASE + bonus_lines.iter().map(|b| b.amount).sum::<u32>();
        Self {
            base: XpRewards::ENTRY_BASE,
            bonus_lines,
            total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::SessionKind;

    #[test]
    fn test_full_entry_breakdown() {
        let award = XpAward::for_event(&ActivityEvent::EntryCreated(EntryAttributes {
            word_count: 150,
            tag_count: 3,
            has_title: true,
            has_geo: true,
        }));
        assert_eq!(award.base, 50);
        let amounts: Vec<u32> = award.bonus_lines.iter().map(|b| b.amount).collect();
        assert_eq!(amounts, vec![25, 10, 5, 5]);
        assert_eq!(award.total, 95);
    }

    #[test]
    fn test_bare_entry_is_base_only() {
        let award = XpAward::for_event(&ActivityEvent::EntryCreated(EntryAttributes {
            word_count: 40,
            tag_count: 0,
            has_title: false,
            has_geo: false,
        }));
        assert_eq!(award.base, 50);
        assert!(award.bonus_lines.is_empty());
        assert_eq!(award.total, 50);
    }

    #[test]
    fn test_bonuses_are_independent() {
        let award = XpAward::for_event(&ActivityEvent::EntryCreated(EntryAttributes {
            word_count: 20,
            tag_count: 5,
            has_title: false,
            has_geo: true,
        }));
        let reasons: Vec<&str> = award.bonus_lines.iter().map(|b| b.reason).collect();
        assert_eq!(reasons, vec!["tags", "geo"]);
        assert_eq!(award.total, 65);
    }

    #[test]
    fn test_threshold_boundaries() {
        let short = XpAward::for_event(&ActivityEvent::EntryCreated(EntryAttributes {
            word_count: 99,
            tag_count: 2,
            ..Default::default()
        }));
        assert_eq!(short.total, 50);

        let exact = XpAward::for_event(&ActivityEvent::EntryCreated(EntryAttributes {
            word_count: 100,
            tag_count: 3,
            ..Default::default()
        }));
        assert_eq!(exact.total, 85);
    }

    #[test]
    fn test_session_rewards_are_fixed() {
        let award = XpAward::for_event(&ActivityEvent::SessionCompleted {
            kind: SessionKind::Focus,
            minutes: 90,
        });
        assert_eq!(award.total, 20);
        assert!(award.bonus_lines.is_empty());

        let award = XpAward::for_event(&ActivityEvent::SessionCompleted {
            kind: SessionKind::Breathing,
            minutes: 5,
        });
        assert_eq!(award.total, 10);
    }

    #[test]
    fn test_supplied_rewards_pass_through() {
        let award = XpAward::for_event(&ActivityEvent::GoalMilestoneCompleted { xp_reward: 40 });
        assert_eq!(award.total, 40);
        let award = XpAward::for_event(&ActivityEvent::ChallengeCompleted { xp_reward: 30 });
        assert_eq!(award.total, 30);
    }

    #[test]
    fn test_milestone_bonus_scales_with_streak() {
        assert_eq!(XpRewards::milestone_bonus(7), 35);
        assert_eq!(XpRewards::milestone_bonus(30), 150);
    }
}
