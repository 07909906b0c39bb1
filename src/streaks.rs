//! Daily streak state machine
//!
//! Pure transition function from (stored streak fields, activity day)
//! to the next streak fields plus a description of what changed. The
//! ledger owns persisting the result; nothing here touches storage.

use chrono::NaiveDate;
use serde::Serialize;

use crate::xp::XpRewards;

/// Streak day counts that pay a milestone bonus
pub const STREAK_MILESTONES: &[u32] = &[7, 14, 30, 50, 100];

/// Streak fields of a user's progress record
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreakState {
    pub current: u32,
    pub best: u32,
    pub last_active_day: Option<NaiveDate>,
}

/// What a single qualifying activity did to the streak
#[derive(Debug, Clone, Default, Serialize)]
pub struct StreakOutcome {
    pub current_streak: u32,
    pub streak_changed: bool,
    pub streak_broken: bool,
    /// Set when the streak first reached a milestone day count.
    pub milestone: Option<u32>,
    pub bonus_xp: u32,
}

/// Advance the streak for qualifying activity on `day`.
///
/// Re-entry on the already-recorded day (or any earlier day, for
/// backdated entries) leaves the state untouched, so a milestone bonus
/// can never pay twice.
pub fn advance(state: StreakState, day: NaiveDate) -> (StreakState, StreakOutcome) {
    match state.last_active_day {
        // Same day or a backdated day: idempotent, nothing moves.
        Some(last) if day <= last => {
            let outcome = StreakOutcome {
                current_streak: state.current,
                ..Default::default()
            };
            (state, outcome)
        }
        Some(last) => {
            let gap = (day - last).num_days();
            let (current, broken) = if gap == 1 {
                (state.current + 1, false)
            } else {
                (1, true)
            };
            let next = StreakState {
                current,
                best: state.best.max(current),
                last_active_day: Some(day),
            };
            let milestone = if STREAK_MILESTONES.contains(&current) {
                Some(current)
            } else {
                None
            };
            let outcome = StreakOutcome {
                current_streak: current,
                streak_changed: true,
                streak_broken: broken,
                milestone,
                bonus_xp: milestone.map(XpRewards::milestone_bonus).unwrap_or(0),
            };
            (next, outcome)
        }
        None => {
            let next = StreakState {
                current: 1,
                best: state.best.max(1),
                last_active_day: Some(day),
            };
            let outcome = StreakOutcome {
                current_streak: 1,
                streak_changed: true,
                streak_broken: false,
                milestone: None,
                bonus_xp: 0,
            };
            (next, outcome)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).expect("valid test date")
    }

    #[test]
    fn test_first_activity_starts_streak() {
        let (next, outcome) = advance(StreakState::default(), day(1));
        assert_eq!(next.current, 1);
        assert_eq!(next.best, 1);
        assert_eq!(next.last_active_day, Some(day(1)));
        assert!(outcome.streak_changed);
        assert!(!outcome.streak_broken);
        assert_eq!(outcome.milestone, None);
    }

    #[test]
    fn test_consecutive_days_increment_once_each() {
        let (state, o1) = advance(StreakState::default(), day(1));
        let (state, o2) = advance(state, day(2));
        let (state, o3) = advance(state, day(2)); // duplicate same-day

        assert_eq!(o1.current_streak, 1);
        assert_eq!(o2.current_streak, 2);
        assert_eq!(o3.current_streak, 2);
        assert!(!o3.streak_changed);
        assert_eq!(state.current, 2);
        assert_eq!(state.best, 2);
    }

    #[test]
    fn test_gap_resets_to_one() {
        let (state, o1) = advance(StreakState::default(), day(1));
        let (state, o2) = advance(state, day(4));

        assert_eq!(o1.current_streak, 1);
        assert_eq!(o2.current_streak, 1);
        assert!(o2.streak_broken);
        assert!(o2.streak_changed);
        assert_eq!(state.current, 1);
    }

    #[test]
    fn test_best_streak_survives_break() {
        let mut state = StreakState::default();
        for d in 1..=5 {
            state = advance(state, day(d)).0;
        }
        assert_eq!(state.best, 5);

        let (state, outcome) = advance(state, day(20));
        assert_eq!(state.current, 1);
        assert_eq!(state.best, 5);
        assert!(outcome.streak_broken);
    }

    #[test]
    fn test_milestone_fires_once_at_seven() {
        let mut state = StreakState::default();
        for d in 1..=6 {
            state = advance(state, day(d)).0;
        }

        let (state, outcome) = advance(state, day(7));
        assert_eq!(outcome.current_streak, 7);
        assert_eq!(outcome.milestone, Some(7));
        assert_eq!(outcome.bonus_xp, 35);

        // Re-entry the same day must not pay the bonus again.
        let (_, again) = advance(state, day(7));
        assert_eq!(again.milestone, None);
        assert_eq!(again.bonus_xp, 0);
        assert_eq!(again.current_streak, 7);
    }

    #[test]
    fn test_non_milestone_days_pay_nothing() {
        let mut state = StreakState::default();
        let mut paid = Vec::new();
        for d in 1..=14 {
            let (next, outcome) = advance(state, day(d));
            state = next;
            if outcome.bonus_xp > 0 {
                paid.push((outcome.current_streak, outcome.bonus_xp));
            }
        }
        assert_eq!(paid, vec![(7, 35), (14, 70)]);
    }

    #[test]
    fn test_backdated_day_is_a_no_op() {
        let (state, _) = advance(StreakState::default(), day(10));
        let before = state;
        let (state, outcome) = advance(state, day(3));

        assert_eq!(state, before);
        assert!(!outcome.streak_changed);
        assert_eq!(outcome.current_streak, before.current);
    }
}
