//! Badge rule evaluation
//!
//! One pass over the catalog: every badge not already earned has its
//! predicate evaluated against the same context snapshot. A badge
//! firing cannot influence another badge in the same pass, so
//! evaluation order never affects the result.

use super::definitions::{Badge, BadgeContext, BadgeId, BADGES};

/// Evaluate all unearned badges against `ctx`.
///
/// Already-earned badges are always skipped, so repeated passes over
/// the same (or later) state grant nothing twice.
pub fn newly_satisfied(ctx: &BadgeContext, earned: &[BadgeId]) -> Vec<&'static Badge> {
    BADGES
        .iter()
        .filter(|badge| !earned.contains(&badge.id) && (badge.predicate)(ctx))
        .collect()
}

/// Total XP granted by one evaluation pass.
pub fn pass_xp(newly: &[&'static Badge]) -> u32 {
    newly.iter().map(|b| b.xp_reward).sum()
}
