//! Badge rule engine
//!
//! A fixed catalog of unlock rules evaluated against aggregate user
//! state. Badges are permanent and granted at most once per user; the
//! ledger folds the XP they pay into the same commit as the award that
//! triggered the evaluation.

mod checker;
mod definitions;

pub use checker::{newly_satisfied, pass_xp};
pub use definitions::{Badge, BadgeCategory, BadgeContext, BadgeId, BADGES};
