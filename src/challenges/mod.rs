//! Daily challenges: catalog, per-day instances, lifecycle management
//!
//! Each user gets three randomly drawn challenges per calendar day.
//! Progress is driven by activity signals; completions award XP
//! through the progress ledger.

mod catalog;
mod manager;

pub use catalog::{
    Challenge, ChallengeInstance, ChallengeKind, ChallengeRule, DailyChallengeSet, CHALLENGES,
    DAILY_CHALLENGE_COUNT,
};
pub use manager::{ChallengeCompletion, ChallengeManager};
