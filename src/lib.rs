//! Ember - engagement progression engine
//!
//! Ember tracks a user's XP, levels, streaks, badges and daily
//! challenges, and keeps that state consistent when independent
//! actions (journal entries, goal updates, completed sessions) award
//! points to the same user at the same time. The embedding
//! application supplies persistence, record counts and notification
//! delivery through small trait interfaces; everything else flows
//! through [`ProgressEngine`].
//!
//! ## Awarding
//!
//! Activity events enter through the engine and commit atomically per
//! user: XP, level, streak advance and badge unlocks land together or
//! not at all. Concurrent awards for one user are serialized, so no
//! update is ever lost.
//!
//! ## Daily challenges
//!
//! Each user gets three randomly drawn challenges per calendar day.
//! Activity signals drive their progress; completions award XP
//! through the same ledger path as everything else.

pub mod badges;
pub mod cache;
pub mod challenges;
pub mod config;
pub mod counts;
pub mod engine;
pub mod error;
pub mod event;
pub mod ledger;
pub mod levels;
pub mod model;
pub mod notify;
pub mod store;
pub mod streaks;
pub mod xp;

pub use engine::{AwardOutcome, ProgressEngine};
pub use error::EngineError;
pub use model::*;
