//! Reward notification dispatch
//!
//! Streak milestones, level-ups and badge unlocks produce user-facing
//! notifications; how they are rendered (toast, push, digest) is the
//! embedding application's business. Dispatch is best-effort: the
//! ledger logs failures and never lets them block or roll back a
//! committed award.

use anyhow::Result;
use async_trait::async_trait;

use crate::badges::BadgeId;
use crate::model::UserId;

/// A user-facing reward notification
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    StreakMilestone {
        days: u32,
        bonus_xp: u32,
    },
    LevelUp {
        old_level: u32,
        new_level: u32,
        title: String,
    },
    BadgeEarned {
        id: BadgeId,
        name: String,
        xp: u32,
    },
}

/// Fire-and-forget notification sink
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, user: &UserId, notification: Notification) -> Result<()>;
}

/// Drops every notification. The default when the embedding
/// application has no notification channel wired up.
#[derive(Default)]
pub struct NullNotifier;

#[async_trait]
impl Notifier for NullNotifier {
    async fn notify(&self, _user: &UserId, _notification: Notification) -> Result<()> {
        Ok(())
    }
}
