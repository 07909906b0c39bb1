//! Record-count collaborator
//!
//! Badge predicates aggregate over records the engine does not own
//! (journal entries and sessions live elsewhere in the application).
//! The owning side implements this query interface; the engine treats
//! a failing count query like a transient store failure and retries
//! the whole awarding unit.

use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::Result;
use async_trait::async_trait;

use crate::model::UserId;

/// Aggregate count queries over caller-owned records
#[async_trait]
pub trait RecordCounts: Send + Sync {
    /// Number of journal entries the user has written.
    async fn entry_count(&self, user: &UserId) -> Result<u64>;

    /// Number of sessions the user has completed.
    async fn session_count(&self, user: &UserId) -> Result<u64>;
}

/// Counter-backed counts, settable from outside.
///
/// Ignores the user id, which is fine for single-user embeddings and
/// for tests that drive one user at a time.
#[derive(Default)]
pub struct StaticCounts {
    entries: AtomicU64,
    sessions: AtomicU64,
}

impl StaticCounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_entries(&self, n: u64) {
        self.entries.store(n, Ordering::SeqCst);
    }

    pub fn set_sessions(&self, n: u64) {
        self.sessions.store(n, Ordering::SeqCst);
    }

    /// Record one new entry; returns the new count.
    pub fn add_entry(&self) -> u64 {
        self.entries.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Record one new session; returns the new count.
    pub fn add_session(&self) -> u64 {
        self.sessions.fetch_add(1, Ordering::SeqCst) + 1
    }
}

#[async_trait]
impl RecordCounts for StaticCounts {
    async fn entry_count(&self, _user: &UserId) -> Result<u64> {
        Ok(self.entries.load(Ordering::SeqCst))
    }

    async fn session_count(&self, _user: &UserId) -> Result<u64> {
        Ok(self.sessions.load(Ordering::SeqCst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_counts() {
        let counts = StaticCounts::new();
        let user = UserId::from("u1");
        assert_eq!(counts.entry_count(&user).await.unwrap(), 0);

        counts.set_entries(9);
        assert_eq!(counts.add_entry(), 10);
        assert_eq!(counts.entry_count(&user).await.unwrap(), 10);
        assert_eq!(counts.session_count(&user).await.unwrap(), 0);
    }
}
