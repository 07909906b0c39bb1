//! Read-through view cache
//!
//! Short-TTL memoization of derived read views keyed by (view, user).
//! Mutation paths delete every entry for the affected user before the
//! mutating call returns, so a caller can never read a view older than
//! its own completed write. TTL expiry exists on top of that for views
//! whose inputs can change outside the engine.
//!
//! The cache only ever holds derived data; it is never the system of
//! record.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde_json::Value;
use tracing::debug;

use crate::error::EngineError;
use crate::model::UserId;

/// Cache key: one derived view for one user
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ViewKey {
    view: String,
    user: UserId,
}

struct CacheSlot {
    value: Value,
    expires_at: Instant,
}

/// TTL cache with synchronous per-user invalidation
pub struct ViewCache {
    slots: DashMap<ViewKey, CacheSlot>,
    default_ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ViewCache {
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            slots: DashMap::new(),
            default_ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Look up a fresh entry. An expired entry counts as a miss and is
    /// dropped on the way out.
    pub fn get(&self, view: &str, user: &UserId) -> Option<Value> {
        let key = ViewKey {
            view: view.to_string(),
            user: user.clone(),
        };
        let expired = match self.slots.get(&key) {
            Some(slot) => {
                if slot.expires_at > Instant::now() {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    return Some(slot.value.clone());
                }
                true
            }
            None => false,
        };
        if expired {
            self.slots.remove(&key);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Store a view result under the default TTL.
    pub fn put(&self, view: &str, user: &UserId, value: Value) {
        self.put_with_ttl(view, user, value, self.default_ttl);
    }

    /// Store a view result under its own TTL.
    pub fn put_with_ttl(&self, view: &str, user: &UserId, value: Value, ttl: Duration) {
        let key = ViewKey {
            view: view.to_string(),
            user: user.clone(),
        };
        self.slots.insert(
            key,
            CacheSlot {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    /// Read-through lookup: return the cached view, or compute, store
    /// and return it. Concurrent misses may compute twice; both
    /// results are equally fresh and the last write wins.
    pub async fn get_or_compute<F, Fut>(
        &self,
        view: &str,
        user: &UserId,
        compute: F,
    ) -> Result<Value, EngineError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value, EngineError>>,
    {
        if let Some(value) = self.get(view, user) {
            return Ok(value);
        }
        let value = compute().await?;
        self.put(view, user, value.clone());
        Ok(value)
    }

    /// Delete every cached view for one user.
    pub fn invalidate_user(&self, user: &UserId) {
        let before = self.slots.len();
        self.slots.retain(|key, _| key.user != *user);
        let dropped = before.saturating_sub(self.slots.len());
        if dropped > 0 {
            debug!("Invalidated {} cached view(s) for {}", dropped, user);
        }
    }

    /// Drop expired entries. Housekeeping only; correctness never
    /// depends on this running.
    pub fn purge_expired(&self) {
        let now = Instant::now();
        self.slots.retain(|_, slot| slot.expires_at > now);
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn hit_count(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn miss_count(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::AtomicU32;

    fn cache() -> ViewCache {
        ViewCache::new(Duration::from_secs(60))
    }

    #[test]
    fn test_put_then_get_hits() {
        let cache = cache();
        let user = UserId::from("u1");
        cache.put("dashboard", &user, json!({"xp": 95}));

        assert_eq!(cache.get("dashboard", &user), Some(json!({"xp": 95})));
        assert_eq!(cache.hit_count(), 1);
        assert_eq!(cache.miss_count(), 0);
    }

    #[test]
    fn test_expired_entry_is_a_miss_and_gets_dropped() {
        let cache = cache();
        let user = UserId::from("u1");
        cache.put_with_ttl("dashboard", &user, json!(1), Duration::from_millis(0));

        assert_eq!(cache.get("dashboard", &user), None);
        assert_eq!(cache.miss_count(), 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_invalidate_user_is_scoped() {
        let cache = cache();
        let alice = UserId::from("alice");
        let bob = UserId::from("bob");
        cache.put("dashboard", &alice, json!(1));
        cache.put("summary", &alice, json!(2));
        cache.put("dashboard", &bob, json!(3));

        cache.invalidate_user(&alice);

        assert_eq!(cache.get("dashboard", &alice), None);
        assert_eq!(cache.get("summary", &alice), None);
        assert_eq!(cache.get("dashboard", &bob), Some(json!(3)));
    }

    #[test]
    fn test_purge_expired_keeps_fresh_entries() {
        let cache = cache();
        let user = UserId::from("u1");
        cache.put_with_ttl("stale", &user, json!(1), Duration::from_millis(0));
        cache.put("fresh", &user, json!(2));

        cache.purge_expired();

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("fresh", &user), Some(json!(2)));
    }

    #[tokio::test]
    async fn test_get_or_compute_computes_once() {
        let cache = cache();
        let user = UserId::from("u1");
        let computed = AtomicU32::new(0);

        for _ in 0..3 {
            let value = cache
                .get_or_compute("dashboard", &user, || async {
                    computed.fetch_add(1, Ordering::SeqCst);
                    Ok(json!({"level": 2}))
                })
                .await
                .unwrap();
            assert_eq!(value, json!({"level": 2}));
        }

        assert_eq!(computed.load(Ordering::SeqCst), 1);
        assert_eq!(cache.hit_count(), 2);
    }

    #[tokio::test]
    async fn test_get_or_compute_propagates_compute_errors() {
        let cache = cache();
        let user = UserId::from("u1");

        let result = cache
            .get_or_compute("dashboard", &user, || async {
                Err(EngineError::InvalidState("boom".to_string()))
            })
            .await;

        assert!(matches!(result, Err(EngineError::InvalidState(_))));
        // Failed computations must not poison the cache.
        assert!(cache.is_empty());
    }
}
