//! SQLite-backed progress store
//!
//! Durable store for deployments that outlive the process. One row per
//! user for progress, one row per (user, day) for challenge sets with
//! the set body stored as JSON. WAL mode so readers and the serialized
//! writer do not block each other.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::warn;

use super::ProgressStore;
use crate::badges::BadgeId;
use crate::challenges::DailyChallengeSet;
use crate::error::StoreError;
use crate::model::{EarnedBadge, UserId, UserProgress};

/// Database wrapper
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open or create the progress database at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create data dir: {}", parent.display()))?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open progress db: {}", path.display()))?;

        // WAL mode so readers coexist with the writer
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Open a throwaway in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        let conn =
            Connection::open_in_memory().context("Failed to open in-memory progress db")?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Get a reference to the connection (for queries)
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("Progress DB lock poisoned")
    }

    /// Initialize the database schema
    fn init_schema(&self) -> Result<()> {
        let conn = self.conn();
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(())
    }

    fn load_badges(conn: &Connection, user: &UserId) -> Result<Vec<EarnedBadge>, StoreError> {
        let mut stmt = conn
            .prepare(
                "SELECT badge_id, earned_at, xp_awarded FROM user_badges
                 WHERE user_id = ?1 ORDER BY earned_at",
            )
            .map_err(StoreError::unavailable)?;
        let rows = stmt
            .query_map(params![user.as_str()], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, u32>(2)?,
                ))
            })
            .map_err(StoreError::unavailable)?;

        let mut badges = Vec::new();
        for row in rows {
            let (id_str, earned_ms, xp_awarded) = row.map_err(StoreError::unavailable)?;
            let Some(id) = BadgeId::from_str(&id_str) else {
                // Rows for retired catalog ids are skipped, not fatal.
                warn!("Skipping unknown badge id '{}' for {}", id_str, user);
                continue;
            };
            let earned_at = DateTime::from_timestamp_millis(earned_ms).unwrap_or_else(Utc::now);
            badges.push(EarnedBadge {
                id,
                earned_at,
                xp_awarded,
            });
        }
        Ok(badges)
    }
}

impl ProgressStore for SqliteStore {
    fn load_progress(&self, user: &UserId) -> Result<Option<UserProgress>, StoreError> {
        let conn = self.conn();
        let row = conn
            .query_row(
                "SELECT xp, level, streak, best_streak, last_active_day
                 FROM user_progress WHERE user_id = ?1",
                params![user.as_str()],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, u32>(1)?,
                        row.get::<_, u32>(2)?,
                        row.get::<_, u32>(3)?,
                        row.get::<_, Option<String>>(4)?,
                    ))
                },
            )
            .optional()
            .map_err(StoreError::unavailable)?;

        let Some((xp, level, streak, best_streak, last_day)) = row else {
            return Ok(None);
        };

        let last_active_day = match last_day {
            Some(s) => Some(
                s.parse::<NaiveDate>()
                    .map_err(|e| StoreError::corrupt(format!("progress:{user}"), e))?,
            ),
            None => None,
        };

        let badges = Self::load_badges(&conn, user)?;
        Ok(Some(UserProgress {
            xp: xp as u64,
            level,
            streak,
            best_streak,
            last_active_day,
            badges,
        }))
    }

    fn save_progress(&self, user: &UserId, progress: &UserProgress) -> Result<(), StoreError> {
        let mut conn = self.conn();
        let tx = conn.transaction().map_err(StoreError::unavailable)?;

        tx.execute(
            r#"INSERT INTO user_progress
                   (user_id, xp, level, streak, best_streak, last_active_day, updated_at)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
               ON CONFLICT(user_id) DO UPDATE SET
                   xp = excluded.xp,
                   level = excluded.level,
                   streak = excluded.streak,
                   best_streak = excluded.best_streak,
                   last_active_day = excluded.last_active_day,
                   updated_at = excluded.updated_at"#,
            params![
                user.as_str(),
                progress.xp as i64,
                progress.level,
                progress.streak,
                progress.best_streak,
                progress.last_active_day.map(|d| d.to_string()),
                Utc::now().timestamp_millis(),
            ],
        )
        .map_err(StoreError::unavailable)?;

        // Badges are append-only; existing rows keep their original
        // earned_at.
        for badge in &progress.badges {
            tx.execute(
                "INSERT OR IGNORE INTO user_badges (user_id, badge_id, earned_at, xp_awarded)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    user.as_str(),
                    badge.id.as_str(),
                    badge.earned_at.timestamp_millis(),
                    badge.xp_awarded,
                ],
            )
            .map_err(StoreError::unavailable)?;
        }

        tx.commit().map_err(StoreError::unavailable)
    }

    fn load_challenge_set(
        &self,
        user: &UserId,
        date: NaiveDate,
    ) -> Result<Option<DailyChallengeSet>, StoreError> {
        let conn = self.conn();
        let payload: Option<String> = conn
            .query_row(
                "SELECT payload FROM challenge_sets WHERE user_id = ?1 AND day = ?2",
                params![user.as_str(), date.to_string()],
                |row| row.get(0),
            )
            .optional()
            .map_err(StoreError::unavailable)?;

        match payload {
            Some(json) => serde_json::from_str(&json)
                .map(Some)
                .map_err(|e| StoreError::corrupt(format!("challenges:{user}:{date}"), e)),
            None => Ok(None),
        }
    }

    fn create_challenge_set_if_absent(
        &self,
        user: &UserId,
        set: DailyChallengeSet,
    ) -> Result<DailyChallengeSet, StoreError> {
        let key = format!("challenges:{user}:{}", set.date);
        let payload =
            serde_json::to_string(&set).map_err(|e| StoreError::corrupt(key.clone(), e))?;

        let mut conn = self.conn();
        let tx = conn.transaction().map_err(StoreError::unavailable)?;
        // INSERT OR IGNORE + read-back inside one transaction is the
        // atomic create-if-absent: the first writer's row survives.
        tx.execute(
            "INSERT OR IGNORE INTO challenge_sets (user_id, day, payload, updated_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                user.as_str(),
                set.date.to_string(),
                payload,
                Utc::now().timestamp_millis(),
            ],
        )
        .map_err(StoreError::unavailable)?;

        let stored: String = tx
            .query_row(
                "SELECT payload FROM challenge_sets WHERE user_id = ?1 AND day = ?2",
                params![user.as_str(), set.date.to_string()],
                |row| row.get(0),
            )
            .map_err(StoreError::unavailable)?;
        tx.commit().map_err(StoreError::unavailable)?;

        serde_json::from_str(&stored).map_err(|e| StoreError::corrupt(key, e))
    }

    fn save_challenge_set(
        &self,
        user: &UserId,
        set: &DailyChallengeSet,
    ) -> Result<(), StoreError> {
        let payload = serde_json::to_string(set)
            .map_err(|e| StoreError::corrupt(format!("challenges:{user}:{}", set.date), e))?;

        let conn = self.conn();
        conn.execute(
            r#"INSERT INTO challenge_sets (user_id, day, payload, updated_at)
               VALUES (?1, ?2, ?3, ?4)
               ON CONFLICT(user_id, day) DO UPDATE SET
                   payload = excluded.payload,
                   updated_at = excluded.updated_at"#,
            params![
                user.as_str(),
                set.date.to_string(),
                payload,
                Utc::now().timestamp_millis(),
            ],
        )
        .map_err(StoreError::unavailable)?;
        Ok(())
    }
}

/// SQL schema for the progress database
const SCHEMA_SQL: &str = r#"
-- Per-user progression record
CREATE TABLE IF NOT EXISTS user_progress (
    user_id TEXT PRIMARY KEY,
    xp INTEGER NOT NULL DEFAULT 0,
    level INTEGER NOT NULL DEFAULT 1,
    streak INTEGER NOT NULL DEFAULT 0,
    best_streak INTEGER NOT NULL DEFAULT 0,
    last_active_day TEXT,
    updated_at INTEGER NOT NULL
);

-- Earned badges (append-only)
CREATE TABLE IF NOT EXISTS user_badges (
    user_id TEXT NOT NULL,
    badge_id TEXT NOT NULL,
    earned_at INTEGER NOT NULL,
    xp_awarded INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (user_id, badge_id)
);
CREATE INDEX IF NOT EXISTS idx_badges_user ON user_badges(user_id);

-- Daily challenge sets, one JSON payload per (user, day)
CREATE TABLE IF NOT EXISTS challenge_sets (
    user_id TEXT NOT NULL,
    day TEXT NOT NULL,
    payload TEXT NOT NULL,
    updated_at INTEGER NOT NULL,
    PRIMARY KEY (user_id, day)
);

-- Schema version (bumped by future migrations)
CREATE TABLE IF NOT EXISTS schema_version (version INTEGER PRIMARY KEY);
INSERT OR IGNORE INTO schema_version VALUES (1);
"#;
