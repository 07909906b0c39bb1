//! Error taxonomy for the progression engine.
//!
//! Store-level failures are split from engine-level rejections so the
//! ledger can retry transient store outages without retrying caller
//! mistakes.

use thiserror::Error;
use uuid::Uuid;

/// Failures raised by the backing progress store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not be reached or the write did not stick.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A stored record exists but could not be decoded.
    #[error("corrupt record `{key}`: {message}")]
    Corrupt { key: String, message: String },
}

impl StoreError {
    /// Transient failures are safe to retry with the same arguments.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }

    pub(crate) fn unavailable(err: impl std::fmt::Display) -> Self {
        Self::Unavailable(err.to_string())
    }

    pub(crate) fn corrupt(key: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::Corrupt {
            key: key.into(),
            message: err.to_string(),
        }
    }
}

/// Engine-level errors surfaced to callers.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The referenced user, challenge set or challenge does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Idempotency guard: the targeted challenge was already completed.
    #[error("challenge {0} already completed")]
    AlreadyCompleted(Uuid),

    /// A domain rule was violated or a stored record is unusable.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// The store kept failing after the configured retry attempts.
    #[error("store failure: {0}")]
    Store(StoreError),
}

impl EngineError {
    /// Whether the caller may reasonably retry the failed call as-is.
    ///
    /// `NotFound` / `AlreadyCompleted` / `InvalidState` are client-facing
    /// rejections; only exhausted store outages remain retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Store(e) if e.is_transient())
    }

    pub(crate) fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            // A corrupt record is not retryable and reads as a domain
            // problem to callers, not an outage.
            StoreError::Corrupt { .. } => Self::InvalidState(err.to_string()),
            other => Self::Store(other),
        }
    }
}
