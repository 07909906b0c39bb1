//! Shared fixtures for engine integration tests

use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

use ember::notify::{Notification, Notifier};
use ember::UserId;

/// Install a log subscriber once so `RUST_LOG` works when debugging
/// a failing test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Notifier that records everything it is asked to deliver
#[derive(Default)]
pub struct RecordingNotifier {
    notes: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.notes.lock().expect("notifier lock poisoned").clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, _user: &UserId, notification: Notification) -> Result<()> {
        self.notes
            .lock()
            .expect("notifier lock poisoned")
            .push(notification);
        Ok(())
    }
}

pub fn day(s: &str) -> NaiveDate {
    s.parse().expect("test date should parse")
}
