use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::sensing::Acceleration;

/// A contiguous start-to-stop collection interval. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionSession {
    pub id: String,
    pub started_at: DateTime<Utc>,
}

/// What a display needs to render: the collecting flag, the session clock
/// and the most recent sample.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionSnapshot {
    pub is_active: bool,
    pub started_at: Option<DateTime<Utc>>,
    pub elapsed_secs: Option<u64>,
    pub latest: Acceleration,
}

#[derive(Debug, Clone, Default)]
pub struct CollectionState {
    pub session: Option<CollectionSession>,
    pub latest: Acceleration,
}

impl CollectionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    pub fn begin_session(&mut self, id: String, started_at: DateTime<Utc>) {
        self.session = Some(CollectionSession { id, started_at });
    }

    /// Clears the session and zeroes the displayed sample.
    pub fn end_session(&mut self) -> Option<CollectionSession> {
        self.latest = Acceleration::ZERO;
        self.session.take()
    }

    /// Whole seconds since the session started, clamped at zero.
    pub fn elapsed_secs(&self, now: DateTime<Utc>) -> Option<u64> {
        self.session
            .as_ref()
            .map(|session| (now - session.started_at).num_seconds().max(0) as u64)
    }

    pub fn snapshot(&self, now: DateTime<Utc>) -> CollectionSnapshot {
        CollectionSnapshot {
            is_active: self.is_active(),
            started_at: self.session.as_ref().map(|session| session.started_at),
            elapsed_secs: self.elapsed_secs(now),
            latest: self.latest,
        }
    }
}
