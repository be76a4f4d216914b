use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::payload::SessionCoordinates;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ReporterStatus {
    #[default]
    Idle,
    Active,
    Stopped,
}

/// Bookkeeping side of the reporter. The live ticker itself is owned by the
/// controller; this only records what the reporter believes it is tracking.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReporterState {
    pub status: ReporterStatus,
    pub coordinates: SessionCoordinates,
    pub session_id: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
}

impl ReporterState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_stopped(&self) -> bool {
        self.status == ReporterStatus::Stopped
    }

    pub fn begin_session(
        &mut self,
        session_id: String,
        coordinates: SessionCoordinates,
        start_at: DateTime<Utc>,
    ) {
        *self = Self {
            status: ReporterStatus::Active,
            coordinates,
            session_id: Some(session_id),
            started_at: Some(start_at),
        };
    }

    /// Back to `Idle` while remembering the coordinates that were rejected,
    /// so a repeat of the same tuple is recognised as "no change".
    pub fn idle_with(&mut self, coordinates: SessionCoordinates) {
        *self = Self {
            status: ReporterStatus::Idle,
            coordinates,
            session_id: None,
            started_at: None,
        };
    }

    pub fn stop(&mut self) {
        self.status = ReporterStatus::Stopped;
        self.session_id = None;
    }
}
