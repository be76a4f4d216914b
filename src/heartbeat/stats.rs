use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

const MAX_RECENT_FAILURES: usize = 20;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureRecord {
    pub timestamp: DateTime<Utc>,
    pub content_id: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeliverySnapshot {
    pub delivered: u64,
    pub failed: u64,
    pub last_delivered_at: Option<DateTime<Utc>>,
    pub recent_failures: Vec<FailureRecord>,
}

/// Diagnostics for the heartbeat channel. Failures are swallowed by the
/// transport, so this is the only place they remain visible.
#[derive(Clone, Default)]
pub struct DeliveryStats {
    inner: Arc<Mutex<DeliverySnapshot>>,
}

impl DeliveryStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record_delivered(&self) {
        let mut state = self.inner.lock().await;
        state.delivered += 1;
        state.last_delivered_at = Some(Utc::now());
    }

    pub async fn record_failure(&self, content_id: &str, reason: String) {
        let mut state = self.inner.lock().await;
        state.failed += 1;
        state.recent_failures.push(FailureRecord {
            timestamp: Utc::now(),
            content_id: content_id.to_string(),
            reason,
        });

        if state.recent_failures.len() > MAX_RECENT_FAILURES {
            state.recent_failures.remove(0);
        }
    }

    pub async fn snapshot(&self) -> DeliverySnapshot {
        self.inner.lock().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn failure_history_is_bounded() {
        let stats = DeliveryStats::new();
        for i in 0..(MAX_RECENT_FAILURES + 5) {
            stats.record_failure("m1", format!("status {i}")).await;
        }
        stats.record_delivered().await;

        let snapshot = stats.snapshot().await;
        assert_eq!(snapshot.failed, (MAX_RECENT_FAILURES + 5) as u64);
        assert_eq!(snapshot.delivered, 1);
        assert_eq!(snapshot.recent_failures.len(), MAX_RECENT_FAILURES);
        assert_eq!(snapshot.recent_failures[0].reason, "status 5");
        assert!(snapshot.last_delivered_at.is_some());
    }
}
