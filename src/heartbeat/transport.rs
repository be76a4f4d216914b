use std::{sync::Arc, time::Duration};

use thiserror::Error;
use tokio::time;

use crate::http::{HttpClient, HttpError, HttpMethod, HttpRequest};

use super::payload::HeartbeatPayload;
use super::stats::DeliveryStats;

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_warn};

pub const HEARTBEAT_PATH: &str = "/api/analytics/heartbeat";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    Failed,
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("network error: {0}")]
    Network(String),
    #[error("collector responded with status {0}")]
    Status(u16),
    #[error("request timed out")]
    Timeout,
    #[error("failed to encode payload: {0}")]
    Encode(#[from] serde_json::Error),
}

impl From<HttpError> for TransportError {
    fn from(err: HttpError) -> Self {
        match err {
            HttpError::Timeout => TransportError::Timeout,
            HttpError::Network(message) => TransportError::Network(message),
        }
    }
}

/// Posts heartbeats to the collector. Failures end here: they are logged and
/// counted, never returned to the scheduler.
#[derive(Clone)]
pub struct HeartbeatTransport {
    client: Arc<dyn HttpClient>,
    endpoint: String,
    timeout: Duration,
    stats: DeliveryStats,
}

impl HeartbeatTransport {
    pub fn new(client: Arc<dyn HttpClient>, base_url: &str, timeout: Duration) -> Self {
        Self {
            client,
            endpoint: format!("{}{}", base_url.trim_end_matches('/'), HEARTBEAT_PATH),
            timeout,
            stats: DeliveryStats::new(),
        }
    }

    pub fn stats(&self) -> DeliveryStats {
        self.stats.clone()
    }

    pub async fn send(&self, payload: &HeartbeatPayload, credential: Option<&str>) -> DeliveryOutcome {
        match self.try_send(payload, credential).await {
            Ok(()) => {
                log_debug!(
                    "heartbeat delivered for {} ch.{} p.{}",
                    payload.content_id,
                    payload.chapter_number,
                    payload.page_number
                );
                self.stats.record_delivered().await;
                DeliveryOutcome::Delivered
            }
            Err(err) => {
                log_warn!("heartbeat for {} failed: {err}", payload.content_id);
                self.stats
                    .record_failure(&payload.content_id, err.to_string())
                    .await;
                DeliveryOutcome::Failed
            }
        }
    }

    async fn try_send(
        &self,
        payload: &HeartbeatPayload,
        credential: Option<&str>,
    ) -> Result<(), TransportError> {
        let body = serde_json::to_string(payload)?;
        let request = HttpRequest::new(&self.endpoint, HttpMethod::Post)
            .with_bearer(credential)
            .with_json_body(body);

        let response = time::timeout(self.timeout, self.client.send(request))
            .await
            .map_err(|_| TransportError::Timeout)??;

        if !response.is_success() {
            return Err(TransportError::Status(response.status));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heartbeat::SessionCoordinates;
    use crate::http::mock::MockHttpClient;
    use async_trait::async_trait;
    use crate::http::HttpResponse;

    fn payload() -> HeartbeatPayload {
        HeartbeatPayload::from_coordinates(&SessionCoordinates::new("m1", Some(3)).with_page(5))
            .unwrap()
    }

    #[tokio::test]
    async fn posts_json_with_bearer_to_collector() {
        let client = Arc::new(MockHttpClient::new());
        let transport =
            HeartbeatTransport::new(client.clone(), "https://api.example/", Duration::from_secs(5));

        let outcome = transport.send(&payload(), Some("tok")).await;
        assert_eq!(outcome, DeliveryOutcome::Delivered);

        let requests = client.recorded();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert_eq!(request.url, "https://api.example/api/analytics/heartbeat");
        assert_eq!(request.method, HttpMethod::Post);
        assert_eq!(
            request.headers.get("Authorization").map(String::as_str),
            Some("Bearer tok")
        );

        let body: serde_json::Value =
            serde_json::from_str(request.body.as_deref().unwrap()).unwrap();
        assert_eq!(body["mangaId"], "m1");
        assert_eq!(body["pageNumber"], 5);
    }

    #[tokio::test]
    async fn missing_credential_still_sends_unauthenticated() {
        let client = Arc::new(MockHttpClient::new());
        client.push_status(401);
        let transport = HeartbeatTransport::new(client.clone(), "http://h", Duration::from_secs(5));

        assert_eq!(transport.send(&payload(), None).await, DeliveryOutcome::Failed);
        assert!(!client.recorded()[0].headers.contains_key("Authorization"));
    }

    #[tokio::test]
    async fn failures_are_counted_not_raised() {
        let client = Arc::new(MockHttpClient::new());
        client.push_status(503);
        client.push_failure(HttpError::Network("connection refused".into()));
        let transport = HeartbeatTransport::new(client, "http://h", Duration::from_secs(5));

        assert_eq!(transport.send(&payload(), Some("t")).await, DeliveryOutcome::Failed);
        assert_eq!(transport.send(&payload(), Some("t")).await, DeliveryOutcome::Failed);
        assert_eq!(transport.send(&payload(), Some("t")).await, DeliveryOutcome::Delivered);

        let snapshot = transport.stats().snapshot().await;
        assert_eq!(snapshot.failed, 2);
        assert_eq!(snapshot.delivered, 1);
        assert!(snapshot.recent_failures[0].reason.contains("503"));
    }

    struct StalledClient;

    #[async_trait]
    impl HttpClient for StalledClient {
        async fn send(&self, _req: HttpRequest) -> Result<HttpResponse, HttpError> {
            std::future::pending().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn slow_collector_times_out() {
        let transport =
            HeartbeatTransport::new(Arc::new(StalledClient), "http://h", Duration::from_secs(2));
        assert_eq!(transport.send(&payload(), Some("t")).await, DeliveryOutcome::Failed);

        let snapshot = transport.stats().snapshot().await;
        assert!(snapshot.recent_failures[0].reason.contains("timed out"));
    }
}
