use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{watch, Mutex};
use tokio_util::task::TaskTracker;
use uuid::Uuid;

use crate::auth::CredentialProvider;
use crate::http::HttpClient;
use crate::settings::AppConfig;

use super::payload::SessionCoordinates;
use super::state::{ReporterState, ReporterStatus};
use super::stats::DeliverySnapshot;
use super::ticker::{TickerContext, TickerHandle};
use super::transport::HeartbeatTransport;
use super::visibility::{VisibilityGate, VisibilitySource};

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

/// Reports reading activity for one reader view.
///
/// Drive it with [`update_coordinates`](Self::update_coordinates) whenever the
/// content, chapter, page or genre changes, and [`stop`](Self::stop) when the
/// view goes away. Every change tears the previous ticker down before a new
/// one is armed, so at most one ticker is ever live.
#[derive(Clone)]
pub struct ActivityReporter {
    state: Arc<Mutex<ReporterState>>,
    ticker: Arc<Mutex<Option<TickerHandle>>>,
    coordinates_tx: Arc<watch::Sender<SessionCoordinates>>,
    transport: HeartbeatTransport,
    credentials: Arc<dyn CredentialProvider>,
    gate: VisibilityGate,
    period: Duration,
    live_tickers: Arc<AtomicUsize>,
    in_flight: TaskTracker,
}

impl ActivityReporter {
    pub fn new(
        transport: HeartbeatTransport,
        credentials: Arc<dyn CredentialProvider>,
        visibility: Arc<dyn VisibilitySource>,
        period: Duration,
    ) -> Self {
        let (coordinates_tx, _) = watch::channel(SessionCoordinates::default());

        Self {
            state: Arc::new(Mutex::new(ReporterState::new())),
            ticker: Arc::new(Mutex::new(None)),
            coordinates_tx: Arc::new(coordinates_tx),
            transport,
            credentials,
            gate: VisibilityGate::new(visibility),
            period,
            live_tickers: Arc::new(AtomicUsize::new(0)),
            in_flight: TaskTracker::new(),
        }
    }

    pub fn from_config(
        config: &AppConfig,
        client: Arc<dyn HttpClient>,
        credentials: Arc<dyn CredentialProvider>,
        visibility: Arc<dyn VisibilitySource>,
    ) -> Self {
        let transport = HeartbeatTransport::new(client, config.base_url(), config.request_timeout());
        Self::new(transport, credentials, visibility, config.heartbeat_interval())
    }

    pub async fn status(&self) -> ReporterStatus {
        self.state.lock().await.status
    }

    pub async fn snapshot(&self) -> ReporterState {
        self.state.lock().await.clone()
    }

    pub async fn is_armed(&self) -> bool {
        self.ticker.lock().await.is_some()
    }

    /// Number of ticker loops currently running.
    pub fn live_tickers(&self) -> usize {
        self.live_tickers.load(Ordering::SeqCst)
    }

    pub async fn delivery_stats(&self) -> DeliverySnapshot {
        self.transport.stats().snapshot().await
    }

    /// Number of dispatched sends that have not finished yet.
    pub fn pending_sends(&self) -> usize {
        self.in_flight.len()
    }

    /// Waits until every send dispatched so far has been delivered or
    /// recorded as failed. Each send is bounded by the transport timeout.
    /// Call after [`stop`](Self::stop) before reading final delivery stats.
    pub async fn flush(&self) {
        self.in_flight.close();
        self.in_flight.wait().await;
        self.in_flight.reopen();
    }

    /// Start or reconfigure reporting for `coordinates`.
    ///
    /// Identical coordinates are a no-op. Anything else cancels the current
    /// ticker, then starts a fresh session (immediate report plus a ticker)
    /// if the coordinates identify a chapter, or settles in `Idle` if not.
    /// Once stopped, the reporter ignores further updates.
    pub async fn update_coordinates(&self, coordinates: SessionCoordinates) -> ReporterStatus {
        let mut state = self.state.lock().await;

        if state.is_stopped() {
            log_warn!(
                "ignoring coordinates for {} on a stopped reporter",
                coordinates.content_id
            );
            return ReporterStatus::Stopped;
        }

        if state.coordinates == coordinates {
            return state.status;
        }

        self.cancel_ticker().await;
        self.coordinates_tx.send_replace(coordinates.clone());

        if !coordinates.is_reportable() {
            if state.status == ReporterStatus::Active {
                log_info!("reading session left without a chapter; reporter idle");
            }
            state.idle_with(coordinates);
            return ReporterStatus::Idle;
        }

        let session_id = Uuid::new_v4().to_string();
        log_info!(
            "heartbeat session {} started for {} ch.{:?} p.{}",
            session_id,
            coordinates.content_id,
            coordinates.chapter_number,
            coordinates.page_number
        );

        state.begin_session(session_id.clone(), coordinates, Utc::now());
        self.spawn_ticker(session_id).await;

        ReporterStatus::Active
    }

    /// Tear down for good. Safe to call any number of times.
    pub async fn stop(&self) {
        let mut state = self.state.lock().await;
        if state.is_stopped() {
            return;
        }

        self.cancel_ticker().await;
        if let Some(session_id) = state.session_id.as_deref() {
            log_info!("heartbeat session {} stopped", session_id);
        }
        state.stop();
    }

    async fn spawn_ticker(&self, session_id: String) {
        let mut ticker_guard = self.ticker.lock().await;
        if let Some(previous) = ticker_guard.take() {
            previous.shutdown().await;
        }

        let ctx = TickerContext {
            session_id,
            coordinates: self.coordinates_tx.subscribe(),
            gate: self.gate.clone(),
            transport: self.transport.clone(),
            credentials: Arc::clone(&self.credentials),
            period: self.period,
            in_flight: self.in_flight.clone(),
        };

        *ticker_guard = Some(TickerHandle::spawn(ctx, Arc::clone(&self.live_tickers)));
    }

    async fn cancel_ticker(&self) {
        let previous = self.ticker.lock().await.take();
        if let Some(handle) = previous {
            handle.shutdown().await;
        }
    }
}
