use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::auth::CredentialProvider;

use super::payload::{HeartbeatPayload, SessionCoordinates};
use super::transport::HeartbeatTransport;
use super::visibility::VisibilityGate;

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info};

/// Everything one ticker needs. Coordinates come through a watch channel and
/// the credential through the provider, both read at send time.
pub(super) struct TickerContext {
    pub session_id: String,
    pub coordinates: watch::Receiver<SessionCoordinates>,
    pub gate: VisibilityGate,
    pub transport: HeartbeatTransport,
    pub credentials: Arc<dyn CredentialProvider>,
    pub period: Duration,
    pub in_flight: TaskTracker,
}

/// The single live ticker of a reporter. Dropping it cancels the loop.
pub(super) struct TickerHandle {
    handle: Option<JoinHandle<()>>,
    cancel_token: CancellationToken,
}

impl TickerHandle {
    pub fn spawn(ctx: TickerContext, live: Arc<AtomicUsize>) -> Self {
        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(heartbeat_loop(ctx, cancel_token.clone(), live));
        Self {
            handle: Some(handle),
            cancel_token,
        }
    }

    /// Cancels the loop and waits for it to exit, so no tick fires after this
    /// returns. Sends already dispatched are left to finish.
    pub async fn shutdown(mut self) {
        self.cancel_token.cancel();
        if let Some(handle) = self.handle.take() {
            if let Err(err) = handle.await {
                if !err.is_cancelled() {
                    log_error!("heartbeat ticker task failed to join: {err}");
                }
            }
        }
    }
}

impl Drop for TickerHandle {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}

struct LiveTicker(Arc<AtomicUsize>);

impl LiveTicker {
    fn enter(counter: Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for LiveTicker {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

async fn heartbeat_loop(ctx: TickerContext, cancel_token: CancellationToken, live: Arc<AtomicUsize>) {
    let _live = LiveTicker::enter(live);

    // First tick completes immediately: that is the report on session start.
    let mut ticker = time::interval(ctx.period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel_token.cancelled() => {
                log_info!("heartbeat ticker for session {} shutting down", ctx.session_id);
                break;
            }
            _ = ticker.tick() => {
                dispatch_report(&ctx);
            }
        }
    }
}

/// Fire-and-forget: the send runs on its own task so a slow collector never
/// delays the next tick. The task is tracked so the owner can wait it out.
fn dispatch_report(ctx: &TickerContext) {
    if !ctx.gate.should_report() {
        log_debug!("tab hidden; skipping heartbeat for session {}", ctx.session_id);
        return;
    }

    let Some(payload) = HeartbeatPayload::from_coordinates(&ctx.coordinates.borrow()) else {
        return;
    };

    let transport = ctx.transport.clone();
    let credentials = Arc::clone(&ctx.credentials);
    ctx.in_flight.spawn(async move {
        let token = credentials.bearer_token();
        transport.send(&payload, token.as_deref()).await;
    });
}
