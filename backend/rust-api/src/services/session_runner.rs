use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{interval, sleep, MissedTickBehavior};
use tracing::{debug, info};

use crate::metrics::SESSIONS_TOTAL;
use crate::services::session_service::{SessionHandle, SessionRegistry};

/// Ticks one session until it is submitted or torn down. A submitted session
/// stays registered for `retention` so its report can be fetched, then it is
/// evicted.
pub async fn run(
    handle: Arc<SessionHandle>,
    registry: Arc<SessionRegistry>,
    tick_interval: Duration,
    retention: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = interval(tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // The first tick of an interval completes immediately.
    ticker.tick().await;

    info!(session_id = %handle.id(), "Session timer started");

    let submitted = loop {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    debug!(session_id = %handle.id(), "Session timer received shutdown");
                    break false;
                }
            }
            _ = ticker.tick() => {
                if handle.tick().await {
                    break true;
                }
            }
        }
    };

    info!(session_id = %handle.id(), "Session timer stopped");

    if submitted {
        retain_then_evict(&handle, &registry, retention, &mut shutdown).await;
    }
}

async fn retain_then_evict(
    handle: &SessionHandle,
    registry: &SessionRegistry,
    retention: Duration,
    shutdown: &mut watch::Receiver<bool>,
) {
    tokio::select! {
        _ = shutdown.changed() => {
            debug!(session_id = %handle.id(), "Submitted session torn down before eviction");
        }
        _ = sleep(retention) => {
            if registry.write().await.remove(handle.id()).is_some() {
                SESSIONS_TOTAL.with_label_values(&["evicted"]).inc();
                info!(
                    session_id = %handle.id(),
                    retention_seconds = retention.as_secs(),
                    "Evicted submitted session"
                );
            }
        }
    }
}
