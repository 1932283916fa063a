use std::sync::Arc;

use chrono::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::SessionConfig;
use crate::services::advisory::ResponseCache;
use crate::services::session_manager::SessionManager;
use crate::utils::error::Result;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub sessions_idled: u64,
    pub sessions_removed: u64,
    pub cache_purged: usize,
}

/// One maintenance pass: idle sweep, expired-session cleanup, cache purge
pub async fn run_sweep(
    sessions: &SessionManager,
    cache: &ResponseCache,
    idle_timeout: Duration,
) -> Result<SweepReport> {
    let sessions_idled = sessions.mark_idle(idle_timeout).await?;
    let sessions_removed = sessions.cleanup_expired().await?;
    let cache_purged = cache.purge_expired();

    Ok(SweepReport {
        sessions_idled,
        sessions_removed,
        cache_purged,
    })
}

/// Periodic sweep until `cancel` fires. A failed pass is logged and the
/// loop continues.
pub fn spawn_maintenance(
    sessions: Arc<SessionManager>,
    cache: Arc<ResponseCache>,
    cfg: &SessionConfig,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    let idle_timeout = cfg.idle_timeout();
    let period = cfg.sweep_interval();

    tokio::spawn(async move {
        info!("Maintenance worker started (every {}s)", period.as_secs());
        let mut ticker = tokio::time::interval(period);
        // first tick completes immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            match run_sweep(&sessions, &cache, idle_timeout).await {
                Ok(report) if report != SweepReport::default() => info!(
                    "Maintenance sweep: {} idled, {} sessions removed, {} cache entries purged",
                    report.sessions_idled, report.sessions_removed, report.cache_purged
                ),
                Ok(_) => debug!("Maintenance sweep: nothing to do"),
                Err(e) => warn!("Maintenance sweep failed: {}", e),
            }
        }
        info!("Maintenance worker stopped");
    })
}
