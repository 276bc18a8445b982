//! Periodic registry maintenance: expiring stale lobbies and snapshotting.

use chrono::Utc;
use match_core::{SessionRegistry, Status};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Interval, MissedTickBehavior};
use tracing::{info, warn};

use crate::metrics;
use crate::storage::SessionStore;

/// Remove expired Waiting sessions once. Returns how many were removed.
pub fn cleanup_once(registry: &SessionRegistry) -> usize {
    let removed = registry.cleanup(Utc::now());
    if !removed.is_empty() {
        metrics::SESSIONS_EXPIRED.inc_by(removed.len() as u64);
        metrics::SESSIONS_WAITING.set(registry.count_with_status(Status::Waiting) as i64);
    }
    removed.len()
}

/// Persist the current registry state.
pub async fn save_snapshot(
    registry: &SessionRegistry,
    store: &dyn SessionStore,
) -> anyhow::Result<usize> {
    let sessions = registry.snapshot();
    store.save(&sessions).await?;
    Ok(sessions.len())
}

/// Interval that skips ahead after a slow pass instead of bursting.
fn ticker(every: Duration) -> Interval {
    let mut interval = tokio::time::interval(every);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

pub fn spawn_cleanup(registry: Arc<SessionRegistry>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = ticker(every);
        // First tick fires immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            let removed = cleanup_once(&registry);
            if removed > 0 {
                info!(removed, "Cleanup pass finished");
            }
        }
    })
}

pub fn spawn_snapshots(
    registry: Arc<SessionRegistry>,
    store: Arc<dyn SessionStore>,
    every: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = ticker(every);
        interval.tick().await;
        loop {
            interval.tick().await;
            if let Err(e) = save_snapshot(&registry, store.as_ref()).await {
                warn!("Periodic snapshot failed: {:#}", e);
            }
        }
    })
}
