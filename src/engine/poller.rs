//! Background results polling
//!
//! While an experiment's results view is open, the latest snapshot is
//! fetched on a fixed interval and published on a watch channel. Polling is
//! read-only; the decision workflow decides for itself whether to apply a
//! fresher snapshot (it does not while submitting). Fetch failures keep the
//! previous value and are retried on the next tick.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::api::ExperimentStore;
use crate::experiment::ResultsSnapshot;

/// Default refresh interval for an open results view
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Handle to a running snapshot poller
pub struct SnapshotPoller {
    receiver: watch::Receiver<Option<ResultsSnapshot>>,
    stop: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl SnapshotPoller {
    /// Latest snapshot, if at least one fetch has succeeded
    pub fn latest(&self) -> Option<ResultsSnapshot> {
        self.receiver.borrow().clone()
    }

    /// Subscribe to snapshot updates
    pub fn subscribe(&self) -> watch::Receiver<Option<ResultsSnapshot>> {
        self.receiver.clone()
    }

    /// Stop polling; safe to call more than once
    pub fn stop(&self) {
        let _ = self.stop.send(true);
    }
}

impl Drop for SnapshotPoller {
    fn drop(&mut self) {
        let _ = self.stop.send(true);
        self.handle.abort();
    }
}

/// Spawn a background poller for one experiment's results
pub fn spawn_snapshot_poller(
    store: Arc<dyn ExperimentStore>,
    experiment_id: String,
    interval: Duration,
) -> SnapshotPoller {
    let (snapshot_tx, snapshot_rx) = watch::channel(None);
    let (stop_tx, mut stop_rx) = watch::channel(false);

    let handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // First tick fires immediately so the view is populated right away
        loop {
            tokio::select! {
                _ = stop_rx.changed() => {
                    if *stop_rx.borrow() {
                        info!(experiment = %experiment_id, "Snapshot polling stopped");
                        break;
                    }
                }
                _ = ticker.tick() => {
                    match store.fetch_results(&experiment_id).await {
                        Ok(snapshot) => {
                            debug!(
                                experiment = %experiment_id,
                                progress_pct = snapshot.gate.progress_pct,
                                "Results snapshot refreshed"
                            );
                            let _ = snapshot_tx.send(Some(snapshot));
                        }
                        Err(e) => {
                            // Keep the previous snapshot, try again next tick
                            warn!(
                                experiment = %experiment_id,
                                error = %e,
                                "Results fetch failed"
                            );
                        }
                    }
                }
            }
        }
    });

    SnapshotPoller {
        receiver: snapshot_rx,
        stop: stop_tx,
        handle,
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::api::MockExperimentStore;

    #[tokio::test]
    async fn test_poller_publishes_snapshots() {
        let snapshot = ResultsSnapshot {
            no_stable_id_queries: 42,
            ..Default::default()
        };
        let store = Arc::new(MockExperimentStore::new(snapshot));
        let poller = spawn_snapshot_poller(
            store.clone(),
            "exp-1".to_string(),
            Duration::from_millis(10),
        );

        let mut rx = poller.subscribe();
        rx.changed().await.unwrap();
        let latest = poller.latest().unwrap();
        assert_eq!(latest.no_stable_id_queries, 42);
        assert!(store.fetches() >= 1);

        poller.stop();
    }

    #[tokio::test]
    async fn test_poller_keeps_fetching_on_interval() {
        let store = Arc::new(MockExperimentStore::new(ResultsSnapshot::default()));
        let poller = spawn_snapshot_poller(
            store.clone(),
            "exp-1".to_string(),
            Duration::from_millis(5),
        );

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(store.fetches() >= 3);
        poller.stop();

        // After stop, the fetch count settles
        tokio::time::sleep(Duration::from_millis(20)).await;
        let after_stop = store.fetches();
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(store.fetches() <= after_stop + 1);
    }

    #[tokio::test]
    async fn test_fetch_failure_keeps_previous_snapshot() {
        let snapshot = ResultsSnapshot {
            outlier_users_excluded: 7,
            ..Default::default()
        };
        let store = Arc::new(MockExperimentStore::new(snapshot));
        let poller = spawn_snapshot_poller(
            store.clone(),
            "exp-1".to_string(),
            Duration::from_millis(5),
        );

        let mut rx = poller.subscribe();
        rx.changed().await.unwrap();
        assert_eq!(poller.latest().unwrap().outlier_users_excluded, 7);

        // Service starts failing; the last good snapshot stays available
        *store.fetch_error.lock().unwrap() = Some("stats service down".to_string());
        let fetched = store.fetches();
        while store.fetches() < fetched + 2 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(poller.latest().unwrap().outlier_users_excluded, 7);
        poller.stop();
    }
}
