//! Status Refresh Scheduler
//!
//! Drives the status core on a fixed cadence:
//! - Pulls fresh snapshots from the collaborators
//! - Re-evaluates backup staleness against the clock
//! - Stops cleanly on shutdown
//!
//! The watchdog never evaluates on its own; without this driver (or an
//! explicit call to [`StatusScheduler::tick`]) backup health is not updated.

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use crate::backup::BackupHealth;
use crate::collaborators::{BackupSource, ConnectivitySource, LedgerSource, LiquiditySource};
use crate::readiness::{ReadinessState, Transition};
use crate::status::{Sources, WalletStatus};

/// Everything one scheduled pass observed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusTick {
    pub transitions: Vec<Transition>,
    pub readiness: ReadinessState,
    pub backup: BackupHealth,
}

pub struct StatusScheduler<S> {
    status: Arc<WalletStatus>,
    source: Arc<S>,
    interval: Duration,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl<S> StatusScheduler<S>
where
    S: LedgerSource + LiquiditySource + ConnectivitySource + BackupSource + 'static,
{
    pub fn new(status: Arc<WalletStatus>, source: Arc<S>, interval: Duration) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        log::info!("Status scheduler initialized (interval={}ms)", interval.as_millis());
        Self {
            status,
            source,
            interval,
            shutdown_tx,
            shutdown_rx,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// One synchronous refresh + watchdog pass
    pub fn tick(&self) -> StatusTick {
        let source: &S = &self.source;
        let transitions = self.status.refresh(Sources {
            ledger: source,
            liquidity: source,
            connectivity: source,
            backup: source,
        });

        StatusTick {
            transitions,
            readiness: self.status.readiness_state(),
            backup: self.status.backup_health(),
        }
    }

    /// Tick every interval until [`StatusScheduler::shutdown`] is called
    ///
    /// The first tick runs immediately.
    pub async fn run<F>(&self, mut on_tick: F)
    where
        F: FnMut(StatusTick),
    {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut shutdown_rx = self.shutdown_rx.clone();

        if *shutdown_rx.borrow() {
            return;
        }

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    on_tick(self.tick());
                }
                _ = shutdown_rx.changed() => {
                    log::info!("Status scheduler shutting down");
                    break;
                }
            }
        }
    }

    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::{BackupTarget, BackupTargetId, Clock, ManualClock};
    use crate::config::StatusConfig;
    use crate::readiness::ItemState;
    use crate::storage::{BackupDocument, ConnectivityDocument, SnapshotStore};
    use chrono::{TimeZone, Utc};
    use std::sync::Mutex;
    use tempfile::TempDir;

    fn setup() -> (TempDir, Arc<SnapshotStore>, Arc<WalletStatus>, Arc<ManualClock>) {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(SnapshotStore::new_with_base_dir(dir.path().to_path_buf(), "wallet0"));
        let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()));
        let status = Arc::new(WalletStatus::new(&StatusConfig::default(), clock.clone()));
        (dir, store, status, clock)
    }

    #[test]
    fn test_tick_with_empty_store_fails_closed() {
        let (_dir, store, status, _) = setup();
        let scheduler = StatusScheduler::new(status, store, Duration::from_secs(1));

        let tick = scheduler.tick();
        assert_eq!(tick.readiness, ReadinessState::unknown());
        assert!(!tick.backup.healthy);
        assert!(tick.transitions.is_empty());
    }

    #[test]
    fn test_tick_picks_up_store_changes() {
        let (_dir, store, status, clock) = setup();
        let scheduler = StatusScheduler::new(status, store.clone(), Duration::from_secs(1));

        store
            .save_connectivity(&ConnectivityDocument {
                internet: Some(true),
                settlement_layer: Some(true),
            })
            .unwrap();
        store
            .save_backup(&BackupDocument {
                targets: vec![BackupTarget {
                    id: BackupTargetId::Widgets,
                    last_sync: None,
                    sync_required_since: Some(clock.now()),
                }],
            })
            .unwrap();

        let first = scheduler.tick();
        assert_eq!(first.readiness.internet, ItemState::Ready);
        assert!(first.backup.healthy);

        store
            .save_connectivity(&ConnectivityDocument {
                internet: Some(false),
                settlement_layer: Some(true),
            })
            .unwrap();
        clock.advance(chrono::Duration::seconds(301));

        let second = scheduler.tick();
        assert_eq!(second.transitions.len(), 1);
        assert_eq!(second.readiness.settlement_layer, ItemState::Error);
        assert_eq!(second.backup.stale_targets, vec![BackupTargetId::Widgets]);
    }

    #[tokio::test]
    async fn test_run_until_shutdown() {
        let (_dir, store, status, _) = setup();
        let scheduler = Arc::new(StatusScheduler::new(status, store, Duration::from_millis(10)));
        let ticks = Arc::new(Mutex::new(0usize));

        let handle = {
            let scheduler = scheduler.clone();
            let ticks = ticks.clone();
            tokio::spawn(async move {
                scheduler.run(move |_| *ticks.lock().unwrap() += 1).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        scheduler.shutdown();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();

        assert!(*ticks.lock().unwrap() >= 1);
    }

    #[tokio::test]
    async fn test_run_after_shutdown_returns_immediately() {
        let (_dir, store, status, _) = setup();
        let scheduler = StatusScheduler::new(status, store, Duration::from_millis(10));
        scheduler.shutdown();

        let mut ticks = 0;
        scheduler.run(|_| ticks += 1).await;
        assert_eq!(ticks, 0);
    }
}
