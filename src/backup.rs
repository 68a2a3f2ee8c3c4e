//! Backup Staleness Watchdog
//!
//! Each backup target records when it last synced and, while a change is
//! waiting to be uploaded, since when a sync has been required. A target
//! whose pending sync is older than the stale threshold is stale, and a
//! single stale target makes the overall backup state an error.
//!
//! [`tick`] is the pure evaluation. [`BackupWatchdog`] wraps it with one
//! clock source and never lets its notion of "now" move backwards, so a
//! wall-clock adjustment cannot flip health back to ready while a sync is
//! still outstanding.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex};

use crate::readiness::ItemState;

pub type Timestamp = DateTime<Utc>;

/// The fixed set of remote backup destinations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackupTargetId {
    LightningState,
    LightningActivity,
    LiquidityOrders,
    Settings,
    Metadata,
    Widgets,
}

impl BackupTargetId {
    pub const ALL: [BackupTargetId; 6] = [
        Self::LightningState,
        Self::LightningActivity,
        Self::LiquidityOrders,
        Self::Settings,
        Self::Metadata,
        Self::Widgets,
    ];
}

impl fmt::Display for BackupTargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::LightningState => "lightning state",
            Self::LightningActivity => "lightning activity",
            Self::LiquidityOrders => "liquidity orders",
            Self::Settings => "settings",
            Self::Metadata => "metadata",
            Self::Widgets => "widgets",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupTarget {
    pub id: BackupTargetId,
    #[serde(default)]
    pub last_sync: Option<Timestamp>,
    /// Set when a change is waiting to be backed up, cleared on sync
    #[serde(default)]
    pub sync_required_since: Option<Timestamp>,
}

impl BackupTarget {
    pub fn new(id: BackupTargetId) -> Self {
        Self {
            id,
            last_sync: None,
            sync_required_since: None,
        }
    }

    /// Nothing pending means synchronized, whatever `last_sync` says
    pub fn is_stale(&self, now: Timestamp, threshold: chrono::Duration) -> bool {
        match self.sync_required_since {
            Some(since) => now.signed_duration_since(since) >= threshold,
            None => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackupHealth {
    pub healthy: bool,
    pub stale_targets: Vec<BackupTargetId>,
    /// Most recent sync across all targets; only reported while healthy
    pub display_sync: Option<Timestamp>,
}

impl BackupHealth {
    pub fn state(&self) -> ItemState {
        if self.healthy {
            ItemState::Ready
        } else {
            ItemState::Error
        }
    }
}

/// Evaluate all targets at `now`
pub fn tick(targets: &[BackupTarget], now: Timestamp, threshold: chrono::Duration) -> BackupHealth {
    let mut stale_targets: Vec<BackupTargetId> = targets
        .iter()
        .filter(|target| target.is_stale(now, threshold))
        .map(|target| target.id)
        .collect();
    stale_targets.sort();
    stale_targets.dedup();

    let healthy = stale_targets.is_empty();
    let display_sync = if healthy {
        targets.iter().filter_map(|target| target.last_sync).max()
    } else {
        None
    };

    BackupHealth {
        healthy,
        stale_targets,
        display_sync,
    }
}

/// Time source for the watchdog; one watchdog uses one clock only
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Utc::now()
    }
}

/// Hand-driven clock for tests and replay tooling
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<Timestamp>,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn set(&self, now: Timestamp) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = now;
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

pub struct BackupWatchdog {
    threshold: chrono::Duration,
    clock: Arc<dyn Clock>,
    latest_now: Option<Timestamp>,
    last_healthy: Option<bool>,
}

impl BackupWatchdog {
    pub fn new(threshold: chrono::Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            threshold,
            clock,
            latest_now: None,
            last_healthy: None,
        }
    }

    pub fn threshold(&self) -> chrono::Duration {
        self.threshold
    }

    /// Evaluate at the clock's current time
    pub fn check(&mut self, targets: &[BackupTarget]) -> BackupHealth {
        let now = self.clock.now();
        self.check_at(targets, now)
    }

    /// Evaluate at `now`, or at the latest time already seen if later
    pub fn check_at(&mut self, targets: &[BackupTarget], now: Timestamp) -> BackupHealth {
        let now = match self.latest_now {
            Some(latest) if latest > now => {
                log::debug!("Clock went back from {} to {}, holding at {}", latest, now, latest);
                latest
            }
            _ => now,
        };
        self.latest_now = Some(now);

        let health = tick(targets, now, self.threshold);

        if self.last_healthy != Some(health.healthy) {
            if health.healthy {
                log::info!("Backups in sync (last sync: {:?})", health.display_sync);
            } else {
                let stale: Vec<String> = health.stale_targets.iter().map(|t| t.to_string()).collect();
                log::warn!("Backup sync overdue for: {}", stale.join(", "));
            }
            self.last_healthy = Some(health.healthy);
        }

        health
    }
}
