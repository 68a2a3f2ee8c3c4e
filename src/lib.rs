//! Wallet Status: balance, channel, readiness and backup reconciliation
//!
//! This crate turns raw snapshots from a Lightning node, an on-chain wallet,
//! a liquidity service and the backup uploader into the figures a
//! Bitcoin/Lightning wallet shows its user.
//!
//! # Architecture
//!
//! - **Balance Aggregator**: on-chain funds plus ready channel balances
//! - **Channel Reconciler**: merges real channels with paid liquidity orders
//! - **Readiness**: connectivity flags and channel counts to ready/pending/error
//! - **Backup Watchdog**: flags backup targets whose sync is overdue
//!
//! Every engine is a pure function of its inputs; [`WalletStatus`] holds the
//! latest inputs and memoizes the results.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use wallet_status::{SnapshotStore, StatusConfig, StatusScheduler, SystemClock, WalletStatus};
//!
//! let config = StatusConfig::from_env()?;
//! let store = Arc::new(SnapshotStore::new(&config));
//! let status = Arc::new(WalletStatus::new(&config, Arc::new(SystemClock)));
//!
//! let scheduler = StatusScheduler::new(status.clone(), store, config.check_interval);
//! let tick = scheduler.tick();
//! println!("spendable: {}", status.balance_snapshot()?.spendable_sats());
//! ```

// Public modules
pub mod backup;
pub mod balance;
pub mod channels;
pub mod collaborators;
pub mod config;
pub mod error;
pub mod readiness;
pub mod scheduler;
pub mod status;
pub mod storage;

// Re-exports for convenience
pub use backup::{
    BackupHealth, BackupTarget, BackupTargetId, BackupWatchdog, Clock, ManualClock, SystemClock,
    Timestamp,
};
pub use balance::{BalanceSnapshot, LightningTotals, OnchainBalance};
pub use channels::{
    reconcile, Channel, ChannelId, ChannelSet, ChannelView, IntegrityIssue, Order, OrderId,
    OrderState, ReconcileInput, SyntheticChannel,
};
pub use collaborators::{
    BackupSource, ConnectivityEvent, ConnectivityHub, ConnectivitySource, LedgerSnapshot,
    LedgerSource, LiquiditySnapshot, LiquiditySource, Subscription,
};
pub use config::StatusConfig;
pub use error::{StatusError, StorageError};
pub use readiness::{
    ConnectivityBanner, ConnectivityFlags, ItemState, ReadinessState, Signal, Transition,
    TransitionTracker,
};
pub use scheduler::{StatusScheduler, StatusTick};
pub use status::{Sources, WalletStatus};
pub use storage::SnapshotStore;

// Common result type
pub type Result<T> = std::result::Result<T, StatusError>;
