//! Wallet status façade
//!
//! Holds the latest snapshot from every collaborator and answers the four
//! presentation queries: balance, channels, readiness and backup health.
//! Every snapshot update bumps a revision; results are memoized against the
//! revisions they were computed from and recomputed as soon as any of them
//! moves. Backup health depends on the clock as well and is evaluated on
//! every call.

use bitcoin::Network;
use std::sync::{Arc, Mutex, RwLock, Weak};

use crate::backup::{BackupHealth, BackupTarget, BackupWatchdog, Clock};
use crate::balance::{self, BalanceSnapshot, LightningTotals};
use crate::channels::{self, ChannelSet, ReconcileInput};
use crate::collaborators::{
    BackupSource, ConnectivityEvent, ConnectivityHub, ConnectivitySource, LedgerSnapshot,
    LedgerSource, LiquiditySnapshot, LiquiditySource, Subscription,
};
use crate::config::StatusConfig;
use crate::error::StatusError;
use crate::readiness::{
    self, ChannelCounts, ConnectivityBanner, ConnectivityFlags, ReadinessState, Signal, Transition,
    TransitionTracker,
};

/// The collaborators a refresh pass reads from
#[derive(Clone, Copy)]
pub struct Sources<'a> {
    pub ledger: &'a dyn LedgerSource,
    pub liquidity: &'a dyn LiquiditySource,
    pub connectivity: &'a dyn ConnectivitySource,
    pub backup: &'a dyn BackupSource,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Revisions {
    ledger: u64,
    liquidity: u64,
    connectivity: u64,
    backup: u64,
}

#[derive(Default)]
struct Inputs {
    ledger: Option<LedgerSnapshot>,
    liquidity: Option<LiquiditySnapshot>,
    internet: Option<bool>,
    settlement_layer: Option<bool>,
    backup: Option<Vec<BackupTarget>>,
    revisions: Revisions,
    counter: u64,
}

impl Inputs {
    fn next_revision(&mut self) -> u64 {
        self.counter += 1;
        self.counter
    }

    fn flags(&self) -> ConnectivityFlags {
        ConnectivityFlags {
            internet: self.internet,
            settlement_layer: self.settlement_layer,
            node_ready: self.ledger.as_ref().and_then(|ledger| ledger.node_ready),
        }
    }
}

struct Memo<K, T> {
    key: K,
    value: T,
}

#[derive(Default)]
struct MemoCache {
    balance: Option<Memo<(u64, u64), BalanceSnapshot>>,
    channels: Option<Memo<(u64, u64), ChannelSet>>,
    readiness: Option<Memo<Revisions, ReadinessState>>,
}

pub struct WalletStatus {
    wallet_name: String,
    network: Network,
    inputs: RwLock<Inputs>,
    memo: Mutex<MemoCache>,
    watchdog: Mutex<BackupWatchdog>,
    tracker: Mutex<TransitionTracker>,
    notifications: Mutex<Vec<Transition>>,
}

impl WalletStatus {
    pub fn new(config: &StatusConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            wallet_name: config.wallet_name.clone(),
            network: config.network,
            inputs: RwLock::new(Inputs::default()),
            memo: Mutex::new(MemoCache::default()),
            watchdog: Mutex::new(BackupWatchdog::new(config.stale_threshold_chrono(), clock)),
            tracker: Mutex::new(TransitionTracker::new()),
            notifications: Mutex::new(Vec::new()),
        }
    }

    // ------------------------------------------------------------------
    // Snapshot updates
    // ------------------------------------------------------------------

    pub fn update_ledger(&self, ledger: Option<LedgerSnapshot>) -> Vec<Transition> {
        {
            let mut inputs = self.write_inputs();
            inputs.ledger = ledger;
            inputs.revisions.ledger = inputs.next_revision();
        }
        self.track_transitions()
    }

    pub fn update_liquidity(&self, liquidity: Option<LiquiditySnapshot>) {
        let mut inputs = self.write_inputs();
        inputs.liquidity = liquidity;
        inputs.revisions.liquidity = inputs.next_revision();
    }

    pub fn update_connectivity(&self, event: ConnectivityEvent) -> Vec<Transition> {
        match event {
            ConnectivityEvent::Internet(value) => self.set_connectivity(Signal::Internet, Some(value)),
            ConnectivityEvent::SettlementLayer(value) => {
                self.set_connectivity(Signal::SettlementLayer, Some(value))
            }
        }
    }

    pub fn update_backup(&self, targets: Option<Vec<BackupTarget>>) {
        let mut inputs = self.write_inputs();
        inputs.backup = targets;
        inputs.revisions.backup = inputs.next_revision();
    }

    /// Pull a fresh snapshot from every collaborator
    ///
    /// A collaborator that fails is recorded as unknown. Returns the
    /// connectivity transitions this refresh caused.
    pub fn refresh(&self, sources: Sources<'_>) -> Vec<Transition> {
        let ledger = self.read_ledger(sources.ledger);
        let liquidity = read_liquidity(sources.liquidity);

        let mut transitions = Vec::new();
        let internet = sources
            .connectivity
            .is_internet_reachable()
            .map_err(|e| log::warn!("Internet reachability unknown: {}", e))
            .ok();
        transitions.extend(self.set_connectivity(Signal::Internet, internet));
        let settlement_layer = sources
            .connectivity
            .is_settlement_layer_connected()
            .map_err(|e| log::warn!("Server connection state unknown: {}", e))
            .ok();
        transitions.extend(self.set_connectivity(Signal::SettlementLayer, settlement_layer));

        let backup = match sources.backup.backup_targets() {
            Ok(targets) => Some(targets),
            Err(e) => {
                log::warn!("Backup state unavailable: {}", e);
                None
            }
        };

        // Ledger and orders land together so no reader sees one without the other
        {
            let mut inputs = self.write_inputs();
            inputs.ledger = ledger;
            inputs.revisions.ledger = inputs.next_revision();
            inputs.liquidity = liquidity;
            inputs.revisions.liquidity = inputs.next_revision();
        }
        transitions.extend(self.track_transitions());
        self.update_backup(backup);

        transitions
    }

    /// Follow a connectivity hub for as long as the returned handle lives
    pub fn attach(self: &Arc<Self>, hub: &ConnectivityHub) -> Subscription {
        let status: Weak<Self> = Arc::downgrade(self);
        hub.subscribe(move |event| {
            if let Some(status) = status.upgrade() {
                status.update_connectivity(event);
            }
        })
    }

    /// Drain transitions not yet shown to the user
    pub fn take_notifications(&self) -> Vec<Transition> {
        std::mem::take(&mut *self.notifications.lock().unwrap_or_else(|e| e.into_inner()))
    }

    // ------------------------------------------------------------------
    // Presentation queries
    // ------------------------------------------------------------------

    /// Balance over the channels the channel view lists as open
    pub fn balance_snapshot(&self) -> Result<BalanceSnapshot, StatusError> {
        let inputs = self.read_inputs();
        let revision = (inputs.revisions.ledger, inputs.revisions.liquidity);
        let mut memo = self.lock_memo();
        if let Some(cached) = memo.balance.as_ref().filter(|m| m.key == revision) {
            return Ok(cached.value);
        }

        let onchain = inputs
            .ledger
            .as_ref()
            .and_then(|ledger| ledger.onchain)
            .ok_or_else(|| StatusError::unavailable("on-chain balance"))?;
        let set = channel_view_locked(&inputs, &mut memo)?;
        let snapshot = balance::compute(onchain, set.open_channels())?;
        memo.balance = Some(Memo {
            key: revision,
            value: snapshot,
        });
        Ok(snapshot)
    }

    pub fn lightning_totals(&self) -> Result<LightningTotals, StatusError> {
        let inputs = self.read_inputs();
        let mut memo = self.lock_memo();
        let set = channel_view_locked(&inputs, &mut memo)?;
        balance::lightning_totals(set.open_channels())
    }

    pub fn channel_view(&self) -> Result<ChannelSet, StatusError> {
        let inputs = self.read_inputs();
        let mut memo = self.lock_memo();
        channel_view_locked(&inputs, &mut memo)
    }

    pub fn readiness_state(&self) -> ReadinessState {
        let inputs = self.read_inputs();
        let revisions = inputs.revisions;
        let mut memo = self.lock_memo();
        if let Some(cached) = memo.readiness.as_ref().filter(|m| m.key == revisions) {
            return cached.value;
        }

        let counts = match channel_view_locked(&inputs, &mut memo) {
            Ok(set) => ChannelCounts::from_set(&set),
            Err(_) => ChannelCounts::default(),
        };
        let state = readiness::evaluate(inputs.flags(), counts);
        memo.readiness = Some(Memo {
            key: revisions,
            value: state,
        });
        state
    }

    pub fn connectivity_banner(&self) -> ConnectivityBanner {
        ConnectivityBanner::from_flags(&self.read_inputs().flags())
    }

    /// Backup health at the watchdog clock's current time
    ///
    /// Unknown backup state is reported as unhealthy.
    pub fn backup_health(&self) -> BackupHealth {
        let inputs = self.read_inputs();
        let mut watchdog = self.watchdog.lock().unwrap_or_else(|e| e.into_inner());
        match &inputs.backup {
            Some(targets) => watchdog.check(targets),
            None => BackupHealth {
                healthy: false,
                stale_targets: Vec::new(),
                display_sync: None,
            },
        }
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn read_ledger(&self, source: &dyn LedgerSource) -> Option<LedgerSnapshot> {
        source
            .ledger_snapshot(&self.wallet_name, self.network)
            .map_err(|e| log::warn!("Ledger snapshot unavailable: {}", e))
            .ok()
    }

    fn set_connectivity(&self, signal: Signal, value: Option<bool>) -> Vec<Transition> {
        {
            let mut inputs = self.write_inputs();
            let slot = match signal {
                Signal::Internet => &mut inputs.internet,
                Signal::SettlementLayer => &mut inputs.settlement_layer,
                // node readiness arrives with the ledger snapshot
                Signal::LightningNode => return Vec::new(),
            };
            if *slot == value {
                return Vec::new();
            }
            *slot = value;
            inputs.revisions.connectivity = inputs.next_revision();
        }
        self.track_transitions()
    }

    fn track_transitions(&self) -> Vec<Transition> {
        let flags = self.read_inputs().flags();
        let transitions = self
            .tracker
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .observe(flags);
        if !transitions.is_empty() {
            self.notifications
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .extend(transitions.iter().copied());
        }
        transitions
    }

    fn read_inputs(&self) -> std::sync::RwLockReadGuard<'_, Inputs> {
        self.inputs.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_inputs(&self) -> std::sync::RwLockWriteGuard<'_, Inputs> {
        self.inputs.write().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_memo(&self) -> std::sync::MutexGuard<'_, MemoCache> {
        self.memo.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn read_liquidity(source: &dyn LiquiditySource) -> Option<LiquiditySnapshot> {
    source
        .liquidity_snapshot()
        .map_err(|e| log::warn!("Liquidity orders unavailable: {}", e))
        .ok()
}

fn channel_view_locked(inputs: &Inputs, memo: &mut MemoCache) -> Result<ChannelSet, StatusError> {
    let key = (inputs.revisions.ledger, inputs.revisions.liquidity);
    if let Some(cached) = memo.channels.as_ref().filter(|m| m.key == key) {
        return Ok(cached.value.clone());
    }

    let ledger = inputs
        .ledger
        .as_ref()
        .ok_or_else(|| StatusError::unavailable("ledger snapshot"))?;

    let set = match &inputs.liquidity {
        Some(liquidity) => channels::reconcile(ReconcileInput {
            channels: &ledger.channels,
            closed_channels: &ledger.closed_channels,
            paid_order_ids: &liquidity.paid_order_ids,
            orders: &liquidity.orders,
            service_node_key: &liquidity.service_node_key,
        }),
        None => {
            log::debug!("No liquidity snapshot, reconciling real channels only");
            reconcile_real_only(ledger)
        }
    };

    memo.channels = Some(Memo {
        key,
        value: set.clone(),
    });
    Ok(set)
}

fn reconcile_real_only(ledger: &LedgerSnapshot) -> ChannelSet {
    let mut open = Vec::new();
    let mut pending = Vec::new();
    for channel in &ledger.channels {
        if ledger
            .closed_channels
            .iter()
            .any(|closed| closed.channel_id == channel.channel_id)
        {
            continue;
        }
        let view = channels::ChannelView::Real(channel.clone());
        if channel.is_channel_ready {
            open.push(view);
        } else {
            pending.push(view);
        }
    }
    open.reverse();
    pending.reverse();

    ChannelSet {
        open,
        pending,
        closed: ledger
            .closed_channels
            .iter()
            .rev()
            .cloned()
            .map(channels::ChannelView::Real)
            .collect(),
        failed: Vec::new(),
        issues: Vec::new(),
    }
}
