//! Interfaces to the external collaborators that own the ledgers
//!
//! The reconciliation core only reads. Each source returns
//! `StatusError::CollaboratorUnavailable` (or a storage error) when it cannot
//! answer, and the core then reports the affected state as unknown.
//!
//! Connectivity changes are also pushed through [`ConnectivityHub`]: a
//! listener registered with [`ConnectivityHub::subscribe`] stays registered
//! exactly as long as the returned [`Subscription`] is alive.

use bitcoin::secp256k1::PublicKey;
use bitcoin::Network;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, Weak};

use crate::backup::BackupTarget;
use crate::balance::OnchainBalance;
use crate::channels::{Channel, Order, OrderId};
use crate::error::StatusError;
use crate::readiness::ConnectivityFlags;

/// Node and on-chain wallet state read at one point in time
///
/// Fields the ledger could not report are `None`; only the figures that
/// depend on them become unknown.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerSnapshot {
    pub onchain: Option<OnchainBalance>,
    pub channels: Vec<Channel>,
    pub closed_channels: Vec<Channel>,
    pub node_ready: Option<bool>,
}

/// Liquidity-service orders; must be from the same revision as the ledger
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiquiditySnapshot {
    pub orders: Vec<Order>,
    pub paid_order_ids: Vec<OrderId>,
    pub service_node_key: PublicKey,
}

/// Lightning node and on-chain wallet
pub trait LedgerSource: Send + Sync {
    fn onchain_balance(&self, wallet: &str, network: Network) -> Result<u64, StatusError>;
    /// Funds in flight after a channel open/close
    fn claimable_balance(&self) -> Result<u64, StatusError>;
    fn channels(&self) -> Result<Vec<Channel>, StatusError>;
    fn closed_channels(&self) -> Result<Vec<Channel>, StatusError>;
    fn is_node_ready(&self) -> Result<bool, StatusError>;

    /// Everything above in one read
    ///
    /// The default composes the single calls and is only consistent when the
    /// source cannot change between them; sources backed by a document
    /// should override it with a single load. Failing channel lists fail the
    /// snapshot, a failing balance or readiness call only blanks that field.
    fn ledger_snapshot(&self, wallet: &str, network: Network) -> Result<LedgerSnapshot, StatusError> {
        let channels = self.channels()?;
        let closed_channels = self.closed_channels()?;

        let onchain = self
            .onchain_balance(wallet, network)
            .and_then(|total_sats| {
                Ok(OnchainBalance {
                    total_sats,
                    claimable_sats: self.claimable_balance()?,
                })
            })
            .map_err(|e| log::warn!("On-chain balance unavailable: {}", e))
            .ok();
        let node_ready = self
            .is_node_ready()
            .map_err(|e| log::warn!("Node state unavailable: {}", e))
            .ok();

        Ok(LedgerSnapshot {
            onchain,
            channels,
            closed_channels,
            node_ready,
        })
    }
}

/// Third-party liquidity service selling inbound channels
pub trait LiquiditySource: Send + Sync {
    fn orders(&self) -> Result<Vec<Order>, StatusError>;
    fn paid_order_ids(&self) -> Result<Vec<OrderId>, StatusError>;
    fn service_node_key(&self) -> Result<PublicKey, StatusError>;

    /// Orders, paid ids and service key in one read
    fn liquidity_snapshot(&self) -> Result<LiquiditySnapshot, StatusError> {
        Ok(LiquiditySnapshot {
            orders: self.orders()?,
            paid_order_ids: self.paid_order_ids()?,
            service_node_key: self.service_node_key()?,
        })
    }
}

pub trait ConnectivitySource: Send + Sync {
    fn is_internet_reachable(&self) -> Result<bool, StatusError>;
    /// Electrum / bitcoin node connection
    fn is_settlement_layer_connected(&self) -> Result<bool, StatusError>;
}

pub trait BackupSource: Send + Sync {
    fn backup_targets(&self) -> Result<Vec<BackupTarget>, StatusError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityEvent {
    Internet(bool),
    SettlementLayer(bool),
}

type Listener = Arc<dyn Fn(ConnectivityEvent) + Send + Sync>;

struct HubInner {
    listeners: RwLock<HashMap<u64, Listener>>,
    next_id: AtomicU64,
    internet: RwLock<Option<bool>>,
    settlement_layer: RwLock<Option<bool>>,
}

/// In-process publisher of connectivity changes
#[derive(Clone)]
pub struct ConnectivityHub {
    inner: Arc<HubInner>,
}

impl ConnectivityHub {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(HubInner {
                listeners: RwLock::new(HashMap::new()),
                next_id: AtomicU64::new(0),
                internet: RwLock::new(None),
                settlement_layer: RwLock::new(None),
            }),
        }
    }

    /// Register a listener; it is removed when the handle drops
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(ConnectivityEvent) + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner
            .listeners
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id, Arc::new(listener));
        log::debug!("Connectivity listener {} registered", id);

        Subscription {
            id,
            hub: Arc::downgrade(&self.inner),
        }
    }

    /// Record a new reading and notify every listener
    pub fn publish(&self, event: ConnectivityEvent) {
        let (cell, value) = match event {
            ConnectivityEvent::Internet(value) => (&self.inner.internet, value),
            ConnectivityEvent::SettlementLayer(value) => (&self.inner.settlement_layer, value),
        };
        *cell.write().unwrap_or_else(|e| e.into_inner()) = Some(value);

        // Snapshot the listeners so a callback may subscribe or unsubscribe
        let listeners: Vec<Listener> = self
            .inner
            .listeners
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .cloned()
            .collect();
        for listener in listeners {
            listener(event);
        }
    }

    /// Latest published readings; node readiness is not tracked here
    pub fn flags(&self) -> ConnectivityFlags {
        ConnectivityFlags {
            internet: *self.inner.internet.read().unwrap_or_else(|e| e.into_inner()),
            settlement_layer: *self
                .inner
                .settlement_layer
                .read()
                .unwrap_or_else(|e| e.into_inner()),
            node_ready: None,
        }
    }

    pub fn listener_count(&self) -> usize {
        self.inner
            .listeners
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }
}

impl Default for ConnectivityHub {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectivitySource for ConnectivityHub {
    fn is_internet_reachable(&self) -> Result<bool, StatusError> {
        self.flags()
            .internet
            .ok_or_else(|| StatusError::unavailable("internet reachability not reported yet"))
    }

    fn is_settlement_layer_connected(&self) -> Result<bool, StatusError> {
        self.flags()
            .settlement_layer
            .ok_or_else(|| StatusError::unavailable("server connection not reported yet"))
    }
}

/// Registration handle returned by [`ConnectivityHub::subscribe`]
#[must_use = "dropping the subscription unregisters the listener"]
pub struct Subscription {
    id: u64,
    hub: Weak<HubInner>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        // Drop does the work
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(hub) = self.hub.upgrade() {
            hub.listeners
                .write()
                .unwrap_or_else(|e| e.into_inner())
                .remove(&self.id);
            log::debug!("Connectivity listener {} unregistered", self.id);
        }
    }
}
