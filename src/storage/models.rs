//! Data models for snapshot storage

use bitcoin::secp256k1::PublicKey;
use bitcoin::Network;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::backup::BackupTarget;
use crate::channels::{Channel, Order, OrderId};

/// On-chain balance of one wallet on one network
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnchainEntry {
    pub wallet: String,
    pub network: Network,
    pub total_sats: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerDocument {
    #[serde(default)]
    pub balances: Vec<OnchainEntry>,
    #[serde(default)]
    pub claimable_sats: u64,
    #[serde(default)]
    pub channels: Vec<Channel>,
    #[serde(default)]
    pub closed_channels: Vec<Channel>,
    #[serde(default)]
    pub node_ready: bool,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl LedgerDocument {
    pub fn balance_for(&self, wallet: &str, network: Network) -> Option<u64> {
        self.balances
            .iter()
            .find(|entry| entry.wallet == wallet && entry.network == network)
            .map(|entry| entry.total_sats)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrdersDocument {
    #[serde(default)]
    pub orders: Vec<Order>,
    #[serde(default)]
    pub paid_order_ids: Vec<OrderId>,
    pub service_node_key: PublicKey,
}

/// Last readings from the network monitors; absent = not reported
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectivityDocument {
    #[serde(default)]
    pub internet: Option<bool>,
    #[serde(default)]
    pub settlement_layer: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupDocument {
    #[serde(default)]
    pub targets: Vec<BackupTarget>,
}
