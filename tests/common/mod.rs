//! Shared fixtures for wallet status integration tests
//!
//! - Deterministic node keys and txids
//! - Channel / order builders
//! - A temp-dir backed snapshot store wired to a manual clock

#![allow(dead_code)]

use bitcoin::hashes::Hash;
use bitcoin::secp256k1::{PublicKey, Secp256k1, SecretKey};
use bitcoin::{Network, Txid};
use chrono::{TimeZone, Utc};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wallet_status::storage::{LedgerDocument, OnchainEntry, OrdersDocument};
use wallet_status::{
    Channel, ChannelId, ManualClock, Order, OrderId, OrderState, SnapshotStore, StatusConfig,
    StatusScheduler, Timestamp, WalletStatus,
};

pub const WALLET: &str = "wallet0";
pub const NETWORK: Network = Network::Regtest;

pub fn init_logging() {
    env_logger::builder().is_test(true).try_init().ok();
}

/// Deterministic node key derived from a one-byte seed
pub fn node_key(seed: u8) -> PublicKey {
    let secret = SecretKey::from_slice(&[seed; 32]).expect("valid secret key");
    PublicKey::from_secret_key(&Secp256k1::new(), &secret)
}

pub fn service_key() -> PublicKey {
    node_key(0x11)
}

pub fn txid(seed: u8) -> Txid {
    Txid::from_byte_array([seed; 32])
}

pub fn t0() -> Timestamp {
    Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap()
}

pub fn channel(id: &str, ready: bool, capacity: u64, outbound: u64) -> Channel {
    Channel {
        channel_id: ChannelId::from(id),
        is_channel_ready: ready,
        is_public: false,
        capacity_sats: capacity,
        outbound_capacity_sats: outbound,
        inbound_capacity_sats: capacity - outbound,
        counterparty_node_id: service_key(),
        funding_txid: None,
        short_channel_id: None,
    }
}

pub fn order(id: &str, state: OrderState, service_sats: u64, client_sats: u64) -> Order {
    Order {
        id: Some(OrderId::from(id)),
        legacy_id: None,
        state,
        service_balance_sats: Some(service_sats),
        client_balance_sats: Some(client_sats),
        funding_txid: None,
    }
}

pub fn ledger(onchain_sats: u64, channels: Vec<Channel>) -> LedgerDocument {
    LedgerDocument {
        balances: vec![OnchainEntry {
            wallet: WALLET.to_string(),
            network: NETWORK,
            total_sats: onchain_sats,
        }],
        channels,
        node_ready: true,
        ..Default::default()
    }
}

pub fn orders(orders: Vec<Order>, paid: &[&str]) -> OrdersDocument {
    OrdersDocument {
        orders,
        paid_order_ids: paid.iter().map(|id| OrderId::from(*id)).collect(),
        service_node_key: service_key(),
    }
}

/// Temp-dir snapshot store plus a status core reading from it
pub struct TestEnvironment {
    pub temp_dir: TempDir,
    pub store: Arc<SnapshotStore>,
    pub status: Arc<WalletStatus>,
    pub clock: Arc<ManualClock>,
    pub scheduler: StatusScheduler<SnapshotStore>,
}

impl TestEnvironment {
    pub fn new() -> anyhow::Result<Self> {
        Self::with_threshold(Duration::from_secs(300))
    }

    pub fn with_threshold(threshold: Duration) -> anyhow::Result<Self> {
        init_logging();
        let temp_dir = TempDir::new()?;
        let config = StatusConfig::with_threshold(
            NETWORK,
            WALLET.to_string(),
            temp_dir.path().to_path_buf(),
            threshold,
            None,
        );

        let store = Arc::new(SnapshotStore::new(&config));
        let clock = Arc::new(ManualClock::new(t0()));
        let status = Arc::new(WalletStatus::new(&config, clock.clone()));
        let scheduler = StatusScheduler::new(status.clone(), store.clone(), config.check_interval);

        Ok(Self {
            temp_dir,
            store,
            status,
            clock,
            scheduler,
        })
    }
}
