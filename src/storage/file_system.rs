use bitcoin::secp256k1::PublicKey;
use bitcoin::Network;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use super::models::{BackupDocument, ConnectivityDocument, LedgerDocument, OrdersDocument};
use crate::backup::BackupTarget;
use crate::balance::OnchainBalance;
use crate::channels::{Channel, Order, OrderId};
use crate::collaborators::{
    BackupSource, ConnectivitySource, LedgerSnapshot, LedgerSource, LiquiditySnapshot,
    LiquiditySource,
};
use crate::config::StatusConfig;
use crate::error::{StatusError, StorageError};

const LEDGER_FILE: &str = "ledger.json";
const ORDERS_FILE: &str = "orders.json";
const CONNECTIVITY_FILE: &str = "connectivity.json";
const BACKUP_FILE: &str = "backup.json";

/// Read-mostly store of collaborator snapshots for one wallet
///
/// The status core only ever reads; the `save_*` methods exist for the
/// processes that own the data and for tests.
#[derive(Clone)]
pub struct SnapshotStore {
    base_path: PathBuf,
    wallet: String,
}

impl SnapshotStore {
    /// Create a store rooted at the configured data directory
    pub fn new(config: &StatusConfig) -> Self {
        Self::new_with_base_dir(config.data_dir.clone(), &config.wallet_name)
    }

    /// Create a store with a custom base directory (for testing)
    pub fn new_with_base_dir(base_path: PathBuf, wallet: &str) -> Self {
        Self {
            base_path,
            wallet: wallet.to_string(),
        }
    }

    pub fn base_dir(&self) -> &PathBuf {
        &self.base_path
    }

    /// Directory holding this wallet's documents
    pub fn wallet_dir(&self) -> PathBuf {
        self.base_path.join(&self.wallet)
    }

    pub fn create_wallet_dir(&self) -> Result<(), StorageError> {
        fs::create_dir_all(self.wallet_dir())?;
        Ok(())
    }

    pub fn load_ledger(&self) -> Result<LedgerDocument, StorageError> {
        self.read_document(LEDGER_FILE)
    }

    pub fn save_ledger(&self, ledger: &LedgerDocument) -> Result<(), StorageError> {
        self.write_document(LEDGER_FILE, ledger)
    }

    pub fn load_orders(&self) -> Result<OrdersDocument, StorageError> {
        self.read_document(ORDERS_FILE)
    }

    pub fn save_orders(&self, orders: &OrdersDocument) -> Result<(), StorageError> {
        self.write_document(ORDERS_FILE, orders)
    }

    pub fn load_connectivity(&self) -> Result<ConnectivityDocument, StorageError> {
        self.read_document(CONNECTIVITY_FILE)
    }

    pub fn save_connectivity(&self, connectivity: &ConnectivityDocument) -> Result<(), StorageError> {
        self.write_document(CONNECTIVITY_FILE, connectivity)
    }

    pub fn load_backup(&self) -> Result<BackupDocument, StorageError> {
        self.read_document(BACKUP_FILE)
    }

    pub fn save_backup(&self, backup: &BackupDocument) -> Result<(), StorageError> {
        self.write_document(BACKUP_FILE, backup)
    }

    fn read_document<T: DeserializeOwned>(&self, file: &str) -> Result<T, StorageError> {
        let path = self.wallet_dir().join(file);
        if !path.exists() {
            return Err(StorageError::FileNotFound(path.display().to_string()));
        }
        let contents = fs::read_to_string(&path)?;
        let document = serde_json::from_str(&contents)?;
        Ok(document)
    }

    fn write_document<T: Serialize>(&self, file: &str, document: &T) -> Result<(), StorageError> {
        self.create_wallet_dir()?;
        let path = self.wallet_dir().join(file);
        let json = serde_json::to_string_pretty(document)?;
        write_atomically(&path, &json)?;
        log::debug!("Wrote {}", path.display());
        Ok(())
    }
}

/// Write to a sibling temp file then rename, so readers never see half a document
fn write_atomically(path: &Path, contents: &str) -> Result<(), StorageError> {
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, contents)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Missing documents mean the owning process has not reported yet
fn into_status_error(error: StorageError) -> StatusError {
    match error {
        StorageError::FileNotFound(path) => StatusError::unavailable(path),
        other => StatusError::Storage(other),
    }
}

impl LedgerSource for SnapshotStore {
    fn onchain_balance(&self, wallet: &str, network: Network) -> Result<u64, StatusError> {
        let ledger = self.load_ledger().map_err(into_status_error)?;
        ledger.balance_for(wallet, network).ok_or_else(|| {
            StatusError::unavailable(format!("no on-chain balance for {} on {}", wallet, network))
        })
    }

    fn claimable_balance(&self) -> Result<u64, StatusError> {
        Ok(self.load_ledger().map_err(into_status_error)?.claimable_sats)
    }

    fn channels(&self) -> Result<Vec<Channel>, StatusError> {
        Ok(self.load_ledger().map_err(into_status_error)?.channels)
    }

    fn closed_channels(&self) -> Result<Vec<Channel>, StatusError> {
        Ok(self.load_ledger().map_err(into_status_error)?.closed_channels)
    }

    fn is_node_ready(&self) -> Result<bool, StatusError> {
        Ok(self.load_ledger().map_err(into_status_error)?.node_ready)
    }

    fn ledger_snapshot(&self, wallet: &str, network: Network) -> Result<LedgerSnapshot, StatusError> {
        let ledger = self.load_ledger().map_err(into_status_error)?;
        let onchain = ledger.balance_for(wallet, network).map(|total_sats| OnchainBalance {
            total_sats,
            claimable_sats: ledger.claimable_sats,
        });
        if onchain.is_none() {
            log::warn!("No on-chain balance for {} on {}", wallet, network);
        }

        Ok(LedgerSnapshot {
            onchain,
            channels: ledger.channels,
            closed_channels: ledger.closed_channels,
            node_ready: Some(ledger.node_ready),
        })
    }
}

impl LiquiditySource for SnapshotStore {
    fn orders(&self) -> Result<Vec<Order>, StatusError> {
        Ok(self.load_orders().map_err(into_status_error)?.orders)
    }

    fn paid_order_ids(&self) -> Result<Vec<OrderId>, StatusError> {
        Ok(self.load_orders().map_err(into_status_error)?.paid_order_ids)
    }

    fn service_node_key(&self) -> Result<PublicKey, StatusError> {
        Ok(self.load_orders().map_err(into_status_error)?.service_node_key)
    }

    fn liquidity_snapshot(&self) -> Result<LiquiditySnapshot, StatusError> {
        let orders = self.load_orders().map_err(into_status_error)?;
        Ok(LiquiditySnapshot {
            orders: orders.orders,
            paid_order_ids: orders.paid_order_ids,
            service_node_key: orders.service_node_key,
        })
    }
}

impl ConnectivitySource for SnapshotStore {
    fn is_internet_reachable(&self) -> Result<bool, StatusError> {
        self.load_connectivity()
            .map_err(into_status_error)?
            .internet
            .ok_or_else(|| StatusError::unavailable("internet reachability not reported"))
    }

    fn is_settlement_layer_connected(&self) -> Result<bool, StatusError> {
        self.load_connectivity()
            .map_err(into_status_error)?
            .settlement_layer
            .ok_or_else(|| StatusError::unavailable("server connection not reported"))
    }
}

impl BackupSource for SnapshotStore {
    fn backup_targets(&self) -> Result<Vec<BackupTarget>, StatusError> {
        Ok(self.load_backup().map_err(into_status_error)?.targets)
    }
}
