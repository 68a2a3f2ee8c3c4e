//! Status daemon configuration from environment variables
//!
//! Controls which wallet/network is reconciled, where snapshots are read
//! from, and how the backup watchdog is paced.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::StatusError;

/// Default staleness threshold for pending backup syncs (5 minutes)
pub const DEFAULT_STALE_THRESHOLD_SECS: u64 = 300;

#[derive(Clone, Debug)]
pub struct StatusConfig {
    /// Network whose on-chain balance is reported
    pub network: bitcoin::Network,
    /// Wallet whose on-chain balance is reported
    pub wallet_name: String,
    /// Root directory of the snapshot store
    pub data_dir: PathBuf,
    /// A pending backup older than this is stale
    pub stale_threshold: Duration,
    /// Watchdog polling cadence, never longer than `stale_threshold`
    pub check_interval: Duration,
}

impl StatusConfig {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `BITCOIN_NETWORK`: "bitcoin" (default), "testnet", "signet" or "regtest"
    /// - `WALLET_NAME`: wallet to report on (default "wallet0")
    /// - `STATUS_DATA_DIR`: snapshot store root (default "./wallet-status")
    /// - `BACKUP_STALE_THRESHOLD_SECS`: staleness threshold (default 300)
    /// - `BACKUP_CHECK_INTERVAL_SECS`: watchdog cadence (default = threshold)
    pub fn from_env() -> Result<Self, StatusError> {
        let network_str = env::var("BITCOIN_NETWORK")
            .unwrap_or_else(|_| "bitcoin".to_string())
            .to_lowercase();
        let network = parse_network(&network_str);

        let wallet_name = env::var("WALLET_NAME").unwrap_or_else(|_| "wallet0".to_string());

        let data_dir = env::var("STATUS_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./wallet-status"));

        let threshold_secs =
            parse_secs("BACKUP_STALE_THRESHOLD_SECS", env::var("BACKUP_STALE_THRESHOLD_SECS").ok())?
                .unwrap_or(DEFAULT_STALE_THRESHOLD_SECS);
        if threshold_secs == 0 {
            return Err(StatusError::Config(
                "BACKUP_STALE_THRESHOLD_SECS must be greater than zero".to_string(),
            ));
        }
        let interval_secs =
            parse_secs("BACKUP_CHECK_INTERVAL_SECS", env::var("BACKUP_CHECK_INTERVAL_SECS").ok())?;

        let config = Self::with_threshold(
            network,
            wallet_name,
            data_dir,
            Duration::from_secs(threshold_secs),
            interval_secs.map(Duration::from_secs),
        );

        log::info!(
            "Reporting on wallet '{}' ({:?}), snapshots in {}",
            config.wallet_name,
            config.network,
            config.data_dir.display()
        );
        log::info!(
            "Backup stale threshold {:?}, checked every {:?}",
            config.stale_threshold,
            config.check_interval
        );

        Ok(config)
    }

    /// Build a config, clamping the check interval to the threshold
    pub fn with_threshold(
        network: bitcoin::Network,
        wallet_name: String,
        data_dir: PathBuf,
        stale_threshold: Duration,
        check_interval: Option<Duration>,
    ) -> Self {
        let check_interval = match check_interval {
            Some(interval) if interval.is_zero() => stale_threshold,
            Some(interval) if interval > stale_threshold => {
                log::warn!(
                    "Check interval {:?} exceeds stale threshold {:?}, using the threshold",
                    interval,
                    stale_threshold
                );
                stale_threshold
            }
            Some(interval) => interval,
            None => stale_threshold,
        };

        Self {
            network,
            wallet_name,
            data_dir,
            stale_threshold,
            check_interval,
        }
    }

    /// Staleness threshold as a chrono duration for timestamp arithmetic
    pub fn stale_threshold_chrono(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.stale_threshold)
            .unwrap_or_else(|_| chrono::Duration::seconds(DEFAULT_STALE_THRESHOLD_SECS as i64))
    }
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            network: bitcoin::Network::Bitcoin,
            wallet_name: "wallet0".to_string(),
            data_dir: PathBuf::from("./wallet-status"),
            stale_threshold: Duration::from_secs(DEFAULT_STALE_THRESHOLD_SECS),
            check_interval: Duration::from_secs(DEFAULT_STALE_THRESHOLD_SECS),
        }
    }
}

fn parse_network(value: &str) -> bitcoin::Network {
    match value {
        "bitcoin" | "mainnet" | "" => bitcoin::Network::Bitcoin,
        "testnet" => bitcoin::Network::Testnet,
        "signet" => bitcoin::Network::Signet,
        "regtest" => bitcoin::Network::Regtest,
        other => {
            log::warn!("Unknown network '{}', defaulting to bitcoin", other);
            bitcoin::Network::Bitcoin
        }
    }
}

fn parse_secs(name: &str, value: Option<String>) -> Result<Option<u64>, StatusError> {
    match value {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|e| StatusError::Config(format!("{} = '{}': {}", name, raw, e))),
    }
}
