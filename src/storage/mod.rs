//! Snapshot persistence
//!
//! - JSON documents per wallet
//! - Collaborator trait implementations over those documents

mod file_system;
mod models;

pub use file_system::SnapshotStore;
pub use models::{
    BackupDocument, ConnectivityDocument, LedgerDocument, OnchainEntry, OrdersDocument,
};
