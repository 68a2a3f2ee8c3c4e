//! Channel and liquidity-order records as reported by the node and the
//! liquidity service

use bitcoin::secp256k1::PublicKey;
use bitcoin::Txid;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lightning channel identifier, unique and immutable once assigned
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(pub String);

impl ChannelId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ChannelId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Liquidity-service order identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub String);

impl OrderId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OrderId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// A real Lightning channel reported by the node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub channel_id: ChannelId,
    /// Funding confirmed to sufficient depth
    pub is_channel_ready: bool,
    pub is_public: bool,
    /// Total channel balance from this wallet's point of view
    pub capacity_sats: u64,
    pub outbound_capacity_sats: u64,
    #[serde(default)]
    pub inbound_capacity_sats: u64,
    pub counterparty_node_id: PublicKey,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub funding_txid: Option<Txid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_channel_id: Option<u64>,
}

/// Order lifecycle state as reported by the liquidity service
///
/// Only `Created` and `Expired` matter here; every other state (paid,
/// executed, closed, ...) collapses into `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderState {
    Created,
    Expired,
    #[serde(other)]
    Other,
}

/// A channel purchase order placed with the liquidity service
///
/// Orders paid through the old service API carry their identifier under
/// `_id` instead of `id`. Both forms are kept and both are checked when
/// resolving a paid order id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<OrderId>,
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub legacy_id: Option<OrderId>,
    pub state: OrderState,
    /// Balance the service pushes to its side of the channel
    #[serde(rename = "lspBalanceSat", default)]
    pub service_balance_sats: Option<u64>,
    /// Balance on the wallet's side of the channel
    #[serde(rename = "clientBalanceSat", default)]
    pub client_balance_sats: Option<u64>,
    #[serde(rename = "fundingTxid", default, skip_serializing_if = "Option::is_none")]
    pub funding_txid: Option<Txid>,
}

impl Order {
    /// Identifier to display and key on; prefers the current form
    pub fn primary_id(&self) -> Option<&OrderId> {
        self.id.as_ref().or(self.legacy_id.as_ref())
    }

    /// Whether `id` names this order in either identifier form
    pub fn has_id(&self, id: &str) -> bool {
        self.id.as_ref().is_some_and(|own| own.as_str() == id)
            || self.legacy_id.as_ref().is_some_and(|own| own.as_str() == id)
    }

    /// Both balance fields, or `None` when the record is incomplete
    pub fn balances(&self) -> Option<(u64, u64)> {
        Some((self.service_balance_sats?, self.client_balance_sats?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitcoin::hashes::Hash;

    #[test]
    fn test_order_accepts_legacy_id_field() {
        let json = r#"{
            "_id": "legacy-1",
            "state": "created",
            "lspBalanceSat": 100000,
            "clientBalanceSat": 10000
        }"#;
        let order: Order = serde_json::from_str(json).unwrap();

        assert_eq!(order.id, None);
        assert_eq!(order.legacy_id, Some(OrderId::from("legacy-1")));
        assert_eq!(order.primary_id(), Some(&OrderId::from("legacy-1")));
        assert!(order.has_id("legacy-1"));
        assert_eq!(order.balances(), Some((100_000, 10_000)));
    }

    #[test]
    fn test_unknown_order_state_is_other() {
        let json = r#"{ "id": "o-1", "state": "executed" }"#;
        let order: Order = serde_json::from_str(json).unwrap();

        assert_eq!(order.state, OrderState::Other);
        assert_eq!(order.balances(), None);
    }

    #[test]
    fn test_primary_id_prefers_current_form() {
        let order = Order {
            id: Some(OrderId::from("new")),
            legacy_id: Some(OrderId::from("old")),
            state: OrderState::Created,
            service_balance_sats: Some(1),
            client_balance_sats: Some(1),
            funding_txid: None,
        };

        assert_eq!(order.primary_id(), Some(&OrderId::from("new")));
        assert!(order.has_id("new"));
        assert!(order.has_id("old"));
        assert!(!order.has_id("other"));
    }

    #[test]
    fn test_order_funding_txid_deserializes_from_hex() {
        let txid = Txid::from_byte_array([7u8; 32]);
        let json = format!(
            r#"{{ "id": "o-2", "state": "expired", "fundingTxid": "{}" }}"#,
            txid
        );
        let order: Order = serde_json::from_str(&json).unwrap();

        assert_eq!(order.state, OrderState::Expired);
        assert_eq!(order.funding_txid, Some(txid));
    }
}
