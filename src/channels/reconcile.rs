//! Channel State Reconciler
//!
//! Merges the node's real channels with placeholder entries for liquidity
//! orders that have been paid for but are not yet backed by a channel, and
//! sorts the result into open / pending / closed / failed.
//!
//! An order and the real channel it eventually becomes are one economic
//! channel: whenever a real channel matches an order, the order yields no
//! placeholder, whatever state the service still reports for it.

use bitcoin::secp256k1::PublicKey;
use bitcoin::Txid;
use serde::Serialize;
use std::collections::HashSet;

use super::model::{Channel, ChannelId, Order, OrderId, OrderState};

/// Placeholder for a paid order with no channel yet
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyntheticChannel {
    pub order_id: OrderId,
    pub order_state: OrderState,
    pub capacity_sats: u64,
    pub outbound_capacity_sats: u64,
    pub inbound_capacity_sats: u64,
    pub counterparty_node_id: PublicKey,
    pub funding_txid: Option<Txid>,
}

/// One entry of the reconciled channel list
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ChannelView {
    Real(Channel),
    Synthetic(SyntheticChannel),
}

impl ChannelView {
    /// Channel id for real channels, order id for placeholders
    pub fn id(&self) -> &str {
        match self {
            Self::Real(channel) => channel.channel_id.as_str(),
            Self::Synthetic(synthetic) => synthetic.order_id.as_str(),
        }
    }

    pub fn is_synthetic(&self) -> bool {
        matches!(self, Self::Synthetic(_))
    }

    pub fn capacity_sats(&self) -> u64 {
        match self {
            Self::Real(channel) => channel.capacity_sats,
            Self::Synthetic(synthetic) => synthetic.capacity_sats,
        }
    }

    pub fn outbound_capacity_sats(&self) -> u64 {
        match self {
            Self::Real(channel) => channel.outbound_capacity_sats,
            Self::Synthetic(synthetic) => synthetic.outbound_capacity_sats,
        }
    }

    pub fn inbound_capacity_sats(&self) -> u64 {
        match self {
            Self::Real(channel) => channel.inbound_capacity_sats,
            Self::Synthetic(synthetic) => synthetic.inbound_capacity_sats,
        }
    }

    pub fn counterparty_node_id(&self) -> &PublicKey {
        match self {
            Self::Real(channel) => &channel.counterparty_node_id,
            Self::Synthetic(synthetic) => &synthetic.counterparty_node_id,
        }
    }

    pub fn funding_txid(&self) -> Option<&Txid> {
        match self {
            Self::Real(channel) => channel.funding_txid.as_ref(),
            Self::Synthetic(synthetic) => synthetic.funding_txid.as_ref(),
        }
    }

    pub fn as_real(&self) -> Option<&Channel> {
        match self {
            Self::Real(channel) => Some(channel),
            Self::Synthetic(_) => None,
        }
    }
}

/// A record excluded from reconciliation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum IntegrityIssue {
    /// A paid order id with no order record under either id form
    UnknownPaidOrder { order_id: OrderId },
    /// An order record without both balance fields
    MissingBalance { order_id: OrderId },
    /// Service + client balance does not fit in a u64
    CapacityOverflow { order_id: OrderId },
}

/// Reconciled channel list, each category newest first
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChannelSet {
    pub open: Vec<ChannelView>,
    pub pending: Vec<ChannelView>,
    pub closed: Vec<ChannelView>,
    pub failed: Vec<ChannelView>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<IntegrityIssue>,
}

impl ChannelSet {
    /// Placeholders for created orders not yet backed by a channel
    pub fn unmatched_created_orders(&self) -> usize {
        self.pending.iter().filter(|view| view.is_synthetic()).count()
    }

    /// Real channels still negotiating
    pub fn pending_real_channels(&self) -> usize {
        self.pending.iter().filter(|view| !view.is_synthetic()).count()
    }

    /// Ready channels, for balance aggregation
    pub fn open_channels(&self) -> impl Iterator<Item = &Channel> {
        self.open.iter().filter_map(ChannelView::as_real)
    }

    /// Ids of every placeholder entry, pending or failed
    pub fn synthetic_ids(&self) -> Vec<&str> {
        self.pending
            .iter()
            .chain(self.failed.iter())
            .filter(|view| view.is_synthetic())
            .map(ChannelView::id)
            .collect()
    }
}

/// Inputs to one reconciliation pass
///
/// Channel and order lists must come from the same logical revision,
/// otherwise a channel may briefly be counted alongside its own order.
#[derive(Debug, Clone, Copy)]
pub struct ReconcileInput<'a> {
    pub channels: &'a [Channel],
    pub closed_channels: &'a [Channel],
    pub paid_order_ids: &'a [OrderId],
    pub orders: &'a [Order],
    pub service_node_key: &'a PublicKey,
}

/// Whether a real channel is the materialization of `order`
///
/// Funding transaction equality when the channel knows its funding tx,
/// identifier equality (either order id form) otherwise.
pub fn channel_matches_order(channel: &Channel, order: &Order) -> bool {
    match &channel.funding_txid {
        Some(txid) => order.funding_txid.as_ref() == Some(txid),
        None => order.has_id(channel.channel_id.as_str()),
    }
}

/// Resolve a paid order id against the order list
///
/// The current id form wins over the legacy one when both could match.
pub fn find_order<'a>(orders: &'a [Order], order_id: &OrderId) -> Option<&'a Order> {
    if let Some(order) = orders
        .iter()
        .find(|order| order.id.as_ref() == Some(order_id))
    {
        return Some(order);
    }

    let legacy = orders
        .iter()
        .find(|order| order.legacy_id.as_ref() == Some(order_id));
    if legacy.is_some() {
        // TODO: drop the `_id` lookup once no paid orders predate the current service API
        log::debug!("Order {} resolved through its legacy id", order_id);
    }
    legacy
}

/// Order that a channel list entry stands for, if any
pub fn order_for_channel<'a>(view: &ChannelView, orders: &'a [Order]) -> Option<&'a Order> {
    match view {
        ChannelView::Real(channel) => orders
            .iter()
            .find(|order| channel_matches_order(channel, order)),
        ChannelView::Synthetic(synthetic) => find_order(orders, &synthetic.order_id),
    }
}

/// Run one reconciliation pass
///
/// Pure and deterministic: identical inputs give identical, identically
/// ordered output. Bad order records are skipped and listed in
/// [`ChannelSet::issues`].
pub fn reconcile(input: ReconcileInput<'_>) -> ChannelSet {
    let closed_ids: HashSet<&ChannelId> = input
        .closed_channels
        .iter()
        .map(|channel| &channel.channel_id)
        .collect();

    let mut open = Vec::new();
    let mut pending_real = Vec::new();
    let mut live: Vec<&Channel> = Vec::new();

    for channel in input.channels {
        if closed_ids.contains(&channel.channel_id) {
            log::debug!(
                "Channel {} reported both live and closed, treating as closed",
                channel.channel_id
            );
            continue;
        }
        live.push(channel);
        if channel.is_channel_ready {
            open.push(ChannelView::Real(channel.clone()));
        } else {
            pending_real.push(ChannelView::Real(channel.clone()));
        }
    }

    let mut pending_synthetic = Vec::new();
    let mut failed = Vec::new();
    let mut issues = Vec::new();
    let mut seen_orders: HashSet<OrderId> = HashSet::new();

    for paid_id in input.paid_order_ids {
        let Some(order) = find_order(input.orders, paid_id) else {
            log::warn!("Paid order {} has no matching order record, skipping", paid_id);
            issues.push(IntegrityIssue::UnknownPaidOrder {
                order_id: paid_id.clone(),
            });
            continue;
        };

        let order_id = order.primary_id().cloned().unwrap_or_else(|| paid_id.clone());
        if !seen_orders.insert(order_id.clone()) {
            continue;
        }

        let target = match order.state {
            OrderState::Created => &mut pending_synthetic,
            OrderState::Expired => &mut failed,
            OrderState::Other => continue,
        };

        if live.iter().any(|channel| channel_matches_order(channel, order)) {
            log::debug!("Order {} already backed by a real channel", order_id);
            continue;
        }

        match synthesize(order, order_id, input.service_node_key) {
            Ok(synthetic) => target.push(ChannelView::Synthetic(synthetic)),
            Err(issue) => {
                log::warn!("Skipping malformed order: {:?}", issue);
                issues.push(issue);
            }
        }
    }

    let mut pending = pending_synthetic;
    pending.extend(pending_real);
    pending.reverse();
    open.reverse();
    failed.reverse();

    let closed = input
        .closed_channels
        .iter()
        .rev()
        .cloned()
        .map(ChannelView::Real)
        .collect();

    ChannelSet {
        open,
        pending,
        closed,
        failed,
        issues,
    }
}

fn synthesize(
    order: &Order,
    order_id: OrderId,
    service_node_key: &PublicKey,
) -> Result<SyntheticChannel, IntegrityIssue> {
    let Some((service_sats, client_sats)) = order.balances() else {
        return Err(IntegrityIssue::MissingBalance { order_id });
    };
    let Some(capacity_sats) = service_sats.checked_add(client_sats) else {
        return Err(IntegrityIssue::CapacityOverflow { order_id });
    };

    Ok(SyntheticChannel {
        order_id,
        order_state: order.state,
        capacity_sats,
        outbound_capacity_sats: client_sats,
        inbound_capacity_sats: service_sats,
        counterparty_node_id: *service_node_key,
        funding_txid: order.funding_txid,
    })
}
