//! Readiness State Machine
//!
//! Turns the raw connectivity flags and the reconciled channel counts into
//! the user-facing ready / pending / error states. A flag nobody has
//! reported yet (`None`) always reads as not ready.
//!
//! The only state kept between evaluations is the last seen value of each
//! flag, in [`TransitionTracker`], so that notifications fire on edges and
//! never on repeated polling.

use serde::Serialize;

use crate::channels::ChannelSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemState {
    Ready,
    Pending,
    Error,
}

/// Raw connectivity booleans; `None` = collaborator has not reported
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConnectivityFlags {
    pub internet: Option<bool>,
    pub settlement_layer: Option<bool>,
    pub node_ready: Option<bool>,
}

impl ConnectivityFlags {
    pub fn known(internet: bool, settlement_layer: bool, node_ready: bool) -> Self {
        Self {
            internet: Some(internet),
            settlement_layer: Some(settlement_layer),
            node_ready: Some(node_ready),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ChannelCounts {
    pub open: usize,
    pub pending_channels: usize,
    /// Paid orders in the created state with no channel yet
    pub created_orders: usize,
}

impl ChannelCounts {
    pub fn from_set(set: &ChannelSet) -> Self {
        Self {
            open: set.open.len(),
            pending_channels: set.pending_real_channels(),
            created_orders: set.unmatched_created_orders(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReadinessState {
    pub internet: ItemState,
    /// Electrum / bitcoin node connection
    pub settlement_layer: ItemState,
    pub lightning_node: ItemState,
    pub lightning_connectivity: ItemState,
}

impl ReadinessState {
    /// Everything unknown; what the core reports before any input arrives
    pub fn unknown() -> Self {
        evaluate(ConnectivityFlags::default(), ChannelCounts::default())
    }
}

pub fn internet_state(internet: Option<bool>) -> ItemState {
    match internet {
        Some(true) => ItemState::Ready,
        _ => ItemState::Error,
    }
}

pub fn settlement_layer_state(internet: Option<bool>, connected: Option<bool>) -> ItemState {
    match (internet, connected) {
        (Some(true), Some(true)) => ItemState::Ready,
        (Some(true), Some(false)) => ItemState::Pending,
        _ => ItemState::Error,
    }
}

pub fn lightning_node_state(node_ready: Option<bool>) -> ItemState {
    match node_ready {
        Some(true) => ItemState::Ready,
        _ => ItemState::Error,
    }
}

pub fn lightning_connectivity_state(counts: ChannelCounts) -> ItemState {
    if counts.open > 0 {
        ItemState::Ready
    } else if counts.pending_channels > 0 || counts.created_orders > 0 {
        ItemState::Pending
    } else {
        ItemState::Error
    }
}

pub fn evaluate(flags: ConnectivityFlags, counts: ChannelCounts) -> ReadinessState {
    ReadinessState {
        internet: internet_state(flags.internet),
        settlement_layer: settlement_layer_state(flags.internet, flags.settlement_layer),
        lightning_node: lightning_node_state(flags.node_ready),
        lightning_connectivity: lightning_connectivity_state(counts),
    }
}

/// Connection-issue banner shown above the wallet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectivityBanner {
    Hidden,
    /// No internet; nothing to retry
    Offline,
    /// Online but the server is unreachable; a retry is offered
    ServerUnreachable,
}

impl ConnectivityBanner {
    pub fn from_flags(flags: &ConnectivityFlags) -> Self {
        match (flags.internet, flags.settlement_layer) {
            (Some(true), Some(true)) => Self::Hidden,
            (Some(true), _) => Self::ServerUnreachable,
            _ => Self::Offline,
        }
    }

    pub fn retry_available(&self) -> bool {
        matches!(self, Self::ServerUnreachable)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    Internet,
    SettlementLayer,
    LightningNode,
}

/// A flag flipped between two observations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Transition {
    pub signal: Signal,
    pub up: bool,
}

impl Transition {
    pub fn title(&self) -> &'static str {
        match (self.signal, self.up) {
            (Signal::Internet, true) => "You're Back Online!",
            (Signal::Internet, false) => "Internet Connectivity Issues",
            (Signal::SettlementLayer, true) => "Connection Restored",
            (Signal::SettlementLayer, false) => "Reconnecting To Server",
            (Signal::LightningNode, true) => "Lightning Node Ready",
            (Signal::LightningNode, false) => "Lightning Node Stopped",
        }
    }

    pub fn message(&self) -> &'static str {
        match (self.signal, self.up) {
            (Signal::Internet, true) => "Successfully reconnected to the Internet.",
            (Signal::Internet, false) => "Please check your network connection.",
            (Signal::SettlementLayer, true) => "Successfully reconnected to the server.",
            (Signal::SettlementLayer, false) => "Lost connection to server, trying to reconnect...",
            (Signal::LightningNode, true) => "The Lightning node is running.",
            (Signal::LightningNode, false) => "The Lightning node is not running.",
        }
    }
}

/// Edge detector over successive [`ConnectivityFlags`]
///
/// The first known value of a flag is recorded silently; afterwards only a
/// change of value produces a [`Transition`]. Unknown values are skipped.
#[derive(Debug, Clone, Default)]
pub struct TransitionTracker {
    last: ConnectivityFlags,
}

impl TransitionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, flags: ConnectivityFlags) -> Vec<Transition> {
        let mut transitions = Vec::new();
        for (signal, previous, current) in [
            (Signal::Internet, &mut self.last.internet, flags.internet),
            (
                Signal::SettlementLayer,
                &mut self.last.settlement_layer,
                flags.settlement_layer,
            ),
            (Signal::LightningNode, &mut self.last.node_ready, flags.node_ready),
        ] {
            let Some(current) = current else {
                continue;
            };
            if let Some(before) = previous.replace(current) {
                if before != current {
                    log::info!("{:?} went {}", signal, if current { "up" } else { "down" });
                    transitions.push(Transition {
                        signal,
                        up: current,
                    });
                }
            }
        }
        transitions
    }
}
