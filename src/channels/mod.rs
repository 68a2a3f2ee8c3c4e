//! Lightning channels and liquidity orders
//!
//! - `model.rs` - Channel / Order records from the node and the liquidity service
//! - `reconcile.rs` - Merging real channels with placeholders for paid orders

mod model;
mod reconcile;

pub use model::{Channel, ChannelId, Order, OrderId, OrderState};
pub use reconcile::{
    channel_matches_order, find_order, order_for_channel, reconcile, ChannelSet, ChannelView,
    IntegrityIssue, ReconcileInput, SyntheticChannel,
};
