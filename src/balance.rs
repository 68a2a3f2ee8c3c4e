//! Balance Aggregator
//!
//! Folds the on-chain balance and the ready Lightning channels into a single
//! [`BalanceSnapshot`]. Channels that are still negotiating contribute
//! nothing. All sums are checked; an overflow or a channel reporting more
//! outbound capacity than it holds fails the whole computation.

use serde::{Deserialize, Serialize};

use crate::channels::Channel;
use crate::error::{add_sats, sub_sats, StatusError};

/// On-chain side of the wallet for the active wallet/network
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnchainBalance {
    /// Confirmed plus unconfirmed funds
    pub total_sats: u64,
    /// Funds in flight after a channel open/close, added verbatim
    pub claimable_sats: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BalanceSnapshot {
    onchain_sats: u64,
    channel_spending_sats: u64,
    channel_reserve_sats: u64,
    claimable_sats: u64,
    spendable_sats: u64,
    lightning_sats: u64,
    total_sats: u64,
}

impl BalanceSnapshot {
    /// Build a snapshot, computing the derived totals with checked math
    pub fn new(
        onchain_sats: u64,
        channel_spending_sats: u64,
        channel_reserve_sats: u64,
        claimable_sats: u64,
    ) -> Result<Self, StatusError> {
        let spendable_sats = add_sats(onchain_sats, channel_spending_sats, "spendable balance")?;
        let lightning_sats = add_sats(
            add_sats(channel_spending_sats, channel_reserve_sats, "lightning balance")?,
            claimable_sats,
            "lightning balance",
        )?;
        let total_sats = add_sats(
            add_sats(spendable_sats, channel_reserve_sats, "total balance")?,
            claimable_sats,
            "total balance",
        )?;

        Ok(Self {
            onchain_sats,
            channel_spending_sats,
            channel_reserve_sats,
            claimable_sats,
            spendable_sats,
            lightning_sats,
            total_sats,
        })
    }

    pub fn onchain_sats(&self) -> u64 {
        self.onchain_sats
    }

    /// Outbound capacity of ready channels
    pub fn channel_spending_sats(&self) -> u64 {
        self.channel_spending_sats
    }

    /// Capacity of ready channels locked as reserve
    pub fn channel_reserve_sats(&self) -> u64 {
        self.channel_reserve_sats
    }

    pub fn claimable_sats(&self) -> u64 {
        self.claimable_sats
    }

    /// On-chain funds plus spendable channel funds
    pub fn spendable_sats(&self) -> u64 {
        self.spendable_sats
    }

    /// Spending + reserve + claimable
    pub fn lightning_sats(&self) -> u64 {
        self.lightning_sats
    }

    pub fn total_sats(&self) -> u64 {
        self.total_sats
    }
}

/// Compute the balance snapshot from on-chain funds and the channel list
pub fn compute<'a, I>(onchain: OnchainBalance, channels: I) -> Result<BalanceSnapshot, StatusError>
where
    I: IntoIterator<Item = &'a Channel>,
{
    let mut spending = 0u64;
    let mut reserve = 0u64;

    for channel in channels.into_iter().filter(|c| c.is_channel_ready) {
        let context = format!("channel {}", channel.channel_id);
        let unspendable = sub_sats(
            channel.capacity_sats,
            channel.outbound_capacity_sats,
            &format!("{} reserve", context),
        )?;
        spending = add_sats(spending, channel.outbound_capacity_sats, &context)?;
        reserve = add_sats(reserve, unspendable, &context)?;
    }

    BalanceSnapshot::new(onchain.total_sats, spending, reserve, onchain.claimable_sats)
}

/// Outbound (local) and inbound (remote) capacity of ready channels
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LightningTotals {
    pub local_sats: u64,
    pub remote_sats: u64,
}

pub fn lightning_totals<'a, I>(channels: I) -> Result<LightningTotals, StatusError>
where
    I: IntoIterator<Item = &'a Channel>,
{
    channels
        .into_iter()
        .filter(|c| c.is_channel_ready)
        .try_fold(LightningTotals::default(), |acc, channel| {
            Ok(LightningTotals {
                local_sats: add_sats(acc.local_sats, channel.outbound_capacity_sats, "local balance")?,
                remote_sats: add_sats(acc.remote_sats, channel.inbound_capacity_sats, "remote balance")?,
            })
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::ChannelId;
    use bitcoin::secp256k1::{PublicKey, Secp256k1, SecretKey};

    fn channel(id: &str, ready: bool, capacity: u64, outbound: u64) -> Channel {
        let secret = SecretKey::from_slice(&[3u8; 32]).unwrap();
        Channel {
            channel_id: ChannelId::from(id),
            is_channel_ready: ready,
            is_public: false,
            capacity_sats: capacity,
            outbound_capacity_sats: outbound,
            inbound_capacity_sats: capacity - outbound,
            counterparty_node_id: PublicKey::from_secret_key(&Secp256k1::new(), &secret),
            funding_txid: None,
            short_channel_id: None,
        }
    }

    fn onchain(total: u64) -> OnchainBalance {
        OnchainBalance {
            total_sats: total,
            claimable_sats: 0,
        }
    }

    #[test]
    fn test_single_ready_channel() {
        let channels = vec![channel("a", true, 20_000, 8_000)];
        let snapshot = compute(onchain(50_000), &channels).unwrap();

        assert_eq!(snapshot.onchain_sats(), 50_000);
        assert_eq!(snapshot.channel_spending_sats(), 8_000);
        assert_eq!(snapshot.channel_reserve_sats(), 12_000);
        assert_eq!(snapshot.claimable_sats(), 0);
        assert_eq!(snapshot.spendable_sats(), 58_000);
        assert_eq!(snapshot.lightning_sats(), 20_000);
        assert_eq!(snapshot.total_sats(), 70_000);
    }

    #[test]
    fn test_no_channels_is_not_an_error() {
        let snapshot = compute(onchain(1_234), &Vec::<Channel>::new()).unwrap();

        assert_eq!(snapshot.channel_spending_sats(), 0);
        assert_eq!(snapshot.channel_reserve_sats(), 0);
        assert_eq!(snapshot.total_sats(), 1_234);
    }

    #[test]
    fn test_unready_channels_contribute_nothing() {
        let channels = vec![
            channel("ready", true, 20_000, 8_000),
            channel("negotiating", false, 500_000, 400_000),
        ];
        let snapshot = compute(onchain(0), &channels).unwrap();

        assert_eq!(snapshot.channel_spending_sats(), 8_000);
        assert_eq!(snapshot.channel_reserve_sats(), 12_000);
    }

    #[test]
    fn test_claimable_added_verbatim() {
        let balance = OnchainBalance {
            total_sats: 1_000,
            claimable_sats: 2_500,
        };
        let snapshot = compute(balance, &[channel("a", true, 300, 100)]).unwrap();

        assert_eq!(snapshot.claimable_sats(), 2_500);
        assert_eq!(snapshot.spendable_sats(), 1_100);
        assert_eq!(snapshot.total_sats(), 1_000 + 100 + 200 + 2_500);
    }

    #[test]
    fn test_total_is_sum_of_parts() {
        let channels = vec![
            channel("a", true, 20_000, 8_000),
            channel("b", true, 1_000_000, 999_000),
            channel("c", false, 7, 3),
        ];
        let balance = OnchainBalance {
            total_sats: 42,
            claimable_sats: 17,
        };
        let s = compute(balance, &channels).unwrap();

        assert_eq!(
            s.total_sats(),
            s.onchain_sats() + s.channel_spending_sats() + s.channel_reserve_sats() + s.claimable_sats()
        );
        assert_eq!(s.spendable_sats(), s.onchain_sats() + s.channel_spending_sats());
    }

    #[test]
    fn test_overflow_fails_loudly() {
        let channels = vec![channel("a", true, u64::MAX, u64::MAX)];
        let err = compute(onchain(1), &channels).unwrap_err();

        assert!(matches!(err, StatusError::ArithmeticOverflow { .. }));
    }

    #[test]
    fn test_outbound_above_capacity_is_negative_not_zero() {
        let mut bad = channel("a", true, 1_000, 500);
        bad.outbound_capacity_sats = 1_500;
        let err = compute(onchain(0), &[bad]).unwrap_err();

        assert!(matches!(err, StatusError::NegativeAmount { .. }));
    }

    #[test]
    fn test_lightning_totals_only_ready_channels() {
        let channels = vec![
            channel("a", true, 20_000, 8_000),
            channel("b", true, 10_000, 1_000),
            channel("c", false, 10_000, 5_000),
        ];
        let totals = lightning_totals(&channels).unwrap();

        assert_eq!(totals.local_sats, 9_000);
        assert_eq!(totals.remote_sats, 21_000);
    }
}
