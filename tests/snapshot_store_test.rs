//! Snapshot store tests against hand-written documents
//!
//! Tests cover:
//! - Liquidity service order records (current and legacy id forms)
//! - Malformed and incomplete records surfacing as integrity issues
//! - Unavailable documents failing closed in the status core

mod common;

use common::*;
use std::fs;
use wallet_status::{
    IntegrityIssue, ItemState, LedgerSource, LiquiditySource, OrderId, OrderState,
};

fn write_raw(env: &TestEnvironment, file: &str, json: &str) -> anyhow::Result<()> {
    env.store.create_wallet_dir()?;
    fs::write(env.store.wallet_dir().join(file), json)?;
    Ok(())
}

// ============================================================================
// Order records
// ============================================================================

#[test]
fn test_reads_service_order_format() -> anyhow::Result<()> {
    let env = TestEnvironment::new()?;
    let json = format!(
        r#"{{
            "orders": [
                {{ "id": "new-1", "state": "created", "lspBalanceSat": 100000, "clientBalanceSat": 10000 }},
                {{ "_id": "old-1", "state": "expired", "lspBalanceSat": 50000, "clientBalanceSat": 0,
                   "fundingTxid": "{}" }},
                {{ "id": "done-1", "state": "executed", "lspBalanceSat": 1, "clientBalanceSat": 1 }}
            ],
            "paid_order_ids": ["new-1", "old-1", "done-1"],
            "service_node_key": "{}"
        }}"#,
        txid(9),
        service_key()
    );
    write_raw(&env, "orders.json", &json)?;

    let orders = env.store.orders()?;
    assert_eq!(orders.len(), 3);
    assert_eq!(orders[0].state, OrderState::Created);
    assert_eq!(orders[1].legacy_id, Some(OrderId::from("old-1")));
    assert_eq!(orders[1].funding_txid, Some(txid(9)));
    assert_eq!(orders[2].state, OrderState::Other);
    assert_eq!(env.store.service_node_key()?, service_key());

    env.store.save_ledger(&ledger(0, Vec::new()))?;
    env.scheduler.tick();
    let set = env.status.channel_view()?;
    assert_eq!(set.synthetic_ids(), vec!["new-1", "old-1"]);
    assert_eq!(set.pending.len(), 1);
    assert_eq!(set.failed.len(), 1);
    Ok(())
}

#[test]
fn test_incomplete_records_become_issues() -> anyhow::Result<()> {
    let env = TestEnvironment::new()?;
    let json = format!(
        r#"{{
            "orders": [
                {{ "id": "no-balance", "state": "created", "lspBalanceSat": 100000 }},
                {{ "id": "good", "state": "created", "lspBalanceSat": 20000, "clientBalanceSat": 0 }}
            ],
            "paid_order_ids": ["no-balance", "ghost", "good"],
            "service_node_key": "{}"
        }}"#,
        service_key()
    );
    write_raw(&env, "orders.json", &json)?;
    env.store.save_ledger(&ledger(0, Vec::new()))?;

    env.scheduler.tick();
    let set = env.status.channel_view()?;

    assert_eq!(set.pending.len(), 1);
    assert_eq!(set.pending[0].id(), "good");
    assert!(set.issues.contains(&IntegrityIssue::MissingBalance {
        order_id: OrderId::from("no-balance"),
    }));
    assert!(set.issues.contains(&IntegrityIssue::UnknownPaidOrder {
        order_id: OrderId::from("ghost"),
    }));
    Ok(())
}

// ============================================================================
// Unavailable and malformed documents
// ============================================================================

#[test]
fn test_malformed_ledger_fails_closed() -> anyhow::Result<()> {
    let env = TestEnvironment::new()?;
    write_raw(&env, "ledger.json", "{ \"channels\": 12 }")?;

    assert!(env.store.channels().is_err());

    let tick = env.scheduler.tick();
    assert_eq!(tick.readiness.lightning_node, ItemState::Error);
    assert_eq!(tick.readiness.lightning_connectivity, ItemState::Error);
    assert!(env.status.balance_snapshot().is_err());
    assert!(env.status.channel_view().is_err());
    Ok(())
}

#[test]
fn test_ledger_without_this_wallet_is_unknown() -> anyhow::Result<()> {
    let env = TestEnvironment::new()?;
    let mut doc = ledger(5_000, vec![channel("chan-1", true, 20_000, 8_000)]);
    doc.balances[0].wallet = "someone-else".to_string();
    env.store.save_ledger(&doc)?;

    assert!(env
        .store
        .onchain_balance(WALLET, NETWORK)
        .unwrap_err()
        .is_unavailable());

    let tick = env.scheduler.tick();
    assert!(env.status.balance_snapshot().unwrap_err().is_unavailable());

    // Only the balance is unknown; the rest of the ledger was read fine
    assert_eq!(tick.readiness.lightning_node, ItemState::Ready);
    assert_eq!(tick.readiness.lightning_connectivity, ItemState::Ready);
    assert_eq!(env.status.channel_view()?.open.len(), 1);
    Ok(())
}

#[test]
fn test_orders_missing_keeps_real_channels() -> anyhow::Result<()> {
    let env = TestEnvironment::new()?;
    env.store.save_ledger(&ledger(
        0,
        vec![
            channel("chan-1", true, 20_000, 8_000),
            channel("chan-2", false, 10_000, 0),
        ],
    ))?;

    let tick = env.scheduler.tick();
    let set = env.status.channel_view()?;

    assert_eq!(set.open.len(), 1);
    assert_eq!(set.pending.len(), 1);
    assert!(set.synthetic_ids().is_empty());
    assert_eq!(tick.readiness.lightning_connectivity, ItemState::Ready);
    Ok(())
}
