use std::sync::Arc;
use wallet_status::{
    SnapshotStore, StatusConfig, StatusScheduler, StatusTick, SystemClock, WalletStatus,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    // Initialize logger (set RUST_LOG=debug for verbose output, RUST_LOG=info for normal)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = StatusConfig::from_env()?;
    let store = Arc::new(SnapshotStore::new(&config));
    let status = Arc::new(WalletStatus::new(&config, Arc::new(SystemClock)));
    let scheduler = Arc::new(StatusScheduler::new(
        status.clone(),
        store.clone(),
        config.check_interval,
    ));

    log::info!(
        "Starting wallet status daemon for {}",
        store.wallet_dir().display()
    );

    let runner = {
        let scheduler = scheduler.clone();
        tokio::spawn(async move {
            let mut last: Option<StatusTick> = None;
            scheduler
                .run(move |tick| {
                    report(&status, &tick, last.as_ref());
                    last = Some(tick);
                })
                .await;
        })
    };

    tokio::signal::ctrl_c().await?;
    log::info!("Shutdown signal received");
    scheduler.shutdown();
    runner.await?;

    Ok(())
}

/// Log what changed since the previous tick
fn report(status: &WalletStatus, tick: &StatusTick, last: Option<&StatusTick>) {
    for transition in &tick.transitions {
        log::info!("{}: {}", transition.title(), transition.message());
    }

    if last.map(|l| l.readiness) != Some(tick.readiness) {
        match serde_json::to_string(&tick.readiness) {
            Ok(json) => log::info!("Readiness: {}", json),
            Err(e) => log::error!("Failed to encode readiness: {}", e),
        }
        log::info!("Connectivity banner: {:?}", status.connectivity_banner());
    }

    if last.map(|l| &l.backup) != Some(&tick.backup) {
        log::info!(
            "Backup state {:?} (stale: {:?}, last sync: {:?})",
            tick.backup.state(),
            tick.backup.stale_targets,
            tick.backup.display_sync
        );
    }

    match status.balance_snapshot() {
        Ok(balance) => log::debug!(
            "Balance: spendable {} sats, lightning {} sats, total {} sats",
            balance.spendable_sats(),
            balance.lightning_sats(),
            balance.total_sats()
        ),
        Err(e) if e.is_unavailable() => log::debug!("Balance unknown: {}", e),
        Err(e) => log::error!("Balance computation failed: {}", e),
    }
}
