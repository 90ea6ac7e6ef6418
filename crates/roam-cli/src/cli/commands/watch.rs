//! `roam watch` – run the auto-update daemon until Ctrl-C.

use anyhow::Result;
use roam_core::engine::MapEngine;
use tokio_util::sync::CancellationToken;

pub async fn run_watch(engine: &MapEngine) -> Result<()> {
    let shutdown = CancellationToken::new();
    let daemon = engine.spawn_auto_update_daemon(shutdown.clone());
    println!("Watching for scheduled updates (Ctrl-C to stop).");

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown requested");
    shutdown.cancel();
    daemon.await?;
    println!("Stopped.");
    Ok(())
}
