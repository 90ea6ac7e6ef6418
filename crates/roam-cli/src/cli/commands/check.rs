//! `roam check` – run one auto-update condition check.

use anyhow::{bail, Result};
use chrono::{Duration, Local, Timelike};
use roam_core::engine::MapEngine;
use roam_core::network::NetworkClass;

pub fn parse_network(s: &str) -> Result<NetworkClass> {
    match s {
        "wifi" => Ok(NetworkClass::Wifi),
        "cellular" => Ok(NetworkClass::Cellular),
        "offline" => Ok(NetworkClass::Offline),
        other => bail!("unknown network class {other:?} (wifi, cellular or offline)"),
    }
}

pub async fn run_check(engine: &MapEngine, force_window: bool) -> Result<()> {
    let mut now = Local::now();
    if force_window {
        // Shift the evaluated clock onto the scheduled minute so the
        // time window gate passes.
        let settings = engine.auto_update_settings().await;
        if let Some((h, m)) = settings
            .time_of_day
            .split_once(':')
            .and_then(|(h, m)| Some((h.parse::<i64>().ok()?, m.parse::<i64>().ok()?)))
        {
            let current = (now.hour() * 60 + now.minute()) as i64;
            now = now + Duration::minutes(h * 60 + m - current);
        }
    }
    let outcome = engine.run_update_check_at(now).await;
    println!("{outcome}");
    Ok(())
}
