//! Scheduled freshness checks for downloaded regions.
//!
//! A check walks a gate cascade (enabled, network class, interval, time
//! window); only when every gate passes does it scan for regions older
//! than the staleness threshold and refresh them by delete + re-request.
//! The check timestamp is persisted before any refresh work, so a crashed
//! scan cannot re-arm the interval early.

pub mod settings;

use crate::engine::{delete_region_inner, request_download_inner, EngineInner};
use crate::network::NetworkClass;
use crate::registry::{RegionRequest, RegionStatus};
use crate::store::{KvStore, AUTO_UPDATE_KEY};
use chrono::{DateTime, Local, Timelike};
use settings::{parse_minute_of_day, within_window};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub use settings::{AutoUpdateSettings, UpdateInterval};

/// Regions not refreshed for this long are considered stale.
const STALE_AFTER_MS: i64 = 30 * 24 * 60 * 60 * 1000;

/// Daemon tick between condition checks.
const TICK: Duration = Duration::from_secs(60 * 60);

/// Which gate stopped a check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Disabled,
    NetworkClass,
    IntervalNotElapsed,
    OutsideWindow,
}

impl SkipReason {
    pub fn as_str(self) -> &'static str {
        match self {
            SkipReason::Disabled => "auto-update disabled",
            SkipReason::NetworkClass => "network class not allowed",
            SkipReason::IntervalNotElapsed => "interval not elapsed",
            SkipReason::OutsideWindow => "outside check window",
        }
    }
}

/// Result of one condition check, for the CLI and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckOutcome {
    Skipped(SkipReason),
    Ran { scanned: usize, refreshed: usize },
}

impl fmt::Display for CheckOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckOutcome::Skipped(reason) => write!(f, "skipped: {}", reason.as_str()),
            CheckOutcome::Ran { scanned, refreshed } => {
                write!(f, "ran: {scanned} stale region(s), {refreshed} refresh(es) started")
            }
        }
    }
}

pub(crate) async fn load_settings(kv: &KvStore) -> AutoUpdateSettings {
    kv.get(AUTO_UPDATE_KEY).await.unwrap_or_default()
}

pub(crate) async fn save_settings(kv: &KvStore, settings: &AutoUpdateSettings) {
    kv.put(AUTO_UPDATE_KEY, settings).await;
}

/// The gate cascade, in order. Returns the first gate that fails, `None`
/// when a refresh scan may run.
pub(crate) fn gate(
    settings: &AutoUpdateSettings,
    network: NetworkClass,
    now_ms: i64,
    minute_of_day: u32,
) -> Option<SkipReason> {
    if !settings.enabled {
        return Some(SkipReason::Disabled);
    }
    match network {
        NetworkClass::Offline => return Some(SkipReason::NetworkClass),
        NetworkClass::Cellular if settings.wifi_only => return Some(SkipReason::NetworkClass),
        _ => {}
    }
    let Some(interval) = settings.update_interval.interval_ms() else {
        return Some(SkipReason::IntervalNotElapsed);
    };
    if now_ms - settings.last_auto_check < interval {
        return Some(SkipReason::IntervalNotElapsed);
    }
    let target = parse_minute_of_day(&settings.time_of_day);
    if !within_window(minute_of_day, target) {
        return Some(SkipReason::OutsideWindow);
    }
    None
}

/// Run one condition check as of `now`.
pub(crate) async fn run_check_at(inner: &Arc<EngineInner>, now: DateTime<Local>) -> CheckOutcome {
    let mut settings = load_settings(&inner.kv).await;
    let network = inner.network.network_class();
    let now_ms = now.timestamp_millis();
    let minute_of_day = now.hour() * 60 + now.minute();

    if let Some(reason) = gate(&settings, network, now_ms, minute_of_day) {
        tracing::debug!(reason = reason.as_str(), "auto-update check skipped");
        return CheckOutcome::Skipped(reason);
    }

    // Record the check before refreshing anything.
    settings.last_auto_check = now_ms;
    save_settings(&inner.kv, &settings).await;

    let stale: Vec<RegionRequest> = {
        let mut state = inner.state.lock().await;
        let cutoff = now_ms - STALE_AFTER_MS;
        let stale_ids: Vec<String> = state
            .registry
            .iter()
            .filter(|r| {
                r.status == RegionStatus::Available
                    && r.last_updated.map_or(false, |updated| updated < cutoff)
            })
            .map(|r| r.id.clone())
            .collect();
        for id in &stale_ids {
            if let Some(record) = state.registry.get_mut(id) {
                record.status = RegionStatus::Outdated;
            }
        }
        if !stale_ids.is_empty() {
            state.registry.persist(&inner.kv).await;
        }
        stale_ids
            .iter()
            .filter_map(|id| state.registry.get(id))
            .map(|r| RegionRequest {
                id: r.id.clone(),
                name: r.name.clone(),
                bounds: r.bounds,
                size_mb: r.size_mb,
            })
            .collect()
    };

    let scanned = stale.len();
    let mut refreshed = 0usize;
    for request in stale {
        let id = request.id.clone();
        delete_region_inner(inner, &id).await;
        // The handle is dropped: the queue drives the refresh, nobody waits.
        match request_download_inner(inner, request).await {
            Ok(_handle) => refreshed += 1,
            Err(e) => tracing::warn!(region = %id, "refresh request failed: {e}"),
        }
    }

    if scanned > 0 {
        tracing::info!(scanned, refreshed, "auto-update refresh pass finished");
    }
    CheckOutcome::Ran { scanned, refreshed }
}

/// Hourly check loop. Runs once immediately, then on every tick; settings
/// changes and network-change notifications wake it early. Stops when the
/// token is cancelled.
pub(crate) async fn run_daemon(inner: Arc<EngineInner>, shutdown: CancellationToken) {
    tracing::info!("auto-update daemon started");
    loop {
        let outcome = run_check_at(&inner, Local::now()).await;
        tracing::debug!(%outcome, "auto-update check finished");
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = inner.recheck.notified() => {}
            _ = tokio::time::sleep(TICK) => {}
        }
    }
    tracing::info!("auto-update daemon stopped");
}
