//! FIFO region download scheduler.
//!
//! One region downloads at a time; later requests queue behind it in
//! arrival order. Within the active region, tiles run in fixed-size batches
//! on the blocking pool and a batch fully settles before the next starts.
//! Completion is pushed to waiters over oneshot channels; nothing polls.

mod fetch;
pub mod progress;

use crate::engine::{EngineInner, EngineState};
use crate::error::EngineError;
use crate::geo::{self, MapTile};
use crate::registry::{OfflineRegion, RegionStatus};
use crate::store::{now_ms, region_tiles_key};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::task::JoinSet;

pub use progress::{ListenerId, ProgressBus};

/// Completion value pushed to everyone waiting on a region.
pub(crate) type CompletionResult = Result<OfflineRegion, EngineError>;
pub(crate) type CompletionSender = tokio::sync::oneshot::Sender<CompletionResult>;

/// Pending region ids plus the single active download slot.
#[derive(Debug, Default)]
pub(crate) struct DownloadQueue {
    pub(crate) pending: VecDeque<String>,
    pub(crate) active: Option<String>,
}

impl DownloadQueue {
    /// True when the region is the active download or still waiting its turn.
    pub(crate) fn is_queued(&self, id: &str) -> bool {
        self.active.as_deref() == Some(id) || self.pending.iter().any(|p| p == id)
    }

    pub(crate) fn remove_pending(&mut self, id: &str) {
        self.pending.retain(|p| p != id);
    }
}

/// Failure-ratio policy: a region with more than 20% failed tiles becomes
/// an error; at or below the line it still counts as available. An empty
/// tile set (everything capped away) is a trivially complete download.
pub(crate) fn completion_status(failed: usize, total: usize) -> RegionStatus {
    if total == 0 {
        return RegionStatus::Available;
    }
    if failed as f64 / total as f64 > 0.2 {
        RegionStatus::Error
    } else {
        RegionStatus::Available
    }
}

/// Spawn the worker for a region just promoted to the active slot. The
/// caller must already have set `queue.active` to this region.
pub(crate) fn spawn_worker(inner: Arc<EngineInner>, region_id: String) {
    tokio::spawn(run_region_download(inner, region_id));
}

async fn run_region_download(inner: Arc<EngineInner>, region_id: String) {
    tracing::info!(region = %region_id, "region download started");
    let outcome = download_tiles(&inner, &region_id).await;

    let mut state = inner.state.lock().await;
    match outcome {
        Some((ok_tiles, failed, total)) => {
            settle(&inner, &mut state, &region_id, ok_tiles, failed, total).await;
        }
        None => {
            // The record vanished before any tile was fetched.
            state.waiters.remove(&region_id);
        }
    }

    if state.queue.active.as_deref() == Some(region_id.as_str()) {
        state.queue.active = None;
    }
    if let Some(next) = state.queue.pending.pop_front() {
        state.queue.active = Some(next.clone());
        drop(state);
        spawn_worker(Arc::clone(&inner), next);
    }
}

/// Fetch every tile of the region in batches. Returns the successful tiles
/// (with their on-disk paths), the failure count, and the total attempted,
/// or `None` when the record was gone before work started.
async fn download_tiles(
    inner: &Arc<EngineInner>,
    region_id: &str,
) -> Option<(Vec<MapTile>, usize, usize)> {
    let (bounds, min_zoom, max_zoom) = {
        let state = inner.state.lock().await;
        let record = state.registry.get(region_id)?;
        if record.status != RegionStatus::Downloading {
            return None;
        }
        (record.bounds, record.min_zoom, record.max_zoom)
    };

    let tiles = geo::tiles_for_region(&bounds, min_zoom, max_zoom, &inner.cfg.tile_url_template);
    let total = tiles.len();
    if total == 0 {
        if update_progress(inner, region_id, 100).await {
            inner.progress.emit(region_id, 100);
        }
        return Some((Vec::new(), 0, 0));
    }

    let batch_size = inner.cfg.tile_batch_size.max(1);
    let mut ok_tiles: Vec<MapTile> = Vec::with_capacity(total);
    let mut settled = 0usize;
    let mut failed = 0usize;

    for chunk in tiles.chunks(batch_size) {
        let mut batch: JoinSet<(MapTile, fetch::TileResult)> = JoinSet::new();
        for tile in chunk {
            let mut tile = tile.clone();
            let path = inner.tiles.tile_path(tile.z, tile.x, tile.y);
            batch.spawn_blocking(move || {
                let result = fetch::fetch_tile(&tile.url, &path);
                if result.is_ok() {
                    tile.path = Some(path.to_string_lossy().into_owned());
                }
                (tile, result)
            });
        }

        while let Some(joined) = batch.join_next().await {
            settled += 1;
            match joined {
                Ok((tile, Ok(()))) => ok_tiles.push(tile),
                Ok((tile, Err(e))) => {
                    failed += 1;
                    tracing::warn!(
                        region = region_id,
                        z = tile.z,
                        x = tile.x,
                        y = tile.y,
                        "tile fetch failed: {e}"
                    );
                }
                Err(e) => {
                    failed += 1;
                    tracing::warn!(region = region_id, "tile task join failed: {e}");
                }
            }
            let percent = (settled * 100 / total) as u8;
            if update_progress(inner, region_id, percent).await {
                inner.progress.emit(region_id, percent);
            }
        }
    }

    Some((ok_tiles, failed, total))
}

/// Record the per-tile progress on the registry record. Returns false when
/// the region was deleted or already forced out of `downloading`, in which
/// case nothing is emitted to listeners either.
async fn update_progress(inner: &Arc<EngineInner>, region_id: &str, percent: u8) -> bool {
    let mut state = inner.state.lock().await;
    match state.registry.get_mut(region_id) {
        Some(record) if record.status == RegionStatus::Downloading => {
            record.download_progress = Some(percent);
            true
        }
        _ => false,
    }
}

/// Apply the finished download to the registry and resolve the waiters.
/// A result whose record was deleted or force-timed-out mid-flight is
/// discarded; the queue still advances.
async fn settle(
    inner: &Arc<EngineInner>,
    state: &mut EngineState,
    region_id: &str,
    ok_tiles: Vec<MapTile>,
    failed: usize,
    total: usize,
) {
    let result = match state.registry.get_mut(region_id) {
        Some(record) if record.status == RegionStatus::Downloading => {
            if completion_status(failed, total) == RegionStatus::Available {
                record.status = RegionStatus::Available;
                record.download_progress = Some(100);
                record.last_updated = Some(now_ms());
                Some(Ok(record.clone()))
            } else {
                record.status = RegionStatus::Error;
                record.download_progress = None;
                Some(Err(EngineError::DownloadFailed { failed, total }))
            }
        }
        Some(record) => {
            tracing::info!(
                region = region_id,
                status = record.status.as_str(),
                "late download result discarded"
            );
            None
        }
        None => {
            tracing::info!(region = region_id, "download finished for a deleted region, discarding");
            None
        }
    };

    let Some(result) = result else {
        state.waiters.remove(region_id);
        return;
    };

    if result.is_ok() {
        inner.kv.put(&region_tiles_key(region_id), &ok_tiles).await;
        tracing::info!(
            region = region_id,
            tiles = ok_tiles.len(),
            failed,
            total,
            "region download complete"
        );
    } else {
        tracing::warn!(region = region_id, failed, total, "region download failed");
    }
    state.registry.persist(&inner.kv).await;

    for waiter in state.waiters.remove(region_id).unwrap_or_default() {
        let _ = waiter.send(result.clone());
    }
}
