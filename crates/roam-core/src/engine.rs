//! The engine facade.
//!
//! `MapEngine` ties the registry, scheduler, capacity gate, auto-update
//! loop, and snapshot cache together behind one cloneable handle. All
//! mutable state sits behind a single async mutex; download workers and
//! the auto-update daemon share it through `EngineInner`.

use crate::autoupdate::{self, AutoUpdateSettings, CheckOutcome};
use crate::capacity;
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::geo::{GeoBounds, GeoPoint, MapTile};
use crate::network::{FixedNetwork, NetworkMonitor};
use crate::registry::{OfflineRegion, RegionRegistry, RegionRequest, RegionStatus};
use crate::scheduler::{
    self, CompletionResult, CompletionSender, DownloadQueue, ListenerId, ProgressBus,
};
use crate::snapshot::SnapshotCache;
use crate::store::{region_tiles_key, KvStore, TileStore};
use anyhow::Result;
use chrono::{DateTime, Local};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, Mutex, Notify};
use tokio_util::sync::CancellationToken;

/// Mutable engine state behind the single async mutex.
pub(crate) struct EngineState {
    pub(crate) registry: RegionRegistry,
    pub(crate) queue: DownloadQueue,
    pub(crate) waiters: HashMap<String, Vec<CompletionSender>>,
}

/// Shared internals handed to download workers and the auto-update daemon.
pub(crate) struct EngineInner {
    pub(crate) cfg: EngineConfig,
    pub(crate) kv: KvStore,
    pub(crate) tiles: TileStore,
    pub(crate) state: Mutex<EngineState>,
    pub(crate) progress: ProgressBus,
    pub(crate) network: Arc<dyn NetworkMonitor>,
    /// Wakes the auto-update daemon early (settings or network changes).
    pub(crate) recheck: Notify,
}

/// Handle to one requested download.
///
/// Carries a snapshot of the record as it looked when the request was
/// accepted; `wait` resolves when the scheduler settles the region.
/// Dropping the handle detaches the caller without affecting the download.
pub struct DownloadHandle {
    region: OfflineRegion,
    outcome: Outcome,
    inner: Arc<EngineInner>,
}

enum Outcome {
    /// Resolved at request time (the region was already available).
    Ready(CompletionResult),
    Pending(oneshot::Receiver<CompletionResult>),
}

impl std::fmt::Debug for DownloadHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadHandle")
            .field("region", &self.region)
            .finish_non_exhaustive()
    }
}

impl DownloadHandle {
    /// The record as of request acceptance.
    pub fn region(&self) -> &OfflineRegion {
        &self.region
    }

    /// Wait for the download to settle, bounded by the configured region
    /// timeout. On expiry the record is forced to `error` and the download
    /// task is left to finish on its own; tiles already on disk stay.
    pub async fn wait(self) -> Result<OfflineRegion, EngineError> {
        let rx = match self.outcome {
            Outcome::Ready(result) => return result,
            Outcome::Pending(rx) => rx,
        };
        let timeout_secs = self.inner.cfg.region_timeout_secs;
        match tokio::time::timeout(Duration::from_secs(timeout_secs), rx).await {
            Ok(Ok(result)) => result,
            // The channel can only close when the region record went away.
            Ok(Err(_)) => Err(EngineError::RegionDeleted {
                id: self.region.id.clone(),
            }),
            Err(_) => {
                force_timeout(&self.inner, &self.region.id).await;
                Err(EngineError::Timeout {
                    id: self.region.id.clone(),
                    timeout_secs,
                })
            }
        }
    }
}

/// Mark a region that outlived its waiter as failed. A later settle from
/// the still-running worker sees the status change and discards itself.
async fn force_timeout(inner: &Arc<EngineInner>, region_id: &str) {
    let mut state = inner.state.lock().await;
    if let Some(record) = state.registry.get_mut(region_id) {
        if record.status == RegionStatus::Downloading {
            record.status = RegionStatus::Error;
            record.download_progress = None;
            state.registry.persist(&inner.kv).await;
            tracing::warn!(region = region_id, "region download timed out, marked error");
        }
    }
    state.waiters.remove(region_id);
}

pub(crate) async fn request_download_inner(
    inner: &Arc<EngineInner>,
    request: RegionRequest,
) -> Result<DownloadHandle, EngineError> {
    if !request.bounds.is_valid() {
        return Err(EngineError::InvalidConfig(format!(
            "bounds of region {} are inverted or out of range",
            request.id
        )));
    }

    let mut state = inner.state.lock().await;

    // Anything holding a queue slot keeps it. This also covers workers
    // still draining after a timeout or delete, whose stale results must
    // not land on a fresh record.
    if state.queue.is_queued(&request.id) {
        return Err(EngineError::AlreadyDownloading { id: request.id });
    }

    if let Some(existing) = state.registry.get(&request.id) {
        if existing.status == RegionStatus::Available {
            // Idempotent: resolve immediately with what is cached.
            let record = existing.clone();
            return Ok(DownloadHandle {
                region: record.clone(),
                outcome: Outcome::Ready(Ok(record)),
                inner: Arc::clone(inner),
            });
        }
        // Outdated, errored, and placeholder records are replaced by a
        // fresh download below.
    }

    capacity::ensure_quota(&state.registry, inner.cfg.max_cache_mb, request.size_mb)?;

    let record = OfflineRegion {
        id: request.id.clone(),
        name: request.name,
        bounds: request.bounds,
        min_zoom: inner.cfg.min_zoom,
        max_zoom: inner.cfg.max_zoom,
        size_mb: request.size_mb,
        status: RegionStatus::Downloading,
        download_progress: Some(0),
        last_updated: None,
    };
    state.registry.insert(record.clone());
    state.registry.persist(&inner.kv).await;

    let (tx, rx) = oneshot::channel();
    state.waiters.entry(request.id.clone()).or_default().push(tx);

    if state.queue.active.is_none() {
        state.queue.active = Some(request.id.clone());
        scheduler::spawn_worker(Arc::clone(inner), request.id.clone());
    } else {
        state.queue.pending.push_back(request.id.clone());
        tracing::info!(
            region = %request.id,
            position = state.queue.pending.len(),
            "queued behind active download"
        );
    }

    Ok(DownloadHandle {
        region: record,
        outcome: Outcome::Pending(rx),
        inner: Arc::clone(inner),
    })
}

pub(crate) async fn delete_region_inner(inner: &Arc<EngineInner>, region_id: &str) -> bool {
    let mut state = inner.state.lock().await;
    if state.registry.get(region_id).is_none() {
        return false;
    }

    // A queued-but-unstarted download will never run; its waiters resolve
    // now. An active download keeps running and discards its own result.
    state.queue.remove_pending(region_id);
    for waiter in state.waiters.remove(region_id).unwrap_or_default() {
        let _ = waiter.send(Err(EngineError::RegionDeleted {
            id: region_id.to_string(),
        }));
    }

    let tiles_key = region_tiles_key(region_id);
    let tiles: Vec<MapTile> = inner.kv.get(&tiles_key).await.unwrap_or_default();
    let paths: Vec<PathBuf> = tiles
        .iter()
        .filter_map(|t| t.path.as_ref().map(PathBuf::from))
        .collect();
    let removed = inner.tiles.remove_files(&paths).await;

    if let Err(e) = inner.kv.remove(&tiles_key).await {
        tracing::warn!(region = region_id, "tile list removal failed: {e:#}");
    }
    state.registry.remove(region_id);
    state.registry.persist(&inner.kv).await;
    tracing::info!(region = region_id, files_removed = removed, "region deleted");
    true
}

/// Cloneable facade over the whole engine.
#[derive(Clone)]
pub struct MapEngine {
    inner: Arc<EngineInner>,
}

impl MapEngine {
    /// Open with the on-disk configuration (created on first run) and a
    /// default wifi network monitor.
    pub async fn open() -> Result<Self> {
        let cfg = crate::config::load_or_init()?;
        Self::open_with(cfg, Arc::new(FixedNetwork::default())).await
    }

    /// Open with an explicit configuration and network monitor. Paths not
    /// set in the config default to the XDG state directory.
    pub async fn open_with(cfg: EngineConfig, network: Arc<dyn NetworkMonitor>) -> Result<Self> {
        cfg.validate()?;

        let kv = match &cfg.db_path {
            Some(path) => KvStore::open_at(path).await?,
            None => KvStore::open_default().await?,
        };
        let tile_base = match &cfg.tile_dir {
            Some(dir) => dir.clone(),
            None => {
                let xdg_dirs = xdg::BaseDirectories::with_prefix("roam")?;
                xdg_dirs.get_state_home().join("tiles")
            }
        };
        let tiles = TileStore::open(tile_base).await?;

        let mut registry = RegionRegistry::load(&kv).await;

        // Records stranded mid-download by a crash cannot resume; their
        // partial state is unusable until re-requested.
        let mut stranded = 0usize;
        for id in registry.ids() {
            if let Some(record) = registry.get_mut(&id) {
                if record.status == RegionStatus::Downloading {
                    record.status = RegionStatus::Error;
                    record.download_progress = None;
                    stranded += 1;
                }
            }
        }
        if stranded > 0 {
            tracing::warn!(stranded, "normalized interrupted downloads to error");
            registry.persist(&kv).await;
        }

        let inner = Arc::new(EngineInner {
            cfg,
            kv,
            tiles,
            state: Mutex::new(EngineState {
                registry,
                queue: DownloadQueue::default(),
                waiters: HashMap::new(),
            }),
            progress: ProgressBus::default(),
            network,
            recheck: Notify::new(),
        });
        Ok(MapEngine { inner })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.cfg
    }

    /// Request a region download. Already-available regions resolve
    /// immediately; a region mid-download is an error; anything else is
    /// checked against the quota, recorded as `downloading`, and queued.
    pub async fn request_download(
        &self,
        request: RegionRequest,
    ) -> Result<DownloadHandle, EngineError> {
        request_download_inner(&self.inner, request).await
    }

    /// Delete one region: queued work, tile files, tile list, record.
    /// Returns false for an unknown id.
    pub async fn delete_region(&self, region_id: &str) -> bool {
        delete_region_inner(&self.inner, region_id).await
    }

    /// Delete every region. Returns how many were removed.
    pub async fn delete_all_regions(&self) -> usize {
        let ids = { self.inner.state.lock().await.registry.ids() };
        let mut deleted = 0usize;
        for id in ids {
            if delete_region_inner(&self.inner, &id).await {
                deleted += 1;
            }
        }
        deleted
    }

    /// All records, sorted by id.
    pub async fn regions(&self) -> Vec<OfflineRegion> {
        self.inner.state.lock().await.registry.list()
    }

    pub async fn region(&self, region_id: &str) -> Option<OfflineRegion> {
        self.inner.state.lock().await.registry.get(region_id).cloned()
    }

    /// The persisted tile list of a region (empty when never completed).
    pub async fn region_tiles(&self, region_id: &str) -> Vec<MapTile> {
        self.inner
            .kv
            .get(&region_tiles_key(region_id))
            .await
            .unwrap_or_default()
    }

    /// True when a fully downloaded region contains the point.
    pub async fn is_point_covered(&self, point: &GeoPoint) -> bool {
        self.inner.state.lock().await.registry.point_covered(point)
    }

    /// True when a fully downloaded region contains the whole box.
    pub async fn is_region_available_offline(&self, bounds: &GeoBounds) -> bool {
        self.inner.state.lock().await.registry.bounds_covered(bounds)
    }

    /// Megabytes currently counted against the quota.
    pub async fn total_cache_mb(&self) -> f64 {
        capacity::total_cache_mb(&self.inner.state.lock().await.registry)
    }

    pub fn max_cache_mb(&self) -> f64 {
        self.inner.cfg.max_cache_mb
    }

    pub fn add_progress_listener(
        &self,
        listener: impl Fn(&str, u8) + Send + Sync + 'static,
    ) -> ListenerId {
        self.inner.progress.add(listener)
    }

    pub fn remove_progress_listener(&self, id: ListenerId) {
        self.inner.progress.remove(id)
    }

    pub async fn auto_update_settings(&self) -> AutoUpdateSettings {
        autoupdate::load_settings(&self.inner.kv).await
    }

    /// Persist new auto-update settings and wake the daemon for an
    /// immediate re-check.
    pub async fn set_auto_update_settings(&self, settings: AutoUpdateSettings) {
        autoupdate::save_settings(&self.inner.kv, &settings).await;
        self.inner.recheck.notify_one();
    }

    /// Run one auto-update condition check now.
    pub async fn run_update_check(&self) -> CheckOutcome {
        autoupdate::run_check_at(&self.inner, Local::now()).await
    }

    /// Run one auto-update condition check as of a specific instant.
    pub async fn run_update_check_at(&self, now: DateTime<Local>) -> CheckOutcome {
        autoupdate::run_check_at(&self.inner, now).await
    }

    /// Start the hourly auto-update daemon; it stops when `shutdown` fires.
    pub fn spawn_auto_update_daemon(
        &self,
        shutdown: CancellationToken,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(autoupdate::run_daemon(Arc::clone(&self.inner), shutdown))
    }

    /// Tell the engine the host's connectivity changed; the auto-update
    /// daemon re-evaluates its gates right away.
    pub fn notify_network_changed(&self) {
        self.inner.recheck.notify_one();
    }

    /// The snapshot cache sharing this engine's store.
    pub fn snapshot_cache(&self) -> SnapshotCache {
        SnapshotCache::new(self.inner.kv.clone())
    }
}
