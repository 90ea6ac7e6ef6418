//! Integration tests: region downloads against a local tile server.
//!
//! Exercises the full engine path end to end: request, batched tile
//! fetches, progress fan-out, the completion policy, FIFO queueing,
//! deletion, the region timeout, and the auto-update refresh cycle.

mod common;

use chrono::{Local, Timelike};
use roam_core::autoupdate::{AutoUpdateSettings, CheckOutcome, SkipReason, UpdateInterval};
use roam_core::config::EngineConfig;
use roam_core::engine::MapEngine;
use roam_core::error::EngineError;
use roam_core::geo::{GeoBounds, GeoPoint, MapTile};
use roam_core::network::FixedNetwork;
use roam_core::registry::{OfflineRegion, RegionRequest, RegionStatus};
use roam_core::store::{now_ms, region_tiles_key, KvStore, REGIONS_KEY};
use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use common::tile_server::{self, TileServerOptions};

/// Central Seoul; 6 tiles at z12 and 12 at z13.
fn seoul_bounds() -> GeoBounds {
    GeoBounds::new(GeoPoint::new(37.60, 127.00), GeoPoint::new(37.50, 126.90))
}

/// Exactly ten z12 tiles: columns 3491..=3495, rows 1585..=1586.
fn ten_tile_bounds() -> GeoBounds {
    GeoBounds::new(GeoPoint::new(37.62, 127.25), GeoPoint::new(37.55, 126.85))
}

fn engine_config(dir: &Path, template: String) -> EngineConfig {
    EngineConfig {
        tile_url_template: template,
        min_zoom: 12,
        max_zoom: 12,
        db_path: Some(dir.join("engine.db")),
        tile_dir: Some(dir.join("tiles")),
        ..EngineConfig::default()
    }
}

async fn open_engine(dir: &Path, template: String) -> MapEngine {
    MapEngine::open_with(
        engine_config(dir, template),
        Arc::new(FixedNetwork::default()),
    )
    .await
    .unwrap()
}

fn request(id: &str, bounds: GeoBounds, size_mb: f64) -> RegionRequest {
    RegionRequest {
        id: id.into(),
        name: id.to_uppercase(),
        bounds,
        size_mb,
    }
}

#[tokio::test]
async fn seoul_region_downloads_to_available_with_files_on_disk() {
    let server = tile_server::start();
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = engine_config(dir.path(), server.template());
    cfg.max_zoom = 13;
    let engine = MapEngine::open_with(cfg, Arc::new(FixedNetwork::default()))
        .await
        .unwrap();

    let events: Arc<Mutex<Vec<(String, u8)>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    engine.add_progress_listener(move |id, pct| sink.lock().unwrap().push((id.to_string(), pct)));

    let handle = engine
        .request_download(request("seoul", seoul_bounds(), 40.0))
        .await
        .unwrap();
    assert_eq!(handle.region().status, RegionStatus::Downloading);
    assert_eq!(handle.region().download_progress, Some(0));

    let record = handle.wait().await.unwrap();
    assert_eq!(record.status, RegionStatus::Available);
    assert_eq!(record.download_progress, Some(100));
    assert!(record.last_updated.unwrap() > 0);

    // 6 tiles at z12 plus 12 at z13.
    assert_eq!(server.request_count(), 18);
    let tiles = engine.region_tiles("seoul").await;
    assert_eq!(tiles.len(), 18);
    for tile in &tiles {
        let path = tile.path.as_deref().expect("tile path recorded");
        assert!(Path::new(path).exists(), "tile file missing: {path}");
    }

    let events = events.lock().unwrap();
    assert!(!events.is_empty());
    assert!(events.iter().all(|(id, _)| id == "seoul"));
    let percents: Vec<u8> = events.iter().map(|(_, p)| *p).collect();
    assert!(
        percents.windows(2).all(|w| w[0] <= w[1]),
        "progress must never go backwards: {percents:?}"
    );
    assert_eq!(*percents.last().unwrap(), 100);

    assert!(engine.is_point_covered(&GeoPoint::new(37.55, 126.95)).await);
    assert!(engine.is_region_available_offline(&seoul_bounds()).await);
    assert_eq!(engine.total_cache_mb().await, 40.0);
}

#[tokio::test]
async fn two_failures_in_ten_tiles_still_count_as_available() {
    let opts = TileServerOptions {
        fail_paths: HashSet::from([
            "/12/3491/1585.png".to_string(),
            "/12/3492/1585.png".to_string(),
        ]),
        ..TileServerOptions::default()
    };
    let server = tile_server::start_with_options(opts);
    let dir = tempfile::tempdir().unwrap();
    let engine = open_engine(dir.path(), server.template()).await;

    let record = engine
        .request_download(request("coast", ten_tile_bounds(), 10.0))
        .await
        .unwrap()
        .wait()
        .await
        .unwrap();
    assert_eq!(record.status, RegionStatus::Available);
    assert_eq!(record.download_progress, Some(100));
    // Only the eight fetched tiles make the persisted list.
    assert_eq!(engine.region_tiles("coast").await.len(), 8);
}

#[tokio::test]
async fn three_failures_in_ten_tiles_fail_the_region() {
    let opts = TileServerOptions {
        fail_paths: HashSet::from([
            "/12/3491/1585.png".to_string(),
            "/12/3492/1585.png".to_string(),
            "/12/3493/1585.png".to_string(),
        ]),
        ..TileServerOptions::default()
    };
    let server = tile_server::start_with_options(opts);
    let dir = tempfile::tempdir().unwrap();
    let engine = open_engine(dir.path(), server.template()).await;

    let err = engine
        .request_download(request("coast", ten_tile_bounds(), 10.0))
        .await
        .unwrap()
        .wait()
        .await
        .unwrap_err();
    match err {
        EngineError::DownloadFailed { failed, total } => {
            assert_eq!(failed, 3);
            assert_eq!(total, 10);
        }
        other => panic!("unexpected error: {other}"),
    }

    let record = engine.region("coast").await.unwrap();
    assert_eq!(record.status, RegionStatus::Error);
    assert!(record.download_progress.is_none());

    // The seven fetched tiles stay on disk and no list is recorded.
    let left = std::fs::read_dir(dir.path().join("tiles")).unwrap().count();
    assert_eq!(left, 7);
    assert!(engine.region_tiles("coast").await.is_empty());

    // A failed region never provides coverage.
    assert!(!engine.is_point_covered(&GeoPoint::new(37.58, 127.0)).await);
}

#[tokio::test]
async fn second_request_queues_until_the_first_fully_settles() {
    // Slow the server enough that the first region is still in flight
    // when the second request arrives.
    let opts = TileServerOptions {
        delay: Some(Duration::from_millis(200)),
        ..TileServerOptions::default()
    };
    let server = tile_server::start_with_options(opts);
    let dir = tempfile::tempdir().unwrap();
    let engine = open_engine(dir.path(), server.template()).await;

    let events: Arc<Mutex<Vec<(String, u8)>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    engine.add_progress_listener(move |id, pct| sink.lock().unwrap().push((id.to_string(), pct)));

    let first = engine
        .request_download(request("first", ten_tile_bounds(), 10.0))
        .await
        .unwrap();
    let second = engine
        .request_download(request("second", seoul_bounds(), 10.0))
        .await
        .unwrap();
    // A queued region is recorded as downloading from the start.
    assert_eq!(second.region().status, RegionStatus::Downloading);

    assert_eq!(first.wait().await.unwrap().status, RegionStatus::Available);
    assert_eq!(second.wait().await.unwrap().status, RegionStatus::Available);

    let order = events.lock().unwrap();
    let first_last = order.iter().rposition(|(id, _)| id == "first").unwrap();
    let second_first = order.iter().position(|(id, _)| id == "second").unwrap();
    assert!(
        first_last < second_first,
        "the first region must fully settle before the second starts: {order:?}"
    );
}

#[tokio::test]
async fn slow_server_trips_the_region_timeout() {
    let opts = TileServerOptions {
        delay: Some(Duration::from_secs(3)),
        ..TileServerOptions::default()
    };
    let server = tile_server::start_with_options(opts);
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = engine_config(dir.path(), server.template());
    cfg.region_timeout_secs = 1;
    let engine = MapEngine::open_with(cfg, Arc::new(FixedNetwork::default()))
        .await
        .unwrap();

    let started = Instant::now();
    let err = engine
        .request_download(request("slow", ten_tile_bounds(), 5.0))
        .await
        .unwrap()
        .wait()
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Timeout { timeout_secs: 1, .. }));
    assert!(started.elapsed() < Duration::from_secs(3));

    let record = engine.region("slow").await.unwrap();
    assert_eq!(record.status, RegionStatus::Error);
    assert!(record.download_progress.is_none());
}

#[tokio::test]
async fn re_request_after_completion_does_not_refetch() {
    let server = tile_server::start();
    let dir = tempfile::tempdir().unwrap();
    let engine = open_engine(dir.path(), server.template()).await;

    engine
        .request_download(request("coast", ten_tile_bounds(), 10.0))
        .await
        .unwrap()
        .wait()
        .await
        .unwrap();
    assert_eq!(server.request_count(), 10);

    let record = engine
        .request_download(request("coast", ten_tile_bounds(), 10.0))
        .await
        .unwrap()
        .wait()
        .await
        .unwrap();
    assert_eq!(record.status, RegionStatus::Available);
    assert_eq!(server.request_count(), 10, "no tile is fetched twice");
}

#[tokio::test]
async fn re_requesting_a_region_mid_download_is_rejected() {
    let opts = TileServerOptions {
        delay: Some(Duration::from_millis(200)),
        ..TileServerOptions::default()
    };
    let server = tile_server::start_with_options(opts);
    let dir = tempfile::tempdir().unwrap();
    let engine = open_engine(dir.path(), server.template()).await;

    let first = engine
        .request_download(request("coast", ten_tile_bounds(), 10.0))
        .await
        .unwrap();
    let err = engine
        .request_download(request("coast", ten_tile_bounds(), 10.0))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::AlreadyDownloading { .. }));

    assert_eq!(first.wait().await.unwrap().status, RegionStatus::Available);
}

#[tokio::test]
async fn delete_after_download_removes_tile_files() {
    let server = tile_server::start();
    let dir = tempfile::tempdir().unwrap();
    let engine = open_engine(dir.path(), server.template()).await;

    engine
        .request_download(request("coast", ten_tile_bounds(), 10.0))
        .await
        .unwrap()
        .wait()
        .await
        .unwrap();
    assert_eq!(std::fs::read_dir(dir.path().join("tiles")).unwrap().count(), 10);

    assert!(engine.delete_region("coast").await);
    assert_eq!(std::fs::read_dir(dir.path().join("tiles")).unwrap().count(), 0);
    assert!(engine.region("coast").await.is_none());
    assert_eq!(engine.total_cache_mb().await, 0.0);
}

#[tokio::test]
async fn deleting_a_queued_region_resolves_its_waiter() {
    // Slow the server slightly so the first download is still running when
    // the queued one is deleted.
    let opts = TileServerOptions {
        delay: Some(Duration::from_millis(200)),
        ..TileServerOptions::default()
    };
    let server = tile_server::start_with_options(opts);
    let dir = tempfile::tempdir().unwrap();
    let engine = open_engine(dir.path(), server.template()).await;

    let first = engine
        .request_download(request("first", ten_tile_bounds(), 5.0))
        .await
        .unwrap();
    let second = engine
        .request_download(request("second", seoul_bounds(), 5.0))
        .await
        .unwrap();

    assert!(engine.delete_region("second").await);
    let err = second.wait().await.unwrap_err();
    assert!(matches!(err, EngineError::RegionDeleted { .. }));
    assert!(engine.region("second").await.is_none());

    // The active download is unaffected.
    assert_eq!(first.wait().await.unwrap().status, RegionStatus::Available);
    assert_eq!(server.request_count(), 10);
}

#[tokio::test]
async fn undeletable_tile_files_leave_orphans_but_never_block_deletion() {
    let dir = tempfile::tempdir().unwrap();
    // A tile list entry pointing at a directory: unlink fails with
    // something other than NotFound and the cleanup skips it.
    let obstinate = dir.path().join("tiles").join("not-a-file");
    tokio::fs::create_dir_all(&obstinate).await.unwrap();
    {
        let kv = KvStore::open_at(dir.path().join("engine.db")).await.unwrap();
        let record = OfflineRegion {
            id: "stuck".into(),
            name: "Stuck".into(),
            bounds: seoul_bounds(),
            min_zoom: 12,
            max_zoom: 12,
            size_mb: 5.0,
            status: RegionStatus::Available,
            download_progress: Some(100),
            last_updated: Some(now_ms()),
        };
        kv.put(REGIONS_KEY, &vec![record]).await;
        let tiles = vec![MapTile {
            z: 12,
            x: 1,
            y: 1,
            url: "http://127.0.0.1:9/1.png".into(),
            path: Some(obstinate.to_string_lossy().into_owned()),
        }];
        kv.put(&region_tiles_key("stuck"), &tiles).await;
    }

    let engine = open_engine(
        dir.path(),
        "https://tile.example.com/{z}/{x}/{y}.png".to_string(),
    )
    .await;
    assert!(engine.delete_region("stuck").await);
    assert!(engine.region("stuck").await.is_none());
    assert!(engine.region_tiles("stuck").await.is_empty());
    // The orphan survives on disk.
    assert!(obstinate.exists());
}

#[tokio::test]
async fn default_settings_skip_the_update_check() {
    let dir = tempfile::tempdir().unwrap();
    let engine = open_engine(
        dir.path(),
        "https://tile.example.com/{z}/{x}/{y}.png".to_string(),
    )
    .await;
    assert_eq!(
        engine.run_update_check().await,
        CheckOutcome::Skipped(SkipReason::Disabled)
    );
}

#[tokio::test]
async fn stale_regions_are_refreshed_by_a_passing_check() {
    let server = tile_server::start();
    let dir = tempfile::tempdir().unwrap();

    // Seed a month-old region with one stale tile file.
    let stale_ms = now_ms() - 31 * 24 * 60 * 60 * 1000;
    let old_file = dir.path().join("tiles").join("12_0_0.png");
    tokio::fs::create_dir_all(old_file.parent().unwrap())
        .await
        .unwrap();
    tokio::fs::write(&old_file, b"png").await.unwrap();
    {
        let kv = KvStore::open_at(dir.path().join("engine.db")).await.unwrap();
        let record = OfflineRegion {
            id: "old".into(),
            name: "Old".into(),
            bounds: ten_tile_bounds(),
            min_zoom: 12,
            max_zoom: 12,
            size_mb: 10.0,
            status: RegionStatus::Available,
            download_progress: Some(100),
            last_updated: Some(stale_ms),
        };
        kv.put(REGIONS_KEY, &vec![record]).await;
        let tiles = vec![MapTile {
            z: 12,
            x: 0,
            y: 0,
            url: "http://127.0.0.1:9/0.png".into(),
            path: Some(old_file.to_string_lossy().into_owned()),
        }];
        kv.put(&region_tiles_key("old"), &tiles).await;
    }

    let engine = open_engine(dir.path(), server.template()).await;

    // Arm the settings so every gate passes right now.
    let now = Local::now();
    engine
        .set_auto_update_settings(AutoUpdateSettings {
            enabled: true,
            wifi_only: true,
            update_interval: UpdateInterval::Weekly,
            time_of_day: format!("{:02}:{:02}", now.hour(), now.minute()),
            last_auto_check: 0,
        })
        .await;

    let outcome = engine.run_update_check().await;
    assert_eq!(
        outcome,
        CheckOutcome::Ran {
            scanned: 1,
            refreshed: 1
        }
    );
    assert!(engine.auto_update_settings().await.last_auto_check > 0);

    // The refresh re-downloads the region through the normal queue.
    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        if let Some(record) = engine.region("old").await {
            if record.status == RegionStatus::Available {
                assert!(record.last_updated.unwrap() > stale_ms);
                break;
            }
        }
        assert!(Instant::now() < deadline, "refresh never completed");
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert_eq!(server.request_count(), 10);
    assert!(!old_file.exists(), "the stale tile file should be gone");
    assert!(dir.path().join("tiles").join("12_3491_1585.png").exists());

    // A second check right away is stopped by the interval gate.
    assert_eq!(
        engine.run_update_check().await,
        CheckOutcome::Skipped(SkipReason::IntervalNotElapsed)
    );
}
