//! SQLite-backed durable key-value store.
//!
//! All engine persistence (region registry, tile lists, auto-update
//! settings, snapshot catalog) goes through this store as JSON strings
//! under well-known keys. Reads of corrupt values are treated as absent
//! data; write failures are logged by the typed helpers and never panic,
//! leaving the in-memory state authoritative.

use anyhow::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Row, Sqlite};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

/// Registry of all persisted regions (JSON array of region records).
pub const REGIONS_KEY: &str = "offline_map_regions";

/// Persisted auto-update settings singleton.
pub const AUTO_UPDATE_KEY: &str = "offline_map_autoupdate";

/// Serialized current map-graph snapshot blob.
pub const MAP_DATA_KEY: &str = "@navigation_app/map_data";

/// Info record describing the current snapshot.
pub const MAP_INFO_KEY: &str = "@navigation_app/map_info";

/// Catalog of all named snapshots (JSON object, name -> info).
pub const MAP_CACHE_LIST_KEY: &str = "@navigation_app/map_cache_list";

/// Key of the persisted tile list for one region.
pub fn region_tiles_key(region_id: &str) -> String {
    format!("offline_map_tiles_{region_id}")
}

/// Percent-encode a path for use in a sqlite:// URI so spaces and special chars don't break parsing.
fn path_to_sqlite_uri(path: &Path) -> String {
    let s = path.to_string_lossy();
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '%' => out.push_str("%25"),
            ' ' => out.push_str("%20"),
            '#' => out.push_str("%23"),
            '?' => out.push_str("%3F"),
            '&' => out.push_str("%26"),
            c => out.push(c),
        }
    }
    format!("sqlite://{}", out)
}

/// Handle to the SQLite-backed key-value store.
///
/// The database file lives under the XDG state directory,
/// `~/.local/state/roam/engine.db`, unless opened at an explicit path.
#[derive(Clone)]
pub struct KvStore {
    pool: Pool<Sqlite>,
}

impl KvStore {
    /// Open (or create) the default store and run migrations.
    pub async fn open_default() -> Result<Self> {
        let xdg_dirs = xdg::BaseDirectories::with_prefix("roam")?;
        let state_dir = xdg_dirs.get_state_home();
        let db_path = state_dir.join("engine.db");

        tokio::fs::create_dir_all(&state_dir).await?;

        let uri = path_to_sqlite_uri(&db_path) + "?mode=rwc";
        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .connect(&uri)
            .await?;

        let store = KvStore { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Open (or create) a store at a specific path. Creates parent dirs if
    /// needed; intended for tests and embedding.
    pub async fn open_at(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let uri = path_to_sqlite_uri(path) + "?mode=rwc";
        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .connect(&uri)
            .await?;
        let store = KvStore { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Raw read of one key.
    pub async fn get_raw(&self, key: &str) -> Result<Option<String>> {
        let row = sqlx::query(r#"SELECT value FROM kv WHERE key = ?1"#)
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.get::<String, _>("value")))
    }

    /// Raw upsert of one key.
    pub async fn put_raw(&self, key: &str, value: &str) -> Result<()> {
        let now = now_ms();
        sqlx::query(
            r#"
            INSERT INTO kv (key, value, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Remove one key. Missing keys are not an error.
    pub async fn remove(&self, key: &str) -> Result<()> {
        sqlx::query(r#"DELETE FROM kv WHERE key = ?1"#)
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Typed read. Absent keys, read failures, and corrupt JSON all come
    /// back as `None`; the latter two are logged.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.get_raw(key).await {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::warn!(key, "kv read failed: {e:#}");
                return None;
            }
        };
        match serde_json::from_str::<T>(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(key, "corrupt kv value treated as absent: {e}");
                None
            }
        }
    }

    /// Typed write. Failures are logged, not propagated; returns whether
    /// the value reached the store.
    pub async fn put<T: Serialize>(&self, key: &str, value: &T) -> bool {
        let json = match serde_json::to_string(value) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!(key, "kv serialize failed: {e}");
                return false;
            }
        };
        match self.put_raw(key, &json).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(key, "kv write failed: {e:#}");
                false
            }
        }
    }
}

/// Current time as unix milliseconds; the persisted records carry
/// `Date.now()`-shaped timestamps.
pub fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

#[cfg(test)]
/// Open an in-memory store for tests (no disk I/O).
pub(crate) async fn open_memory() -> Result<KvStore> {
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;
    let store = KvStore { pool };
    store.migrate().await?;
    Ok(store)
}
