//! Single-tile HTTP GET and write to the tile store.

use std::fmt;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Result of a single tile fetch, classified for failure accounting.
pub(super) type TileResult = Result<(), TileError>;

/// Error from one tile fetch (curl failure, HTTP error, or disk write).
#[derive(Debug)]
pub enum TileError {
    /// Curl reported an error (timeout, connection, etc.).
    Curl(curl::Error),
    /// HTTP response had a non-2xx status.
    Http(u32),
    /// Disk write failed (e.g. disk full, permission denied).
    Storage(std::io::Error),
}

impl fmt::Display for TileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TileError::Curl(e) => write!(f, "{}", e),
            TileError::Http(code) => write!(f, "HTTP {}", code),
            TileError::Storage(e) => write!(f, "storage: {}", e),
        }
    }
}

impl std::error::Error for TileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TileError::Curl(e) => Some(e),
            TileError::Storage(e) => Some(e),
            TileError::Http(_) => None,
        }
    }
}

/// Downloads one tile and writes it to `path`. Blocking; callers run it on
/// the blocking pool. The body is buffered and only written after the
/// status check, so an error page never lands on disk as a tile.
pub(super) fn fetch_tile(url: &str, path: &Path) -> TileResult {
    let body: Arc<Mutex<Vec<u8>>> = Arc::new(Mutex::new(Vec::new()));
    let body_cb = Arc::clone(&body);

    let mut easy = curl::easy::Easy::new();
    easy.url(url).map_err(TileError::Curl)?;
    easy.follow_location(true).map_err(TileError::Curl)?;
    easy.connect_timeout(Duration::from_secs(30))
        .map_err(TileError::Curl)?;
    // Tiles are small; a stuck transfer fails fast instead of pinning its
    // batch slot.
    easy.timeout(Duration::from_secs(60))
        .map_err(TileError::Curl)?;
    // Public tile servers reject requests without an identifying agent.
    easy.useragent(concat!("roam/", env!("CARGO_PKG_VERSION")))
        .map_err(TileError::Curl)?;

    {
        let mut transfer = easy.transfer();
        transfer
            .write_function(move |data| {
                body_cb.lock().unwrap().extend_from_slice(data);
                Ok(data.len())
            })
            .map_err(TileError::Curl)?;
        transfer.perform().map_err(TileError::Curl)?;
    }

    let code = easy.response_code().map_err(TileError::Curl)?;
    if code < 200 || code >= 300 {
        return Err(TileError::Http(code));
    }

    let data = std::mem::take(&mut *body.lock().unwrap());
    std::fs::write(path, &data).map_err(TileError::Storage)?;
    Ok(())
}
