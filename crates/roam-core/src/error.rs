//! Engine error taxonomy.
//!
//! Region-level failures land here and in the region record's `error`
//! status; tile-level failures are absorbed into the batch failure counter
//! and never surface individually.

use thiserror::Error;

/// Errors surfaced across the engine's public boundary.
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    /// A download request used an id that is already mid-download.
    #[error("region {id} is already downloading")]
    AlreadyDownloading { id: String },

    /// Accepting the request would push the cache over its quota.
    /// Sizes are the caller-estimated megabytes used for admission.
    #[error("Quota exceeded: limit {limit_mb} MB, current {current_mb} MB, requested {requested_mb} MB")]
    QuotaExceeded {
        limit_mb: f64,
        current_mb: f64,
        requested_mb: f64,
    },

    /// The region download did not finish within the hard timeout; the
    /// record has been forced to `error`.
    #[error("Timeout: region {id} did not complete within {timeout_secs}s")]
    Timeout { id: String, timeout_secs: u64 },

    /// Too many tiles failed (ratio above 20%); the region is in `error`.
    #[error("Download failed: {failed}/{total} tiles")]
    DownloadFailed { failed: usize, total: usize },

    /// The region was deleted while still queued, so its download never ran.
    #[error("region {id} was deleted before its download started")]
    RegionDeleted { id: String },

    /// Durable store could not be opened or written at a point where the
    /// engine cannot continue (construction only; routine persistence
    /// failures are logged instead).
    #[error("storage: {0}")]
    Storage(String),

    /// Engine configuration rejected at load/validation time.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
