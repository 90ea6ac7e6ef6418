//! Cache capacity accounting.
//!
//! Sizes are the caller-supplied estimates carried on each record; bytes on
//! disk are never measured or reconciled. The quota gate runs before a
//! request touches the registry, so a rejected request leaves no trace.

use crate::error::EngineError;
use crate::registry::{RegionRegistry, RegionStatus};

/// Megabytes currently counted against the quota: every record that holds
/// tiles on disk (`available`) or still holds them while awaiting a refresh
/// (`outdated`). Downloading and errored records do not count.
pub fn total_cache_mb(registry: &RegionRegistry) -> f64 {
    registry
        .iter()
        .filter(|r| matches!(r.status, RegionStatus::Available | RegionStatus::Outdated))
        .map(|r| r.size_mb)
        .sum()
}

/// Reject a request that would push the cache past the configured limit.
pub fn ensure_quota(
    registry: &RegionRegistry,
    max_cache_mb: f64,
    requested_mb: f64,
) -> Result<(), EngineError> {
    let current_mb = total_cache_mb(registry);
    if current_mb + requested_mb > max_cache_mb {
        return Err(EngineError::QuotaExceeded {
            limit_mb: max_cache_mb,
            current_mb,
            requested_mb,
        });
    }
    Ok(())
}
