//! Persisted auto-update settings.
//!
//! Stored as one JSON object under the auto-update key; the camelCase
//! spellings are shared with the host application. Defaults are
//! conservative: disabled, wifi-only, weekly at 03:00.

use serde::{Deserialize, Serialize};

/// How often a passing check may actually run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateInterval {
    Daily,
    Weekly,
    Monthly,
    Never,
}

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

impl UpdateInterval {
    pub fn as_str(self) -> &'static str {
        match self {
            UpdateInterval::Daily => "daily",
            UpdateInterval::Weekly => "weekly",
            UpdateInterval::Monthly => "monthly",
            UpdateInterval::Never => "never",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "daily" => UpdateInterval::Daily,
            "weekly" => UpdateInterval::Weekly,
            "monthly" => UpdateInterval::Monthly,
            _ => UpdateInterval::Never,
        }
    }

    /// Minimum milliseconds between runs; `None` means the interval gate
    /// never passes.
    pub fn interval_ms(self) -> Option<i64> {
        match self {
            UpdateInterval::Daily => Some(DAY_MS),
            UpdateInterval::Weekly => Some(7 * DAY_MS),
            UpdateInterval::Monthly => Some(30 * DAY_MS),
            UpdateInterval::Never => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoUpdateSettings {
    pub enabled: bool,
    pub wifi_only: bool,
    pub update_interval: UpdateInterval,
    /// Preferred local check time as `"HH:MM"`.
    pub time_of_day: String,
    /// Unix milliseconds of the last check that passed every gate.
    pub last_auto_check: i64,
}

impl Default for AutoUpdateSettings {
    fn default() -> Self {
        AutoUpdateSettings {
            enabled: false,
            wifi_only: true,
            update_interval: UpdateInterval::Weekly,
            time_of_day: "03:00".to_string(),
            last_auto_check: 0,
        }
    }
}

/// Fallback target when `time_of_day` cannot be parsed (03:00).
const DEFAULT_MINUTE: u32 = 3 * 60;

/// Parse `"HH:MM"` into minutes after midnight. Malformed strings log and
/// fall back to 03:00 so a bad persisted value never wedges the daemon.
pub(crate) fn parse_minute_of_day(s: &str) -> u32 {
    let parsed = s.split_once(':').and_then(|(h, m)| {
        let h: u32 = h.parse().ok()?;
        let m: u32 = m.parse().ok()?;
        (h < 24 && m < 60).then_some(h * 60 + m)
    });
    match parsed {
        Some(minute) => minute,
        None => {
            tracing::warn!(time_of_day = s, "unparsable check time, using 03:00");
            DEFAULT_MINUTE
        }
    }
}

/// True when `now_minute` is within 30 minutes of `target_minute` on the
/// wrapped 24-hour clock, so a window around midnight spans both days.
pub(crate) fn within_window(now_minute: u32, target_minute: u32) -> bool {
    const DAY: i64 = 24 * 60;
    let diff = (now_minute as i64 - target_minute as i64).abs();
    diff.min(DAY - diff) <= 30
}
