//! `roam autoupdate` – read and write the persisted update settings.

use anyhow::{bail, Result};
use chrono::{Local, TimeZone};
use roam_core::autoupdate::{AutoUpdateSettings, UpdateInterval};
use roam_core::engine::MapEngine;

use crate::cli::AutoUpdateAction;

fn parse_interval(s: &str) -> Result<UpdateInterval> {
    match s {
        "daily" => Ok(UpdateInterval::Daily),
        "weekly" => Ok(UpdateInterval::Weekly),
        "monthly" => Ok(UpdateInterval::Monthly),
        "never" => Ok(UpdateInterval::Never),
        other => bail!("unknown interval {other:?} (daily, weekly, monthly or never)"),
    }
}

fn validate_time_of_day(s: &str) -> Result<()> {
    let valid = s
        .split_once(':')
        .and_then(|(h, m)| Some((h.parse::<u32>().ok()?, m.parse::<u32>().ok()?)))
        .is_some_and(|(h, m)| h < 24 && m < 60);
    if !valid {
        bail!("time of day must be \"HH:MM\", got {s:?}");
    }
    Ok(())
}

fn print_settings(s: &AutoUpdateSettings) {
    let last = if s.last_auto_check > 0 {
        Local
            .timestamp_millis_opt(s.last_auto_check)
            .single()
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string())
    } else {
        "never".to_string()
    };
    println!("enabled:     {}", s.enabled);
    println!("wifi only:   {}", s.wifi_only);
    println!("interval:    {}", s.update_interval.as_str());
    println!("time of day: {}", s.time_of_day);
    println!("last check:  {last}");
}

pub async fn run_autoupdate(engine: &MapEngine, action: AutoUpdateAction) -> Result<()> {
    match action {
        AutoUpdateAction::Show => {
            print_settings(&engine.auto_update_settings().await);
        }
        AutoUpdateAction::Set {
            enabled,
            wifi_only,
            interval,
            time_of_day,
        } => {
            let mut settings = engine.auto_update_settings().await;
            if let Some(enabled) = enabled {
                settings.enabled = enabled;
            }
            if let Some(wifi_only) = wifi_only {
                settings.wifi_only = wifi_only;
            }
            if let Some(interval) = interval.as_deref() {
                settings.update_interval = parse_interval(interval)?;
            }
            if let Some(time) = time_of_day {
                validate_time_of_day(&time)?;
                settings.time_of_day = time;
            }
            engine.set_auto_update_settings(settings.clone()).await;
            print_settings(&settings);
        }
    }
    Ok(())
}
