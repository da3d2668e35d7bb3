//! Time utilities: lenient ISO parsing and default-window construction.

use anyhow::Result;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::event::TimeInterval;

/// Parse an ISO-8601 timestamp, accepting both offset-carrying strings
/// ("2024-01-01T18:00:00-05:00", trailing "Z") and naive ones
/// ("2024-01-01T18:00:00"), interpreting naive times in `tz`.
///
/// The model is prompted for exact ISO times but tends to omit offsets, so
/// commit-time parsing has to take both.
pub fn parse_iso_lenient(s: &str, tz: Tz) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    let ndt = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M"))
        .map_err(|e| anyhow::anyhow!("invalid ISO timestamp '{s}': {e}"))?;

    tz.from_local_datetime(&ndt)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| anyhow::anyhow!("ambiguous or invalid local time (DST?): {s} {tz}"))
}

/// Single free window on `date_iso` from `start_hour`:00 to `end_hour`:00
/// local time. Used when an optimize request supplies no windows.
pub fn default_free_window(date_iso: &str, start_hour: u32, end_hour: u32, tz: Tz) -> Result<TimeInterval> {
    let date = NaiveDate::parse_from_str(date_iso, "%Y-%m-%d")
        .map_err(|e| anyhow::anyhow!("invalid ISO date '{date_iso}': {e}"))?;

    let start = date
        .and_hms_opt(start_hour, 0, 0)
        .ok_or_else(|| anyhow::anyhow!("invalid start hour {start_hour}"))?;
    let end = date
        .and_hms_opt(end_hour, 0, 0)
        .ok_or_else(|| anyhow::anyhow!("invalid end hour {end_hour}"))?;

    let localize = |ndt| {
        tz.from_local_datetime(&ndt)
            .single()
            .map(|dt: DateTime<Tz>| dt.with_timezone(&Utc))
            .ok_or_else(|| anyhow::anyhow!("ambiguous local time on {date_iso} (DST?)"))
    };

    Ok(TimeInterval::new(localize(start)?, localize(end)?))
}

/// Today's date in `tz`, as an ISO date string.
pub fn today_iso(tz: Tz) -> String {
    Utc::now().with_timezone(&tz).date_naive().to_string()
}
