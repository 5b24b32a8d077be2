//! Decomposition of epoch-millisecond timestamps into time-dimension rows.

use crate::warehouse::TimeRecord;
use chrono::{DateTime, Datelike, Local, TimeZone, Timelike};
use std::fmt;

/// Format of the `start_time` key, second granularity.
pub const START_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// 0001-01-02T00:00:00Z and 9999-12-30T23:59:59Z. One day of slack on both
// sides keeps the local-time year within four digits for any UTC offset.
const MIN_EPOCH_MS: i64 = -62_135_510_400_000;
const MAX_EPOCH_MS: i64 = 253_402_214_399_000;

/// Decomposes `epoch_ms` in the host's local timezone.
pub fn decompose(epoch_ms: f64) -> TimeRecord {
    decompose_in(epoch_ms, &Local)
}

/// Decomposes `epoch_ms` in the given timezone.
///
/// Sub-second precision is dropped. Non-finite input is read as the epoch
/// and values outside years 0001..9999 are clamped, so this never fails.
pub fn decompose_in<Tz: TimeZone>(epoch_ms: f64, tz: &Tz) -> TimeRecord
where
    Tz::Offset: fmt::Display,
{
    let utc = DateTime::from_timestamp_millis(clamp_epoch_ms(epoch_ms)).unwrap_or_default();
    let local = utc.with_timezone(tz);

    TimeRecord {
        start_time: local.format(START_TIME_FORMAT).to_string(),
        hour: local.hour(),
        day: local.day(),
        week: local.iso_week().week(),
        month: local.month(),
        year: local.year(),
        weekday: local.weekday().num_days_from_monday(),
    }
}

fn clamp_epoch_ms(epoch_ms: f64) -> i64 {
    if !epoch_ms.is_finite() {
        return 0;
    }
    // Flooring keeps pre-epoch values in the second they belong to.
    (epoch_ms.floor() as i64).clamp(MIN_EPOCH_MS, MAX_EPOCH_MS)
}
