//! Timestamp utilities
//!
//! Domain times are epoch seconds as `f64`, matching the waveform data model.

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Current time as epoch seconds
pub fn now_epoch_secs() -> f64 {
    let now = now();
    now.timestamp() as f64 + f64::from(now.timestamp_subsec_millis()) / 1000.0
}

/// Convert epoch seconds to an ISO-8601 string with millisecond precision
///
/// `None` (and out-of-range values) normalize to the epoch, so hashing a channel
/// without an effective time is still deterministic.
pub fn to_osd_time(epoch_secs: Option<f64>) -> String {
    let millis = epoch_secs.map(|s| (s * 1000.0).round() as i64).unwrap_or(0);
    let instant = Utc
        .timestamp_millis_opt(millis)
        .single()
        .unwrap_or_default();
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}
