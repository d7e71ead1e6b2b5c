//! Timestamp utilities
//!
//! Wall-clock timestamps (`chrono`) stamp events; playback math runs on
//! monotonic seconds expressed as `f64`.

use chrono::{DateTime, Utc};
use std::time::Duration;

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Convert a duration to fractional seconds
pub fn duration_to_secs(duration: Duration) -> f64 {
    duration.as_secs_f64()
}

/// Convert fractional seconds to a duration
///
/// Negative, NaN and infinite inputs collapse to zero; values too large for
/// a `Duration` saturate at `Duration::MAX`.
pub fn secs_to_duration(secs: f64) -> Duration {
    if secs.is_finite() && secs > 0.0 {
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    } else {
        Duration::ZERO
    }
}

/// Convert milliseconds to duration
pub fn millis_to_duration(millis: u64) -> Duration {
    Duration::from_millis(millis)
}
