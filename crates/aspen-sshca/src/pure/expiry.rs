//! Tidy eligibility.

use std::time::Duration;

use chrono::DateTime;
use chrono::Utc;

/// Whether a record that expired at `valid_before` may be pruned at `now`.
///
/// True only once `valid_before` lies strictly before `now - safety_buffer`.
#[inline]
pub fn is_past_safety_buffer(valid_before: DateTime<Utc>, now: DateTime<Utc>, safety_buffer: Duration) -> bool {
    let buffer_ms = i64::try_from(safety_buffer.as_millis()).unwrap_or(i64::MAX);
    let cutoff_ms = now.timestamp_millis().saturating_sub(buffer_ms);
    valid_before.timestamp_millis() < cutoff_ms
}
