//! Wall-clock helpers.
//!
//! Every stateful operation in this crate takes the current time as an
//! epoch-millisecond argument instead of reading the clock itself, so tests
//! control time. `now_ms()` is what hosts pass in.

use chrono::{DateTime, Utc};

/// Current wall-clock time in milliseconds since the Unix epoch.
pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Convert an epoch-millisecond instant to a `DateTime<Utc>` for event
/// payloads. Out-of-range values collapse to the epoch.
pub fn datetime(epoch_ms: u64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(epoch_ms as i64).unwrap_or_default()
}

/// Calendar date (`YYYY-MM-DD`, UTC) of an instant. Used for the daily
/// reset comparisons throughout the crate.
pub fn date_str(epoch_ms: u64) -> String {
    datetime(epoch_ms).date_naive().to_string()
}

/// True when two instants fall on the same UTC calendar day.
pub fn same_day(a_ms: u64, b_ms: u64) -> bool {
    datetime(a_ms).date_naive() == datetime(b_ms).date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;

    // 2024-01-15T12:00:00Z
    const NOON: u64 = 1_705_320_000_000;

    #[test]
    fn date_str_is_calendar_day() {
        assert_eq!(date_str(NOON), "2024-01-15");
    }

    #[test]
    fn same_day_boundaries() {
        let late = NOON + 11 * 60 * 60 * 1000; // 23:00 same day
        let next = NOON + 13 * 60 * 60 * 1000; // 01:00 next day
        assert!(same_day(NOON, late));
        assert!(!same_day(NOON, next));
    }
}
