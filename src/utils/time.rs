use chrono::{DateTime, Local, TimeZone, Utc};
use std::time::{SystemTime, UNIX_EPOCH};

pub const NANOS_PER_MILLI: i64 = 1_000_000;
pub const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// Current wall-clock time in the gateway's timestamp domain (ns since epoch)
pub fn current_timestamp_nanos() -> i64 {
    millis_to_nanos(current_timestamp_millis())
}

pub fn current_timestamp_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

pub fn millis_to_nanos(millis: i64) -> i64 {
    millis.saturating_mul(NANOS_PER_MILLI)
}

fn local_datetime(nanos: i64) -> DateTime<Local> {
    let utc = Utc.timestamp_nanos(nanos);
    utc.with_timezone(&Local)
}

/// "Mar 4, 2025"
pub fn format_date(nanos: i64) -> String {
    local_datetime(nanos).format("%b %-d, %Y").to_string()
}

/// "09:30 AM"
pub fn format_time(nanos: i64) -> String {
    local_datetime(nanos).format("%I:%M %p").to_string()
}

/// "Mar 4, 2025 - Mar 4, 2025, 09:00 AM - 10:00 AM"
pub fn format_window(start: i64, end: i64) -> String {
    format!(
        "{} - {}, {} - {}",
        format_date(start),
        format_date(end),
        format_time(start),
        format_time(end)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_timestamp_nanos() {
        let ts = current_timestamp_nanos();
        // After 2020-01-01 and before 2100-01-01
        assert!(ts > 1_577_836_800 * NANOS_PER_SECOND);
        assert!(ts < 4_102_444_800 * NANOS_PER_SECOND);
    }

    #[test]
    fn test_millis_to_nanos_saturates() {
        assert_eq!(millis_to_nanos(1_500), 1_500_000_000);
        assert_eq!(millis_to_nanos(i64::MAX), i64::MAX);
    }

    #[test]
    fn test_format_date_shape() {
        let formatted = format_date(current_timestamp_nanos());
        // "Mon D, YYYY"
        assert!(formatted.contains(", "));
        assert_eq!(formatted.split(' ').count(), 3);
    }

    #[test]
    fn test_format_time_shape() {
        let formatted = format_time(current_timestamp_nanos());
        assert!(formatted.ends_with("AM") || formatted.ends_with("PM"));
        assert_eq!(formatted.len(), 8);
    }
}
