//! Wall-clock and duration formatting

use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;

/// `HH:MM` (24-hour) of `instant` in `tz`.
pub fn format_local_time(instant: DateTime<Utc>, tz: Tz) -> String {
    instant.with_timezone(&tz).format("%H:%M").to_string()
}

/// `HH:MM - HH:MM` for a window, both ends rendered in `tz`.
pub fn format_window_range(start: DateTime<Utc>, end: DateTime<Utc>, tz: Tz) -> String {
    format!("{} - {}", format_local_time(start, tz), format_local_time(end, tz))
}

/// Calendar date of `now` as observed in `tz`.
pub fn local_date(now: DateTime<Utc>, tz: Tz) -> NaiveDate {
    now.with_timezone(&tz).date_naive()
}

/// Format a duration into a human-readable string
///
/// # Examples
///
/// ```
/// # #[cfg(feature = "foundation")]
/// # {
/// use std::time::Duration;
///
/// use greenwindow_common::time::format_duration;
///
/// assert_eq!(format_duration(Duration::from_secs(5)), "5s");
/// assert_eq!(format_duration(Duration::from_secs(675)), "11m 15s");
/// assert_eq!(format_duration(Duration::from_secs(1800)), "30m 0s");
/// # }
/// ```
pub fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs();
    if total_secs == 0 {
        return format!("{}ms", duration.as_millis());
    }

    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;

    match (hours, minutes) {
        (0, 0) => format!("{seconds}s"),
        (0, _) => format!("{minutes}m {seconds}s"),
        _ => format!("{hours}h {minutes}m {seconds}s"),
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn local_time_follows_dst() {
        let summer = Utc.with_ymd_and_hms(2024, 7, 1, 12, 0, 0).unwrap();
        let winter = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        assert_eq!(format_local_time(summer, chrono_tz::Europe::Amsterdam), "14:00");
        assert_eq!(format_local_time(winter, chrono_tz::Europe::Amsterdam), "13:00");
    }

    #[test]
    fn window_range_uses_24_hour_clock() {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 11, 5, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 5, 1, 14, 5, 0).unwrap();
        assert_eq!(format_window_range(start, end, chrono_tz::UTC), "11:05 - 14:05");
        assert_eq!(format_window_range(start, end, chrono_tz::Europe::Amsterdam), "13:05 - 16:05");
    }

    #[test]
    fn local_date_crosses_midnight() {
        let late_utc = Utc.with_ymd_and_hms(2024, 5, 1, 23, 30, 0).unwrap();
        assert_eq!(
            local_date(late_utc, chrono_tz::Europe::Amsterdam),
            NaiveDate::from_ymd_opt(2024, 5, 2).unwrap()
        );
        assert_eq!(local_date(late_utc, chrono_tz::UTC), NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
    }

    #[test]
    fn durations() {
        assert_eq!(format_duration(Duration::from_millis(250)), "250ms");
        assert_eq!(format_duration(Duration::from_secs(60)), "1m 0s");
        assert_eq!(format_duration(Duration::from_secs(3725)), "1h 2m 5s");
    }
}
