//! Timestamp display helpers.

use chrono::{DateTime, Utc};

/// Format a message timestamp for display next to the bubble (24-hour
/// `HH:MM`, UTC).
pub fn format_message_time(ts: DateTime<Utc>) -> String {
    ts.format("%H:%M").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn formats_as_hours_and_minutes() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 33).unwrap();
        assert_eq!(format_message_time(ts), "14:05");
    }
}
