//! TMS timestamp formatting.
//!
//! Source appointment windows arrive as `MM/DD/YY HH:MM`. The TMS expects
//! `YYYYMMDDHHMMSS` followed by a UTC offset. No timezone is inferred: every
//! timestamp carries the fixed `-0700` suffix, which ground-truth records also
//! assume.

use chrono::{Local, NaiveDateTime};

/// Input format of extraction appointment windows
pub const EXTRACTION_FORMAT: &str = "%m/%d/%y %H:%M";

/// Offset suffix appended to every TMS timestamp
pub const TMS_OFFSET: &str = "-0700";

const TMS_FORMAT: &str = "%Y%m%d%H%M%S";

/// Convert an `MM/DD/YY HH:MM` string into a TMS timestamp.
///
/// Returns an empty string for missing input or when parsing fails.
pub fn format_timestamp(timestamp: Option<&str>) -> String {
    let Some(raw) = timestamp.filter(|s| !s.is_empty()) else {
        return String::new();
    };

    match NaiveDateTime::parse_from_str(raw, EXTRACTION_FORMAT) {
        Ok(dt) => format!("{}{}", dt.format(TMS_FORMAT), TMS_OFFSET),
        Err(_) => String::new(),
    }
}

/// Current local wall-clock time as a TMS timestamp.
pub fn now_timestamp() -> String {
    format!("{}{}", Local::now().format(TMS_FORMAT), TMS_OFFSET)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(Some("12/03/24 06:00")), "20241203060000-0700");
        assert_eq!(format_timestamp(Some("01/15/25 23:45")), "20250115234500-0700");
    }

    #[test]
    fn test_missing_timestamp() {
        assert_eq!(format_timestamp(None), "");
        assert_eq!(format_timestamp(Some("")), "");
    }

    #[test]
    fn test_unparseable_timestamp() {
        assert_eq!(format_timestamp(Some("2024-12-03 06:00")), "");
        assert_eq!(format_timestamp(Some("12/03/24")), "");
        assert_eq!(format_timestamp(Some("13/40/24 06:00")), "");
    }

    #[test]
    fn test_now_timestamp_shape() {
        let ts = now_timestamp();
        assert_eq!(ts.len(), 19);
        assert!(ts.ends_with("-0700"));
        assert!(ts[..14].chars().all(|c| c.is_ascii_digit()));
    }
}
