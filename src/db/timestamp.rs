//! Timestamp formats used by the store and by presentation.

use chrono::NaiveDateTime;

/// Storage format: `yyyyMMddHHmmss`.
pub const DATABASE_FORMAT: &str = "%Y%m%d%H%M%S";
/// Entry display format: `HH:mm:ss dd/MM/yyyy`.
pub const ENTRY_FORMAT: &str = "%H:%M:%S %d/%m/%Y";
/// Photo/day display format: `dd.MM.yyyy`.
pub const DAY_FORMAT: &str = "%d.%m.%Y";

/// Shown in place of a date that cannot be parsed.
pub const UNKNOWN_DATE: &str = "--";

const DATE_KEY_LEN: usize = 8;

pub fn format_db(time: NaiveDateTime) -> String {
    time.format(DATABASE_FORMAT).to_string()
}

pub fn parse_db(stamp: &str) -> Result<NaiveDateTime, chrono::ParseError> {
    NaiveDateTime::parse_from_str(stamp, DATABASE_FORMAT)
}

/// The calendar-date prefix (`yyyyMMdd`) of a stored timestamp.
pub fn date_key(stamp: &str) -> &str {
    stamp.get(..DATE_KEY_LEN).unwrap_or(stamp)
}

pub fn display_entry(stamp: &str) -> String {
    display(stamp, ENTRY_FORMAT)
}

pub fn display_day(stamp: &str) -> String {
    display(stamp, DAY_FORMAT)
}

fn display(stamp: &str, format: &str) -> String {
    match parse_db(stamp) {
        Ok(time) => time.format(format).to_string(),
        Err(e) => {
            tracing::warn!(stamp, error = %e, "Unparseable timestamp");
            UNKNOWN_DATE.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_and_parse() {
        let time = parse_db("20240101103045").unwrap();
        assert_eq!(format_db(time), "20240101103045");
        assert!(parse_db("2024-01-01").is_err());
    }

    #[test]
    fn test_date_key() {
        assert_eq!(date_key("20240101103045"), "20240101");
        assert_eq!(date_key("2024"), "2024");
    }

    #[test]
    fn test_display_formats() {
        assert_eq!(display_entry("20240315080910"), "08:09:10 15/03/2024");
        assert_eq!(display_day("20240315080910"), "15.03.2024");
    }

    #[test]
    fn test_display_falls_back_on_garbage() {
        assert_eq!(display_entry("yesterday"), UNKNOWN_DATE);
        assert_eq!(display_day(""), UNKNOWN_DATE);
    }
}
