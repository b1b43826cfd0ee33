//! Date and time parsing for Chinese invoices and tickets.

use chrono::{NaiveDate, NaiveTime};

use super::patterns::{DATE_CN, DATE_ISO, TIME_OF_DAY};

/// Parse `YYYY年MM月DD日`, falling back to `YYYY-MM-DD` (also `/` and `.`).
///
/// Returns `None` for text without a date or with an impossible one
/// (`2024年02月30日`).
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let caps = DATE_CN.captures(s).or_else(|| DATE_ISO.captures(s))?;

    let year: i32 = caps[1].parse().ok()?;
    let month: u32 = caps[2].parse().ok()?;
    let day: u32 = caps[3].parse().ok()?;

    NaiveDate::from_ymd_opt(year, month, day)
}

/// Parse `HH:MM`, ignoring a trailing `开` (departure marker).
pub fn parse_time(s: &str) -> Option<NaiveTime> {
    let caps = TIME_OF_DAY.captures(s)?;

    let hour: u32 = caps[1].parse().ok()?;
    let minute: u32 = caps[2].parse().ok()?;

    NaiveTime::from_hms_opt(hour, minute, 0)
}
