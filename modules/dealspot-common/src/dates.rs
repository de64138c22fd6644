//! Parsing for the date and time-of-day strings listings are authored with.

use chrono::{Datelike, NaiveDate, NaiveTime};

use crate::error::{DealspotError, Result};

/// Authored listing date format, e.g. `06/01/2024`.
pub const LISTING_DATE_FORMAT: &str = "%m/%d/%Y";

const TIME_FORMATS: &[&str] = &["%H:%M", "%H:%M:%S", "%I:%M %p", "%I:%M%p"];

/// Weekday name table, indexed by days from Sunday.
pub const WEEKDAY_NAMES: [&str; 7] = [
    "sunday",
    "monday",
    "tuesday",
    "wednesday",
    "thursday",
    "friday",
    "saturday",
];

/// Parse an `MM/DD/YYYY` date. `field` names the input for the error message.
pub fn parse_listing_date(field: &str, value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), LISTING_DATE_FORMAT).map_err(|e| {
        DealspotError::validation(format!(
            "{field}: expected MM/DD/YYYY, got '{value}' ({e})"
        ))
    })
}

pub fn format_listing_date(date: NaiveDate) -> String {
    date.format(LISTING_DATE_FORMAT).to_string()
}

/// Parse a time of day: `HH:MM`, `HH:MM:SS`, or `h:MM AM/PM`.
pub fn parse_time_of_day(field: &str, value: &str) -> Result<NaiveTime> {
    let trimmed = value.trim();
    TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(trimmed, fmt).ok())
        .ok_or_else(|| {
            DealspotError::validation(format!("{field}: unrecognized time of day '{value}'"))
        })
}

/// Ordinal for a lowercase weekday name (`sunday` = 0 … `saturday` = 6).
/// Case-sensitive: `Monday` is not a weekday name.
pub fn weekday_from_name(name: &str) -> Option<u32> {
    WEEKDAY_NAMES
        .iter()
        .position(|n| *n == name)
        .map(|i| i as u32)
}

pub fn weekday_name(date: NaiveDate) -> &'static str {
    WEEKDAY_NAMES[date.weekday().num_days_from_sunday() as usize]
}
