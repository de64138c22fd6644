//! Expansion of a listing definition into concrete calendar occurrences.
//!
//! A definition is one of three shapes:
//!
//! 1. Single day: the start date only.
//! 2. Multi-day: every day from the start date through the end date, inclusive.
//! 3. Weekly recurrence: the start date, then every later day strictly before the
//!    recurrence end date whose weekday is in the requested set.
//!
//! Multi-day takes precedence when a definition sets both flags.

use chrono::{Datelike, Duration, NaiveDate, NaiveTime};
use dealspot_common::dates::{parse_listing_date, parse_time_of_day, weekday_from_name};
use dealspot_common::{DealspotError, ListingDefinition, ListingOccurrence, Result};
use tracing::warn;
use uuid::Uuid;

/// Longest span a single definition may cover.
pub const MAX_SPAN_DAYS: i64 = 731;

/// Dates produced by expansion, all sharing one time-of-day window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expansion {
    pub dates: Vec<NaiveDate>,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

impl Expansion {
    pub fn for_listing(&self, listing_id: Uuid) -> Vec<ListingOccurrence> {
        self.dates
            .iter()
            .map(|&date| ListingOccurrence {
                listing_id,
                date,
                start_time: self.start_time,
                end_time: self.end_time,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}

/// Expand a definition into its ordered, non-empty set of occurrence dates.
pub fn expand(definition: &ListingDefinition) -> Result<Expansion> {
    let start = parse_listing_date("start_date", &definition.start_date)?;
    let start_time = parse_time_of_day("start_time", &definition.start_time)?;
    let end_time = parse_time_of_day("end_time", &definition.end_time)?;

    let mut dates = vec![start];

    if definition.multiple_days {
        if definition.recurring {
            warn!(
                title = definition.title.as_str(),
                "Listing sets both multiple_days and recurring; expanding as multi-day"
            );
        }
        let end = required_date("end_date", definition.end_date.as_deref())?;
        let days = span_days(start, end)?;
        dates.extend((1..=days).map(|i| start + Duration::days(i)));
    } else if definition.recurring {
        let end = required_date(
            "recurring_end_date",
            definition.recurring_end_date.as_deref(),
        )?;
        let weekdays = recurring_weekdays(&definition.recurring_days)?;
        let days = span_days(start, end)?;
        dates.extend(
            (1..days)
                .map(|i| start + Duration::days(i))
                .filter(|d| weekdays.contains(&d.weekday().num_days_from_sunday())),
        );
    }

    Ok(Expansion {
        dates,
        start_time,
        end_time,
    })
}

fn required_date(field: &str, value: Option<&str>) -> Result<NaiveDate> {
    match value {
        Some(v) if !v.trim().is_empty() => parse_listing_date(field, v),
        _ => Err(DealspotError::validation(format!("{field} is required"))),
    }
}

/// Whole days from `start` to `end`. An end before the start yields a negative
/// count, which expands to nothing beyond the start date.
fn span_days(start: NaiveDate, end: NaiveDate) -> Result<i64> {
    let days = (end - start).num_days();
    if days > MAX_SPAN_DAYS {
        return Err(DealspotError::validation(format!(
            "listing spans {days} days (max {MAX_SPAN_DAYS})"
        )));
    }
    Ok(days)
}

fn recurring_weekdays(names: &[String]) -> Result<Vec<u32>> {
    if names.is_empty() {
        return Err(DealspotError::validation(
            "recurring_days must name at least one weekday",
        ));
    }
    names
        .iter()
        .map(|name| {
            weekday_from_name(name).ok_or_else(|| {
                DealspotError::validation(format!(
                    "recurring_days: '{name}' is not a lowercase weekday name"
                ))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use dealspot_common::ListingType;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn definition(start_date: &str) -> ListingDefinition {
        ListingDefinition {
            business_id: Uuid::nil(),
            title: "Half-price wings".to_string(),
            description: String::new(),
            old_price: 12.0,
            new_price: 6.0,
            discount: 50.0,
            listing_type: ListingType::HappyHour,
            start_date: start_date.to_string(),
            start_time: "16:00".to_string(),
            end_time: "18:00".to_string(),
            multiple_days: false,
            end_date: None,
            recurring: false,
            recurring_days: Vec::new(),
            recurring_end_date: None,
            dietary_restrictions: Vec::new(),
            image_url: None,
        }
    }

    #[test]
    fn single_day_yields_one_occurrence() {
        let exp = expand(&definition("06/01/2024")).unwrap();
        assert_eq!(exp.dates, vec![ymd(2024, 6, 1)]);
        assert_eq!(exp.start_time, NaiveTime::from_hms_opt(16, 0, 0).unwrap());
        assert_eq!(exp.end_time, NaiveTime::from_hms_opt(18, 0, 0).unwrap());
    }

    #[test]
    fn multi_day_span_is_inclusive() {
        let mut def = definition("06/01/2024");
        def.multiple_days = true;
        def.end_date = Some("06/03/2024".to_string());

        let exp = expand(&def).unwrap();
        assert_eq!(exp.dates, vec![ymd(2024, 6, 1), ymd(2024, 6, 2), ymd(2024, 6, 3)]);
    }

    #[test]
    fn multi_day_spanning_n_days_yields_n_plus_one_consecutive_dates() {
        let mut def = definition("02/25/2024");
        def.multiple_days = true;
        def.end_date = Some("03/05/2024".to_string());

        let exp = expand(&def).unwrap();
        // 2024 is a leap year: Feb 25 → Mar 5 is 9 days.
        assert_eq!(exp.len(), 10);
        for pair in exp.dates.windows(2) {
            assert_eq!(pair[1] - pair[0], Duration::days(1));
        }
    }

    #[test]
    fn zero_day_span_yields_only_start() {
        let mut def = definition("06/01/2024");
        def.multiple_days = true;
        def.end_date = Some("06/01/2024".to_string());
        assert_eq!(expand(&def).unwrap().dates, vec![ymd(2024, 6, 1)]);
    }

    #[test]
    fn end_before_start_yields_only_start() {
        let mut def = definition("06/10/2024");
        def.multiple_days = true;
        def.end_date = Some("06/01/2024".to_string());
        assert_eq!(expand(&def).unwrap().dates, vec![ymd(2024, 6, 10)]);
    }

    #[test]
    fn weekly_recurrence_excludes_end_date() {
        let mut def = definition("06/03/2024");
        def.recurring = true;
        def.recurring_days = vec!["monday".to_string()];
        def.recurring_end_date = Some("06/17/2024".to_string());

        let exp = expand(&def).unwrap();
        assert_eq!(exp.dates, vec![ymd(2024, 6, 3), ymd(2024, 6, 10)]);
    }

    #[test]
    fn recurrence_only_emits_requested_weekdays_before_end() {
        let mut def = definition("06/03/2024");
        def.recurring = true;
        def.recurring_days = vec!["tuesday".to_string(), "friday".to_string()];
        def.recurring_end_date = Some("06/30/2024".to_string());
        let end = ymd(2024, 6, 30);

        let exp = expand(&def).unwrap();
        // Start date is always emitted; everything after it matches the set.
        assert_eq!(exp.dates[0], ymd(2024, 6, 3));
        for date in &exp.dates[1..] {
            let name = dealspot_common::dates::weekday_name(*date);
            assert!(name == "tuesday" || name == "friday", "{date} is a {name}");
            assert!(*date < end);
        }
        assert_eq!(exp.len(), 1 + 8);
    }

    #[test]
    fn multi_day_wins_over_recurrence() {
        let mut def = definition("06/03/2024");
        def.multiple_days = true;
        def.end_date = Some("06/04/2024".to_string());
        def.recurring = true;
        def.recurring_days = vec!["monday".to_string()];
        def.recurring_end_date = Some("07/01/2024".to_string());

        assert_eq!(expand(&def).unwrap().dates, vec![ymd(2024, 6, 3), ymd(2024, 6, 4)]);
    }

    #[test]
    fn weekday_names_are_case_sensitive() {
        let mut def = definition("06/03/2024");
        def.recurring = true;
        def.recurring_days = vec!["Monday".to_string()];
        def.recurring_end_date = Some("06/17/2024".to_string());
        assert!(matches!(expand(&def), Err(DealspotError::Validation(_))));
    }

    #[test]
    fn malformed_dates_are_validation_errors() {
        assert!(matches!(
            expand(&definition("2024-06-01")),
            Err(DealspotError::Validation(_))
        ));

        let mut def = definition("06/01/2024");
        def.multiple_days = true;
        def.end_date = None;
        assert!(matches!(expand(&def), Err(DealspotError::Validation(_))));
    }

    #[test]
    fn oversized_span_is_rejected() {
        let mut def = definition("01/01/2024");
        def.multiple_days = true;
        def.end_date = Some("01/01/2030".to_string());
        assert!(matches!(expand(&def), Err(DealspotError::Validation(_))));
    }

    #[test]
    fn occurrences_carry_listing_id() {
        let id = Uuid::new_v4();
        let occs = expand(&definition("06/01/2024")).unwrap().for_listing(id);
        assert_eq!(occs.len(), 1);
        assert_eq!(occs[0].listing_id, id);
        assert_eq!(occs[0].date, ymd(2024, 6, 1));
    }
}
