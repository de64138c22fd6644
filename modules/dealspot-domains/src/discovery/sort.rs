//! Sort engine. Every strategy is a stable ascending sort, so equal keys keep
//! the order the store returned them in.

use std::cmp::Ordering;

use chrono::NaiveDateTime;
use dealspot_common::SortStrategy;

use super::Candidate;
use crate::listings::time_left_hours;

pub fn sort_candidates(candidates: &mut [Candidate], strategy: SortStrategy, now: NaiveDateTime) {
    match strategy {
        SortStrategy::Distance => candidates.sort_by(|a, b| {
            cmp_distance(a.distance, b.distance).then_with(|| a.listing_id().cmp(&b.listing_id()))
        }),
        SortStrategy::Price => candidates.sort_by(|a, b| a.price().total_cmp(&b.price())),
        SortStrategy::TimeLeft => candidates.sort_by_key(|c| time_left_hours(&c.occurrence, now)),
        SortStrategy::DateAdded => candidates.sort_by_key(|c| c.listing.created_at),
    }
}

/// Unranked candidates sort after ranked ones.
fn cmp_distance(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
