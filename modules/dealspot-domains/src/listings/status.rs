use chrono::NaiveDateTime;
use dealspot_common::{ListingOccurrence, ListingStatus};

/// Lifecycle state of one occurrence at `now`.
///
/// Active covers `[start, end)`; at the end instant the occurrence has ended.
pub fn classify(occurrence: &ListingOccurrence, now: NaiveDateTime) -> ListingStatus {
    if now >= occurrence.end_instant() {
        ListingStatus::Ended
    } else if now >= occurrence.start_instant() {
        ListingStatus::Active
    } else {
        ListingStatus::Scheduled
    }
}

/// Whole hours until the occurrence ends, truncated toward zero.
/// Negative once the occurrence has ended.
pub fn time_left_hours(occurrence: &ListingOccurrence, now: NaiveDateTime) -> i64 {
    (occurrence.end_instant() - now).num_hours()
}

/// Pick the single status a listing shows in owner views: the earliest active
/// occurrence, else the earliest scheduled one, else the most recent that ended.
pub fn representative_status(
    occurrences: &[ListingOccurrence],
    now: NaiveDateTime,
) -> Option<(ListingStatus, ListingOccurrence)> {
    let mut scheduled: Option<&ListingOccurrence> = None;
    let mut ended: Option<&ListingOccurrence> = None;

    for occ in occurrences {
        match classify(occ, now) {
            ListingStatus::Active => return Some((ListingStatus::Active, *occ)),
            ListingStatus::Scheduled => {
                if scheduled.map_or(true, |s| occ.start_instant() < s.start_instant()) {
                    scheduled = Some(occ);
                }
            }
            ListingStatus::Ended => {
                if ended.map_or(true, |e| occ.end_instant() > e.end_instant()) {
                    ended = Some(occ);
                }
            }
        }
    }

    scheduled
        .map(|o| (ListingStatus::Scheduled, *o))
        .or_else(|| ended.map(|o| (ListingStatus::Ended, *o)))
}
