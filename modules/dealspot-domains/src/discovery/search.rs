use std::collections::{HashMap, HashSet};

use chrono::{Days, NaiveDate, NaiveDateTime};
use dealspot_common::{
    GeoPoint, ListingStatus, QueryLocation, Result, SearchQuery, SearchResult, SortStrategy,
};
use tokio::time::Instant;
use tracing::debug;
use uuid::Uuid;

use super::{sort_candidates, Candidate, CandidateCriteria, ListingFilter};
use crate::geo;
use crate::listings::{classify, time_left_hours};
use crate::service::{within, ListingService};

impl ListingService {
    /// Run a discovery query against the current wall clock.
    pub async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchResult>> {
        self.search_at(query, self.local_now()).await
    }

    /// Run a discovery query with `now` read once for the whole response.
    ///
    /// 1. Fetch today's or the upcoming window's occurrences
    /// 2. Apply the price-or-dietary refinement
    /// 3. Resolve the origin, geocoding free text if needed
    /// 4. Attach dietary tags
    /// 5. Rank by distance, apply the distance ceiling, sort
    /// 6. Project to results
    ///
    /// Any collaborator failure aborts the whole query.
    pub async fn search_at(
        &self,
        query: &SearchQuery,
        now: NaiveDateTime,
    ) -> Result<Vec<SearchResult>> {
        let deadline = self.query_deadline();
        let criteria = candidate_criteria(query, now.date(), self.config.future_window_days);

        let fetched = within(
            deadline,
            "listing store",
            self.store.fetch_candidates(&criteria),
        )
        .await?;
        let fetched_count = fetched.len();
        let mut candidates = select_candidates(fetched, query.future, now);

        let refinement = ListingFilter::refinement(query);
        if refinement.needs_dietary_tags() {
            self.attach_dietary_tags(&mut candidates, deadline).await?;
        }
        candidates = refinement.apply(candidates);

        let origin = self.resolve_origin(&query.location, deadline).await?;

        if !refinement.needs_dietary_tags() {
            self.attach_dietary_tags(&mut candidates, deadline).await?;
        }

        geo::rank(&mut candidates, origin, self.config.distance_unit);
        let refined_count = candidates.len();
        candidates = ListingFilter::DistanceCeiling(query.distance).apply(candidates);
        sort_candidates(&mut candidates, query.sort, now);

        debug!(
            fetched = fetched_count,
            refined = refined_count,
            returned = candidates.len(),
            future = query.future,
            sort = ?query.sort,
            "Search complete"
        );

        Ok(candidates.iter().map(|c| project(c, now)).collect())
    }

    /// A user's favorited listings, each at its next non-ended occurrence.
    pub async fn favorites(
        &self,
        user_id: Uuid,
        location: &QueryLocation,
        sort: SortStrategy,
    ) -> Result<Vec<SearchResult>> {
        self.favorites_at(user_id, location, sort, self.local_now())
            .await
    }

    pub async fn favorites_at(
        &self,
        user_id: Uuid,
        location: &QueryLocation,
        sort: SortStrategy,
        now: NaiveDateTime,
    ) -> Result<Vec<SearchResult>> {
        let deadline = self.query_deadline();
        let fetched = within(
            deadline,
            "listing store",
            self.store.fetch_favorites(user_id, now.date()),
        )
        .await?;

        let mut candidates: Vec<Candidate> = fetched
            .into_iter()
            .filter(|c| classify(&c.occurrence, now) != ListingStatus::Ended)
            .collect();
        candidates = first_per_listing(candidates);

        let origin = self.resolve_origin(location, deadline).await?;
        self.attach_dietary_tags(&mut candidates, deadline).await?;
        geo::rank(&mut candidates, origin, self.config.distance_unit);
        sort_candidates(&mut candidates, sort, now);

        Ok(candidates.iter().map(|c| project(c, now)).collect())
    }

    async fn resolve_origin(&self, location: &QueryLocation, deadline: Instant) -> Result<GeoPoint> {
        match location {
            QueryLocation::Coordinates(point) => Ok(*point),
            QueryLocation::Text(text) => {
                let point = within(deadline, "geocoder", self.geocoder.resolve(text)).await?;
                debug!(location = text.as_str(), lat = point.lat, lng = point.lng, "Resolved search origin");
                Ok(point)
            }
        }
    }

    /// Fetch each distinct listing's tags once and copy them onto every
    /// candidate of that listing.
    async fn attach_dietary_tags(&self, candidates: &mut [Candidate], deadline: Instant) -> Result<()> {
        let mut tags: HashMap<Uuid, Vec<String>> = HashMap::new();
        for candidate in candidates.iter_mut() {
            let id = candidate.listing_id();
            if !tags.contains_key(&id) {
                let fetched = within(
                    deadline,
                    "listing store",
                    self.store.fetch_dietary_tags(id),
                )
                .await?;
                tags.insert(id, fetched);
            }
            candidate.dietary_restrictions = tags.get(&id).cloned().unwrap_or_default();
        }
        Ok(())
    }
}

/// Dates a query covers: today only, or tomorrow through `window_days` ahead.
/// The window saturates at the last representable date.
pub fn candidate_criteria(query: &SearchQuery, today: NaiveDate, window_days: u32) -> CandidateCriteria {
    let (from, to) = if query.future {
        (
            today.checked_add_days(Days::new(1)).unwrap_or(NaiveDate::MAX),
            today
                .checked_add_days(Days::new(u64::from(window_days)))
                .unwrap_or(NaiveDate::MAX),
        )
    } else {
        (today, today)
    };

    CandidateCriteria {
        from,
        to,
        listing_type: query.listing_type,
        keywords: query
            .keywords
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(String::from),
    }
}

/// Narrow fetched rows to the query window. Today's occurrences must not have
/// ended yet; the upcoming window keeps one occurrence per listing.
pub fn select_candidates(fetched: Vec<Candidate>, future: bool, now: NaiveDateTime) -> Vec<Candidate> {
    let today = now.date();
    let selected: Vec<Candidate> = if future {
        fetched.into_iter().filter(|c| c.occurrence.date > today).collect()
    } else {
        fetched
            .into_iter()
            .filter(|c| c.occurrence.date == today)
            .filter(|c| classify(&c.occurrence, now) != ListingStatus::Ended)
            .collect()
    };
    first_per_listing(selected)
}

/// Keep the first candidate seen for each listing, preserving order.
fn first_per_listing(candidates: Vec<Candidate>) -> Vec<Candidate> {
    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter(|c| seen.insert(c.listing_id()))
        .collect()
}

pub fn project(candidate: &Candidate, now: NaiveDateTime) -> SearchResult {
    SearchResult {
        listing_id: candidate.listing.id,
        listing_type: candidate.listing.listing_type,
        title: candidate.listing.title.clone(),
        business_id: candidate.business.business_id,
        business_name: candidate.business.name.clone(),
        price: candidate.listing.new_price,
        old_price: candidate.listing.old_price,
        discount: candidate.listing.discount,
        dietary_restrictions: candidate.dietary_restrictions.clone(),
        time_left: time_left_hours(&candidate.occurrence, now),
        image_url: candidate.listing.image_url.clone(),
        distance: candidate.distance.unwrap_or_default(),
        date: candidate.occurrence.date,
    }
}
