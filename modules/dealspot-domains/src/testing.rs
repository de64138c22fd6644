// Test mocks for the listing engine.
//
// Three mocks matching the three trait boundaries:
// - MockListingStore (ListingStore): stateful in-memory listings/occurrences/favorites
// - MockBusinessLookup (BusinessLookup): HashMap-based id→business
// - MockGeocoder (GeocodingClient): HashMap-based address→point
//
// Plus helpers for constructing definitions and candidates.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use uuid::Uuid;

use dealspot_common::{
    BusinessLocation, DealspotError, GeoPoint, ListingDefinition, ListingOccurrence,
    ListingRecord, ListingType, Result,
};

use crate::discovery::{Candidate, CandidateCriteria, ListingSummary};
use crate::listings::Expansion;
use crate::traits::{BusinessLookup, GeocodingClient, ListingStore};

// ---------------------------------------------------------------------------
// Test constants
// ---------------------------------------------------------------------------

/// Minneapolis, MN coordinates.
pub const MINNEAPOLIS: GeoPoint = GeoPoint { lat: 44.9778, lng: -93.2650 };
/// St. Paul, MN coordinates.
pub const ST_PAUL: GeoPoint = GeoPoint { lat: 44.9537, lng: -93.0900 };
/// Duluth, MN coordinates.
pub const DULUTH: GeoPoint = GeoPoint { lat: 46.7867, lng: -92.1005 };

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

/// A valid single-day happy hour on 06/03/2024, 16:00–18:00.
pub fn sample_definition() -> ListingDefinition {
    ListingDefinition {
        business_id: Uuid::nil(),
        title: "Half-price wings".to_string(),
        description: "All wings half off at the bar".to_string(),
        old_price: 12.0,
        new_price: 6.0,
        discount: 50.0,
        listing_type: ListingType::HappyHour,
        start_date: "06/03/2024".to_string(),
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

pub fn business(name: &str, location: GeoPoint) -> BusinessLocation {
    BusinessLocation {
        business_id: Uuid::new_v4(),
        name: name.to_string(),
        location,
    }
}

/// A standalone candidate for pure pipeline tests.
pub fn candidate(title: &str, price: f64) -> Candidate {
    let id = Uuid::new_v4();
    Candidate {
        occurrence: ListingOccurrence {
            listing_id: id,
            date: NaiveDate::from_ymd_opt(2024, 6, 3).unwrap_or_default(),
            start_time: NaiveTime::from_hms_opt(16, 0, 0).unwrap_or_default(),
            end_time: NaiveTime::from_hms_opt(18, 0, 0).unwrap_or_default(),
        },
        listing: ListingSummary {
            id,
            listing_type: ListingType::HappyHour,
            title: title.to_string(),
            description: String::new(),
            old_price: price * 2.0,
            new_price: price,
            discount: 50.0,
            image_url: None,
            created_at: Utc::now(),
        },
        business: business("Test Bar", MINNEAPOLIS),
        dietary_restrictions: Vec::new(),
        distance: None,
    }
}

// ---------------------------------------------------------------------------
// MockListingStore
// ---------------------------------------------------------------------------

#[derive(Default)]
struct StoreState {
    businesses: HashMap<Uuid, BusinessLocation>,
    listings: Vec<ListingRecord>,
    occurrences: HashMap<Uuid, Vec<ListingOccurrence>>,
    favorites: Vec<(Uuid, Uuid)>,
    failing: HashSet<&'static str>,
    calls: Vec<&'static str>,
}

/// In-memory listing store. Listings get creation timestamps one minute apart
/// so `dateAdded` ordering is deterministic. Builder pattern:
/// `.with_business()`, `.failing()`.
#[derive(Default)]
pub struct MockListingStore {
    state: Mutex<StoreState>,
}

impl MockListingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make a business available to candidate joins.
    pub fn with_business(self, business: BusinessLocation) -> Self {
        self.lock().businesses.insert(business.business_id, business);
        self
    }

    /// Fail every call to the named operation with a storage error.
    /// `"insert_occurrences"` fails the occurrence step inside
    /// `create_listing`/`replace_listing`; neither then writes anything.
    pub fn failing(self, op: &'static str) -> Self {
        self.lock().failing.insert(op);
        self
    }

    /// Start failing the named operation on an already-shared store.
    pub fn fail(&self, op: &'static str) {
        self.lock().failing.insert(op);
    }

    /// Operation names in call order.
    pub fn calls(&self) -> Vec<&'static str> {
        self.lock().calls.clone()
    }

    pub fn call_count(&self, op: &str) -> usize {
        self.lock().calls.iter().filter(|c| **c == op).count()
    }

    pub fn occurrences_of(&self, listing_id: Uuid) -> Vec<ListingOccurrence> {
        self.lock()
            .occurrences
            .get(&listing_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn listing_count(&self) -> usize {
        self.lock().listings.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn enter(&self, op: &'static str) -> Result<std::sync::MutexGuard<'_, StoreState>> {
        let mut state = self.lock();
        state.calls.push(op);
        if state.failing.contains(op) {
            return Err(DealspotError::storage(format!("mock failure in {op}")));
        }
        Ok(state)
    }

    fn candidates_where(
        state: &StoreState,
        listing_ids: Option<&HashSet<Uuid>>,
        keep: impl Fn(&ListingRecord, &BusinessLocation, &ListingOccurrence) -> bool,
    ) -> Result<Vec<Candidate>> {
        let mut out = Vec::new();
        for record in &state.listings {
            if listing_ids.is_some_and(|ids| !ids.contains(&record.id)) {
                continue;
            }
            let business = state
                .businesses
                .get(&record.definition.business_id)
                .ok_or_else(|| DealspotError::storage("listing references unknown business"))?;
            for occ in state.occurrences.get(&record.id).into_iter().flatten() {
                if keep(record, business, occ) {
                    out.push(Candidate {
                        occurrence: *occ,
                        listing: summary(record),
                        business: business.clone(),
                        dietary_restrictions: Vec::new(),
                        distance: None,
                    });
                }
            }
        }
        // Stable: creation order survives within a date.
        out.sort_by_key(|c| c.occurrence.date);
        Ok(out)
    }
}

fn summary(record: &ListingRecord) -> ListingSummary {
    let d = &record.definition;
    ListingSummary {
        id: record.id,
        listing_type: d.listing_type,
        title: d.title.clone(),
        description: d.description.clone(),
        old_price: d.old_price,
        new_price: d.new_price,
        discount: d.discount,
        image_url: d.image_url.clone(),
        created_at: record.created_at,
    }
}

fn mock_epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or_default()
}

/// Build an occurrence set the way the insert would, without touching state.
/// Fails on a duplicate `(listing_id, date)` or when `insert_occurrences` is
/// marked failing, so callers commit nothing.
fn staged_occurrences(
    state: &mut StoreState,
    occurrences: &[ListingOccurrence],
) -> Result<Vec<ListingOccurrence>> {
    state.calls.push("insert_occurrences");
    if state.failing.contains("insert_occurrences") {
        return Err(DealspotError::storage("mock failure in insert_occurrences"));
    }
    let mut staged: Vec<ListingOccurrence> = Vec::with_capacity(occurrences.len());
    for occ in occurrences {
        if staged.iter().any(|s| s.date == occ.date) {
            return Err(DealspotError::storage(format!(
                "duplicate occurrence ({}, {})",
                occ.listing_id, occ.date
            )));
        }
        staged.push(*occ);
    }
    staged.sort_by_key(|o| o.date);
    Ok(staged)
}

#[async_trait]
impl ListingStore for MockListingStore {
    async fn create_listing(
        &self,
        definition: &ListingDefinition,
        expansion: &Expansion,
    ) -> Result<Uuid> {
        let mut state = self.enter("create_listing")?;
        let id = Uuid::new_v4();
        let occurrences = staged_occurrences(&mut state, &expansion.for_listing(id))?;

        let created_at = mock_epoch() + Duration::minutes(state.listings.len() as i64);
        state.listings.push(ListingRecord {
            id,
            created_at,
            definition: definition.clone(),
        });
        state.occurrences.insert(id, occurrences);
        Ok(id)
    }

    async fn replace_listing(
        &self,
        listing_id: Uuid,
        definition: &ListingDefinition,
        expansion: &Expansion,
    ) -> Result<u64> {
        let mut state = self.enter("replace_listing")?;
        if !state.listings.iter().any(|r| r.id == listing_id) {
            return Err(DealspotError::not_found(format!("listing {listing_id}")));
        }
        let occurrences = staged_occurrences(&mut state, &expansion.for_listing(listing_id))?;

        if let Some(record) = state.listings.iter_mut().find(|r| r.id == listing_id) {
            record.definition = definition.clone();
        }
        let removed = state
            .occurrences
            .insert(listing_id, occurrences)
            .map_or(0, |old| old.len() as u64);
        Ok(removed)
    }

    async fn find_listing(&self, listing_id: Uuid) -> Result<Option<ListingRecord>> {
        let state = self.enter("find_listing")?;
        Ok(state.listings.iter().find(|r| r.id == listing_id).cloned())
    }

    async fn delete_listing(&self, listing_id: Uuid) -> Result<bool> {
        let mut state = self.enter("delete_listing")?;
        let before = state.listings.len();
        state.listings.retain(|r| r.id != listing_id);
        state.occurrences.remove(&listing_id);
        state.favorites.retain(|(_, l)| *l != listing_id);
        Ok(state.listings.len() != before)
    }

    async fn listings_for_business(&self, business_id: Uuid) -> Result<Vec<ListingRecord>> {
        let state = self.enter("listings_for_business")?;
        Ok(state
            .listings
            .iter()
            .filter(|r| r.definition.business_id == business_id)
            .cloned()
            .collect())
    }

    async fn fetch_occurrences(&self, listing_id: Uuid) -> Result<Vec<ListingOccurrence>> {
        let state = self.enter("fetch_occurrences")?;
        Ok(state.occurrences.get(&listing_id).cloned().unwrap_or_default())
    }

    async fn fetch_candidates(&self, criteria: &CandidateCriteria) -> Result<Vec<Candidate>> {
        let state = self.enter("fetch_candidates")?;
        let keywords = criteria.keywords.as_deref().map(str::to_lowercase);
        Self::candidates_where(&state, None, |record, business, occ| {
            let d = &record.definition;
            occ.date >= criteria.from
                && occ.date <= criteria.to
                && criteria.listing_type.map_or(true, |t| t == d.listing_type)
                && keywords.as_deref().map_or(true, |k| {
                    [business.name.as_str(), d.title.as_str(), d.description.as_str()]
                        .iter()
                        .any(|field| field.to_lowercase().contains(k))
                })
        })
    }

    async fn fetch_dietary_tags(&self, listing_id: Uuid) -> Result<Vec<String>> {
        let state = self.enter("fetch_dietary_tags")?;
        Ok(state
            .listings
            .iter()
            .find(|r| r.id == listing_id)
            .map(|r| r.definition.dietary_restrictions.clone())
            .unwrap_or_default())
    }

    async fn add_favorite(&self, user_id: Uuid, listing_id: Uuid) -> Result<()> {
        let mut state = self.enter("add_favorite")?;
        if !state.favorites.contains(&(user_id, listing_id)) {
            state.favorites.push((user_id, listing_id));
        }
        Ok(())
    }

    async fn remove_favorite(&self, user_id: Uuid, listing_id: Uuid) -> Result<bool> {
        let mut state = self.enter("remove_favorite")?;
        let before = state.favorites.len();
        state.favorites.retain(|f| *f != (user_id, listing_id));
        Ok(state.favorites.len() != before)
    }

    async fn fetch_favorites(&self, user_id: Uuid, from: NaiveDate) -> Result<Vec<Candidate>> {
        let state = self.enter("fetch_favorites")?;
        let ids: HashSet<Uuid> = state
            .favorites
            .iter()
            .filter(|(u, _)| *u == user_id)
            .map(|(_, l)| *l)
            .collect();
        Self::candidates_where(&state, Some(&ids), |_, _, occ| occ.date >= from)
    }
}

// ---------------------------------------------------------------------------
// MockBusinessLookup
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MockBusinessLookup {
    businesses: HashMap<Uuid, BusinessLocation>,
}

impl MockBusinessLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, business: BusinessLocation) -> Self {
        self.businesses.insert(business.business_id, business);
        self
    }
}

#[async_trait]
impl BusinessLookup for MockBusinessLookup {
    async fn get_by_id(&self, business_id: Uuid) -> Result<BusinessLocation> {
        self.businesses
            .get(&business_id)
            .cloned()
            .ok_or_else(|| DealspotError::not_found(format!("business {business_id}")))
    }
}

// ---------------------------------------------------------------------------
// MockGeocoder
// ---------------------------------------------------------------------------

/// HashMap-based geocoder. Unregistered addresses fail like a zero-result
/// provider response. `.slow()` delays every answer.
#[derive(Default)]
pub struct MockGeocoder {
    places: HashMap<String, GeoPoint>,
    delay: Option<StdDuration>,
    calls: Mutex<Vec<String>>,
}

impl MockGeocoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(mut self, address: &str, point: GeoPoint) -> Self {
        self.places.insert(address.to_string(), point);
        self
    }

    pub fn slow(mut self, delay: StdDuration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl GeocodingClient for MockGeocoder {
    async fn resolve(&self, address: &str) -> Result<GeoPoint> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(address.to_string());
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.places
            .get(address)
            .copied()
            .ok_or_else(|| DealspotError::geocoding(format!("no results for '{address}'")))
    }
}
