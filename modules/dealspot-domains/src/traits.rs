// Collaborator seams for the listing engine.
//
// ListingStore owns every read and write of listing rows, BusinessLookup
// resolves business identity and coordinates, GeocodingClient turns free text
// into coordinates. Production uses Postgres and Nominatim; tests use the
// in-memory mocks in `crate::testing`.

use async_trait::async_trait;
use chrono::NaiveDate;
use dealspot_common::{
    BusinessLocation, DealspotError, GeoPoint, ListingDefinition, ListingOccurrence,
    ListingRecord, Result,
};
use uuid::Uuid;

use crate::discovery::{Candidate, CandidateCriteria};
use crate::listings::Expansion;

// ---------------------------------------------------------------------------
// ListingStore
// ---------------------------------------------------------------------------

#[async_trait]
pub trait ListingStore: Send + Sync {
    // --- Definitions ---

    /// Persist a new definition with its dietary tags and every expanded
    /// occurrence in one transaction. Returns the listing id. On failure
    /// nothing is written.
    async fn create_listing(
        &self,
        definition: &ListingDefinition,
        expansion: &Expansion,
    ) -> Result<Uuid>;

    /// Overwrite a definition and its tags and swap its occurrence set for
    /// the new expansion, in one transaction. `NotFound` if absent. Returns
    /// the number of occurrences removed.
    async fn replace_listing(
        &self,
        listing_id: Uuid,
        definition: &ListingDefinition,
        expansion: &Expansion,
    ) -> Result<u64>;

    async fn find_listing(&self, listing_id: Uuid) -> Result<Option<ListingRecord>>;

    /// Remove a listing with its occurrences, tags and favorites.
    /// Returns false when no such listing existed.
    async fn delete_listing(&self, listing_id: Uuid) -> Result<bool>;

    /// All listings owned by a business, oldest first.
    async fn listings_for_business(&self, business_id: Uuid) -> Result<Vec<ListingRecord>>;

    // --- Occurrences ---

    /// Occurrences of one listing in date order.
    async fn fetch_occurrences(&self, listing_id: Uuid) -> Result<Vec<ListingOccurrence>>;

    // --- Discovery ---

    /// Occurrences matching the criteria, joined with listing and business,
    /// ordered by date then listing creation.
    async fn fetch_candidates(&self, criteria: &CandidateCriteria) -> Result<Vec<Candidate>>;

    async fn fetch_dietary_tags(&self, listing_id: Uuid) -> Result<Vec<String>>;

    // --- Favorites ---

    async fn add_favorite(&self, user_id: Uuid, listing_id: Uuid) -> Result<()>;

    /// Returns false when the listing was not a favorite.
    async fn remove_favorite(&self, user_id: Uuid, listing_id: Uuid) -> Result<bool>;

    /// Occurrences on or after `from` of every listing the user favorited,
    /// in the same order as `fetch_candidates`.
    async fn fetch_favorites(&self, user_id: Uuid, from: NaiveDate) -> Result<Vec<Candidate>>;
}

// ---------------------------------------------------------------------------
// BusinessLookup
// ---------------------------------------------------------------------------

#[async_trait]
pub trait BusinessLookup: Send + Sync {
    /// `NotFound` if the business is unknown.
    async fn get_by_id(&self, business_id: Uuid) -> Result<BusinessLocation>;
}

// ---------------------------------------------------------------------------
// GeocodingClient
// ---------------------------------------------------------------------------

#[async_trait]
pub trait GeocodingClient: Send + Sync {
    /// Resolve a free-text address. Provider failure or zero results is a
    /// `Geocoding` error.
    async fn resolve(&self, address: &str) -> Result<GeoPoint>;
}

#[async_trait]
impl GeocodingClient for geocode_client::NominatimClient {
    async fn resolve(&self, address: &str) -> Result<GeoPoint> {
        let coords = self.search(address).await.map_err(DealspotError::geocoding)?;
        Ok(GeoPoint::new(coords.lat, coords.lng))
    }
}
