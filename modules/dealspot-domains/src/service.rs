use std::future::Future;
use std::sync::Arc;

use chrono::{NaiveDateTime, Utc};
use dealspot_common::{
    DealspotError, DiscoveryConfig, ListingDefinition, ListingStatus, ListingWithStatus, Result,
    StatusFilter,
};
use tokio::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

use crate::listings::{representative_status, validate_definition};
use crate::traits::{BusinessLookup, GeocodingClient, ListingStore};

/// Entry point for the listing engine: authoring, owner views and discovery.
#[derive(Clone)]
pub struct ListingService {
    pub(crate) store: Arc<dyn ListingStore>,
    pub(crate) businesses: Arc<dyn BusinessLookup>,
    pub(crate) geocoder: Arc<dyn GeocodingClient>,
    pub(crate) config: DiscoveryConfig,
}

impl ListingService {
    pub fn new(
        store: Arc<dyn ListingStore>,
        businesses: Arc<dyn BusinessLookup>,
        geocoder: Arc<dyn GeocodingClient>,
        config: DiscoveryConfig,
    ) -> Self {
        Self {
            store,
            businesses,
            geocoder,
            config,
        }
    }

    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    /// Wall-clock time in the zone listings are authored in.
    pub fn local_now(&self) -> NaiveDateTime {
        Utc::now().with_timezone(&self.config.utc_offset).naive_local()
    }

    /// Validate, expand and persist a new listing. Returns its id.
    pub async fn add_listing(&self, definition: &ListingDefinition) -> Result<Uuid> {
        let expansion = validate_definition(definition)?;
        let business = self.businesses.get_by_id(definition.business_id).await?;

        let listing_id = self.store.create_listing(definition, &expansion).await?;

        info!(
            %listing_id,
            business = business.name.as_str(),
            occurrences = expansion.len(),
            "Listing added"
        );
        Ok(listing_id)
    }

    /// Replace a listing's definition and regenerate all of its occurrences.
    ///
    /// Occurrences are never patched: the old set is deleted wholesale and the
    /// new definition re-expanded. Expansion happens before any write and the
    /// store swaps definition and occurrences in one transaction, so a failed
    /// edit leaves the listing as it was.
    pub async fn edit_listing(&self, listing_id: Uuid, definition: &ListingDefinition) -> Result<()> {
        let expansion = validate_definition(definition)?;

        let existing = self
            .store
            .find_listing(listing_id)
            .await?
            .ok_or_else(|| DealspotError::not_found(format!("listing {listing_id}")))?;
        if existing.definition.business_id != definition.business_id {
            return Err(DealspotError::validation(
                "a listing cannot move to another business",
            ));
        }

        let removed = self
            .store
            .replace_listing(listing_id, definition, &expansion)
            .await?;

        info!(
            %listing_id,
            removed,
            occurrences = expansion.len(),
            "Listing edited, occurrences regenerated"
        );
        Ok(())
    }

    /// Delete a listing and everything hanging off it. Every failure propagates.
    pub async fn delete_listing(&self, listing_id: Uuid) -> Result<()> {
        if !self.store.delete_listing(listing_id).await? {
            return Err(DealspotError::not_found(format!("listing {listing_id}")));
        }
        info!(%listing_id, "Listing deleted");
        Ok(())
    }

    /// A business's listings with one representative status each.
    pub async fn listings_by_business(
        &self,
        business_id: Uuid,
        filter: StatusFilter,
    ) -> Result<Vec<ListingWithStatus>> {
        self.listings_by_business_at(business_id, filter, self.local_now())
            .await
    }

    pub async fn listings_by_business_at(
        &self,
        business_id: Uuid,
        filter: StatusFilter,
        now: NaiveDateTime,
    ) -> Result<Vec<ListingWithStatus>> {
        self.businesses.get_by_id(business_id).await?;
        let listings = self.store.listings_for_business(business_id).await?;

        let mut out = Vec::with_capacity(listings.len());
        for listing in listings {
            let occurrences = self.store.fetch_occurrences(listing.id).await?;
            let (status, occurrence) = match representative_status(&occurrences, now) {
                Some((status, occ)) => (status, Some(occ)),
                None => {
                    warn!(listing_id = %listing.id, "Listing has no occurrences");
                    (ListingStatus::Ended, None)
                }
            };
            if filter.admits(status) {
                out.push(ListingWithStatus {
                    listing,
                    status,
                    occurrence,
                });
            }
        }
        Ok(out)
    }

    pub async fn add_favorite(&self, user_id: Uuid, listing_id: Uuid) -> Result<()> {
        if self.store.find_listing(listing_id).await?.is_none() {
            return Err(DealspotError::not_found(format!("listing {listing_id}")));
        }
        self.store.add_favorite(user_id, listing_id).await
    }

    pub async fn remove_favorite(&self, user_id: Uuid, listing_id: Uuid) -> Result<()> {
        if !self.store.remove_favorite(user_id, listing_id).await? {
            return Err(DealspotError::not_found(format!(
                "favorite {listing_id} for user {user_id}"
            )));
        }
        Ok(())
    }

    /// Deadline for every collaborator call made on behalf of one query.
    pub(crate) fn query_deadline(&self) -> Instant {
        Instant::now() + self.config.query_timeout
    }
}

/// Await a collaborator call, failing with `DeadlineExceeded` once `deadline` passes.
pub(crate) async fn within<T>(
    deadline: Instant,
    what: &'static str,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::time::timeout_at(deadline, fut)
        .await
        .map_err(|_| DealspotError::DeadlineExceeded(what))?
}
