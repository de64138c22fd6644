//! Discovery: candidate selection, filtering, geo-ranking, sorting and projection.

pub mod filters;
pub mod search;
pub mod sort;

pub use filters::ListingFilter;
pub use sort::sort_candidates;

use chrono::{DateTime, NaiveDate, Utc};
use dealspot_common::{BusinessLocation, GeoPoint, ListingOccurrence, ListingType};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geo::Located;

/// The listing fields discovery needs, as joined onto each occurrence row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingSummary {
    pub id: Uuid,
    pub listing_type: ListingType,
    pub title: String,
    pub description: String,
    pub old_price: f64,
    pub new_price: f64,
    pub discount: f64,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// An occurrence joined with its listing and business, as fetched from the
/// store. Dietary tags and distance are filled in by the discovery pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub occurrence: ListingOccurrence,
    pub listing: ListingSummary,
    pub business: BusinessLocation,
    #[serde(default)]
    pub dietary_restrictions: Vec<String>,
    #[serde(default)]
    pub distance: Option<f64>,
}

impl Candidate {
    pub fn listing_id(&self) -> Uuid {
        self.listing.id
    }

    /// Current (discounted) price.
    pub fn price(&self) -> f64 {
        self.listing.new_price
    }
}

impl Located for Candidate {
    fn location(&self) -> GeoPoint {
        self.business.location
    }

    fn set_distance(&mut self, distance: f64) {
        self.distance = Some(distance);
    }
}

/// What the store should fetch. Every value is bound as a query parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateCriteria {
    /// First occurrence date, inclusive.
    pub from: NaiveDate,
    /// Last occurrence date, inclusive.
    pub to: NaiveDate,
    pub listing_type: Option<ListingType>,
    /// Full-text match across business name, listing title and description.
    pub keywords: Option<String>,
}
