use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DealspotError;

// --- Geography ---

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// Distance unit, fixed once for the whole system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceUnit {
    #[default]
    Miles,
    Kilometers,
}

impl DistanceUnit {
    pub fn earth_radius(self) -> f64 {
        match self {
            Self::Miles => 3958.8,
            Self::Kilometers => 6371.0,
        }
    }
}

impl FromStr for DistanceUnit {
    type Err = DealspotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "miles" | "mi" => Ok(Self::Miles),
            "kilometers" | "km" => Ok(Self::Kilometers),
            other => Err(DealspotError::validation(format!(
                "unknown distance unit '{other}'"
            ))),
        }
    }
}

/// A business identity plus its stored coordinates. Read-only to the core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessLocation {
    pub business_id: Uuid,
    pub name: String,
    pub location: GeoPoint,
}

// --- Enums ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingType {
    Meal,
    HappyHour,
}

impl ListingType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Meal => "meal",
            Self::HappyHour => "happy_hour",
        }
    }
}

impl fmt::Display for ListingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ListingType {
    type Err = DealspotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "meal" => Ok(Self::Meal),
            "happy_hour" | "happyHour" | "happy-hour" => Ok(Self::HappyHour),
            other => Err(DealspotError::validation(format!(
                "unknown listing type '{other}'"
            ))),
        }
    }
}

/// Lifecycle state of an occurrence relative to now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingStatus {
    Scheduled,
    Active,
    Ended,
}

impl fmt::Display for ListingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scheduled => write!(f, "scheduled"),
            Self::Active => write!(f, "active"),
            Self::Ended => write!(f, "ended"),
        }
    }
}

/// Business-owner view filter over representative listing status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusFilter {
    Active,
    Scheduled,
    Ended,
    #[default]
    All,
}

impl StatusFilter {
    pub fn admits(self, status: ListingStatus) -> bool {
        match self {
            Self::All => true,
            Self::Active => status == ListingStatus::Active,
            Self::Scheduled => status == ListingStatus::Scheduled,
            Self::Ended => status == ListingStatus::Ended,
        }
    }
}

impl FromStr for StatusFilter {
    type Err = DealspotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "scheduled" => Ok(Self::Scheduled),
            "ended" => Ok(Self::Ended),
            "all" | "" => Ok(Self::All),
            other => Err(DealspotError::validation(format!(
                "unknown status filter '{other}'"
            ))),
        }
    }
}

/// One of four mutually exclusive result orders. Decoding goes through
/// `from_name`, so an unknown name sorts by distance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "String")]
pub enum SortStrategy {
    #[default]
    Distance,
    Price,
    TimeLeft,
    DateAdded,
}

impl SortStrategy {
    /// Resolve a strategy by name. Unrecognized or empty names sort by distance.
    pub fn from_name(name: &str) -> Self {
        match name {
            "price" => Self::Price,
            "timeLeft" => Self::TimeLeft,
            "dateAdded" => Self::DateAdded,
            _ => Self::Distance,
        }
    }
}

impl From<String> for SortStrategy {
    fn from(name: String) -> Self {
        Self::from_name(&name)
    }
}

/// Maximum-distance filter. `All` bypasses the filter entirely.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceCeiling {
    #[default]
    All,
    Within(f64),
}

impl FromStr for DistanceCeiling {
    type Err = DealspotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || s.eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        let max = s
            .parse::<f64>()
            .map_err(|_| DealspotError::validation(format!("invalid distance '{s}'")))?;
        if !max.is_finite() || max < 0.0 {
            return Err(DealspotError::validation(format!("invalid distance '{s}'")));
        }
        Ok(Self::Within(max))
    }
}

// --- Listings ---

/// The authored intent of an offer, exactly as the owner submitted it.
/// Dates are `MM/DD/YYYY`; times are `HH:MM` (or `h:MM AM/PM`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingDefinition {
    pub business_id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub old_price: f64,
    pub new_price: f64,
    #[serde(default)]
    pub discount: f64,
    pub listing_type: ListingType,
    pub start_date: String,
    pub start_time: String,
    pub end_time: String,
    #[serde(default)]
    pub multiple_days: bool,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub recurring: bool,
    #[serde(default)]
    pub recurring_days: Vec<String>,
    #[serde(default)]
    pub recurring_end_date: Option<String>,
    #[serde(default)]
    pub dietary_restrictions: Vec<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// A persisted definition with its identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingRecord {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub definition: ListingDefinition,
}

/// One concrete calendar instance of a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingOccurrence {
    pub listing_id: Uuid,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

impl ListingOccurrence {
    pub fn start_instant(&self) -> NaiveDateTime {
        self.date.and_time(self.start_time)
    }

    /// End instant. An end time earlier than the start time runs past
    /// midnight into the following day.
    pub fn end_instant(&self) -> NaiveDateTime {
        let end = self.date.and_time(self.end_time);
        if self.end_time < self.start_time {
            end + Duration::days(1)
        } else {
            end
        }
    }
}

/// Listing with its representative status, for business-owner views.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingWithStatus {
    pub listing: ListingRecord,
    pub status: ListingStatus,
    /// The occurrence the status was taken from.
    pub occurrence: Option<ListingOccurrence>,
}

// --- Discovery ---

/// Where a search is centred: explicit coordinates or text to geocode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryLocation {
    Coordinates(GeoPoint),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub listing_type: Option<ListingType>,
    /// Search the upcoming window instead of today.
    #[serde(default)]
    pub future: bool,
    pub location: QueryLocation,
    #[serde(default)]
    pub price_ceiling: Option<f64>,
    #[serde(default)]
    pub dietary: Option<String>,
    #[serde(default)]
    pub distance: DistanceCeiling,
    #[serde(default)]
    pub keywords: Option<String>,
    #[serde(default)]
    pub sort: SortStrategy,
}

impl SearchQuery {
    pub fn near(location: QueryLocation) -> Self {
        Self {
            listing_type: None,
            future: false,
            location,
            price_ceiling: None,
            dietary: None,
            distance: DistanceCeiling::All,
            keywords: None,
            sort: SortStrategy::Distance,
        }
    }
}

/// Search result projection. Regenerated per query, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub listing_id: Uuid,
    pub listing_type: ListingType,
    pub title: String,
    pub business_id: Uuid,
    pub business_name: String,
    pub price: f64,
    pub old_price: f64,
    pub discount: f64,
    pub dietary_restrictions: Vec<String>,
    /// Whole hours until the occurrence ends; negative once it has ended.
    pub time_left: i64,
    pub image_url: Option<String>,
    pub distance: f64,
    pub date: NaiveDate,
}
