//! Filter pipeline. Each filter keeps a subset of its input and never reorders
//! the survivors.

use dealspot_common::{DistanceCeiling, SearchQuery};

use super::Candidate;

#[derive(Debug, Clone, PartialEq)]
pub enum ListingFilter {
    PriceCeiling(f64),
    DietaryTag(String),
    DistanceCeiling(DistanceCeiling),
    /// Applied by the store's text search; passes through here.
    Keywords(String),
    None,
}

impl ListingFilter {
    /// The single price-or-dietary refinement a query applies. Price is used
    /// when both are supplied; the two never combine.
    pub fn refinement(query: &SearchQuery) -> Self {
        match (query.price_ceiling, query.dietary.as_deref()) {
            (Some(max), _) => Self::PriceCeiling(max),
            (None, Some(tag)) if !tag.trim().is_empty() => Self::DietaryTag(tag.trim().to_string()),
            _ => Self::None,
        }
    }

    /// Whether this filter reads dietary tags, which must be attached first.
    pub fn needs_dietary_tags(&self) -> bool {
        matches!(self, Self::DietaryTag(_))
    }

    pub fn apply(&self, mut candidates: Vec<Candidate>) -> Vec<Candidate> {
        match self {
            Self::PriceCeiling(max) => candidates.retain(|c| c.price() <= *max),
            Self::DietaryTag(tag) => {
                candidates.retain(|c| c.dietary_restrictions.iter().any(|t| t == tag))
            }
            Self::DistanceCeiling(DistanceCeiling::All) => {}
            Self::DistanceCeiling(DistanceCeiling::Within(max)) => {
                candidates.retain(|c| c.distance.is_some_and(|d| d <= *max))
            }
            Self::Keywords(_) | Self::None => {}
        }
        candidates
    }
}
