pub mod discovery;
pub mod geo;
pub mod listings;
pub mod service;
pub mod store;
pub mod testing;
pub mod traits;

pub use discovery::{Candidate, CandidateCriteria, ListingFilter, ListingSummary};
pub use service::ListingService;
pub use store::{PgBusinessLookup, PgListingStore};
pub use traits::{BusinessLookup, GeocodingClient, ListingStore};
