mod postgres;

pub use postgres::{PgBusinessLookup, PgListingStore};
