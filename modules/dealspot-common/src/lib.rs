pub mod config;
pub mod dates;
pub mod error;
pub mod types;

pub use config::{Config, DiscoveryConfig};
pub use error::{BoxError, DealspotError, Result};
pub use types::*;
