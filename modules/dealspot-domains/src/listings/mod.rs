pub mod schedule;
pub mod status;
pub mod validate;

pub use schedule::{expand, Expansion};
pub use status::{classify, representative_status, time_left_hours};
pub use validate::validate_definition;
