use thiserror::Error;

/// Opaque collaborator failure carried as a diagnostic source.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Result type alias for listing and discovery operations.
pub type Result<T> = std::result::Result<T, DealspotError>;

#[derive(Error, Debug)]
pub enum DealspotError {
    /// Malformed caller input: bad date format, missing required field.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Listing or business absent.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Location resolution failed.
    #[error("Geocoding error: {0}")]
    Geocoding(#[source] BoxError),

    /// Persistence call failed.
    #[error("Storage error: {0}")]
    Storage(#[source] BoxError),

    /// The query deadline expired while waiting on a collaborator.
    #[error("Deadline exceeded while waiting on {0}")]
    DeadlineExceeded(&'static str),
}

impl DealspotError {
    pub fn storage(err: impl Into<BoxError>) -> Self {
        DealspotError::Storage(err.into())
    }

    pub fn geocoding(err: impl Into<BoxError>) -> Self {
        DealspotError::Geocoding(err.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        DealspotError::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        DealspotError::NotFound(msg.into())
    }
}
