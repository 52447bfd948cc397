//! Error types for `roomlink` core library.

use thiserror::Error;

/// Result type alias using `roomlink` Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for `roomlink` operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Booking identifier is not a canonical v4 UUID
    #[error("Invalid booking id: {0:?}")]
    InvalidBookingId(String),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
