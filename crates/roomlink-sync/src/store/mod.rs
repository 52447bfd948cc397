//! Access to the shared booking record.
//!
//! The reconciliation components only ever do two things with a booking: read
//! the room fields and publish a room link. `BookingStore` is that seam; the
//! `SQLite` database, the in-process store and the unconfigured placeholder
//! all implement it.

mod db;
mod memory;
mod models;
mod queries;

use std::time::Duration;

use async_trait::async_trait;

use roomlink_core::BookingRecord;
use roomlink_core::db::DatabaseError;

pub use db::BookingDatabase;
pub use memory::InMemoryBookingStore;
pub use models::BookingRow;
pub use queries::NewBooking;

/// Errors surfaced by a [`BookingStore`].
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("Booking store is not configured")]
    NotConfigured,

    #[error("Booking not found: {0}")]
    NotFound(String),

    #[error("Remote store error: {0}")]
    Remote(String),

    #[error("Store call timed out after {0:?}")]
    Timeout(Duration),
}

impl From<DatabaseError> for StoreError {
    fn from(e: DatabaseError) -> Self {
        match e {
            DatabaseError::NotFound(what) => Self::NotFound(what),
            other => Self::Remote(other.to_string()),
        }
    }
}

/// The booking record as an external, shared, mutable resource.
#[async_trait]
pub trait BookingStore: Send + Sync {
    /// `SELECT id, room_link, meeting_status, scheduled_for, ... WHERE id = ?`
    async fn fetch(&self, booking_id: &str) -> Result<Option<BookingRecord>, StoreError>;

    /// Set `room_link` and advance `meeting_status` to `ready`, returning the
    /// updated row. A missing row is [`StoreError::NotFound`].
    async fn publish_room_link(
        &self,
        booking_id: &str,
        room_link: &str,
    ) -> Result<BookingRecord, StoreError>;
}

/// Store used when no backing service is configured. Every call fails with
/// [`StoreError::NotConfigured`] so dependents can log and stand down.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnconfiguredStore;

#[async_trait]
impl BookingStore for UnconfiguredStore {
    async fn fetch(&self, _booking_id: &str) -> Result<Option<BookingRecord>, StoreError> {
        Err(StoreError::NotConfigured)
    }

    async fn publish_room_link(
        &self,
        _booking_id: &str,
        _room_link: &str,
    ) -> Result<BookingRecord, StoreError> {
        Err(StoreError::NotConfigured)
    }
}
