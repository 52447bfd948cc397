//! Database models for the booking store.

use serde::{Deserialize, Serialize};
use tracing::warn;

use roomlink_core::{BookingRecord, MeetingStatus};

/// Booking row as stored in `SQLite`.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct BookingRow {
    pub id: String,
    pub room_link: Option<String>,
    pub meeting_status: Option<String>,
    pub scheduled_for: Option<String>,
    pub client_name: Option<String>,
    pub client_email: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl From<BookingRow> for BookingRecord {
    fn from(row: BookingRow) -> Self {
        let meeting_status = row
            .meeting_status
            .as_deref()
            .and_then(|raw| match raw.parse::<MeetingStatus>() {
                Ok(status) => Some(status),
                Err(e) => {
                    warn!(booking_id = %row.id, error = %e, "Ignoring meeting status");
                    None
                }
            });

        Self {
            id: row.id,
            room_link: row.room_link,
            meeting_status,
            scheduled_for: row.scheduled_for,
            client_name: row.client_name,
            client_email: row.client_email,
        }
    }
}
