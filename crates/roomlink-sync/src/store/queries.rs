//! Database queries for the booking store.

use async_trait::async_trait;

use roomlink_core::db::unix_timestamp;
use roomlink_core::{BookingRecord, MeetingStatus};

use super::db::{BookingDatabase, DatabaseError};
use super::models::BookingRow;
use super::{BookingStore, StoreError};

/// Fields supplied by the booking flow when a consultation is created.
#[derive(Debug, Clone, Default)]
pub struct NewBooking<'a> {
    pub id: &'a str,
    pub client_name: Option<&'a str>,
    pub client_email: Option<&'a str>,
    pub scheduled_for: Option<&'a str>,
}

impl BookingDatabase {
    /// Create a booking in `pending` state with no room link.
    pub async fn create_booking(&self, booking: &NewBooking<'_>) -> Result<BookingRow, DatabaseError> {
        let now = unix_timestamp();

        sqlx::query(
            r"
            INSERT INTO bookings (id, meeting_status, scheduled_for, client_name, client_email, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ",
        )
        .bind(booking.id)
        .bind(MeetingStatus::Pending.as_str())
        .bind(booking.scheduled_for)
        .bind(booking.client_name)
        .bind(booking.client_email)
        .bind(now)
        .bind(now)
        .execute(self.pool())
        .await?;

        self.get_booking(booking.id).await
    }

    /// Get a booking by ID.
    pub async fn get_booking(&self, id: &str) -> Result<BookingRow, DatabaseError> {
        self.find_booking(id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Booking {id}")))
    }

    pub async fn find_booking(&self, id: &str) -> Result<Option<BookingRow>, DatabaseError> {
        let row = sqlx::query_as::<_, BookingRow>("SELECT * FROM bookings WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;

        Ok(row)
    }

    /// Write the room link and mark the meeting ready.
    pub async fn update_room_link(&self, id: &str, room_link: &str) -> Result<BookingRow, DatabaseError> {
        let now = unix_timestamp();

        sqlx::query_as::<_, BookingRow>(
            "UPDATE bookings SET room_link = ?, meeting_status = ?, updated_at = ? WHERE id = ? RETURNING *",
        )
        .bind(room_link)
        .bind(MeetingStatus::Ready.as_str())
        .bind(now)
        .bind(id)
        .fetch_optional(self.pool())
        .await?
        .ok_or_else(|| DatabaseError::NotFound(format!("Booking {id}")))
    }

    /// Overwrite the meeting status. No ordering is enforced.
    pub async fn set_meeting_status(&self, id: &str, status: MeetingStatus) -> Result<(), DatabaseError> {
        let now = unix_timestamp();

        let result = sqlx::query("UPDATE bookings SET meeting_status = ?, updated_at = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(now)
            .bind(id)
            .execute(self.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("Booking {id}")));
        }
        Ok(())
    }

    pub async fn set_scheduled_for(&self, id: &str, scheduled_for: Option<&str>) -> Result<(), DatabaseError> {
        let now = unix_timestamp();

        let result = sqlx::query("UPDATE bookings SET scheduled_for = ?, updated_at = ? WHERE id = ?")
            .bind(scheduled_for)
            .bind(now)
            .bind(id)
            .execute(self.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("Booking {id}")));
        }
        Ok(())
    }
}

#[async_trait]
impl BookingStore for BookingDatabase {
    async fn fetch(&self, booking_id: &str) -> Result<Option<BookingRecord>, StoreError> {
        Ok(self.find_booking(booking_id).await?.map(BookingRecord::from))
    }

    async fn publish_room_link(
        &self,
        booking_id: &str,
        room_link: &str,
    ) -> Result<BookingRecord, StoreError> {
        Ok(self.update_room_link(booking_id, room_link).await?.into())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const ID: &str = "3f2504e0-4f89-41d3-9a0c-0305e82c3301";

    async fn seeded() -> BookingDatabase {
        let db = BookingDatabase::open_in_memory().await.unwrap();
        db.create_booking(&NewBooking {
            id: ID,
            client_name: Some("Ada"),
            client_email: Some("ada@example.com"),
            scheduled_for: None,
        })
        .await
        .unwrap();
        db
    }

    #[tokio::test]
    async fn created_booking_is_pending_without_room() {
        let db = seeded().await;
        let row = db.get_booking(ID).await.unwrap();
        assert_eq!(row.meeting_status.as_deref(), Some("pending"));
        assert!(row.room_link.is_none());
        assert_eq!(row.client_name.as_deref(), Some("Ada"));
    }

    #[tokio::test]
    async fn publish_sets_room_and_ready() {
        let db = seeded().await;
        let record = db.publish_room_link(ID, "room-42").await.unwrap();
        assert_eq!(record.room_link.as_deref(), Some("room-42"));
        assert_eq!(record.meeting_status, Some(MeetingStatus::Ready));
        assert_eq!(record.client_email.as_deref(), Some("ada@example.com"));

        let fetched = db.fetch(ID).await.unwrap().unwrap();
        assert_eq!(fetched, record);
    }

    #[tokio::test]
    async fn publish_to_missing_booking_is_not_found() {
        let db = seeded().await;
        let err = db
            .publish_room_link("9b2d1c7e-5a3f-4e21-8c4d-2f6a7b8c9d0e", "room-1")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn fetch_missing_is_none() {
        let db = seeded().await;
        assert!(db.fetch("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn status_can_move_backwards() {
        let db = seeded().await;
        db.publish_room_link(ID, "room-42").await.unwrap();
        db.set_meeting_status(ID, MeetingStatus::Pending).await.unwrap();
        let record = db.fetch(ID).await.unwrap().unwrap();
        assert_eq!(record.meeting_status, Some(MeetingStatus::Pending));
        assert_eq!(record.room_link.as_deref(), Some("room-42"));
    }

    #[tokio::test]
    async fn schedule_round_trips_and_clears() {
        let db = seeded().await;
        db.set_scheduled_for(ID, Some("2026-10-20T15:00:00Z")).await.unwrap();
        let record = db.fetch(ID).await.unwrap().unwrap();
        assert_eq!(record.scheduled_for.as_deref(), Some("2026-10-20T15:00:00Z"));

        db.set_scheduled_for(ID, None).await.unwrap();
        assert!(db.fetch(ID).await.unwrap().unwrap().scheduled_for.is_none());
        assert!(matches!(
            db.set_scheduled_for("nope", None).await,
            Err(DatabaseError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn duplicate_booking_is_rejected() {
        let db = seeded().await;
        let again = db.create_booking(&NewBooking { id: ID, ..Default::default() }).await;
        assert!(again.is_err());
    }
}
