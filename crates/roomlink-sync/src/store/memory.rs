//! In-process booking store.
//!
//! Backs the `demo` command and the component tests. It counts every call so
//! callers can assert how many remote operations a component issued, and it
//! can simulate an outage or a slow backend.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use roomlink_core::{BookingRecord, MeetingStatus};

use super::{BookingStore, StoreError};

#[derive(Debug, Default)]
struct Counters {
    reads: AtomicUsize,
    writes: AtomicUsize,
    unavailable: AtomicBool,
    latency_ms: AtomicU64,
}

/// Shared in-memory booking table. Clones share the same rows.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBookingStore {
    rows: Arc<RwLock<HashMap<String, BookingRecord>>>,
    counters: Arc<Counters>,
}

impl InMemoryBookingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a record without counting it as a write.
    pub async fn insert(&self, record: BookingRecord) {
        self.rows.write().await.insert(record.id.clone(), record);
    }

    /// Apply an out-of-band edit to a record (the booking flow, an admin).
    pub async fn modify(&self, booking_id: &str, edit: impl FnOnce(&mut BookingRecord)) -> bool {
        let mut rows = self.rows.write().await;
        rows.get_mut(booking_id).map(edit).is_some()
    }

    pub async fn get(&self, booking_id: &str) -> Option<BookingRecord> {
        self.rows.read().await.get(booking_id).cloned()
    }

    /// Number of `fetch` calls that reached the store.
    pub fn read_count(&self) -> usize {
        self.counters.reads.load(Ordering::SeqCst)
    }

    /// Number of `publish_room_link` calls that reached the store.
    pub fn write_count(&self) -> usize {
        self.counters.writes.load(Ordering::SeqCst)
    }

    /// Make every call fail with [`StoreError::Remote`] while `true`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.counters.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Delay every call by `latency` before answering.
    #[allow(clippy::cast_possible_truncation)]
    pub fn set_latency(&self, latency: Duration) {
        self.counters
            .latency_ms
            .store(latency.as_millis() as u64, Ordering::SeqCst);
    }

    async fn simulate_backend(&self) -> Result<(), StoreError> {
        let latency = self.counters.latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }
        if self.counters.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Remote("store unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl BookingStore for InMemoryBookingStore {
    async fn fetch(&self, booking_id: &str) -> Result<Option<BookingRecord>, StoreError> {
        self.counters.reads.fetch_add(1, Ordering::SeqCst);
        self.simulate_backend().await?;
        Ok(self.get(booking_id).await)
    }

    async fn publish_room_link(
        &self,
        booking_id: &str,
        room_link: &str,
    ) -> Result<BookingRecord, StoreError> {
        self.counters.writes.fetch_add(1, Ordering::SeqCst);
        self.simulate_backend().await?;

        let mut rows = self.rows.write().await;
        let record = rows
            .get_mut(booking_id)
            .ok_or_else(|| StoreError::NotFound(format!("Booking {booking_id}")))?;
        record.room_link = Some(room_link.to_string());
        record.meeting_status = Some(MeetingStatus::Ready);
        Ok(record.clone())
    }
}
