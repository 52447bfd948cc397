//! Short-lived cache of the last booking read.

use std::time::Duration;

use tokio::time::Instant;

use roomlink_core::BookingRecord;

#[derive(Debug)]
pub(crate) struct ReadCache {
    expiry: Duration,
    entry: Option<(String, BookingRecord, Instant)>,
}

impl ReadCache {
    pub const fn new(expiry: Duration) -> Self {
        Self {
            expiry,
            entry: None,
        }
    }

    /// The cached record for `booking_id`, if younger than the expiry.
    pub fn fresh(&self, booking_id: &str) -> Option<&BookingRecord> {
        self.entry
            .as_ref()
            .filter(|(id, _, at)| id == booking_id && at.elapsed() < self.expiry)
            .map(|(_, record, _)| record)
    }

    pub fn store(&mut self, booking_id: &str, record: BookingRecord) {
        self.entry = Some((booking_id.to_string(), record, Instant::now()));
    }

    pub fn invalidate(&mut self) {
        self.entry = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn entry_expires() {
        let mut cache = ReadCache::new(Duration::from_secs(60));
        cache.store("b1", BookingRecord::pending("b1"));
        assert!(cache.fresh("b1").is_some());
        assert!(cache.fresh("b2").is_none());

        tokio::time::advance(Duration::from_secs(60)).await;
        assert!(cache.fresh("b1").is_none());
    }

    #[tokio::test]
    async fn zero_expiry_never_hits() {
        let mut cache = ReadCache::new(Duration::ZERO);
        cache.store("b1", BookingRecord::pending("b1"));
        assert!(cache.fresh("b1").is_none());
    }

    #[tokio::test]
    async fn invalidate_clears() {
        let mut cache = ReadCache::new(Duration::from_secs(60));
        cache.store("b1", BookingRecord::pending("b1"));
        cache.invalidate();
        assert!(cache.fresh("b1").is_none());
    }
}
