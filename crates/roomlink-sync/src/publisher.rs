//! Meeting code publisher (professional side).
//!
//! Watches the locally generated meeting code and writes it into the booking
//! record once input settles. Writes are debounced on the trailing edge and
//! a value equal to the last published one is suppressed inside the throttle
//! window. Failures end up on the status channel; the next local change is
//! the retry.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use roomlink_core::BookingRecord;
use roomlink_core::config::PublisherConfig;
use roomlink_core::ident::validate_booking_id;

use crate::bridge::CrossFrameBridge;
use crate::store::{BookingStore, StoreError};

/// What the publisher last did, for the host-side status display.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PublisherStatus {
    #[default]
    Idle,
    Published {
        room_link: String,
    },
    /// The booking id is missing or malformed; nothing was sent.
    ValidationError(String),
    /// The store rejected the write.
    RemoteError(String),
}

impl std::fmt::Display for PublisherStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => f.write_str("Waiting for a meeting code"),
            Self::Published { room_link } => write!(f, "Meeting room {room_link} shared with client"),
            Self::ValidationError(msg) => write!(f, "Cannot share meeting room: {msg}"),
            Self::RemoteError(msg) => write!(f, "Error sharing meeting room: {msg}"),
        }
    }
}

/// Handle to a running publisher task.
#[derive(Debug)]
pub struct MeetingCodePublisher {
    input_tx: Option<mpsc::UnboundedSender<String>>,
    status_rx: watch::Receiver<PublisherStatus>,
    shutdown_tx: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl MeetingCodePublisher {
    /// Spawn the publisher for `booking_id` (as resolved by the role router).
    pub fn spawn(
        booking_id: Option<String>,
        store: Arc<dyn BookingStore>,
        bridge: CrossFrameBridge,
        config: &PublisherConfig,
    ) -> Self {
        let (input_tx, input_rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = watch::channel(PublisherStatus::Idle);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let task = PublisherTask {
            booking_id,
            store,
            bridge,
            update_delay: config.update_delay(),
            throttle_window: config.throttle_window(),
            last_published: None,
            status_tx,
            mirror_task: None,
        };
        let handle = tokio::spawn(task.run(input_rx, shutdown_rx));

        Self {
            input_tx: Some(input_tx),
            status_rx,
            shutdown_tx,
            task: Some(handle),
        }
    }

    /// Report a new value of the local meeting code input.
    ///
    /// Returns `false` once the publisher has stopped.
    pub fn notify_change(&self, value: impl Into<String>) -> bool {
        self.input_tx
            .as_ref()
            .is_some_and(|tx| tx.send(value.into()).is_ok())
    }

    pub fn status(&self) -> watch::Receiver<PublisherStatus> {
        self.status_rx.clone()
    }

    pub fn current_status(&self) -> PublisherStatus {
        self.status_rx.borrow().clone()
    }

    /// Stop accepting input, let a pending debounced write complete, then stop.
    pub async fn finish(mut self) {
        self.input_tx = None;
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }

    /// Stop immediately, dropping any pending write.
    pub async fn shutdown(mut self) {
        self.shutdown_tx.send_replace(true);
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for MeetingCodePublisher {
    fn drop(&mut self) {
        if self.task.is_some() {
            self.shutdown_tx.send_replace(true);
        }
    }
}

struct PublisherTask {
    booking_id: Option<String>,
    store: Arc<dyn BookingStore>,
    bridge: CrossFrameBridge,
    update_delay: Duration,
    throttle_window: Duration,
    /// Last value written and when.
    last_published: Option<(String, Instant)>,
    status_tx: watch::Sender<PublisherStatus>,
    /// Parent mirroring runs off the task; at most one at a time.
    mirror_task: Option<JoinHandle<()>>,
}

impl PublisherTask {
    async fn run(
        mut self,
        input_rx: mpsc::UnboundedReceiver<String>,
        shutdown_rx: watch::Receiver<bool>,
    ) {
        self.process(input_rx, shutdown_rx).await;
        self.settle_mirror().await;
    }

    async fn process(
        &mut self,
        mut input_rx: mpsc::UnboundedReceiver<String>,
        mut shutdown_rx: watch::Receiver<bool>,
    ) {
        let mut pending: Option<String> = None;
        let mut input_open = true;
        let deadline = tokio::time::sleep(self.update_delay);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                biased;
                _ = shutdown_rx.changed() => {
                    debug!("Publisher shutting down");
                    return;
                }
                value = input_rx.recv(), if input_open => match value {
                    Some(value) => {
                        pending = self.intake(value);
                        if pending.is_some() {
                            deadline.as_mut().reset(Instant::now() + self.update_delay);
                        }
                    }
                    None => {
                        input_open = false;
                        if pending.is_none() {
                            return;
                        }
                    }
                },
                () = &mut deadline, if pending.is_some() => {
                    if let Some(value) = pending.take() {
                        self.flush(value).await;
                    }
                    if !input_open {
                        return;
                    }
                }
            }
        }
    }

    /// Decide whether a fresh input value needs a write. `None` means the
    /// latest local value requires nothing, which also cancels a pending write.
    fn intake(&self, raw: String) -> Option<String> {
        let value = raw.trim();
        if value.is_empty() {
            return None;
        }
        if self.is_throttled(value) {
            debug!(room_link = value, "Meeting code unchanged within throttle window");
            return None;
        }
        Some(value.to_string())
    }

    fn is_throttled(&self, value: &str) -> bool {
        self.last_published
            .as_ref()
            .is_some_and(|(last, at)| last == value && at.elapsed() < self.throttle_window)
    }

    async fn flush(&mut self, room_link: String) {
        if self.is_throttled(&room_link) {
            debug!(room_link = %room_link, "Skipping duplicate meeting code write");
            return;
        }

        let booking_id = match self.booking_id.as_deref().map(validate_booking_id) {
            Some(Ok(id)) => id.to_string(),
            Some(Err(e)) => {
                warn!(error = %e, "Not publishing meeting code");
                self.status_tx
                    .send_replace(PublisherStatus::ValidationError(e.to_string()));
                return;
            }
            None => {
                warn!("Not publishing meeting code: no booking id");
                self.status_tx.send_replace(PublisherStatus::ValidationError(
                    "no booking id".to_string(),
                ));
                return;
            }
        };

        match self.store.publish_room_link(&booking_id, &room_link).await {
            Ok(record) => {
                info!(booking_id = %booking_id, room_link = %room_link, "Published meeting room link");
                self.last_published = Some((room_link.clone(), Instant::now()));
                self.status_tx
                    .send_replace(PublisherStatus::Published { room_link });
                self.spawn_mirror(record).await;
            }
            Err(StoreError::NotConfigured) => {
                warn!(booking_id = %booking_id, "Booking store not configured; meeting code not published");
            }
            Err(e) => {
                error!(booking_id = %booking_id, error = %e, "Failed to publish meeting room link");
                self.status_tx
                    .send_replace(PublisherStatus::RemoteError(e.to_string()));
            }
        }
    }

    /// Mirror `record` into the parent on the blocking pool. The previous
    /// mirror is awaited first so writes to the parent stay ordered.
    async fn spawn_mirror(&mut self, record: BookingRecord) {
        if !self.bridge.is_attached() {
            return;
        }
        self.settle_mirror().await;
        let bridge = self.bridge.clone();
        self.mirror_task = Some(tokio::task::spawn_blocking(move || {
            let outcome = bridge.mirror(&record);
            debug!(?outcome, "Mirrored booking into parent context");
        }));
    }

    async fn settle_mirror(&mut self) {
        if let Some(task) = self.mirror_task.take()
            && let Err(e) = task.await
        {
            debug!(error = %e, "Parent mirroring task failed");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use roomlink_core::{BookingRecord, MeetingStatus};

    use super::*;
    use crate::bridge::{FrameAccessError, ParentField, ParentFrame};
    use crate::store::{InMemoryBookingStore, UnconfiguredStore};

    const ID: &str = "3f2504e0-4f89-41d3-9a0c-0305e82c3301";

    async fn setup() -> (InMemoryBookingStore, MeetingCodePublisher) {
        let store = InMemoryBookingStore::new();
        store.insert(BookingRecord::pending(ID)).await;
        let publisher = MeetingCodePublisher::spawn(
            Some(ID.to_string()),
            Arc::new(store.clone()),
            CrossFrameBridge::detached(),
            &PublisherConfig::default(),
        );
        (store, publisher)
    }

    async fn advance(ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn burst_collapses_into_one_write_of_final_value() {
        let (store, publisher) = setup().await;

        for (i, code) in ["r", "ro", "roo", "room-42"].into_iter().enumerate() {
            publisher.notify_change(code);
            if i < 3 {
                advance(400).await;
            }
        }
        advance(999).await;
        assert_eq!(store.write_count(), 0);

        advance(10).await;
        assert_eq!(store.write_count(), 1);
        let record = store.get(ID).await.unwrap();
        assert_eq!(record.room_link.as_deref(), Some("room-42"));
        assert_eq!(record.meeting_status, Some(MeetingStatus::Ready));
        assert_eq!(
            publisher.current_status(),
            PublisherStatus::Published {
                room_link: "room-42".into()
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn same_value_within_throttle_window_writes_once() {
        let (store, publisher) = setup().await;

        publisher.notify_change("room-42");
        advance(1_010).await;
        assert_eq!(store.write_count(), 1);

        publisher.notify_change("room-42");
        advance(2_000).await;
        assert_eq!(store.write_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn same_value_after_throttle_window_writes_again() {
        let (store, publisher) = setup().await;

        publisher.notify_change("room-42");
        advance(1_010).await;
        advance(1_500).await;
        publisher.notify_change("room-42");
        advance(1_010).await;
        assert_eq!(store.write_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn duplicate_input_event_writes_once() {
        let (store, publisher) = setup().await;

        publisher.notify_change("room-42");
        publisher.notify_change("room-42");
        advance(3_000).await;
        assert_eq!(store.write_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn throttled_value_cancels_pending_write() {
        let (store, publisher) = setup().await;

        publisher.notify_change("room-42");
        advance(1_010).await;
        publisher.notify_change("room-43");
        advance(100).await;
        publisher.notify_change("room-42");
        advance(2_000).await;

        assert_eq!(store.write_count(), 1);
        assert_eq!(store.get(ID).await.unwrap().room_link.as_deref(), Some("room-42"));
    }

    #[tokio::test(start_paused = true)]
    async fn blank_values_are_ignored() {
        let (store, publisher) = setup().await;

        publisher.notify_change("   ");
        advance(2_000).await;
        assert_eq!(store.write_count(), 0);
        assert_eq!(publisher.current_status(), PublisherStatus::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_booking_id_makes_no_remote_call() {
        let store = InMemoryBookingStore::new();
        store.insert(BookingRecord::pending("b1")).await;
        let publisher = MeetingCodePublisher::spawn(
            Some("b1".to_string()),
            Arc::new(store.clone()),
            CrossFrameBridge::detached(),
            &PublisherConfig::default(),
        );

        publisher.notify_change("room-42");
        advance(1_500).await;

        assert_eq!(store.write_count(), 0);
        assert!(matches!(
            publisher.current_status(),
            PublisherStatus::ValidationError(_)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn missing_booking_id_is_validation_error() {
        let store = InMemoryBookingStore::new();
        let publisher = MeetingCodePublisher::spawn(
            None,
            Arc::new(store.clone()),
            CrossFrameBridge::detached(),
            &PublisherConfig::default(),
        );

        publisher.notify_change("room-42");
        advance(1_500).await;
        assert_eq!(store.write_count(), 0);
        assert_eq!(
            publisher.current_status(),
            PublisherStatus::ValidationError("no booking id".into())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn remote_error_is_surfaced_and_next_change_retries() {
        let (store, publisher) = setup().await;
        store.set_unavailable(true);

        publisher.notify_change("room-42");
        advance(1_010).await;
        assert_eq!(store.write_count(), 1);
        assert!(matches!(
            publisher.current_status(),
            PublisherStatus::RemoteError(_)
        ));

        // No automatic retry.
        advance(10_000).await;
        assert_eq!(store.write_count(), 1);

        store.set_unavailable(false);
        publisher.notify_change("room-42");
        advance(1_010).await;
        assert_eq!(store.write_count(), 2);
        assert_eq!(store.get(ID).await.unwrap().room_link.as_deref(), Some("room-42"));
    }

    #[tokio::test(start_paused = true)]
    async fn unconfigured_store_leaves_status_untouched() {
        let publisher = MeetingCodePublisher::spawn(
            Some(ID.to_string()),
            Arc::new(UnconfiguredStore),
            CrossFrameBridge::detached(),
            &PublisherConfig::default(),
        );
        publisher.notify_change("room-42");
        advance(1_500).await;
        assert_eq!(publisher.current_status(), PublisherStatus::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn finish_flushes_pending_write() {
        let (store, publisher) = setup().await;
        publisher.notify_change("room-42");
        publisher.finish().await;
        assert_eq!(store.write_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_drops_pending_write() {
        let (store, publisher) = setup().await;
        publisher.notify_change("room-42");
        publisher.shutdown().await;
        advance(2_000).await;
        assert_eq!(store.write_count(), 0);
    }

    /// Parent whose booking-id write blocks until released.
    struct GatedParent {
        release: std::sync::Mutex<std::sync::mpsc::Receiver<()>>,
    }

    impl ParentFrame for GatedParent {
        fn set_field(&self, field: ParentField, _value: &str) -> Result<(), FrameAccessError> {
            if field == ParentField::BookingId {
                let _ = self
                    .release
                    .lock()
                    .unwrap()
                    .recv_timeout(Duration::from_secs(5));
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn slow_parent_does_not_hold_up_writes() {
        let store = InMemoryBookingStore::new();
        store.insert(BookingRecord::pending(ID)).await;
        let (release_tx, release_rx) = std::sync::mpsc::channel();
        let parent = Arc::new(GatedParent {
            release: std::sync::Mutex::new(release_rx),
        });
        let publisher = MeetingCodePublisher::spawn(
            Some(ID.to_string()),
            Arc::new(store.clone()),
            CrossFrameBridge::new(parent),
            &PublisherConfig {
                update_delay_ms: 20,
                throttle_window_ms: 1_000,
            },
        );

        publisher.notify_change("room-1");
        tokio::time::sleep(Duration::from_millis(200)).await;
        publisher.notify_change("room-2");
        tokio::time::sleep(Duration::from_millis(200)).await;

        // The first mirror is still blocked; both writes went through.
        assert_eq!(store.write_count(), 2);
        assert_eq!(
            publisher.current_status(),
            PublisherStatus::Published {
                room_link: "room-2".into()
            }
        );

        release_tx.send(()).unwrap();
        release_tx.send(()).unwrap();
        publisher.finish().await;
    }
}
