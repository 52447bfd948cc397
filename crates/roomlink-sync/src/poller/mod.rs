//! Room link poller (client side).
//!
//! Periodically reads one booking and surfaces its room link and status to
//! the local UI. Reads younger than the cache expiry are reused, every read
//! is time-boxed, and the timer only exists while the host tab is visible.
//! A tick awaits its read before the next tick can start, so at most one read
//! is in flight.

mod cache;
mod types;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, trace, warn};

use roomlink_core::config::PollerConfig;
use roomlink_core::{BookingRecord, MeetingStatus, ViewClassification};

use crate::store::{BookingStore, StoreError};
use crate::visibility::Visibility;

use cache::ReadCache;
pub use types::{PollerState, RoomLinkEvent, StatusLine};

const EVENT_CAPACITY: usize = 64;
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Channels the poller writes to. Shared between the handle and its task.
struct Outputs {
    state_tx: watch::Sender<PollerState>,
    join_tx: watch::Sender<Option<String>>,
    status_tx: watch::Sender<StatusLine>,
    events_tx: broadcast::Sender<RoomLinkEvent>,
}

impl Outputs {
    fn new() -> Self {
        let (state_tx, _) = watch::channel(PollerState::Idle);
        let (join_tx, _) = watch::channel(None);
        let (status_tx, _) = watch::channel(StatusLine::default());
        let (events_tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            state_tx,
            join_tx,
            status_tx,
            events_tx,
        }
    }

    fn set_state(&self, state: PollerState) {
        self.state_tx.send_if_modified(|current| {
            let changed = *current != state;
            *current = state;
            changed
        });
    }

    fn set_status(&self, status: StatusLine) {
        let changed = self.status_tx.send_if_modified(|current| {
            if *current == status {
                false
            } else {
                *current = status.clone();
                true
            }
        });
        if changed {
            let _ = self.events_tx.send(RoomLinkEvent::StatusChanged(status));
        }
    }
}

struct Running {
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

/// Client-side poller for one booking at a time.
pub struct RoomLinkPoller {
    store: Arc<dyn BookingStore>,
    router: watch::Receiver<ViewClassification>,
    visibility: watch::Receiver<Visibility>,
    config: PollerConfig,
    outputs: Arc<Outputs>,
    cache: Arc<Mutex<ReadCache>>,
    booking_id: Option<String>,
    running: Option<Running>,
}

impl RoomLinkPoller {
    pub fn new(
        store: Arc<dyn BookingStore>,
        router: watch::Receiver<ViewClassification>,
        visibility: watch::Receiver<Visibility>,
        config: &PollerConfig,
    ) -> Self {
        Self {
            store,
            router,
            visibility,
            config: config.clone(),
            outputs: Arc::new(Outputs::new()),
            cache: Arc::new(Mutex::new(ReadCache::new(config.cache_expiry()))),
            booking_id: None,
            running: None,
        }
    }

    /// Start polling `booking_id`. Rejected (returns `false`) in the pro view
    /// or for a blank id. Restarting with another id drops the cached read.
    pub async fn start(&mut self, booking_id: &str) -> bool {
        let booking_id = booking_id.trim();
        if booking_id.is_empty() {
            debug!("Not polling: no booking id");
            return false;
        }
        if self.router.borrow().is_pro() {
            debug!(booking_id, "Not polling in pro view");
            return false;
        }

        self.stop().await;
        if self.booking_id.as_deref() != Some(booking_id) {
            lock(&self.cache).invalidate();
            self.booking_id = Some(booking_id.to_string());
        }

        let initial = if *self.visibility.borrow() == Visibility::Hidden {
            PollerState::Paused
        } else {
            PollerState::Active
        };
        self.outputs.set_state(initial);

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = PollTask {
            booking_id: booking_id.to_string(),
            store: Arc::clone(&self.store),
            router: self.router.clone(),
            visibility: self.visibility.clone(),
            visibility_open: true,
            poll_interval: self.config.poll_interval().max(MIN_POLL_INTERVAL),
            read_timeout: self.config.read_timeout(),
            outputs: Arc::clone(&self.outputs),
            cache: Arc::clone(&self.cache),
            last_status: None,
            reported_unconfigured: false,
        };
        self.running = Some(Running {
            shutdown_tx,
            task: tokio::spawn(task.run(shutdown_rx)),
        });
        true
    }

    /// Cancel polling, keeping the booking id and cached read.
    pub async fn stop(&mut self) {
        if let Some(running) = self.running.take() {
            running.shutdown_tx.send_replace(true);
            let _ = running.task.await;
        }
        self.outputs.set_state(PollerState::Idle);
    }

    /// Cancel polling and forget the booking.
    pub async fn destroy(&mut self) {
        self.stop().await;
        lock(&self.cache).invalidate();
        self.booking_id = None;
    }

    pub fn state(&self) -> PollerState {
        *self.outputs.state_tx.borrow()
    }

    pub fn booking_id(&self) -> Option<&str> {
        self.booking_id.as_deref()
    }

    pub fn state_changes(&self) -> watch::Receiver<PollerState> {
        self.outputs.state_tx.subscribe()
    }

    /// The local join input, updated whenever a new room link is observed.
    pub fn join_input(&self) -> watch::Receiver<Option<String>> {
        self.outputs.join_tx.subscribe()
    }

    /// Local edit of the join input (the user typed or cleared it).
    pub fn set_join_input(&self, value: Option<String>) {
        self.outputs.join_tx.send_replace(value);
    }

    pub fn status(&self) -> watch::Receiver<StatusLine> {
        self.outputs.status_tx.subscribe()
    }

    pub fn events(&self) -> broadcast::Receiver<RoomLinkEvent> {
        self.outputs.events_tx.subscribe()
    }
}

impl Drop for RoomLinkPoller {
    fn drop(&mut self) {
        if let Some(running) = &self.running {
            running.shutdown_tx.send_replace(true);
        }
    }
}

fn lock(cache: &Mutex<ReadCache>) -> MutexGuard<'_, ReadCache> {
    cache.lock().unwrap_or_else(PoisonError::into_inner)
}

enum Phase {
    Hidden,
    Stopped,
}

struct PollTask {
    booking_id: String,
    store: Arc<dyn BookingStore>,
    router: watch::Receiver<ViewClassification>,
    visibility: watch::Receiver<Visibility>,
    /// `false` once the visibility controller is gone; treated as visible.
    visibility_open: bool,
    poll_interval: Duration,
    read_timeout: Duration,
    outputs: Arc<Outputs>,
    cache: Arc<Mutex<ReadCache>>,
    last_status: Option<MeetingStatus>,
    reported_unconfigured: bool,
}

impl PollTask {
    async fn run(mut self, mut shutdown_rx: watch::Receiver<bool>) {
        info!(booking_id = %self.booking_id, "Room link polling started");

        loop {
            if self.is_hidden() {
                self.outputs.set_state(PollerState::Paused);
                debug!(booking_id = %self.booking_id, "Tab hidden; polling paused");
                if !self.wait_until_visible(&mut shutdown_rx).await {
                    break;
                }
                debug!(booking_id = %self.booking_id, "Tab visible; polling resumed");
            }

            self.outputs.set_state(PollerState::Active);
            match self.poll_while_visible(&mut shutdown_rx).await {
                Phase::Hidden => {}
                Phase::Stopped => break,
            }
        }

        self.outputs.set_state(PollerState::Idle);
        info!(booking_id = %self.booking_id, "Room link polling stopped");
    }

    fn is_hidden(&mut self) -> bool {
        self.visibility_open && *self.visibility.borrow_and_update() == Visibility::Hidden
    }

    /// Returns `false` if shutdown was requested while waiting.
    async fn wait_until_visible(&mut self, shutdown_rx: &mut watch::Receiver<bool>) -> bool {
        loop {
            tokio::select! {
                biased;
                _ = shutdown_rx.changed() => return false,
                changed = self.visibility.changed() => {
                    if changed.is_err() {
                        self.visibility_open = false;
                        return true;
                    }
                    if *self.visibility.borrow_and_update() == Visibility::Visible {
                        return true;
                    }
                }
            }
        }
    }

    /// Tick until the tab hides, shutdown is requested, or the view turns pro.
    /// The interval is dropped on return.
    async fn poll_while_visible(&mut self, shutdown_rx: &mut watch::Receiver<bool>) -> Phase {
        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = shutdown_rx.changed() => return Phase::Stopped,
                changed = self.visibility.changed(), if self.visibility_open => {
                    if changed.is_err() {
                        self.visibility_open = false;
                    } else if *self.visibility.borrow_and_update() == Visibility::Hidden {
                        return Phase::Hidden;
                    }
                }
                _ = interval.tick() => {
                    if self.router.borrow().is_pro() {
                        info!(booking_id = %self.booking_id, "View switched to pro; polling stopped");
                        return Phase::Stopped;
                    }
                    self.tick().await;
                }
            }
        }
    }

    async fn tick(&mut self) {
        let cached = lock(&self.cache).fresh(&self.booking_id).cloned();
        let record = if let Some(record) = cached {
            trace!(booking_id = %self.booking_id, "Using cached booking read");
            record
        } else {
            match self.read().await {
                Some(record) => record,
                None => return,
            }
        };
        self.apply(&record);
    }

    async fn read(&mut self) -> Option<BookingRecord> {
        let result = tokio::time::timeout(self.read_timeout, self.store.fetch(&self.booking_id))
            .await
            .unwrap_or(Err(StoreError::Timeout(self.read_timeout)));
        match result {
            Ok(Some(record)) => {
                lock(&self.cache).store(&self.booking_id, record.clone());
                Some(record)
            }
            Ok(None) => {
                warn!(booking_id = %self.booking_id, "Booking not found");
                None
            }
            Err(StoreError::NotConfigured) => {
                if !self.reported_unconfigured {
                    warn!(booking_id = %self.booking_id, "Booking store not configured; room link unavailable");
                    self.reported_unconfigured = true;
                }
                None
            }
            Err(e) => {
                warn!(booking_id = %self.booking_id, error = %e, "Failed to read booking");
                self.outputs.set_status(StatusLine::Reconnecting);
                None
            }
        }
    }

    fn apply(&mut self, record: &BookingRecord) {
        if let Some(next) = record.meeting_status {
            if let Some(previous) = self.last_status
                && previous.is_regression_to(next)
            {
                warn!(
                    booking_id = %self.booking_id,
                    from = %previous,
                    to = %next,
                    "Meeting status moved backwards"
                );
            }
            self.last_status = Some(next);
        }

        self.outputs
            .set_status(StatusLine::Meeting(record.status_display()));

        let Some(room_link) = record.room_link() else {
            return;
        };
        let changed = self.outputs.join_tx.send_if_modified(|current| {
            if current.as_deref() == Some(room_link) {
                false
            } else {
                *current = Some(room_link.to_string());
                true
            }
        });
        if !changed {
            return;
        }

        info!(booking_id = %self.booking_id, room_link, "Room link updated");
        let _ = self.outputs.events_tx.send(RoomLinkEvent::RoomLinkChanged {
            booking_id: self.booking_id.clone(),
            room_link: room_link.to_string(),
        });
        if self.router.borrow().auto_join {
            let _ = self.outputs.events_tx.send(RoomLinkEvent::AutoJoinRequested {
                booking_id: self.booking_id.clone(),
                room_link: room_link.to_string(),
            });
        }
    }
}
