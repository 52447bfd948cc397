//! Subscription-style access to room link changes.
//!
//! Callers that only want "tell me when the room link changes" use
//! [`RoomLinkFeed`] and never see the timer. Polling is the only transport
//! today; a push transport would implement the same trait.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{broadcast, watch};
use tracing::warn;

use roomlink_core::ViewClassification;
use roomlink_core::config::PollerConfig;

use crate::poller::{PollerState, RoomLinkEvent, RoomLinkPoller, StatusLine};
use crate::store::BookingStore;
use crate::visibility::Visibility;

#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("Room link feed is only available in the client view")]
    ProView,

    #[error("No booking id to subscribe to")]
    MissingBookingId,
}

#[async_trait]
pub trait RoomLinkFeed: Send + Sync {
    /// Start receiving changes for `booking_id`. Dropping the returned
    /// subscription cancels the underlying transport.
    async fn subscribe(&self, booking_id: &str) -> Result<Subscription, FeedError>;
}

/// Feed backed by a [`RoomLinkPoller`] per subscription.
pub struct PollingFeed {
    store: Arc<dyn BookingStore>,
    router: watch::Receiver<ViewClassification>,
    visibility: watch::Receiver<Visibility>,
    config: PollerConfig,
}

impl PollingFeed {
    pub fn new(
        store: Arc<dyn BookingStore>,
        router: watch::Receiver<ViewClassification>,
        visibility: watch::Receiver<Visibility>,
        config: PollerConfig,
    ) -> Self {
        Self {
            store,
            router,
            visibility,
            config,
        }
    }
}

#[async_trait]
impl RoomLinkFeed for PollingFeed {
    async fn subscribe(&self, booking_id: &str) -> Result<Subscription, FeedError> {
        if booking_id.trim().is_empty() {
            return Err(FeedError::MissingBookingId);
        }
        if self.router.borrow().is_pro() {
            return Err(FeedError::ProView);
        }

        let mut poller = RoomLinkPoller::new(
            Arc::clone(&self.store),
            self.router.clone(),
            self.visibility.clone(),
            &self.config,
        );
        let events = poller.events();
        if !poller.start(booking_id).await {
            return Err(FeedError::ProView);
        }
        let state = poller.state_changes();
        Ok(Subscription {
            poller,
            events,
            state,
        })
    }
}

/// A live room link subscription.
pub struct Subscription {
    poller: RoomLinkPoller,
    events: broadcast::Receiver<RoomLinkEvent>,
    state: watch::Receiver<PollerState>,
}

impl Subscription {
    /// Next event, or `None` once the transport has stopped for good
    /// (for instance after the view switched to pro). Events already
    /// emitted are delivered before `None`.
    pub async fn next(&mut self) -> Option<RoomLinkEvent> {
        loop {
            tokio::select! {
                biased;
                received = self.events.recv() => match received {
                    Ok(event) => return Some(event),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Room link subscriber lagging; events dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => return None,
                },
                () = stopped(&mut self.state) => {
                    return self.events.try_recv().ok();
                }
            }
        }
    }

    pub fn status(&self) -> StatusLine {
        self.poller.status().borrow().clone()
    }

    pub fn room_link(&self) -> Option<String> {
        self.poller.join_input().borrow().clone()
    }

    pub fn state(&self) -> PollerState {
        self.poller.state()
    }

    pub fn booking_id(&self) -> Option<&str> {
        self.poller.booking_id()
    }

    /// Stop the transport and wait for it to wind down.
    pub async fn cancel(mut self) {
        self.poller.destroy().await;
    }
}

/// Resolves once the poller has gone idle.
async fn stopped(state: &mut watch::Receiver<PollerState>) {
    let _ = state.wait_for(|state| *state == PollerState::Idle).await;
}
