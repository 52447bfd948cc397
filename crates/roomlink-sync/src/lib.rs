//! `roomlink` Sync Library
//!
//! Keeps a consultation booking's meeting room link in step between the two
//! sides of a session:
//! - Meeting code publisher for the professional (debounced, throttled writes)
//! - Room link poller and feed for the client (cached, visibility-gated reads)
//! - Role router and tab visibility signals
//! - Booking store seam with `SQLite` and in-process implementations
//! - Best-effort mirroring into an embedding parent context

pub mod bridge;
pub mod feed;
pub mod poller;
pub mod publisher;
pub mod router;
pub mod store;
pub mod visibility;

pub use bridge::{BridgeOutcome, CrossFrameBridge, JsonFieldsParent, ParentFrame};
pub use feed::{FeedError, PollingFeed, RoomLinkFeed, Subscription};
pub use poller::{PollerState, RoomLinkEvent, RoomLinkPoller, StatusLine};
pub use publisher::{MeetingCodePublisher, PublisherStatus};
pub use router::RoleRouter;
pub use store::{BookingDatabase, BookingStore, InMemoryBookingStore, StoreError, UnconfiguredStore};
pub use visibility::{Visibility, VisibilityController};
