//! Poller output types.

use std::fmt;

use roomlink_core::StatusDisplay;

/// Lifecycle of a poller instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PollerState {
    #[default]
    Idle,
    Active,
    /// Host tab hidden; no timer is running.
    Paused,
}

/// Client-side status line.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StatusLine {
    /// Nothing read yet.
    #[default]
    Connecting,
    Meeting(StatusDisplay),
    /// Last read failed; the next tick retries.
    Reconnecting,
}

impl fmt::Display for StatusLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connecting => f.write_str("Checking meeting status..."),
            Self::Meeting(display) => display.fmt(f),
            Self::Reconnecting => f.write_str("Connection lost, reconnecting..."),
        }
    }
}

/// Change notifications emitted by the poller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomLinkEvent {
    StatusChanged(StatusLine),
    /// A new non-empty room link was written into the join input.
    RoomLinkChanged { booking_id: String, room_link: String },
    /// Same as above, for a page opened with `auto_join=true`.
    AutoJoinRequested { booking_id: String, room_link: String },
}
