//! Booking record model and meeting status display rules.
//!
//! The record itself is owned by the external data service. This module only
//! describes its shape and the fixed priority order used to turn a record
//! into the status line a waiting client sees.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Meeting lifecycle tag stored in `bookings.meeting_status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeetingStatus {
    Pending,
    Scheduled,
    Ready,
}

impl MeetingStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Scheduled => "scheduled",
            Self::Ready => "ready",
        }
    }

    /// Position in the intended forward-only lifecycle.
    ///
    /// `scheduled` sits at the same stage as `pending`: both mean no room yet.
    pub const fn stage(&self) -> u8 {
        match self {
            Self::Pending | Self::Scheduled => 1,
            Self::Ready => 2,
        }
    }

    /// Whether moving from `self` to `next` goes backwards.
    pub const fn is_regression_to(&self, next: Self) -> bool {
        next.stage() < self.stage()
    }
}

impl fmt::Display for MeetingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MeetingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "scheduled" => Ok(Self::Scheduled),
            "ready" => Ok(Self::Ready),
            other => Err(format!("unknown meeting status: {other}")),
        }
    }
}

/// One consultation booking as seen by the reconciliation components.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingRecord {
    pub id: String,
    pub room_link: Option<String>,
    pub meeting_status: Option<MeetingStatus>,
    /// Opaque timestamp text from the data service; shown verbatim.
    pub scheduled_for: Option<String>,
    pub client_name: Option<String>,
    pub client_email: Option<String>,
}

impl BookingRecord {
    /// A freshly booked consultation: no room, status `pending`.
    pub fn pending(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            room_link: None,
            meeting_status: Some(MeetingStatus::Pending),
            scheduled_for: None,
            client_name: None,
            client_email: None,
        }
    }

    /// The room link, ignoring empty or whitespace-only values.
    pub fn room_link(&self) -> Option<&str> {
        non_blank(self.room_link.as_deref())
    }

    pub fn scheduled_for(&self) -> Option<&str> {
        non_blank(self.scheduled_for.as_deref())
    }

    /// Derive the status line for this record.
    pub fn status_display(&self) -> StatusDisplay {
        StatusDisplay::derive(self)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// What the client-side status line shows for a booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StatusDisplay {
    Scheduled { at: String },
    Waiting,
    Ready,
    Connecting,
    WaitingForProfessional,
}

impl StatusDisplay {
    /// Apply the display priority order:
    /// `scheduled_for` > `pending` > `ready` with a room > room alone > nothing.
    pub fn derive(record: &BookingRecord) -> Self {
        if let Some(at) = record.scheduled_for() {
            return Self::Scheduled { at: at.to_string() };
        }
        match (record.meeting_status, record.room_link()) {
            (Some(MeetingStatus::Pending), _) => Self::Waiting,
            (Some(MeetingStatus::Ready), Some(_)) => Self::Ready,
            (_, Some(_)) => Self::Connecting,
            _ => Self::WaitingForProfessional,
        }
    }
}

impl fmt::Display for StatusDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scheduled { at } => write!(f, "Meeting scheduled for {at}"),
            Self::Waiting => f.write_str("Waiting for the professional to start the meeting"),
            Self::Ready => f.write_str("Meeting room is ready"),
            Self::Connecting => f.write_str("Connecting to the meeting room"),
            Self::WaitingForProfessional => {
                f.write_str("Waiting for the professional to create the meeting room")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(
        status: Option<MeetingStatus>,
        room: Option<&str>,
        scheduled: Option<&str>,
    ) -> BookingRecord {
        BookingRecord {
            id: "b1".into(),
            room_link: room.map(Into::into),
            meeting_status: status,
            scheduled_for: scheduled.map(Into::into),
            client_name: None,
            client_email: None,
        }
    }

    #[test]
    fn scheduled_for_wins_over_ready() {
        let r = record(
            Some(MeetingStatus::Ready),
            Some("room-42"),
            Some("2026-10-20T15:00:00Z"),
        );
        assert_eq!(
            r.status_display(),
            StatusDisplay::Scheduled {
                at: "2026-10-20T15:00:00Z".into()
            }
        );
    }

    #[test]
    fn pending_wins_over_room_link() {
        let r = record(Some(MeetingStatus::Pending), Some("room-42"), None);
        assert_eq!(r.status_display(), StatusDisplay::Waiting);
    }

    #[test]
    fn ready_requires_room_link() {
        assert_eq!(
            record(Some(MeetingStatus::Ready), Some("room-42"), None).status_display(),
            StatusDisplay::Ready
        );
        assert_eq!(
            record(Some(MeetingStatus::Ready), None, None).status_display(),
            StatusDisplay::WaitingForProfessional
        );
    }

    #[test]
    fn room_link_alone_is_connecting() {
        assert_eq!(
            record(None, Some("room-42"), None).status_display(),
            StatusDisplay::Connecting
        );
        assert_eq!(
            record(Some(MeetingStatus::Scheduled), Some("room-42"), None).status_display(),
            StatusDisplay::Connecting
        );
    }

    #[test]
    fn blank_fields_count_as_absent() {
        let r = record(None, Some("  "), Some(""));
        assert_eq!(r.status_display(), StatusDisplay::WaitingForProfessional);
        assert!(r.room_link().is_none());
    }

    #[test]
    fn status_parses_case_insensitively() {
        assert_eq!("READY".parse::<MeetingStatus>(), Ok(MeetingStatus::Ready));
        assert_eq!(" pending ".parse::<MeetingStatus>(), Ok(MeetingStatus::Pending));
        assert!("done".parse::<MeetingStatus>().is_err());
    }

    #[test]
    fn regression_detection() {
        assert!(MeetingStatus::Ready.is_regression_to(MeetingStatus::Pending));
        assert!(!MeetingStatus::Pending.is_regression_to(MeetingStatus::Ready));
        assert!(!MeetingStatus::Pending.is_regression_to(MeetingStatus::Scheduled));
    }

    #[test]
    fn display_text() {
        assert_eq!(StatusDisplay::Ready.to_string(), "Meeting room is ready");
        assert_eq!(
            StatusDisplay::Scheduled { at: "tomorrow".into() }.to_string(),
            "Meeting scheduled for tomorrow"
        );
    }
}
