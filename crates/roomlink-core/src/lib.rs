//! `roomlink` Core Library
//!
//! Shared, runtime-free functionality for room-link reconciliation:
//! - Booking record model and meeting status display rules
//! - Booking identifier validation
//! - Entry parameter parsing and client/pro role classification
//! - Configuration resolution and hierarchy
//! - Common error and database types

pub mod booking;
pub mod config;
pub mod db;
pub mod error;
pub mod ident;
pub mod routing;
pub mod tracing_init;

pub use booking::{BookingRecord, MeetingStatus, StatusDisplay};
pub use config::Config;
pub use error::{Error, Result};
pub use routing::{EntryParams, View, ViewClassification, VisibilityGroup, classify};
