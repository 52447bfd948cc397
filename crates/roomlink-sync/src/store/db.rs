//! Database connection and initialization.

pub use roomlink_core::db::DatabaseError;

roomlink_core::define_database!(BookingDatabase, "Booking database migrations complete");
