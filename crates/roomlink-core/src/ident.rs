//! Booking identifier validation.
//!
//! The data service keys bookings by v4 UUIDs in canonical hyphenated form.
//! Writes with anything else are rejected before any remote call is made.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{Error, Result};

static BOOKING_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[0-9a-f]{8}-[0-9a-f]{4}-4[0-9a-f]{3}-[89ab][0-9a-f]{3}-[0-9a-f]{12}$")
        .expect("static regex is valid")
});

/// Whether `id` is a canonical v4 UUID.
pub fn is_valid_booking_id(id: &str) -> bool {
    BOOKING_ID_RE.is_match(id)
}

/// Validate a booking identifier, returning it trimmed on success.
pub fn validate_booking_id(id: &str) -> Result<&str> {
    let trimmed = id.trim();
    if is_valid_booking_id(trimmed) {
        Ok(trimmed)
    } else {
        Err(Error::InvalidBookingId(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_v4_uuid_any_case() {
        assert!(is_valid_booking_id("3f2504e0-4f89-41d3-9a0c-0305e82c3301"));
        assert!(is_valid_booking_id("3F2504E0-4F89-41D3-9A0C-0305E82C3301"));
    }

    #[test]
    fn rejects_other_versions_and_shapes() {
        // version 1
        assert!(!is_valid_booking_id("3f2504e0-4f89-11d3-9a0c-0305e82c3301"));
        // bad variant nibble
        assert!(!is_valid_booking_id("3f2504e0-4f89-41d3-7a0c-0305e82c3301"));
        assert!(!is_valid_booking_id("3f2504e04f8941d39a0c0305e82c3301"));
        assert!(!is_valid_booking_id("b1"));
        assert!(!is_valid_booking_id(""));
    }

    #[test]
    fn validate_trims_whitespace() {
        let id = validate_booking_id(" 3f2504e0-4f89-41d3-9a0c-0305e82c3301\n");
        assert!(matches!(id, Ok("3f2504e0-4f89-41d3-9a0c-0305e82c3301")));
        assert!(matches!(
            validate_booking_id("default"),
            Err(Error::InvalidBookingId(_))
        ));
    }
}
