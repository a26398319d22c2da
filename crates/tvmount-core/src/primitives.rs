//! # Marketplace Primitives
//!
//! Hardcoded limits and constants for the booking engine.
//!
//! These are compiled into the binary and are immutable at runtime. Every
//! collection a request can grow is bounded by one of them.

/// Maximum number of TVs in a single booking.
pub const MAX_TVS_PER_BOOKING: usize = 8;

/// Smallest TV (diagonal inches) the service accepts.
pub const MIN_TV_INCHES: u16 = 24;

/// Largest TV (diagonal inches) the service accepts.
pub const MAX_TV_INCHES: u16 = 100;

/// Maximum number of add-ons selected for one TV.
pub const MAX_ADDONS_PER_TV: usize = 16;

/// Maximum size of an uploaded room photo (5 MiB).
pub const MAX_PHOTO_BYTES: usize = 5 * 1024 * 1024;

/// Earliest bookable date, in days after today.
pub const MIN_LEAD_DAYS: i64 = 1;

/// Latest bookable date, in days after today.
pub const MAX_HORIZON_DAYS: i64 = 90;

/// Maximum number of wizard drafts held in memory.
///
/// When the cap is reached the oldest draft is evicted.
pub const MAX_OPEN_DRAFTS: usize = 10_000;

/// Length of the customer-facing tracking code.
pub const TRACKING_CODE_LENGTH: usize = 10;

// =============================================================================
// INPUT VALIDATION LIMITS
// =============================================================================

/// Maximum length for names (customer, installer).
pub const MAX_NAME_LENGTH: usize = 120;

/// Maximum length for email addresses (RFC 5321 path limit).
pub const MAX_EMAIL_LENGTH: usize = 254;

/// Maximum length for street addresses.
pub const MAX_ADDRESS_LENGTH: usize = 300;

/// Maximum length for free-text notes.
pub const MAX_NOTES_LENGTH: usize = 2000;

/// Minimum number of digits in a phone number.
pub const MIN_PHONE_DIGITS: usize = 10;

/// Maximum number of digits in a phone number (E.164).
pub const MAX_PHONE_DIGITS: usize = 15;

/// Maximum number of bookings returned by one list call.
pub const MAX_LIST_LIMIT: usize = 500;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tv_size_range_is_sane() {
        assert!(MIN_TV_INCHES < MAX_TV_INCHES);
    }

    #[test]
    fn scheduling_window_is_sane() {
        assert!(MIN_LEAD_DAYS >= 0);
        assert!(MIN_LEAD_DAYS < MAX_HORIZON_DAYS);
    }
}
