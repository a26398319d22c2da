//! # Core Type Definitions
//!
//! This module contains the shared types of the booking engine:
//! - Identifiers (`BookingId`, `InstallerId`, `DraftId`, `PhotoId`)
//! - Money (`Cents`)
//! - Scheduling and contact data (`TimeSlot`, `Schedule`, `Contact`)
//! - The wizard step enumeration (`Step`)
//! - Error types (`MarketError`)
//!
//! ## Arithmetic Guarantees
//!
//! All money is integer cents. Sums saturate at `i64::MAX`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Identifier of a persisted booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BookingId(pub u64);

/// Identifier of a registered installer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct InstallerId(pub u64);

/// Identifier of a volatile wizard draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DraftId(pub u64);

/// Content address of an uploaded photo (BLAKE3 hex digest).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PhotoId(pub String);

impl PhotoId {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BookingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for InstallerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// MONEY
// =============================================================================

/// An amount of money in integer cents.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct Cents(pub i64);

impl Cents {
    pub const ZERO: Self = Self(0);

    #[must_use]
    pub const fn new(cents: i64) -> Self {
        Self(cents)
    }

    #[must_use]
    pub const fn value(self) -> i64 {
        self.0
    }

    /// Add two amounts, saturating at `i64::MAX`.
    #[must_use]
    pub const fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }
}

impl std::iter::Sum for Cents {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Self::saturating_add)
    }
}

impl fmt::Display for Cents {
    /// Renders as dollars, e.g. `$129.00`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}${}.{:02}", sign, abs / 100, abs % 100)
    }
}

// =============================================================================
// SCHEDULING
// =============================================================================

/// Arrival window offered to customers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeSlot {
    /// 08:00 - 12:00
    Morning,
    /// 12:00 - 16:00
    Afternoon,
    /// 16:00 - 20:00
    Evening,
}

impl TimeSlot {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Morning => "8am - 12pm",
            Self::Afternoon => "12pm - 4pm",
            Self::Evening => "4pm - 8pm",
        }
    }
}

/// Requested installation appointment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Schedule {
    pub date: NaiveDate,
    pub slot: TimeSlot,
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.date.format("%A, %B %-d, %Y"), self.slot.label())
    }
}

// =============================================================================
// CONTACT
// =============================================================================

/// Customer contact details collected by the last wizard step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Contact {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
}

impl Contact {
    /// The same details with surrounding whitespace removed.
    #[must_use]
    pub fn trimmed(self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            phone: self.phone.trim().to_string(),
            address: self.address.trim().to_string(),
        }
    }

    /// Email normalized for lookups (trimmed, lower case).
    #[must_use]
    pub fn normalized_email(&self) -> String {
        normalize_email(&self.email)
    }
}

/// Normalize an email address for comparison.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

// =============================================================================
// WIZARD STEPS
// =============================================================================

/// The ordered steps of the booking wizard.
///
/// The first five are repeated once per TV; the rest apply to the whole
/// booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Photo,
    TvSize,
    ServiceTier,
    Mounting,
    AddOns,
    Schedule,
    Contact,
    Review,
}

impl Step {
    /// Steps repeated for every TV, in order.
    pub const PER_TV: [Self; 5] = [
        Self::Photo,
        Self::TvSize,
        Self::ServiceTier,
        Self::Mounting,
        Self::AddOns,
    ];

    /// Whether this step edits the TV under the cursor.
    #[must_use]
    pub const fn is_per_tv(self) -> bool {
        matches!(
            self,
            Self::Photo | Self::TvSize | Self::ServiceTier | Self::Mounting | Self::AddOns
        )
    }

    /// Position of the step within its group (per-TV group or booking group).
    #[must_use]
    pub const fn ordinal(self) -> usize {
        match self {
            Self::Photo | Self::Schedule => 0,
            Self::TvSize | Self::Contact => 1,
            Self::ServiceTier | Self::Review => 2,
            Self::Mounting => 3,
            Self::AddOns => 4,
        }
    }

    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::Photo => "Upload a photo",
            Self::TvSize => "TV size",
            Self::ServiceTier => "Service tier",
            Self::Mounting => "Wall and mount",
            Self::AddOns => "Add-ons",
            Self::Schedule => "Schedule",
            Self::Contact => "Contact details",
            Self::Review => "Review",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the booking engine.
///
/// - No silent failures
/// - Use `Result<T, MarketError>` for fallible operations
/// - The engine never panics; all errors are recoverable
#[derive(Debug, Error)]
pub enum MarketError {
    /// A field failed validation.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The wizard cannot leave a step whose required fields are missing.
    #[error("Step '{0}' is incomplete")]
    IncompleteStep(Step),

    /// Input was sent for a step other than the current one.
    #[error("Wizard is on step '{current}', not '{requested}'")]
    WrongStep { current: Step, requested: Step },

    /// A tier, add-on, wall type or mount type id is not in the catalog.
    #[error("Unknown catalog item: {0}")]
    UnknownCatalogItem(String),

    #[error("Booking not found: {0}")]
    BookingNotFound(BookingId),

    #[error("Installer not found: {0}")]
    InstallerNotFound(InstallerId),

    #[error("Draft not found: {0:?}")]
    DraftNotFound(DraftId),

    #[error("Photo not found")]
    PhotoNotFound,

    #[error("No booking matches tracking code")]
    TrackingCodeNotFound,

    /// A booking status change not allowed by the lifecycle.
    #[error("Cannot move booking from {from:?} to {to:?}")]
    InvalidTransition {
        from: crate::booking::BookingStatus,
        to: crate::booking::BookingStatus,
    },

    /// Credentials were missing or did not match.
    #[error("Unauthorized")]
    Unauthorized,

    /// A serialization or deserialization error occurred.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// A storage I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(String),
}

impl MarketError {
    /// Shorthand for a validation failure.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

// =============================================================================
// TESTS
// =============================================================================
