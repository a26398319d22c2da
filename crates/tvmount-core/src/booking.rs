//! # Booking Lifecycle
//!
//! A booking moves through a small, one-directional status machine:
//!
//! ```text
//! Pending ──► Confirmed ──► Assigned ──► InProgress ──► Completed
//!    │            │            │  ▲
//!    │            │            └──┘ (reassign)
//!    └────────────┴────────────┴──────► Cancelled
//! ```
//!
//! Completed and Cancelled are terminal. Every change is appended to the
//! booking's history, which doubles as the customer-facing tracking
//! timeline.

use crate::catalog::Catalog;
use crate::pricing::{self, Quote, TvConfig};
use crate::primitives::MAX_TVS_PER_BOOKING;
use crate::validation;
use crate::{BookingId, Contact, InstallerId, MarketError, Schedule};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// STATUS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Assigned,
    InProgress,
    Completed,
    Cancelled,
}

impl BookingStatus {
    pub const ALL: [Self; 6] = [
        Self::Pending,
        Self::Confirmed,
        Self::Assigned,
        Self::InProgress,
        Self::Completed,
        Self::Cancelled,
    ];

    /// Whether the lifecycle allows `self → to`.
    #[must_use]
    pub const fn can_transition_to(self, to: Self) -> bool {
        matches!(
            (self, to),
            (Self::Pending, Self::Confirmed | Self::Cancelled)
                | (Self::Confirmed, Self::Assigned | Self::Cancelled)
                | (
                    Self::Assigned,
                    Self::Assigned | Self::InProgress | Self::Cancelled
                )
                | (Self::InProgress, Self::Completed)
        )
    }

    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Statuses with a scheduled visit still ahead.
    #[must_use]
    pub const fn is_open(self) -> bool {
        !self.is_terminal()
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Assigned => "assigned",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Parse the snake_case name used on the wire.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|st| st.as_str() == s)
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Pending => "Pending review",
            Self::Confirmed => "Confirmed",
            Self::Assigned => "Installer assigned",
            Self::InProgress => "Installation in progress",
            Self::Completed => "Completed",
            Self::Cancelled => "Cancelled",
        };
        f.write_str(label)
    }
}

// =============================================================================
// REQUEST
// =============================================================================

/// Everything a customer submits to book an installation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingRequest {
    pub tvs: Vec<TvConfig>,
    pub schedule: Schedule,
    pub contact: Contact,
    #[serde(default)]
    pub notes: String,
}

impl BookingRequest {
    /// Apply every wizard predicate to a complete request.
    pub fn validate(&self, catalog: &Catalog, today: NaiveDate) -> Result<(), MarketError> {
        if self.tvs.is_empty() {
            return Err(MarketError::invalid("A booking needs at least one TV"));
        }
        if self.tvs.len() > MAX_TVS_PER_BOOKING {
            return Err(MarketError::invalid(format!(
                "A booking holds at most {MAX_TVS_PER_BOOKING} TVs"
            )));
        }
        for tv in &self.tvs {
            tv.validate(catalog)?;
        }
        validation::schedule(&self.schedule, today)?;
        validation::contact(&self.contact)?;
        validation::notes(&self.notes)?;
        Ok(())
    }

    /// Price the request against the catalog.
    pub fn quote(&self, catalog: &Catalog) -> Result<Quote, MarketError> {
        pricing::quote(catalog, &self.tvs)
    }
}

// =============================================================================
// BOOKING
// =============================================================================

/// One entry of the status timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEvent {
    pub status: BookingStatus,
    pub at: DateTime<Utc>,
    #[serde(default)]
    pub note: Option<String>,
}

/// A persisted booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub id: BookingId,
    pub tracking_code: String,
    pub request: BookingRequest,
    /// Frozen at creation; later catalog changes do not reprice it.
    pub quote: Quote,
    pub status: BookingStatus,
    pub installer: Option<InstallerId>,
    pub history: Vec<StatusEvent>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    /// A new pending booking.
    #[must_use]
    pub fn new(
        id: BookingId,
        tracking_code: String,
        request: BookingRequest,
        quote: Quote,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            tracking_code,
            request,
            quote,
            status: BookingStatus::Pending,
            installer: None,
            history: vec![StatusEvent {
                status: BookingStatus::Pending,
                at: now,
                note: None,
            }],
            created_at: now,
            updated_at: now,
        }
    }

    /// Move to `to` if the lifecycle allows it, recording the change.
    pub fn transition(
        &mut self,
        to: BookingStatus,
        now: DateTime<Utc>,
        note: Option<String>,
    ) -> Result<(), MarketError> {
        if !self.status.can_transition_to(to) {
            return Err(MarketError::InvalidTransition {
                from: self.status,
                to,
            });
        }
        self.status = to;
        self.updated_at = now;
        self.history.push(StatusEvent {
            status: to,
            at: now,
            note,
        });
        Ok(())
    }

    /// Assign (or reassign) an installer.
    pub fn assign(&mut self, installer: InstallerId, now: DateTime<Utc>) -> Result<(), MarketError> {
        if self.installer == Some(installer) && self.status == BookingStatus::Assigned {
            return Ok(());
        }
        self.transition(BookingStatus::Assigned, now, None)?;
        self.installer = Some(installer);
        Ok(())
    }

    #[must_use]
    pub fn customer_email(&self) -> String {
        self.request.contact.normalized_email()
    }

    #[must_use]
    pub fn tv_count(&self) -> usize {
        self.request.tvs.len()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TimeSlot;

    fn now() -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(1_780_000_000, 0).unwrap_or_default()
    }

    fn booking() -> Booking {
        let request = BookingRequest {
            tvs: vec![],
            schedule: Schedule {
                date: NaiveDate::from_ymd_opt(2026, 6, 1).unwrap_or_default(),
                slot: TimeSlot::Morning,
            },
            contact: Contact::default(),
            notes: String::new(),
        };
        Booking::new(
            BookingId(1),
            "ABC".into(),
            request,
            Quote::default(),
            now(),
        )
    }

    #[test]
    fn transition_table() {
        use BookingStatus::*;
        assert!(Pending.can_transition_to(Confirmed));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(!Pending.can_transition_to(Assigned));
        assert!(!Pending.can_transition_to(Completed));
        assert!(Assigned.can_transition_to(Assigned));
        assert!(!InProgress.can_transition_to(Cancelled));
        for to in BookingStatus::ALL {
            assert!(!Completed.can_transition_to(to));
            assert!(!Cancelled.can_transition_to(to));
        }
    }

    #[test]
    fn history_records_changes() {
        let mut b = booking();
        b.transition(BookingStatus::Confirmed, now(), Some("ok".into()))
            .expect("confirm");
        assert_eq!(b.history.len(), 2);
        assert_eq!(b.history[1].status, BookingStatus::Confirmed);
        assert_eq!(b.history[1].note.as_deref(), Some("ok"));
    }

    #[test]
    fn invalid_transition_leaves_booking_unchanged() {
        let mut b = booking();
        let result = b.transition(BookingStatus::Completed, now(), None);
        assert!(matches!(result, Err(MarketError::InvalidTransition { .. })));
        assert_eq!(b.status, BookingStatus::Pending);
        assert_eq!(b.history.len(), 1);
    }

    #[test]
    fn assign_requires_confirmation() {
        let mut b = booking();
        assert!(b.assign(InstallerId(7), now()).is_err());
        b.transition(BookingStatus::Confirmed, now(), None)
            .expect("confirm");
        b.assign(InstallerId(7), now()).expect("assign");
        assert_eq!(b.installer, Some(InstallerId(7)));
        // Same installer again is idempotent.
        b.assign(InstallerId(7), now()).expect("assign again");
        assert_eq!(b.history.len(), 3);
        b.assign(InstallerId(8), now()).expect("reassign");
        assert_eq!(b.installer, Some(InstallerId(8)));
        assert_eq!(b.history.len(), 4);
    }

    #[test]
    fn status_parse_roundtrip() {
        for st in BookingStatus::ALL {
            assert_eq!(BookingStatus::parse(st.as_str()), Some(st));
        }
        assert_eq!(BookingStatus::parse("lost"), None);
    }

    #[test]
    fn empty_request_rejected() {
        let catalog = Catalog::default();
        let b = booking();
        assert!(b.request.validate(&catalog, NaiveDate::MIN).is_err());
    }
}
