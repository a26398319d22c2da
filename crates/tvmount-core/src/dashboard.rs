//! # Dashboards
//!
//! Read-only projections over stored bookings for the three audiences:
//! admins (`AdminStats`), installers (`InstallerDashboard`), customers
//! (`CustomerDashboard`) plus the public tracking page (`TrackingView`).
//!
//! Everything here is computed from slices handed in by the caller; nothing
//! touches storage.

use crate::booking::{Booking, BookingStatus, StatusEvent};
use crate::installer::Installer;
use crate::tracking::tracking_url;
use crate::{BookingId, Cents, Schedule};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// ADMIN
// =============================================================================

/// Marketplace-wide counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminStats {
    pub total_bookings: usize,
    /// Every status appears, with zero when unused.
    pub by_status: BTreeMap<BookingStatus, usize>,
    /// Sum of quotes for bookings that are not cancelled.
    pub booked_revenue: Cents,
    pub completed_revenue: Cents,
    pub tvs_booked: usize,
    /// Open bookings scheduled today or later.
    pub upcoming: usize,
    pub active_installers: usize,
    pub total_installers: usize,
}

impl AdminStats {
    #[must_use]
    pub fn compute(bookings: &[Booking], installers: &[Installer], today: NaiveDate) -> Self {
        let mut by_status: BTreeMap<BookingStatus, usize> =
            BookingStatus::ALL.into_iter().map(|s| (s, 0)).collect();
        let mut booked_revenue = Cents::ZERO;
        let mut completed_revenue = Cents::ZERO;
        let mut tvs_booked = 0usize;
        let mut upcoming = 0usize;

        for b in bookings {
            *by_status.entry(b.status).or_insert(0) += 1;
            if b.status != BookingStatus::Cancelled {
                booked_revenue = booked_revenue.saturating_add(b.quote.total);
                tvs_booked += b.tv_count();
            }
            if b.status == BookingStatus::Completed {
                completed_revenue = completed_revenue.saturating_add(b.quote.total);
            }
            if b.status.is_open() && b.request.schedule.date >= today {
                upcoming += 1;
            }
        }

        Self {
            total_bookings: bookings.len(),
            by_status,
            booked_revenue,
            completed_revenue,
            tvs_booked,
            upcoming,
            active_installers: installers.iter().filter(|i| i.active).count(),
            total_installers: installers.len(),
        }
    }
}

// =============================================================================
// INSTALLER
// =============================================================================

/// What an installer needs to show up and do the job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSummary {
    pub booking_id: BookingId,
    pub tracking_code: String,
    pub status: BookingStatus,
    pub schedule: Schedule,
    pub customer_name: String,
    pub phone: String,
    pub address: String,
    pub tvs: usize,
    pub total: Cents,
    pub notes: String,
}

impl From<&Booking> for JobSummary {
    fn from(b: &Booking) -> Self {
        let contact = &b.request.contact;
        Self {
            booking_id: b.id,
            tracking_code: b.tracking_code.clone(),
            status: b.status,
            schedule: b.request.schedule,
            customer_name: contact.name.clone(),
            phone: contact.phone.clone(),
            address: contact.address.clone(),
            tvs: b.tv_count(),
            total: b.quote.total,
            notes: b.request.notes.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallerDashboard {
    pub installer: Installer,
    /// Assigned and in-progress jobs, earliest first.
    pub jobs: Vec<JobSummary>,
    pub completed_jobs: usize,
    pub completed_revenue: Cents,
}

impl InstallerDashboard {
    /// `bookings` may contain other installers' jobs; they are ignored.
    #[must_use]
    pub fn compute(installer: Installer, bookings: &[Booking]) -> Self {
        let mine = bookings
            .iter()
            .filter(|b| b.installer == Some(installer.id));

        let mut jobs = Vec::new();
        let mut completed_jobs = 0usize;
        let mut completed_revenue = Cents::ZERO;
        for b in mine {
            match b.status {
                BookingStatus::Assigned | BookingStatus::InProgress => jobs.push(JobSummary::from(b)),
                BookingStatus::Completed => {
                    completed_jobs += 1;
                    completed_revenue = completed_revenue.saturating_add(b.quote.total);
                }
                _ => {}
            }
        }
        jobs.sort_by_key(|j| (j.schedule.date, j.schedule.slot, j.booking_id));

        Self {
            installer,
            jobs,
            completed_jobs,
            completed_revenue,
        }
    }
}

// =============================================================================
// CUSTOMER
// =============================================================================

/// A customer's bookings, newest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerDashboard {
    pub email: String,
    pub bookings: Vec<Booking>,
}

impl CustomerDashboard {
    /// `email` must already be normalized.
    #[must_use]
    pub fn compute(email: &str, bookings: &[Booking]) -> Self {
        let mut mine: Vec<Booking> = bookings
            .iter()
            .filter(|b| b.customer_email() == email)
            .cloned()
            .collect();
        mine.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Self {
            email: email.to_string(),
            bookings: mine,
        }
    }
}

// =============================================================================
// PUBLIC TRACKING
// =============================================================================

/// What anyone holding a tracking code may see. No contact details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingView {
    pub tracking_code: String,
    pub status: BookingStatus,
    pub status_label: String,
    pub schedule: Schedule,
    pub schedule_label: String,
    pub tvs: usize,
    pub total: Cents,
    pub installer_name: Option<String>,
    pub timeline: Vec<StatusEvent>,
    /// Encode this in the QR code.
    pub tracking_url: String,
}

impl TrackingView {
    #[must_use]
    pub fn new(booking: &Booking, installer: Option<&Installer>, public_base_url: &str) -> Self {
        // First name only
        let installer_name = installer
            .and_then(|i| i.name.split_whitespace().next())
            .map(str::to_string);
        Self {
            tracking_code: booking.tracking_code.clone(),
            status: booking.status,
            status_label: booking.status.to_string(),
            schedule: booking.request.schedule,
            schedule_label: booking.request.schedule.to_string(),
            tvs: booking.tv_count(),
            total: booking.quote.total,
            installer_name,
            timeline: booking.history.clone(),
            tracking_url: tracking_url(public_base_url, &booking.tracking_code),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::booking::BookingRequest;
    use crate::catalog::Catalog;
    use crate::installer::InstallerRequest;
    use crate::pricing::{TvConfig, quote};
    use crate::{Contact, InstallerId, TimeSlot};
    use chrono::{DateTime, Duration, Utc};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 6, d).unwrap_or_default()
    }

    fn booking(id: u64, email: &str, date: NaiveDate, tier: &str) -> Booking {
        let tvs = vec![TvConfig {
            size_inches: 50,
            tier: tier.into(),
            wall_type: "drywall".into(),
            mount_type: "customer_provided".into(),
            addons: Vec::new(),
            photo: None,
        }];
        let q = quote(&Catalog::default(), &tvs).expect("quote");
        let request = BookingRequest {
            tvs,
            schedule: Schedule {
                date,
                slot: TimeSlot::Morning,
            },
            contact: Contact {
                name: "Lee Park".into(),
                email: email.into(),
                phone: "5551112222".into(),
                address: "9 Oak Ave".into(),
            },
            notes: String::new(),
        };
        let created = DateTime::<Utc>::UNIX_EPOCH + Duration::seconds(i64::try_from(id).unwrap_or(0));
        Booking::new(BookingId(id), format!("CODE{id:06}"), request, q, created)
    }

    fn installer(id: u64, active: bool) -> Installer {
        let mut i = Installer::new(
            InstallerId(id),
            InstallerRequest {
                name: "Sam Rivera".into(),
                email: "sam@example.com".into(),
                phone: "5559876543".into(),
                service_area: String::new(),
            },
            DateTime::<Utc>::UNIX_EPOCH,
        );
        i.active = active;
        i
    }

    fn at() -> DateTime<Utc> {
        DateTime::<Utc>::UNIX_EPOCH
    }

    #[test]
    fn admin_stats_counts_and_revenue() {
        let mut cancelled = booking(1, "a@x.com", day(10), "basic");
        cancelled
            .transition(BookingStatus::Cancelled, at(), None)
            .expect("cancel");
        let pending = booking(2, "b@x.com", day(12), "standard");
        let mut done = booking(3, "c@x.com", day(1), "premium");
        done.transition(BookingStatus::Confirmed, at(), None).expect("confirm");
        done.assign(InstallerId(1), at()).expect("assign");
        done.transition(BookingStatus::InProgress, at(), None).expect("start");
        done.transition(BookingStatus::Completed, at(), None).expect("complete");

        let stats = AdminStats::compute(
            &[cancelled, pending, done],
            &[installer(1, true), installer(2, false)],
            day(5),
        );
        assert_eq!(stats.total_bookings, 3);
        assert_eq!(stats.by_status[&BookingStatus::Cancelled], 1);
        assert_eq!(stats.by_status[&BookingStatus::Confirmed], 0);
        assert_eq!(stats.booked_revenue, Cents::new(12900 + 19900));
        assert_eq!(stats.completed_revenue, Cents::new(19900));
        assert_eq!(stats.tvs_booked, 2);
        assert_eq!(stats.upcoming, 1);
        assert_eq!(stats.active_installers, 1);
        assert_eq!(stats.total_installers, 2);
    }

    #[test]
    fn installer_jobs_sorted_and_filtered() {
        let mut later = booking(1, "a@x.com", day(20), "basic");
        let mut sooner = booking(2, "b@x.com", day(8), "basic");
        let mut other = booking(3, "c@x.com", day(2), "basic");
        for (b, who) in [(&mut later, 1), (&mut sooner, 1), (&mut other, 2)] {
            b.transition(BookingStatus::Confirmed, at(), None).expect("confirm");
            b.assign(InstallerId(who), at()).expect("assign");
        }

        let dash = InstallerDashboard::compute(installer(1, true), &[later, sooner, other]);
        let ids: Vec<_> = dash.jobs.iter().map(|j| j.booking_id).collect();
        assert_eq!(ids, vec![BookingId(2), BookingId(1)]);
        assert_eq!(dash.completed_jobs, 0);
        assert_eq!(dash.jobs[0].address, "9 Oak Ave");
    }

    #[test]
    fn customer_sees_only_own_bookings_newest_first() {
        let all = [
            booking(1, "me@x.com", day(3), "basic"),
            booking(2, "you@x.com", day(3), "basic"),
            booking(3, "Me@X.com", day(4), "basic"),
        ];
        let dash = CustomerDashboard::compute("me@x.com", &all);
        let ids: Vec<_> = dash.bookings.iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![BookingId(3), BookingId(1)]);
    }

    #[test]
    fn tracking_view_hides_contact() {
        let mut b = booking(1, "me@x.com", day(3), "basic");
        b.transition(BookingStatus::Confirmed, at(), None).expect("confirm");
        b.assign(InstallerId(1), at()).expect("assign");
        let view = TrackingView::new(&b, Some(&installer(1, true)), "https://tv.example");
        assert_eq!(view.installer_name.as_deref(), Some("Sam"));
        assert_eq!(view.status_label, "Installer assigned");
        assert_eq!(view.timeline.len(), 3);
        assert_eq!(view.tracking_url, "https://tv.example/track/CODE000001");
        assert!(!format!("{view:?}").contains("9 Oak Ave"));
    }
}
