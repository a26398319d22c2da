//! # Email Notifications
//!
//! Plain-text messages composed from booking state. The engine only builds
//! them; delivery is the caller's job, and a failed delivery never undoes
//! the booking change that produced it.

use crate::booking::Booking;
use crate::installer::Installer;
use crate::pricing::LineKind;
use crate::tracking::tracking_url;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// What happened to the booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Received,
    Confirmed,
    Assigned,
    Started,
    Completed,
    Cancelled,
}

/// A message ready to send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Build the messages for `kind`.
///
/// The customer always gets one. On assignment the installer gets a job
/// sheet as well.
#[must_use]
pub fn compose(
    kind: NotificationKind,
    booking: &Booking,
    installer: Option<&Installer>,
    public_base_url: &str,
) -> Vec<Notification> {
    let contact = &booking.request.contact;
    let url = tracking_url(public_base_url, &booking.tracking_code);
    let first_name = contact.name.split_whitespace().next().unwrap_or("there");
    let when = booking.request.schedule.to_string();

    let (subject, lead) = match kind {
        NotificationKind::Received => (
            format!("We received your booking {}", booking.tracking_code),
            format!(
                "Thanks for booking with us. We'll confirm your appointment for {when} shortly."
            ),
        ),
        NotificationKind::Confirmed => (
            format!("Booking {} confirmed", booking.tracking_code),
            format!("Your installation is confirmed for {when}."),
        ),
        NotificationKind::Assigned => (
            format!("Your installer for booking {}", booking.tracking_code),
            match installer {
                Some(i) => format!("{} will handle your installation on {when}.", i.name),
                None => format!("An installer has been assigned for {when}."),
            },
        ),
        NotificationKind::Started => (
            format!("Installation {} has started", booking.tracking_code),
            "Your installer has arrived and started work.".to_string(),
        ),
        NotificationKind::Completed => (
            format!("Installation {} complete", booking.tracking_code),
            "Your installation is complete. Enjoy the new setup!".to_string(),
        ),
        NotificationKind::Cancelled => (
            format!("Booking {} cancelled", booking.tracking_code),
            match booking.history.last().and_then(|e| e.note.as_deref()) {
                Some(reason) => format!("Your booking was cancelled: {reason}"),
                None => "Your booking was cancelled.".to_string(),
            },
        ),
    };

    let mut body = format!("Hi {first_name},\n\n{lead}\n\n");
    body.push_str(&summary(booking));
    let _ = write!(body, "\nTrack your booking: {url}\n");

    let mut out = vec![Notification {
        kind,
        to: contact.email.clone(),
        subject,
        body,
    }];

    if kind == NotificationKind::Assigned {
        if let Some(installer) = installer {
            let mut sheet = format!(
                "Hi {},\n\nYou have a new job on {when}.\n\nCustomer: {}\nPhone: {}\nAddress: {}\n\n",
                installer.name, contact.name, contact.phone, contact.address
            );
            sheet.push_str(&summary(booking));
            if !booking.request.notes.is_empty() {
                let _ = write!(sheet, "\nCustomer notes: {}\n", booking.request.notes);
            }
            out.push(Notification {
                kind,
                to: installer.email.clone(),
                subject: format!("New job {} on {}", booking.tracking_code, booking.request.schedule.date),
                body: sheet,
            });
        }
    }
    out
}

/// Per-TV summary with the frozen quote.
fn summary(booking: &Booking) -> String {
    let mut out = String::new();
    for (i, tv) in booking.quote.tvs.iter().enumerate() {
        let _ = writeln!(out, "TV {} ({}\"):", i + 1, tv.size_inches);
        for line in &tv.lines {
            if line.kind == LineKind::Wall && line.amount.value() == 0 {
                continue;
            }
            let _ = writeln!(out, "  - {}: {}", line.label, line.amount);
        }
    }
    let _ = writeln!(out, "Total: {}", booking.quote.total);
    out
}

// =============================================================================
// TESTS
// =============================================================================
