//! # Field Validation
//!
//! The predicates shared by the wizard and by direct booking submission.
//! A booking posted straight to the API is held to exactly the same rules
//! as one assembled step by step.

use crate::catalog::Catalog;
use crate::primitives::{
    MAX_ADDONS_PER_TV, MAX_ADDRESS_LENGTH, MAX_EMAIL_LENGTH, MAX_HORIZON_DAYS, MAX_NAME_LENGTH,
    MAX_NOTES_LENGTH, MAX_PHONE_DIGITS, MAX_TV_INCHES, MIN_LEAD_DAYS, MIN_PHONE_DIGITS,
    MIN_TV_INCHES,
};
use crate::{Contact, MarketError, Schedule};
use chrono::{Days, NaiveDate};
use std::collections::BTreeSet;

/// TV diagonal must be inside the serviced range.
pub fn tv_size(inches: u16) -> Result<(), MarketError> {
    if !(MIN_TV_INCHES..=MAX_TV_INCHES).contains(&inches) {
        return Err(MarketError::invalid(format!(
            "TV size must be between {MIN_TV_INCHES} and {MAX_TV_INCHES} inches, got {inches}"
        )));
    }
    Ok(())
}

/// The tier must exist and cover the TV size.
pub fn tier_for_size(catalog: &Catalog, tier: &str, inches: u16) -> Result<(), MarketError> {
    let tier = catalog.tier(tier)?;
    if tier.max_tv_inches < inches {
        return Err(MarketError::invalid(format!(
            "{} covers TVs up to {} inches",
            tier.name, tier.max_tv_inches
        )));
    }
    Ok(())
}

/// Wall and mount types must both be known.
pub fn mounting(catalog: &Catalog, wall_type: &str, mount_type: &str) -> Result<(), MarketError> {
    catalog.wall_type(wall_type)?;
    catalog.mount_type(mount_type)?;
    Ok(())
}

/// Add-ons must be known, distinct and bounded in number.
pub fn addons(catalog: &Catalog, ids: &[String]) -> Result<(), MarketError> {
    if ids.len() > MAX_ADDONS_PER_TV {
        return Err(MarketError::invalid(format!(
            "At most {MAX_ADDONS_PER_TV} add-ons per TV"
        )));
    }
    let mut seen = BTreeSet::new();
    for id in ids {
        catalog.addon(id)?;
        if !seen.insert(id.as_str()) {
            return Err(MarketError::invalid(format!("Add-on '{id}' selected twice")));
        }
    }
    Ok(())
}

/// First and last bookable dates relative to `today`.
#[must_use]
pub fn booking_window(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let first = today
        .checked_add_days(Days::new(MIN_LEAD_DAYS as u64))
        .unwrap_or(NaiveDate::MAX);
    let last = today
        .checked_add_days(Days::new(MAX_HORIZON_DAYS as u64))
        .unwrap_or(NaiveDate::MAX);
    (first, last)
}

/// The appointment date must fall inside the booking window.
pub fn schedule(schedule: &Schedule, today: NaiveDate) -> Result<(), MarketError> {
    let (first, last) = booking_window(today);
    if schedule.date < first || schedule.date > last {
        return Err(MarketError::invalid(format!(
            "Date must be between {first} and {last}"
        )));
    }
    Ok(())
}

/// A deliberately loose email check: one '@', non-empty local part, dotted domain.
pub fn email(email: &str) -> Result<(), MarketError> {
    let email = email.trim();
    if email.len() > MAX_EMAIL_LENGTH {
        return Err(MarketError::invalid("Email is too long"));
    }
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && !email.contains(char::is_whitespace)
                && domain
                    .split_once('.')
                    .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
                && !domain.ends_with('.')
        }
        None => false,
    };
    if !valid {
        return Err(MarketError::invalid(format!("'{email}' is not a valid email")));
    }
    Ok(())
}

/// Phone numbers are judged by their digit count only.
pub fn phone(phone: &str) -> Result<(), MarketError> {
    let digits = phone.chars().filter(char::is_ascii_digit).count();
    if !(MIN_PHONE_DIGITS..=MAX_PHONE_DIGITS).contains(&digits) {
        return Err(MarketError::invalid(format!(
            "Phone number needs {MIN_PHONE_DIGITS}-{MAX_PHONE_DIGITS} digits"
        )));
    }
    Ok(())
}

fn required(field: &str, value: &str, max: usize) -> Result<(), MarketError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(MarketError::invalid(format!("{field} is required")));
    }
    if trimmed.len() > max {
        return Err(MarketError::invalid(format!(
            "{field} exceeds {max} characters"
        )));
    }
    Ok(())
}

/// Contact details: every field required.
pub fn contact(contact: &Contact) -> Result<(), MarketError> {
    required("Name", &contact.name, MAX_NAME_LENGTH)?;
    email(&contact.email)?;
    phone(&contact.phone)?;
    required("Address", &contact.address, MAX_ADDRESS_LENGTH)?;
    Ok(())
}

/// Installer display name.
pub fn name(name: &str) -> Result<(), MarketError> {
    required("Name", name, MAX_NAME_LENGTH)
}

/// Free-text notes are optional but bounded.
pub fn notes(notes: &str) -> Result<(), MarketError> {
    if notes.len() > MAX_NOTES_LENGTH {
        return Err(MarketError::invalid(format!(
            "Notes exceed {MAX_NOTES_LENGTH} characters"
        )));
    }
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TimeSlot;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default()
    }

    #[test]
    fn size_bounds() {
        assert!(tv_size(MIN_TV_INCHES).is_ok());
        assert!(tv_size(MAX_TV_INCHES).is_ok());
        assert!(tv_size(MIN_TV_INCHES - 1).is_err());
        assert!(tv_size(MAX_TV_INCHES + 1).is_err());
    }

    #[test]
    fn emails() {
        assert!(email("jane@example.com").is_ok());
        assert!(email(" jane.doe+tv@mail.example.co.uk ").is_ok());
        assert!(email("jane").is_err());
        assert!(email("@example.com").is_err());
        assert!(email("jane@localhost").is_err());
        assert!(email("jane@exa mple.com").is_err());
        assert!(email("jane@@example.com").is_err());
        assert!(email("jane@example.").is_err());
    }

    #[test]
    fn phones() {
        assert!(phone("(555) 123-4567").is_ok());
        assert!(phone("+1 555 123 4567").is_ok());
        assert!(phone("555-1234").is_err());
    }

    #[test]
    fn schedule_window() {
        let today = date(2026, 6, 1);
        let ok = Schedule {
            date: date(2026, 6, 2),
            slot: TimeSlot::Morning,
        };
        let same_day = Schedule {
            date: today,
            slot: TimeSlot::Evening,
        };
        let too_far = Schedule {
            date: date(2026, 9, 30),
            slot: TimeSlot::Afternoon,
        };
        assert!(schedule(&ok, today).is_ok());
        assert!(schedule(&same_day, today).is_err());
        assert!(schedule(&too_far, today).is_err());
    }

    #[test]
    fn duplicate_addons_rejected() {
        let catalog = Catalog::default();
        let ids = vec!["soundbar".to_string(), "soundbar".to_string()];
        assert!(matches!(
            addons(&catalog, &ids),
            Err(MarketError::Validation(_))
        ));
    }

    #[test]
    fn contact_requires_all_fields() {
        let mut c = Contact {
            name: "Jane Doe".into(),
            email: "jane@example.com".into(),
            phone: "555 123 4567".into(),
            address: "1 Main St".into(),
        };
        assert!(contact(&c).is_ok());
        c.address = "   ".into();
        assert!(contact(&c).is_err());
    }
}
