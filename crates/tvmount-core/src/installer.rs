//! # Installers
//!
//! Technicians who carry out bookings. Admins register them and hand out
//! their access token; installers use it to see their jobs and report
//! progress.

use crate::validation;
use crate::{InstallerId, MarketError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Registration details for a new installer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallerRequest {
    pub name: String,
    pub email: String,
    pub phone: String,
    /// Free-form coverage description, e.g. a list of ZIP prefixes.
    #[serde(default)]
    pub service_area: String,
}

impl InstallerRequest {
    pub fn validate(&self) -> Result<(), MarketError> {
        validation::name(&self.name)?;
        validation::email(&self.email)?;
        validation::phone(&self.phone)?;
        validation::notes(&self.service_area)?;
        Ok(())
    }
}

/// A registered installer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Installer {
    pub id: InstallerId,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub service_area: String,
    /// Inactive installers keep their history but get no new jobs.
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl Installer {
    #[must_use]
    pub fn new(id: InstallerId, request: InstallerRequest, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: request.name.trim().to_string(),
            email: request.email.trim().to_string(),
            phone: request.phone.trim().to_string(),
            service_area: request.service_area.trim().to_string(),
            active: true,
            created_at: now,
        }
    }
}
