//! # API Request/Response Types
//!
//! This module defines the JSON structures for the HTTP API that are not
//! already defined by `tvmount-core`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tvmount_core::{
    Booking, Catalog, Cents, DraftId, Installer, InstallerId, MarketError, PhotoId, TvConfig,
    Wizard,
    primitives::MAX_LIST_LIMIT,
};

// =============================================================================
// HEALTH RESPONSE
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

// =============================================================================
// ERROR RESPONSE
// =============================================================================

/// Body of every non-2xx answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
        }
    }
}

// =============================================================================
// CATALOG
// =============================================================================

/// `GET /api/service-tiers?size=65`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TierQuery {
    /// Only tiers that cover a TV of this size.
    pub size: Option<u16>,
}

// =============================================================================
// QUOTE
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteRequest {
    pub tvs: Vec<TvConfig>,
}

// =============================================================================
// UPLOADS
// =============================================================================

/// A photo as base64, optionally as a `data:` URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadRequest {
    pub data: String,
}

impl UploadRequest {
    /// The base64 payload with any `data:image/...;base64,` prefix removed.
    pub fn payload(&self) -> &str {
        let data = self.data.trim();
        match data.split_once(";base64,") {
            Some((prefix, rest)) if prefix.starts_with("data:") => rest,
            _ => data,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub id: PhotoId,
    pub content_type: String,
    pub size: usize,
    pub url: String,
}

// =============================================================================
// WIZARD
// =============================================================================

/// A draft as the booking form sees it.
#[derive(Debug, Clone, Serialize)]
pub struct WizardResponse {
    pub draft_id: DraftId,
    #[serde(flatten)]
    pub wizard: Wizard,
    pub step_title: String,
    pub can_advance: bool,
    pub progress_percent: u8,
    /// Price of the TVs configured so far.
    pub estimate: Cents,
}

impl WizardResponse {
    pub fn new(draft_id: DraftId, wizard: &Wizard, catalog: &Catalog, today: NaiveDate) -> Self {
        let complete: Vec<TvConfig> = wizard
            .tvs()
            .iter()
            .filter_map(|tv| tv.to_config())
            .collect();
        let estimate = tvmount_core::quote(catalog, &complete)
            .map(|q| q.total)
            .unwrap_or(Cents::ZERO);
        Self {
            draft_id,
            wizard: wizard.clone(),
            step_title: wizard.step().title().to_string(),
            can_advance: wizard.can_advance(catalog, today),
            progress_percent: wizard.progress_percent(),
            estimate,
        }
    }
}

// =============================================================================
// BOOKINGS
// =============================================================================

/// A booking plus the link encoded in its QR code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingResponse {
    pub booking: Booking,
    pub tracking_url: String,
}

/// `GET /api/admin/bookings?status=pending&limit=50`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookingsQuery {
    pub status: Option<String>,
    pub limit: Option<usize>,
}

impl BookingsQuery {
    pub fn limit(&self) -> usize {
        self.limit.unwrap_or(MAX_LIST_LIMIT).min(MAX_LIST_LIMIT)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CancelRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignRequest {
    pub installer_id: InstallerId,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompleteRequest {
    #[serde(default)]
    pub note: Option<String>,
}

/// `GET /api/customers/bookings?email=..&code=..`
#[derive(Debug, Clone, Deserialize)]
pub struct CustomerQuery {
    pub email: String,
    pub code: String,
}

// =============================================================================
// INSTALLERS
// =============================================================================

/// Returned once at registration; the token is the installer's login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallerCreatedResponse {
    pub installer: Installer,
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallerActiveRequest {
    pub active: bool,
}

// =============================================================================
// INTEGRATIONS
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacementRequest {
    pub photo_id: PhotoId,
    pub size_inches: u16,
    #[serde(default)]
    pub mount_type: Option<String>,
    #[serde(default)]
    pub wall_type: Option<String>,
}

impl PlacementRequest {
    /// Resolve catalog ids to display names; unknown ids are errors.
    pub fn names(
        &self,
        catalog: &Catalog,
    ) -> Result<(Option<String>, Option<String>), MarketError> {
        tvmount_core::validation::tv_size(self.size_inches)?;
        let mount = match &self.mount_type {
            Some(id) => Some(catalog.mount_type(id)?.name.clone()),
            None => None,
        };
        let wall = match &self.wall_type {
            Some(id) => Some(catalog.wall_type(id)?.name.clone()),
            None => None,
        };
        Ok((mount, wall))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeocodeQuery {
    pub address: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AutocompleteQuery {
    pub input: String,
}
