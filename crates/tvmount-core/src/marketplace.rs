//! # Marketplace
//!
//! The engine facade: a storage backend, the catalog, the tracking keys and
//! the open wizard drafts.
//!
//! Drafts are volatile. They live only in this struct, are never written to
//! storage and are lost on restart. When `MAX_OPEN_DRAFTS` is reached the
//! oldest draft is evicted.
//!
//! ## Storage Backends
//!
//! - `InMemory`: `MemoryStore` (fast, volatile)
//! - `Persistent`: `RedbStore` (disk-backed, ACID)
//!
//! Operations that change a booking return an [`Outcome`] carrying the
//! notifications to deliver. Delivery is the caller's job.

use crate::booking::{Booking, BookingRequest, BookingStatus};
use crate::catalog::Catalog;
use crate::dashboard::{AdminStats, CustomerDashboard, InstallerDashboard, TrackingView};
use crate::installer::{Installer, InstallerRequest};
use crate::notifications::{self, Notification, NotificationKind};
use crate::photos::Photo;
use crate::pricing::{self, Quote, TvConfig};
use crate::primitives::MAX_OPEN_DRAFTS;
use crate::storage::RedbStore;
use crate::store::{BookingStore, MemoryStore};
use crate::tracking::{TrackingKeys, normalize_code};
use crate::wizard::{StepInput, Wizard};
use crate::{BookingId, DraftId, InstallerId, MarketError, PhotoId, normalize_email};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Tracking-code collisions tolerated before giving up.
const MAX_CODE_ATTEMPTS: u32 = 32;

// =============================================================================
// STORAGE BACKEND
// =============================================================================

/// Storage backend for a Marketplace.
#[derive(Debug)]
pub enum StorageBackend {
    /// In-memory maps (fast, volatile).
    InMemory(MemoryStore),
    /// Disk-backed store using redb (ACID, persistent).
    Persistent(RedbStore),
}

impl Default for StorageBackend {
    fn default() -> Self {
        Self::InMemory(MemoryStore::new())
    }
}

impl StorageBackend {
    fn store(&self) -> &dyn BookingStore {
        match self {
            Self::InMemory(s) => s,
            Self::Persistent(s) => s,
        }
    }

    fn store_mut(&mut self) -> &mut dyn BookingStore {
        match self {
            Self::InMemory(s) => s,
            Self::Persistent(s) => s,
        }
    }
}

// =============================================================================
// RESULT TYPES
// =============================================================================

/// A booking after a change, plus the messages the change produced.
#[derive(Debug, Clone)]
pub struct Outcome {
    pub booking: Booking,
    pub notifications: Vec<Notification>,
}

/// Everything stored, for backups and migration between backends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub exported_at: DateTime<Utc>,
    pub bookings: Vec<Booking>,
    pub installers: Vec<Installer>,
}

// =============================================================================
// MARKETPLACE
// =============================================================================

#[derive(Debug)]
pub struct Marketplace {
    backend: StorageBackend,
    catalog: Catalog,
    keys: TrackingKeys,
    public_base_url: String,
    drafts: BTreeMap<DraftId, Wizard>,
    next_draft_id: u64,
}

impl Marketplace {
    #[must_use]
    pub fn new(
        backend: StorageBackend,
        catalog: Catalog,
        keys: TrackingKeys,
        public_base_url: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            catalog,
            keys,
            public_base_url: public_base_url.into(),
            drafts: BTreeMap::new(),
            next_draft_id: 1,
        }
    }

    /// In-memory marketplace with the built-in catalog.
    #[must_use]
    pub fn in_memory(secret: &str) -> Self {
        Self::new(
            StorageBackend::default(),
            Catalog::default(),
            TrackingKeys::from_secret(secret),
            "http://localhost:8080",
        )
    }

    /// Open or create a redb-backed marketplace.
    pub fn with_redb(
        path: impl AsRef<Path>,
        catalog: Catalog,
        keys: TrackingKeys,
        public_base_url: impl Into<String>,
    ) -> Result<Self, MarketError> {
        let store = RedbStore::open(path)?;
        Ok(Self::new(
            StorageBackend::Persistent(store),
            catalog,
            keys,
            public_base_url,
        ))
    }

    #[must_use]
    pub fn is_persistent(&self) -> bool {
        matches!(self.backend, StorageBackend::Persistent(_))
    }

    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    #[must_use]
    pub fn public_base_url(&self) -> &str {
        &self.public_base_url
    }

    fn store(&self) -> &dyn BookingStore {
        self.backend.store()
    }

    fn store_mut(&mut self) -> &mut dyn BookingStore {
        self.backend.store_mut()
    }

    /// Price configurations without booking anything.
    pub fn quote(&self, tvs: &[TvConfig]) -> Result<Quote, MarketError> {
        for tv in tvs {
            tv.validate(&self.catalog)?;
        }
        pricing::quote(&self.catalog, tvs)
    }

    // =========================================================================
    // WIZARD DRAFTS
    // =========================================================================

    /// Open a new draft, evicting the oldest one at capacity.
    pub fn create_draft(&mut self) -> (DraftId, &Wizard) {
        while self.drafts.len() >= MAX_OPEN_DRAFTS {
            self.drafts.pop_first();
        }
        let id = DraftId(self.next_draft_id);
        self.next_draft_id = self.next_draft_id.saturating_add(1);
        let wizard = self.drafts.entry(id).or_default();
        (id, wizard)
    }

    pub fn draft(&self, id: DraftId) -> Result<&Wizard, MarketError> {
        self.drafts.get(&id).ok_or(MarketError::DraftNotFound(id))
    }

    fn draft_mut(&mut self, id: DraftId) -> Result<&mut Wizard, MarketError> {
        self.drafts.get_mut(&id).ok_or(MarketError::DraftNotFound(id))
    }

    #[must_use]
    pub fn draft_count(&self) -> usize {
        self.drafts.len()
    }

    /// Store input for the draft's current step.
    pub fn apply_step(&mut self, id: DraftId, input: StepInput) -> Result<&Wizard, MarketError> {
        if let StepInput::Photo { photo: Some(photo) } = &input {
            if !self.store().contains_photo(photo)? {
                return Err(MarketError::PhotoNotFound);
            }
        }
        let Self {
            drafts, catalog, ..
        } = self;
        let wizard = drafts.get_mut(&id).ok_or(MarketError::DraftNotFound(id))?;
        wizard.apply(input, catalog)?;
        Ok(wizard)
    }

    pub fn next_step(&mut self, id: DraftId, now: DateTime<Utc>) -> Result<&Wizard, MarketError> {
        let Self {
            drafts, catalog, ..
        } = self;
        let wizard = drafts.get_mut(&id).ok_or(MarketError::DraftNotFound(id))?;
        wizard.next(catalog, now.date_naive())?;
        Ok(wizard)
    }

    pub fn back_step(&mut self, id: DraftId) -> Result<&Wizard, MarketError> {
        let wizard = self.draft_mut(id)?;
        wizard.back();
        Ok(wizard)
    }

    pub fn add_tv(&mut self, id: DraftId) -> Result<&Wizard, MarketError> {
        let wizard = self.draft_mut(id)?;
        wizard.add_tv()?;
        Ok(wizard)
    }

    pub fn remove_tv(&mut self, id: DraftId, index: usize) -> Result<&Wizard, MarketError> {
        let wizard = self.draft_mut(id)?;
        wizard.remove_tv(index)?;
        Ok(wizard)
    }

    /// Turn a finished draft into a booking. The draft is closed on success
    /// and kept on failure.
    pub fn submit_draft(&mut self, id: DraftId, now: DateTime<Utc>) -> Result<Outcome, MarketError> {
        let request = self.draft(id)?.finish(&self.catalog, now.date_naive())?;
        let outcome = self.create_booking(request, now)?;
        self.drafts.remove(&id);
        Ok(outcome)
    }

    // =========================================================================
    // BOOKINGS
    // =========================================================================

    /// Validate, price and store a booking request.
    ///
    /// Used directly by clients that keep wizard state themselves.
    pub fn create_booking(
        &mut self,
        mut request: BookingRequest,
        now: DateTime<Utc>,
    ) -> Result<Outcome, MarketError> {
        request.contact = request.contact.trimmed();
        request.validate(&self.catalog, now.date_naive())?;
        for photo in request.tvs.iter().filter_map(|tv| tv.photo.as_ref()) {
            if !self.store().contains_photo(photo)? {
                return Err(MarketError::PhotoNotFound);
            }
        }
        let quote = request.quote(&self.catalog)?;

        let id = self.store_mut().allocate_booking_id()?;
        let code = self.unused_tracking_code(id)?;
        let booking = Booking::new(id, code, request, quote, now);
        self.store_mut().insert_booking(&booking)?;

        let notifications = notifications::compose(
            NotificationKind::Received,
            &booking,
            None,
            &self.public_base_url,
        );
        Ok(Outcome {
            booking,
            notifications,
        })
    }

    fn unused_tracking_code(&self, id: BookingId) -> Result<String, MarketError> {
        for attempt in 0..MAX_CODE_ATTEMPTS {
            let code = self.keys.tracking_code(id, attempt);
            if !self.store().tracking_code_taken(&code)? {
                return Ok(code);
            }
        }
        Err(MarketError::IoError(format!(
            "no free tracking code for booking {id}"
        )))
    }

    pub fn booking(&self, id: BookingId) -> Result<Booking, MarketError> {
        self.store()
            .get_booking(id)?
            .ok_or(MarketError::BookingNotFound(id))
    }

    /// All bookings, optionally filtered by status, newest first.
    pub fn bookings(&self, status: Option<BookingStatus>) -> Result<Vec<Booking>, MarketError> {
        let mut all = self.store().list_bookings()?;
        if let Some(status) = status {
            all.retain(|b| b.status == status);
        }
        all.reverse();
        Ok(all)
    }

    pub fn booking_count(&self) -> Result<usize, MarketError> {
        self.store().booking_count()
    }

    /// Look up a booking by a user-typed tracking code.
    pub fn track(&self, code: &str) -> Result<Booking, MarketError> {
        self.store()
            .find_by_tracking_code(&normalize_code(code))?
            .ok_or(MarketError::TrackingCodeNotFound)
    }

    /// The public tracking page for a code.
    pub fn tracking_view(&self, code: &str) -> Result<TrackingView, MarketError> {
        let booking = self.track(code)?;
        let installer = match booking.installer {
            Some(id) => self.store().get_installer(id)?,
            None => None,
        };
        Ok(TrackingView::new(
            &booking,
            installer.as_ref(),
            &self.public_base_url,
        ))
    }

    fn change(
        &mut self,
        booking: Booking,
        kind: NotificationKind,
        installer: Option<&Installer>,
    ) -> Result<Outcome, MarketError> {
        self.store_mut().update_booking(&booking)?;
        let notifications =
            notifications::compose(kind, &booking, installer, &self.public_base_url);
        Ok(Outcome {
            booking,
            notifications,
        })
    }

    pub fn confirm(&mut self, id: BookingId, now: DateTime<Utc>) -> Result<Outcome, MarketError> {
        let mut booking = self.booking(id)?;
        booking.transition(BookingStatus::Confirmed, now, None)?;
        self.change(booking, NotificationKind::Confirmed, None)
    }

    pub fn cancel(
        &mut self,
        id: BookingId,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Outcome, MarketError> {
        let reason = reason
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty());
        if let Some(r) = &reason {
            crate::validation::notes(r)?;
        }
        let mut booking = self.booking(id)?;
        booking.transition(BookingStatus::Cancelled, now, reason)?;
        self.change(booking, NotificationKind::Cancelled, None)
    }

    /// Assign or reassign an active installer to a confirmed booking.
    pub fn assign_installer(
        &mut self,
        id: BookingId,
        installer_id: InstallerId,
        now: DateTime<Utc>,
    ) -> Result<Outcome, MarketError> {
        let installer = self.installer(installer_id)?;
        if !installer.active {
            return Err(MarketError::invalid(format!(
                "Installer {installer_id} is inactive"
            )));
        }
        let mut booking = self.booking(id)?;
        booking.assign(installer_id, now)?;
        self.change(booking, NotificationKind::Assigned, Some(&installer))
    }

    fn installer_job(&self, installer: InstallerId, id: BookingId) -> Result<Booking, MarketError> {
        let booking = self.booking(id)?;
        if booking.installer != Some(installer) {
            return Err(MarketError::Unauthorized);
        }
        Ok(booking)
    }

    /// The assigned installer arrived and began work.
    pub fn start_job(
        &mut self,
        installer: InstallerId,
        id: BookingId,
        now: DateTime<Utc>,
    ) -> Result<Outcome, MarketError> {
        let mut booking = self.installer_job(installer, id)?;
        booking.transition(BookingStatus::InProgress, now, None)?;
        self.change(booking, NotificationKind::Started, None)
    }

    pub fn complete_job(
        &mut self,
        installer: InstallerId,
        id: BookingId,
        note: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Outcome, MarketError> {
        let note = note.map(|n| n.trim().to_string()).filter(|n| !n.is_empty());
        if let Some(n) = &note {
            crate::validation::notes(n)?;
        }
        let mut booking = self.installer_job(installer, id)?;
        booking.transition(BookingStatus::Completed, now, note)?;
        self.change(booking, NotificationKind::Completed, None)
    }

    // =========================================================================
    // INSTALLERS
    // =========================================================================

    pub fn register_installer(
        &mut self,
        request: InstallerRequest,
        now: DateTime<Utc>,
    ) -> Result<Installer, MarketError> {
        request.validate()?;
        let id = self.store_mut().allocate_installer_id()?;
        let installer = Installer::new(id, request, now);
        self.store_mut().put_installer(&installer)?;
        Ok(installer)
    }

    pub fn installer(&self, id: InstallerId) -> Result<Installer, MarketError> {
        self.store()
            .get_installer(id)?
            .ok_or(MarketError::InstallerNotFound(id))
    }

    pub fn installers(&self) -> Result<Vec<Installer>, MarketError> {
        self.store().list_installers()
    }

    /// Deactivated installers keep their jobs but get no new ones.
    pub fn set_installer_active(
        &mut self,
        id: InstallerId,
        active: bool,
    ) -> Result<Installer, MarketError> {
        let mut installer = self.installer(id)?;
        installer.active = active;
        self.store_mut().put_installer(&installer)?;
        Ok(installer)
    }

    /// The bearer token an installer presents to their dashboard.
    pub fn installer_token(&self, id: InstallerId) -> Result<String, MarketError> {
        self.installer(id)?;
        Ok(self.keys.installer_token(id))
    }

    /// Check an installer token and return the installer.
    pub fn verify_installer(&self, id: InstallerId, token: &str) -> Result<Installer, MarketError> {
        if !self.keys.verify_installer_token(id, token) {
            return Err(MarketError::Unauthorized);
        }
        self.installer(id)
    }

    /// Bookings assigned to an installer, in id order.
    pub fn installer_bookings(&self, id: InstallerId) -> Result<Vec<Booking>, MarketError> {
        let mut all = self.store().list_bookings()?;
        all.retain(|b| b.installer == Some(id));
        Ok(all)
    }

    pub fn installer_dashboard(&self, id: InstallerId) -> Result<InstallerDashboard, MarketError> {
        let installer = self.installer(id)?;
        let jobs = self.installer_bookings(id)?;
        Ok(InstallerDashboard::compute(installer, &jobs))
    }

    // =========================================================================
    // CUSTOMERS AND ADMIN
    // =========================================================================

    /// A customer's bookings. The email must match the booking behind
    /// `code`; otherwise the caller is not that customer.
    pub fn customer_bookings(
        &self,
        email: &str,
        code: &str,
    ) -> Result<CustomerDashboard, MarketError> {
        let email = normalize_email(email);
        let proof = self
            .store()
            .find_by_tracking_code(&normalize_code(code))?
            .ok_or(MarketError::Unauthorized)?;
        if proof.customer_email() != email {
            return Err(MarketError::Unauthorized);
        }
        let all = self.store().list_bookings()?;
        Ok(CustomerDashboard::compute(&email, &all))
    }

    pub fn stats(&self, now: DateTime<Utc>) -> Result<AdminStats, MarketError> {
        let bookings = self.store().list_bookings()?;
        let installers = self.store().list_installers()?;
        Ok(AdminStats::compute(&bookings, &installers, now.date_naive()))
    }

    // =========================================================================
    // PHOTOS
    // =========================================================================

    pub fn upload_photo(&mut self, bytes: Vec<u8>) -> Result<Photo, MarketError> {
        let photo = Photo::from_bytes(bytes)?;
        self.store_mut().put_photo(&photo)?;
        Ok(photo)
    }

    pub fn photo(&self, id: &PhotoId) -> Result<Photo, MarketError> {
        self.store()
            .get_photo(id)?
            .ok_or(MarketError::PhotoNotFound)
    }

    // =========================================================================
    // EXPORT
    // =========================================================================

    /// Dump bookings and installers.
    pub fn export_snapshot(&self, now: DateTime<Utc>) -> Result<Snapshot, MarketError> {
        Ok(Snapshot {
            exported_at: now,
            bookings: self.store().list_bookings()?,
            installers: self.store().list_installers()?,
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================
