//! # Booking Storage
//!
//! The `BookingStore` trait is the seam between the marketplace logic and
//! its persistence. Two implementations exist:
//! - [`MemoryStore`]: `BTreeMap`s, volatile, used by tests and `--backend memory`
//! - [`crate::storage::RedbStore`]: redb tables on disk, ACID
//!
//! All fallible operations return `Result<T, MarketError>` so both backends
//! are used uniformly.

use crate::booking::Booking;
use crate::installer::Installer;
use crate::photos::Photo;
use crate::{BookingId, InstallerId, MarketError, PhotoId};
use std::collections::BTreeMap;

// =============================================================================
// BOOKINGSTORE TRAIT
// =============================================================================

pub trait BookingStore {
    /// Reserve the next booking id. Ids are never reused.
    fn allocate_booking_id(&mut self) -> Result<BookingId, MarketError>;

    /// Whether a tracking code is already indexed.
    fn tracking_code_taken(&self, code: &str) -> Result<bool, MarketError>;

    /// Insert a new booking and index its tracking code.
    fn insert_booking(&mut self, booking: &Booking) -> Result<(), MarketError>;

    /// Overwrite an existing booking.
    fn update_booking(&mut self, booking: &Booking) -> Result<(), MarketError>;

    fn get_booking(&self, id: BookingId) -> Result<Option<Booking>, MarketError>;

    fn find_by_tracking_code(&self, code: &str) -> Result<Option<Booking>, MarketError>;

    /// All bookings in id order.
    fn list_bookings(&self) -> Result<Vec<Booking>, MarketError>;

    fn booking_count(&self) -> Result<usize, MarketError>;

    /// Reserve the next installer id.
    fn allocate_installer_id(&mut self) -> Result<InstallerId, MarketError>;

    /// Insert or overwrite an installer.
    fn put_installer(&mut self, installer: &Installer) -> Result<(), MarketError>;

    fn get_installer(&self, id: InstallerId) -> Result<Option<Installer>, MarketError>;

    /// All installers in id order.
    fn list_installers(&self) -> Result<Vec<Installer>, MarketError>;

    /// Store a photo; storing identical content twice is a no-op.
    fn put_photo(&mut self, photo: &Photo) -> Result<(), MarketError>;

    fn get_photo(&self, id: &PhotoId) -> Result<Option<Photo>, MarketError>;

    fn contains_photo(&self, id: &PhotoId) -> Result<bool, MarketError>;
}

// =============================================================================
// IN-MEMORY STORE
// =============================================================================

/// Volatile store backed by `BTreeMap`s.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    bookings: BTreeMap<BookingId, Booking>,
    tracking_index: BTreeMap<String, BookingId>,
    installers: BTreeMap<InstallerId, Installer>,
    photos: BTreeMap<PhotoId, Photo>,
    next_booking_id: u64,
    next_installer_id: u64,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_booking_id: 1,
            next_installer_id: 1,
            ..Self::default()
        }
    }
}

impl BookingStore for MemoryStore {
    fn allocate_booking_id(&mut self) -> Result<BookingId, MarketError> {
        let id = BookingId(self.next_booking_id.max(1));
        self.next_booking_id = id.0.saturating_add(1);
        Ok(id)
    }

    fn tracking_code_taken(&self, code: &str) -> Result<bool, MarketError> {
        Ok(self.tracking_index.contains_key(code))
    }

    fn insert_booking(&mut self, booking: &Booking) -> Result<(), MarketError> {
        if self.bookings.contains_key(&booking.id) {
            return Err(MarketError::IoError(format!(
                "booking {} already exists",
                booking.id
            )));
        }
        if self.tracking_index.contains_key(&booking.tracking_code) {
            return Err(MarketError::IoError(format!(
                "tracking code {} already in use",
                booking.tracking_code
            )));
        }
        self.tracking_index
            .insert(booking.tracking_code.clone(), booking.id);
        self.bookings.insert(booking.id, booking.clone());
        Ok(())
    }

    fn update_booking(&mut self, booking: &Booking) -> Result<(), MarketError> {
        match self.bookings.get_mut(&booking.id) {
            Some(slot) => {
                *slot = booking.clone();
                Ok(())
            }
            None => Err(MarketError::BookingNotFound(booking.id)),
        }
    }

    fn get_booking(&self, id: BookingId) -> Result<Option<Booking>, MarketError> {
        Ok(self.bookings.get(&id).cloned())
    }

    fn find_by_tracking_code(&self, code: &str) -> Result<Option<Booking>, MarketError> {
        Ok(self
            .tracking_index
            .get(code)
            .and_then(|id| self.bookings.get(id))
            .cloned())
    }

    fn list_bookings(&self) -> Result<Vec<Booking>, MarketError> {
        Ok(self.bookings.values().cloned().collect())
    }

    fn booking_count(&self) -> Result<usize, MarketError> {
        Ok(self.bookings.len())
    }

    fn allocate_installer_id(&mut self) -> Result<InstallerId, MarketError> {
        let id = InstallerId(self.next_installer_id.max(1));
        self.next_installer_id = id.0.saturating_add(1);
        Ok(id)
    }

    fn put_installer(&mut self, installer: &Installer) -> Result<(), MarketError> {
        self.installers.insert(installer.id, installer.clone());
        Ok(())
    }

    fn get_installer(&self, id: InstallerId) -> Result<Option<Installer>, MarketError> {
        Ok(self.installers.get(&id).cloned())
    }

    fn list_installers(&self) -> Result<Vec<Installer>, MarketError> {
        Ok(self.installers.values().cloned().collect())
    }

    fn put_photo(&mut self, photo: &Photo) -> Result<(), MarketError> {
        self.photos
            .entry(photo.id.clone())
            .or_insert_with(|| photo.clone());
        Ok(())
    }

    fn get_photo(&self, id: &PhotoId) -> Result<Option<Photo>, MarketError> {
        Ok(self.photos.get(id).cloned())
    }

    fn contains_photo(&self, id: &PhotoId) -> Result<bool, MarketError> {
        Ok(self.photos.contains_key(id))
    }
}

// =============================================================================
// TESTS
// =============================================================================
