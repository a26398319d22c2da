//! # redb-backed Booking Storage
//!
//! Persists bookings, installers and photos in a single redb file:
//! - ACID transactions; a booking and its tracking-code index entry are
//!   written in one commit
//! - Crash safety (copy-on-write B-trees)
//! - MVCC (concurrent readers, single writer)
//!
//! Values are postcard-encoded. Id counters live in the `metadata` table
//! and are cached in memory after `open`.

use crate::booking::Booking;
use crate::installer::Installer;
use crate::photos::Photo;
use crate::store::BookingStore;
use crate::{BookingId, InstallerId, MarketError, PhotoId};
use redb::{Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition};
use std::path::Path;

/// BookingId(u64) -> serialized Booking
const BOOKINGS: TableDefinition<u64, &[u8]> = TableDefinition::new("bookings");

/// Tracking code -> BookingId(u64)
const TRACKING_INDEX: TableDefinition<&str, u64> = TableDefinition::new("tracking_index");

/// InstallerId(u64) -> serialized Installer
const INSTALLERS: TableDefinition<u64, &[u8]> = TableDefinition::new("installers");

/// Photo id (hex digest) -> serialized Photo
const PHOTOS: TableDefinition<&str, &[u8]> = TableDefinition::new("photos");

/// Counter name -> value
const METADATA: TableDefinition<&str, u64> = TableDefinition::new("metadata");

const NEXT_BOOKING_ID: &str = "next_booking_id";
const NEXT_INSTALLER_ID: &str = "next_installer_id";

fn io_err(e: impl std::fmt::Display) -> MarketError {
    MarketError::IoError(e.to_string())
}

fn ser_err(e: impl std::fmt::Display) -> MarketError {
    MarketError::SerializationError(e.to_string())
}

/// A disk-backed booking store using redb.
pub struct RedbStore {
    db: Database,
    next_booking_id: u64,
    next_installer_id: u64,
}

impl std::fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStore")
            .field("next_booking_id", &self.next_booking_id)
            .field("next_installer_id", &self.next_installer_id)
            .finish_non_exhaustive()
    }
}

impl RedbStore {
    /// Open or create a database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, MarketError> {
        let db = Database::create(path.as_ref()).map_err(io_err)?;

        // Create tables on first open
        {
            let write_txn = db.begin_write().map_err(io_err)?;
            let _ = write_txn.open_table(BOOKINGS).map_err(io_err)?;
            let _ = write_txn.open_table(TRACKING_INDEX).map_err(io_err)?;
            let _ = write_txn.open_table(INSTALLERS).map_err(io_err)?;
            let _ = write_txn.open_table(PHOTOS).map_err(io_err)?;
            let _ = write_txn.open_table(METADATA).map_err(io_err)?;
            write_txn.commit().map_err(io_err)?;
        }

        let (next_booking_id, next_installer_id) = {
            let read_txn = db.begin_read().map_err(io_err)?;
            let table = read_txn.open_table(METADATA).map_err(io_err)?;
            let booking = table
                .get(NEXT_BOOKING_ID)
                .map_err(io_err)?
                .map_or(1, |v| v.value());
            let installer = table
                .get(NEXT_INSTALLER_ID)
                .map_err(io_err)?
                .map_or(1, |v| v.value());
            (booking.max(1), installer.max(1))
        };

        Ok(Self {
            db,
            next_booking_id,
            next_installer_id,
        })
    }

    /// Compact the database file.
    pub fn compact(&mut self) -> Result<(), MarketError> {
        self.db.compact().map_err(io_err)?;
        Ok(())
    }

    fn bump_counter(&mut self, key: &str, next: u64) -> Result<(), MarketError> {
        let write_txn = self.db.begin_write().map_err(io_err)?;
        {
            let mut meta = write_txn.open_table(METADATA).map_err(io_err)?;
            meta.insert(key, next).map_err(io_err)?;
        }
        write_txn.commit().map_err(io_err)
    }

    fn read_booking(&self, id: u64) -> Result<Option<Booking>, MarketError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(BOOKINGS).map_err(io_err)?;
        match table.get(id).map_err(io_err)? {
            Some(data) => Ok(Some(postcard::from_bytes(data.value()).map_err(ser_err)?)),
            None => Ok(None),
        }
    }
}

impl BookingStore for RedbStore {
    fn allocate_booking_id(&mut self) -> Result<BookingId, MarketError> {
        let id = BookingId(self.next_booking_id);
        let next = self.next_booking_id.saturating_add(1);
        self.bump_counter(NEXT_BOOKING_ID, next)?;
        self.next_booking_id = next;
        Ok(id)
    }

    fn tracking_code_taken(&self, code: &str) -> Result<bool, MarketError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(TRACKING_INDEX).map_err(io_err)?;
        Ok(table.get(code).map_err(io_err)?.is_some())
    }

    fn insert_booking(&mut self, booking: &Booking) -> Result<(), MarketError> {
        let bytes = postcard::to_allocvec(booking).map_err(ser_err)?;
        let write_txn = self.db.begin_write().map_err(io_err)?;
        {
            let mut bookings = write_txn.open_table(BOOKINGS).map_err(io_err)?;
            if bookings.get(booking.id.0).map_err(io_err)?.is_some() {
                return Err(MarketError::IoError(format!(
                    "booking {} already exists",
                    booking.id
                )));
            }
            let mut index = write_txn.open_table(TRACKING_INDEX).map_err(io_err)?;
            if index
                .get(booking.tracking_code.as_str())
                .map_err(io_err)?
                .is_some()
            {
                return Err(MarketError::IoError(format!(
                    "tracking code {} already in use",
                    booking.tracking_code
                )));
            }
            bookings
                .insert(booking.id.0, bytes.as_slice())
                .map_err(io_err)?;
            index
                .insert(booking.tracking_code.as_str(), booking.id.0)
                .map_err(io_err)?;
        }
        write_txn.commit().map_err(io_err)
    }

    fn update_booking(&mut self, booking: &Booking) -> Result<(), MarketError> {
        let bytes = postcard::to_allocvec(booking).map_err(ser_err)?;
        let write_txn = self.db.begin_write().map_err(io_err)?;
        {
            let mut bookings = write_txn.open_table(BOOKINGS).map_err(io_err)?;
            if bookings.get(booking.id.0).map_err(io_err)?.is_none() {
                return Err(MarketError::BookingNotFound(booking.id));
            }
            bookings
                .insert(booking.id.0, bytes.as_slice())
                .map_err(io_err)?;
        }
        write_txn.commit().map_err(io_err)
    }

    fn get_booking(&self, id: BookingId) -> Result<Option<Booking>, MarketError> {
        self.read_booking(id.0)
    }

    fn find_by_tracking_code(&self, code: &str) -> Result<Option<Booking>, MarketError> {
        let id = {
            let read_txn = self.db.begin_read().map_err(io_err)?;
            let table = read_txn.open_table(TRACKING_INDEX).map_err(io_err)?;
            table.get(code).map_err(io_err)?.map(|v| v.value())
        };
        match id {
            Some(id) => self.read_booking(id),
            None => Ok(None),
        }
    }

    fn list_bookings(&self) -> Result<Vec<Booking>, MarketError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(BOOKINGS).map_err(io_err)?;
        let mut out = Vec::new();
        for entry in table.iter().map_err(io_err)? {
            let (_, value) = entry.map_err(io_err)?;
            out.push(postcard::from_bytes(value.value()).map_err(ser_err)?);
        }
        Ok(out)
    }

    fn booking_count(&self) -> Result<usize, MarketError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(BOOKINGS).map_err(io_err)?;
        let count = table.len().map_err(io_err)?;
        Ok(count as usize)
    }

    fn allocate_installer_id(&mut self) -> Result<InstallerId, MarketError> {
        let id = InstallerId(self.next_installer_id);
        let next = self.next_installer_id.saturating_add(1);
        self.bump_counter(NEXT_INSTALLER_ID, next)?;
        self.next_installer_id = next;
        Ok(id)
    }

    fn put_installer(&mut self, installer: &Installer) -> Result<(), MarketError> {
        let bytes = postcard::to_allocvec(installer).map_err(ser_err)?;
        let write_txn = self.db.begin_write().map_err(io_err)?;
        {
            let mut table = write_txn.open_table(INSTALLERS).map_err(io_err)?;
            table
                .insert(installer.id.0, bytes.as_slice())
                .map_err(io_err)?;
        }
        write_txn.commit().map_err(io_err)
    }

    fn get_installer(&self, id: InstallerId) -> Result<Option<Installer>, MarketError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(INSTALLERS).map_err(io_err)?;
        match table.get(id.0).map_err(io_err)? {
            Some(data) => Ok(Some(postcard::from_bytes(data.value()).map_err(ser_err)?)),
            None => Ok(None),
        }
    }

    fn list_installers(&self) -> Result<Vec<Installer>, MarketError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(INSTALLERS).map_err(io_err)?;
        let mut out = Vec::new();
        for entry in table.iter().map_err(io_err)? {
            let (_, value) = entry.map_err(io_err)?;
            out.push(postcard::from_bytes(value.value()).map_err(ser_err)?);
        }
        Ok(out)
    }

    fn put_photo(&mut self, photo: &Photo) -> Result<(), MarketError> {
        if self.contains_photo(&photo.id)? {
            return Ok(());
        }
        let bytes = postcard::to_allocvec(photo).map_err(ser_err)?;
        let write_txn = self.db.begin_write().map_err(io_err)?;
        {
            let mut table = write_txn.open_table(PHOTOS).map_err(io_err)?;
            table
                .insert(photo.id.as_str(), bytes.as_slice())
                .map_err(io_err)?;
        }
        write_txn.commit().map_err(io_err)
    }

    fn get_photo(&self, id: &PhotoId) -> Result<Option<Photo>, MarketError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(PHOTOS).map_err(io_err)?;
        match table.get(id.as_str()).map_err(io_err)? {
            Some(data) => Ok(Some(postcard::from_bytes(data.value()).map_err(ser_err)?)),
            None => Ok(None),
        }
    }

    fn contains_photo(&self, id: &PhotoId) -> Result<bool, MarketError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(PHOTOS).map_err(io_err)?;
        Ok(table.get(id.as_str()).map_err(io_err)?.is_some())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::booking::{BookingRequest, BookingStatus};
    use crate::catalog::Catalog;
    use crate::installer::InstallerRequest;
    use crate::pricing::{TvConfig, quote};
    use crate::{Contact, Schedule, TimeSlot};
    use chrono::{DateTime, NaiveDate, Utc};
    use tempfile::tempdir;

    fn sample_booking(id: BookingId, code: &str) -> Booking {
        let tvs = vec![TvConfig {
            size_inches: 55,
            tier: "basic".into(),
            wall_type: "drywall".into(),
            mount_type: "customer_provided".into(),
            addons: Vec::new(),
            photo: None,
        }];
        let q = quote(&Catalog::default(), &tvs).expect("quote");
        let request = BookingRequest {
            tvs,
            schedule: Schedule {
                date: NaiveDate::from_ymd_opt(2026, 3, 5).expect("date"),
                slot: TimeSlot::Afternoon,
            },
            contact: Contact {
                name: "Ana Li".into(),
                email: "ana@example.com".into(),
                phone: "5551234567".into(),
                address: "1 Main St".into(),
            },
            notes: String::new(),
        };
        Booking::new(id, code.into(), request, q, DateTime::<Utc>::UNIX_EPOCH)
    }

    #[test]
    fn insert_and_lookup() {
        let temp = tempdir().expect("temp dir");
        let mut store = RedbStore::open(temp.path().join("test.redb")).expect("open db");

        let id = store.allocate_booking_id().expect("id");
        assert_eq!(id, BookingId(1));
        let booking = sample_booking(id, "AAAAAAAAAA");
        store.insert_booking(&booking).expect("insert");

        assert!(store.tracking_code_taken("AAAAAAAAAA").expect("taken"));
        assert_eq!(store.get_booking(id).expect("get"), Some(booking.clone()));
        assert_eq!(
            store.find_by_tracking_code("AAAAAAAAAA").expect("find"),
            Some(booking)
        );
        assert_eq!(store.booking_count().expect("count"), 1);
    }

    #[test]
    fn duplicate_tracking_code_is_rejected_atomically() {
        let temp = tempdir().expect("temp dir");
        let mut store = RedbStore::open(temp.path().join("test.redb")).expect("open db");

        store
            .insert_booking(&sample_booking(BookingId(1), "CODE000001"))
            .expect("insert");
        let result = store.insert_booking(&sample_booking(BookingId(2), "CODE000001"));
        assert!(result.is_err());
        assert_eq!(store.get_booking(BookingId(2)).expect("get"), None);
    }

    #[test]
    fn update_requires_existing_booking() {
        let temp = tempdir().expect("temp dir");
        let mut store = RedbStore::open(temp.path().join("test.redb")).expect("open db");

        let mut booking = sample_booking(BookingId(7), "CODE000007");
        assert!(matches!(
            store.update_booking(&booking),
            Err(MarketError::BookingNotFound(BookingId(7)))
        ));
        store.insert_booking(&booking).expect("insert");
        booking
            .transition(BookingStatus::Confirmed, DateTime::<Utc>::UNIX_EPOCH, None)
            .expect("confirm");
        store.update_booking(&booking).expect("update");
        let stored = store.get_booking(BookingId(7)).expect("get").expect("some");
        assert_eq!(stored.status, BookingStatus::Confirmed);
    }

    #[test]
    fn recovery_after_reopen() {
        let temp = tempdir().expect("temp dir");
        let db_path = temp.path().join("test.redb");

        {
            let mut store = RedbStore::open(&db_path).expect("open db");
            let id = store.allocate_booking_id().expect("id");
            store
                .insert_booking(&sample_booking(id, "PERSIST001"))
                .expect("insert");
            let iid = store.allocate_installer_id().expect("id");
            let installer = Installer::new(
                iid,
                InstallerRequest {
                    name: "Sam".into(),
                    email: "sam@example.com".into(),
                    phone: "5559876543".into(),
                    service_area: String::new(),
                },
                DateTime::<Utc>::UNIX_EPOCH,
            );
            store.put_installer(&installer).expect("put installer");
        }

        let mut store = RedbStore::open(&db_path).expect("reopen db");
        assert!(store.find_by_tracking_code("PERSIST001").expect("find").is_some());
        assert_eq!(store.list_installers().expect("list").len(), 1);
        assert_eq!(store.allocate_booking_id().expect("id"), BookingId(2));
        assert_eq!(store.allocate_installer_id().expect("id"), InstallerId(2));
    }

    #[test]
    fn photos_round_trip_and_dedupe() {
        let temp = tempdir().expect("temp dir");
        let mut store = RedbStore::open(temp.path().join("test.redb")).expect("open db");

        let photo = Photo::from_bytes(vec![0xFF, 0xD8, 0xFF, 0xE0, 1, 2, 3]).expect("jpeg");
        store.put_photo(&photo).expect("put");
        store.put_photo(&photo).expect("put again");
        assert!(store.contains_photo(&photo.id).expect("contains"));
        assert_eq!(store.get_photo(&photo.id).expect("get"), Some(photo));
    }

    #[test]
    fn compact_and_reopen() {
        let temp = tempdir().expect("temp dir");
        let db_path = temp.path().join("test.redb");
        {
            let mut store = RedbStore::open(&db_path).expect("open db");
            for n in 1..=5u64 {
                let id = store.allocate_booking_id().expect("id");
                store
                    .insert_booking(&sample_booking(id, &format!("COMPACT{n:03}")))
                    .expect("insert");
            }
            store.compact().expect("compact");
        }
        let store = RedbStore::open(&db_path).expect("reopen db");
        assert_eq!(store.list_bookings().expect("list").len(), 5);
    }
}
