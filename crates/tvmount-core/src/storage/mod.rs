//! # Persistent Storage
//!
//! Disk-backed implementation of [`crate::store::BookingStore`].

mod redb_store;

pub use redb_store::RedbStore;
