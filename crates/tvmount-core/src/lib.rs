//! # tvmount-core
//!
//! The booking engine for a TV-installation marketplace.
//!
//! Customers walk through a multi-TV wizard (photo, size, service tier,
//! wall and mount, add-ons, schedule, contact), receive a priced booking
//! and a tracking code, and follow it through confirmation, installer
//! assignment and completion.
//!
//! ## Architectural Constraints
//!
//! - Has NO async, NO network dependencies (pure Rust)
//! - Takes the clock as an argument (`now`, `today`); never reads it
//! - Money is integer cents; no floating point anywhere
//! - Storage sits behind the `BookingStore` trait (in-memory or redb)
//! - Builds notifications but never sends them

// =============================================================================
// MODULES
// =============================================================================

pub mod booking;
pub mod catalog;
pub mod dashboard;
pub mod installer;
pub mod marketplace;
pub mod notifications;
pub mod photos;
pub mod pricing;
pub mod primitives;
pub mod storage;
pub mod store;
pub mod tracking;
pub mod types;
pub mod validation;
pub mod wizard;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    BookingId, Cents, Contact, DraftId, InstallerId, MarketError, PhotoId, Schedule, Step,
    TimeSlot, normalize_email,
};

// =============================================================================
// RE-EXPORTS: Engine
// =============================================================================

pub use booking::{Booking, BookingRequest, BookingStatus, StatusEvent};
pub use catalog::{AddOn, Catalog, CatalogFile, MountType, ServiceTier, WallType};
pub use dashboard::{AdminStats, CustomerDashboard, InstallerDashboard, JobSummary, TrackingView};
pub use installer::{Installer, InstallerRequest};
pub use marketplace::{Marketplace, Outcome, Snapshot, StorageBackend};
pub use notifications::{Notification, NotificationKind};
pub use photos::{ImageFormat, Photo};
pub use pricing::{LineItem, LineKind, Quote, TvConfig, TvQuote, quote, quote_tv};
pub use storage::RedbStore;
pub use store::{BookingStore, MemoryStore};
pub use tracking::{TrackingKeys, normalize_code, tracking_url};
pub use wizard::{StepInput, TvDraft, Wizard};
