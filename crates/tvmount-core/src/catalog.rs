//! # Service Catalog
//!
//! The static price table the marketplace quotes from.
//!
//! The catalog has four tables, each keyed by a stable string id:
//! - service tiers (base price, largest supported TV)
//! - wall types (surcharge for harder walls)
//! - mount types (hardware price)
//! - add-ons (flat price each)
//!
//! `Catalog::default()` is the built-in table. Operators can replace it with
//! a TOML file using the same shape (`[[tiers]]`, `[[addons]]`,
//! `[[wall_types]]`, `[[mount_types]]`).

use crate::{Cents, MarketError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// =============================================================================
// CATALOG ENTRIES
// =============================================================================

/// A service level, e.g. basic mounting or full installation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceTier {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub base_price: Cents,
    /// Largest TV diagonal (inches) this tier covers.
    pub max_tv_inches: u16,
}

/// An optional extra service priced per TV.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddOn {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Cents,
}

/// The wall material the TV is mounted on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WallType {
    pub id: String,
    pub name: String,
    pub surcharge: Cents,
}

/// The mount hardware supplied with the installation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountType {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Cents,
}

/// TOML / JSON shape of a catalog: plain lists, in display order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogFile {
    #[serde(default)]
    pub tiers: Vec<ServiceTier>,
    #[serde(default)]
    pub addons: Vec<AddOn>,
    #[serde(default)]
    pub wall_types: Vec<WallType>,
    #[serde(default)]
    pub mount_types: Vec<MountType>,
}

// =============================================================================
// CATALOG
// =============================================================================

/// The validated price table, keyed by id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    tiers: BTreeMap<String, ServiceTier>,
    addons: BTreeMap<String, AddOn>,
    wall_types: BTreeMap<String, WallType>,
    mount_types: BTreeMap<String, MountType>,
}

impl Default for Catalog {
    fn default() -> Self {
        let file = CatalogFile {
            tiers: vec![
                tier("basic", "Basic Mount", "Mount on an existing bracket-ready wall, cables left visible.", 7900, 65),
                tier("standard", "Standard Install", "Mounting, leveling and cable tidy with a surface raceway.", 12900, 85),
                tier("premium", "Premium Install", "Two technicians, large-format TVs, full calibration.", 19900, 100),
            ],
            addons: vec![
                addon("cable_concealment", "In-wall cable concealment", "Run power and HDMI behind the wall.", 9900),
                addon("soundbar", "Soundbar mounting", "Mount a soundbar below the TV.", 4900),
                addon("outlet", "Power outlet install", "Add a recessed outlet behind the TV.", 14900),
                addon("device_setup", "Streaming device setup", "Connect and configure one streaming device.", 2900),
                addon("tv_removal", "Remove existing TV", "Take down and haul away an old TV.", 3900),
            ],
            wall_types: vec![
                wall("drywall", "Drywall", 0),
                wall("plaster", "Plaster", 2000),
                wall("brick", "Brick", 4000),
                wall("concrete", "Concrete", 4000),
                wall("stone", "Stone / tile", 5500),
            ],
            mount_types: vec![
                mount("customer_provided", "I have my own mount", "Installer uses the customer's bracket.", 0),
                mount("fixed", "Fixed mount", "Low profile, flat against the wall.", 3900),
                mount("tilting", "Tilting mount", "Tilts down for high placements.", 5900),
                mount("full_motion", "Full-motion mount", "Articulating arm, swivels and extends.", 9900),
            ],
        };
        // The built-in table is validated by unit tests.
        Self::from_entries(file)
    }
}

impl Catalog {
    /// Build a catalog from a file, rejecting invalid tables.
    pub fn from_file(file: CatalogFile) -> Result<Self, MarketError> {
        Self::validate(&file)?;
        Ok(Self::from_entries(file))
    }

    /// Parse a catalog from TOML text.
    pub fn from_toml(text: &str) -> Result<Self, MarketError> {
        let file: CatalogFile =
            toml::from_str(text).map_err(|e| MarketError::SerializationError(e.to_string()))?;
        Self::from_file(file)
    }

    fn from_entries(file: CatalogFile) -> Self {
        Self {
            tiers: file.tiers.into_iter().map(|t| (t.id.clone(), t)).collect(),
            addons: file.addons.into_iter().map(|a| (a.id.clone(), a)).collect(),
            wall_types: file.wall_types.into_iter().map(|w| (w.id.clone(), w)).collect(),
            mount_types: file.mount_types.into_iter().map(|m| (m.id.clone(), m)).collect(),
        }
    }

    /// Check a catalog file for duplicate ids, empty names and negative prices.
    ///
    /// Every table must have at least one entry except add-ons.
    pub fn validate(file: &CatalogFile) -> Result<(), MarketError> {
        fn check<'a>(
            table: &str,
            entries: impl Iterator<Item = (&'a str, &'a str, Cents)>,
        ) -> Result<usize, MarketError> {
            let mut seen = BTreeSet::new();
            for (id, name, price) in entries {
                if id.trim().is_empty() || name.trim().is_empty() {
                    return Err(MarketError::invalid(format!(
                        "{table}: entries need a non-empty id and name"
                    )));
                }
                if price.value() < 0 {
                    return Err(MarketError::invalid(format!(
                        "{table}: '{id}' has a negative price"
                    )));
                }
                if !seen.insert(id) {
                    return Err(MarketError::invalid(format!(
                        "{table}: duplicate id '{id}'"
                    )));
                }
            }
            Ok(seen.len())
        }

        let tiers = check(
            "tiers",
            file.tiers
                .iter()
                .map(|t| (t.id.as_str(), t.name.as_str(), t.base_price)),
        )?;
        check(
            "addons",
            file.addons
                .iter()
                .map(|a| (a.id.as_str(), a.name.as_str(), a.price)),
        )?;
        let walls = check(
            "wall_types",
            file.wall_types
                .iter()
                .map(|w| (w.id.as_str(), w.name.as_str(), w.surcharge)),
        )?;
        let mounts = check(
            "mount_types",
            file.mount_types
                .iter()
                .map(|m| (m.id.as_str(), m.name.as_str(), m.price)),
        )?;

        if tiers == 0 || walls == 0 || mounts == 0 {
            return Err(MarketError::invalid(
                "catalog needs at least one tier, wall type and mount type",
            ));
        }
        if let Some(t) = file.tiers.iter().find(|t| t.max_tv_inches == 0) {
            return Err(MarketError::invalid(format!(
                "tiers: '{}' has max_tv_inches of 0",
                t.id
            )));
        }
        Ok(())
    }

    // =========================================================================
    // LOOKUPS
    // =========================================================================

    pub fn tier(&self, id: &str) -> Result<&ServiceTier, MarketError> {
        self.tiers
            .get(id)
            .ok_or_else(|| MarketError::UnknownCatalogItem(format!("tier '{id}'")))
    }

    pub fn addon(&self, id: &str) -> Result<&AddOn, MarketError> {
        self.addons
            .get(id)
            .ok_or_else(|| MarketError::UnknownCatalogItem(format!("add-on '{id}'")))
    }

    pub fn wall_type(&self, id: &str) -> Result<&WallType, MarketError> {
        self.wall_types
            .get(id)
            .ok_or_else(|| MarketError::UnknownCatalogItem(format!("wall type '{id}'")))
    }

    pub fn mount_type(&self, id: &str) -> Result<&MountType, MarketError> {
        self.mount_types
            .get(id)
            .ok_or_else(|| MarketError::UnknownCatalogItem(format!("mount type '{id}'")))
    }

    /// Service tiers ordered by base price (cheapest first).
    #[must_use]
    pub fn tiers(&self) -> Vec<&ServiceTier> {
        let mut tiers: Vec<_> = self.tiers.values().collect();
        tiers.sort_by(|a, b| a.base_price.cmp(&b.base_price).then(a.id.cmp(&b.id)));
        tiers
    }

    /// Tiers able to handle a TV of the given size.
    #[must_use]
    pub fn tiers_for_size(&self, inches: u16) -> Vec<&ServiceTier> {
        self.tiers()
            .into_iter()
            .filter(|t| t.max_tv_inches >= inches)
            .collect()
    }

    #[must_use]
    pub fn addons(&self) -> Vec<&AddOn> {
        self.addons.values().collect()
    }

    #[must_use]
    pub fn wall_types(&self) -> Vec<&WallType> {
        self.wall_types.values().collect()
    }

    #[must_use]
    pub fn mount_types(&self) -> Vec<&MountType> {
        self.mount_types.values().collect()
    }

    /// Export the catalog back into its file shape.
    #[must_use]
    pub fn to_file(&self) -> CatalogFile {
        CatalogFile {
            tiers: self.tiers().into_iter().cloned().collect(),
            addons: self.addons.values().cloned().collect(),
            wall_types: self.wall_types.values().cloned().collect(),
            mount_types: self.mount_types.values().cloned().collect(),
        }
    }
}

// =============================================================================
// BUILT-IN TABLE HELPERS
// =============================================================================

fn tier(id: &str, name: &str, description: &str, price: i64, max_tv_inches: u16) -> ServiceTier {
    ServiceTier {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        base_price: Cents::new(price),
        max_tv_inches,
    }
}

fn addon(id: &str, name: &str, description: &str, price: i64) -> AddOn {
    AddOn {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        price: Cents::new(price),
    }
}

fn wall(id: &str, name: &str, surcharge: i64) -> WallType {
    WallType {
        id: id.to_string(),
        name: name.to_string(),
        surcharge: Cents::new(surcharge),
    }
}

fn mount(id: &str, name: &str, description: &str, price: i64) -> MountType {
    MountType {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        price: Cents::new(price),
    }
}

// =============================================================================
// TESTS
// =============================================================================
