//! # Pricing
//!
//! Quotes are a lookup in the catalog plus addition:
//!
//! ```text
//! tv subtotal = tier.base_price + wall.surcharge + mount.price + Σ addon.price
//! total       = Σ tv subtotal
//! ```
//!
//! No discounts, no taxes, no rounding: every amount is integer cents.

use crate::catalog::Catalog;
use crate::validation;
use crate::{Cents, MarketError, PhotoId};
use serde::{Deserialize, Serialize};

// =============================================================================
// TV CONFIGURATION
// =============================================================================

/// A fully specified TV installation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TvConfig {
    pub size_inches: u16,
    pub tier: String,
    pub wall_type: String,
    pub mount_type: String,
    #[serde(default)]
    pub addons: Vec<String>,
    #[serde(default)]
    pub photo: Option<PhotoId>,
}

impl TvConfig {
    /// Validate every field against the catalog.
    pub fn validate(&self, catalog: &Catalog) -> Result<(), MarketError> {
        validation::tv_size(self.size_inches)?;
        validation::tier_for_size(catalog, &self.tier, self.size_inches)?;
        validation::mounting(catalog, &self.wall_type, &self.mount_type)?;
        validation::addons(catalog, &self.addons)?;
        Ok(())
    }
}

// =============================================================================
// QUOTE STRUCTURES
// =============================================================================

/// What a quote line charges for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineKind {
    Tier,
    Wall,
    Mount,
    AddOn,
}

/// One priced line of a TV quote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub kind: LineKind,
    pub id: String,
    pub label: String,
    pub amount: Cents,
}

/// Priced breakdown for one TV.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TvQuote {
    pub size_inches: u16,
    pub lines: Vec<LineItem>,
    pub subtotal: Cents,
}

impl TvQuote {
    /// The tier line's amount (the base price).
    #[must_use]
    pub fn base_price(&self) -> Cents {
        self.lines
            .iter()
            .filter(|l| l.kind == LineKind::Tier)
            .map(|l| l.amount)
            .sum()
    }
}

/// Priced breakdown for a whole booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Quote {
    pub tvs: Vec<TvQuote>,
    pub total: Cents,
}

// =============================================================================
// QUOTING
// =============================================================================

/// Price a single TV.
///
/// Fails if any referenced catalog item is unknown. Size compatibility is
/// not checked here; see [`TvConfig::validate`].
pub fn quote_tv(catalog: &Catalog, tv: &TvConfig) -> Result<TvQuote, MarketError> {
    let tier = catalog.tier(&tv.tier)?;
    let wall = catalog.wall_type(&tv.wall_type)?;
    let mount = catalog.mount_type(&tv.mount_type)?;

    let mut lines = Vec::with_capacity(3 + tv.addons.len());
    lines.push(LineItem {
        kind: LineKind::Tier,
        id: tier.id.clone(),
        label: tier.name.clone(),
        amount: tier.base_price,
    });
    lines.push(LineItem {
        kind: LineKind::Wall,
        id: wall.id.clone(),
        label: format!("{} wall", wall.name),
        amount: wall.surcharge,
    });
    lines.push(LineItem {
        kind: LineKind::Mount,
        id: mount.id.clone(),
        label: mount.name.clone(),
        amount: mount.price,
    });
    for id in &tv.addons {
        let addon = catalog.addon(id)?;
        lines.push(LineItem {
            kind: LineKind::AddOn,
            id: addon.id.clone(),
            label: addon.name.clone(),
            amount: addon.price,
        });
    }

    let subtotal = lines.iter().map(|l| l.amount).sum();
    Ok(TvQuote {
        size_inches: tv.size_inches,
        lines,
        subtotal,
    })
}

/// Price every TV of a booking.
pub fn quote(catalog: &Catalog, tvs: &[TvConfig]) -> Result<Quote, MarketError> {
    let tvs = tvs
        .iter()
        .map(|tv| quote_tv(catalog, tv))
        .collect::<Result<Vec<_>, _>>()?;
    let total = tvs.iter().map(|q| q.subtotal).sum();
    Ok(Quote { tvs, total })
}

// =============================================================================
// TESTS
// =============================================================================
