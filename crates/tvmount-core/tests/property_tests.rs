//! # Property-Based Tests
//!
//! Pricing arithmetic, wizard gating and tracking-code shape over random
//! inputs drawn from the built-in catalog.

use proptest::collection::vec;
use proptest::prelude::*;
use std::collections::BTreeSet;
use tvmount_core::{BookingId, Catalog, Cents, Step, StepInput, TrackingKeys, TvConfig, Wizard};
use tvmount_core::{normalize_code, quote, quote_tv};

const TIERS: [&str; 3] = ["basic", "standard", "premium"];
const WALLS: [&str; 5] = ["drywall", "plaster", "brick", "concrete", "stone"];
const MOUNTS: [&str; 4] = ["customer_provided", "fixed", "tilting", "full_motion"];
const ADDONS: [&str; 5] = [
    "cable_concealment",
    "soundbar",
    "outlet",
    "device_setup",
    "tv_removal",
];

fn tv_strategy() -> impl Strategy<Value = TvConfig> {
    (
        24u16..=65,
        0..TIERS.len(),
        0..WALLS.len(),
        0..MOUNTS.len(),
        vec(0..ADDONS.len(), 0..6),
    )
        .prop_map(|(size, t, w, m, picks)| {
            let addons: BTreeSet<usize> = picks.into_iter().collect();
            TvConfig {
                size_inches: size,
                tier: TIERS[t].to_string(),
                wall_type: WALLS[w].to_string(),
                mount_type: MOUNTS[m].to_string(),
                addons: addons.into_iter().map(|i| ADDONS[i].to_string()).collect(),
                photo: None,
            }
        })
}

fn expected_subtotal(catalog: &Catalog, tv: &TvConfig) -> i64 {
    let base = catalog.tier(&tv.tier).expect("tier").base_price.value()
        + catalog.wall_type(&tv.wall_type).expect("wall").surcharge.value()
        + catalog.mount_type(&tv.mount_type).expect("mount").price.value();
    let addons: i64 = tv
        .addons
        .iter()
        .map(|id| catalog.addon(id).expect("addon").price.value())
        .sum();
    base + addons
}

// =============================================================================
// PRICING
// =============================================================================

proptest! {
    /// A TV costs its base configuration plus the sum of its add-ons.
    #[test]
    fn subtotal_is_base_plus_addons(tv in tv_strategy()) {
        let catalog = Catalog::default();
        let q = quote_tv(&catalog, &tv).expect("quote");
        prop_assert_eq!(q.subtotal.value(), expected_subtotal(&catalog, &tv));
        prop_assert_eq!(q.lines.len(), 3 + tv.addons.len());
    }

    /// The booking total is the sum of TV subtotals.
    #[test]
    fn total_is_sum_of_tvs(tvs in vec(tv_strategy(), 1..8)) {
        let catalog = Catalog::default();
        let q = quote(&catalog, &tvs).expect("quote");
        let expected: i64 = tvs.iter().map(|tv| expected_subtotal(&catalog, tv)).sum();
        prop_assert_eq!(q.total, Cents::new(expected));
        let summed: Cents = q.tvs.iter().map(|t| t.subtotal).sum();
        prop_assert_eq!(q.total, summed);
    }

    /// Add-on order never changes the price.
    #[test]
    fn addon_order_is_irrelevant(tv in tv_strategy()) {
        let catalog = Catalog::default();
        let mut reversed = tv.clone();
        reversed.addons.reverse();
        prop_assert_eq!(
            quote_tv(&catalog, &tv).expect("quote").subtotal,
            quote_tv(&catalog, &reversed).expect("quote").subtotal
        );
    }
}

// =============================================================================
// WIZARD GATING
// =============================================================================

proptest! {
    /// Without a size the wizard never leaves the TV size step; with a valid
    /// one it always does.
    #[test]
    fn size_step_gates_on_required_field(size in 24u16..=100) {
        let catalog = Catalog::default();
        let today = chrono::NaiveDate::from_ymd_opt(2026, 1, 15).expect("date");
        let mut w = Wizard::new();
        w.next(&catalog, today).expect("photo is optional");
        prop_assert_eq!(w.step(), Step::TvSize);

        prop_assert!(w.next(&catalog, today).is_err());
        prop_assert_eq!(w.step(), Step::TvSize);

        w.apply(StepInput::TvSize { size_inches: size }, &catalog).expect("apply");
        prop_assert_eq!(w.next(&catalog, today).expect("next"), Step::ServiceTier);
    }

    /// Out-of-range sizes are refused at input time.
    #[test]
    fn out_of_range_size_rejected(size in prop_oneof![0u16..24, 101u16..2000]) {
        let catalog = Catalog::default();
        let today = chrono::NaiveDate::from_ymd_opt(2026, 1, 15).expect("date");
        let mut w = Wizard::new();
        w.next(&catalog, today).expect("photo");
        let input = StepInput::TvSize { size_inches: size };
        prop_assert!(w.apply(input, &catalog).is_err());
        prop_assert!(w.tvs()[0].size_inches.is_none());
    }

    /// `back` from any reachable per-TV step never fails and never
    /// underflows.
    #[test]
    fn back_is_total(presses in 0usize..20) {
        let mut w = Wizard::new();
        for _ in 0..presses {
            w.back();
        }
        prop_assert_eq!(w.step(), Step::Photo);
        prop_assert_eq!(w.current_tv(), 0);
    }
}

// =============================================================================
// TRACKING CODES
// =============================================================================

proptest! {
    #[test]
    fn tracking_code_shape(id in 1u64..u64::MAX, attempt in 0u32..64) {
        let keys = TrackingKeys::from_secret("prop");
        let code = keys.tracking_code(BookingId(id), attempt);
        prop_assert_eq!(code.len(), 10);
        prop_assert!(code.chars().all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c)));
        prop_assert_eq!(normalize_code(&code.to_ascii_lowercase()), code);
    }

    #[test]
    fn normalize_code_is_idempotent(s in "[a-zA-Z0-9 -]{0,24}") {
        let once = normalize_code(&s);
        prop_assert_eq!(normalize_code(&once), once.clone());
    }
}
