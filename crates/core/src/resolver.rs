//! Ingredient-to-reservoir resolution and portion scaling.
//!
//! Turns a recipe's abstract ingredient list into concrete reservoir
//! assignments and dispense timings for a requested serving count. The
//! resolver is pure with respect to inventory: it never reads or writes
//! stock; the capacity pre-check happens separately against its output.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::CoreError;

/// A user's configuration for one physical reservoir slot, as seen by the
/// resolver. Mirrors the `reservoir_configs` row without the bookkeeping
/// columns.
#[derive(Debug, Clone)]
pub struct SlotConfig {
    /// Physical slot number, 1..=4.
    pub slot: i16,
    /// Spice label loaded in this slot, if any.
    pub label: Option<String>,
    /// Calibrated flow rate in grams per second; `None` or `<= 0` means
    /// the slot is uncalibrated.
    pub flow_rate_g_per_sec: Option<f64>,
    /// Current stock in grams; `None` means unknown.
    pub stock_grams: Option<f64>,
}

impl SlotConfig {
    /// Whether this slot has a usable (positive) flow rate.
    fn has_usable_flow(&self) -> bool {
        self.flow_rate_g_per_sec.is_some_and(|f| f > 0.0)
    }
}

/// One recipe ingredient to be resolved.
#[derive(Debug, Clone)]
pub struct IngredientSpec {
    pub label: String,
    /// Base quantity in grams for `recipe_portions` servings.
    pub quantity_grams: f64,
}

/// A successfully mapped ingredient: which slot dispenses it, how much,
/// and for how long.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedItem {
    pub slot: i16,
    pub label: String,
    /// Scaled quantity in grams for the requested serving count.
    pub quantity_grams: f64,
    pub flow_rate_g_per_sec: f64,
    pub duration_seconds: f64,
}

/// Outcome of resolving a full ingredient list. The three collections are
/// disjoint: every input ingredient lands in exactly one of them.
#[derive(Debug, Default)]
pub struct Resolution {
    pub resolved: Vec<ResolvedItem>,
    /// Labels with no matching reservoir at all.
    pub missing: Vec<String>,
    /// Labels whose best matching reservoir lacks a usable flow rate.
    pub uncalibrated: Vec<String>,
}

impl Resolution {
    /// Whether every ingredient was mapped to a calibrated reservoir.
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty() && self.uncalibrated.is_empty()
    }
}

/// Dispense duration for `quantity_grams` at `flow_rate` g/s.
///
/// Returns 0 when the flow rate is absent or non-positive — never divides
/// by zero.
pub fn duration_seconds(quantity_grams: f64, flow_rate: Option<f64>) -> f64 {
    match flow_rate {
        Some(rate) if rate > 0.0 => quantity_grams / rate,
        _ => 0.0,
    }
}

/// Resolve each ingredient to a reservoir slot and scale quantities from
/// `recipe_portions` base servings to `requested_servings`.
///
/// Matching is case-insensitive on the slot label. When several slots
/// match, a slot with a usable flow rate is preferred; ties break to the
/// lowest slot number, so resolution is deterministic for an unchanged
/// configuration.
///
/// `recipe_portions` must be positive; a recipe without a portion count is
/// rejected as [`CoreError::InvalidState`] before any mapping happens.
pub fn resolve(
    configs: &[SlotConfig],
    ingredients: &[IngredientSpec],
    requested_servings: i32,
    recipe_portions: i32,
) -> Result<Resolution, CoreError> {
    if recipe_portions <= 0 {
        return Err(CoreError::InvalidState(
            "Recipe has no positive portion count".into(),
        ));
    }
    if requested_servings <= 0 {
        return Err(CoreError::Validation(
            "Requested servings must be at least 1".into(),
        ));
    }

    let scale = f64::from(requested_servings) / f64::from(recipe_portions);
    let mut resolution = Resolution::default();

    for ingredient in ingredients {
        let wanted = ingredient.label.to_lowercase();

        let matches: Vec<&SlotConfig> = configs
            .iter()
            .filter(|c| {
                c.label
                    .as_deref()
                    .is_some_and(|l| l.to_lowercase() == wanted)
            })
            .collect();

        if matches.is_empty() {
            resolution.missing.push(ingredient.label.clone());
            continue;
        }

        // Prefer a calibrated slot; among candidates the lowest slot
        // wins. A label whose matches are all uncalibrated is reported,
        // not resolved.
        let Some((slot, flow)) = matches
            .iter()
            .filter(|c| c.has_usable_flow())
            .filter_map(|c| c.flow_rate_g_per_sec.map(|f| (c.slot, f)))
            .min_by_key(|(slot, _)| *slot)
        else {
            resolution.uncalibrated.push(ingredient.label.clone());
            continue;
        };

        let quantity = ingredient.quantity_grams * scale;

        resolution.resolved.push(ResolvedItem {
            slot,
            label: ingredient.label.clone(),
            quantity_grams: quantity,
            flow_rate_g_per_sec: flow,
            duration_seconds: duration_seconds(quantity, Some(flow)),
        });
    }

    Ok(resolution)
}

/// Aggregate scaled consumption per reservoir slot across resolved items.
///
/// Used by the stock pre-check at job creation; the map is ordered by slot
/// so reported shortages are deterministic.
pub fn aggregate_required(resolved: &[ResolvedItem]) -> BTreeMap<i16, f64> {
    let mut totals = BTreeMap::new();
    for item in resolved {
        *totals.entry(item.slot).or_insert(0.0) += item.quantity_grams;
    }
    totals
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(n: i16, label: &str, flow: Option<f64>, stock: Option<f64>) -> SlotConfig {
        SlotConfig {
            slot: n,
            label: Some(label.to_string()),
            flow_rate_g_per_sec: flow,
            stock_grams: stock,
        }
    }

    fn ingredient(label: &str, grams: f64) -> IngredientSpec {
        IngredientSpec {
            label: label.to_string(),
            quantity_grams: grams,
        }
    }

    #[test]
    fn scales_quantities_by_servings_over_portions() {
        // Recipe for 2 portions, job requested for 4 servings: everything doubles.
        let configs = vec![
            slot(1, "Pimenta", Some(5.0), None),
            slot(2, "Sal", Some(10.0), None),
        ];
        let ingredients = vec![ingredient("Pimenta", 10.0), ingredient("Sal", 20.0)];

        let r = resolve(&configs, &ingredients, 4, 2).unwrap();

        assert!(r.is_complete());
        assert_eq!(r.resolved.len(), 2);
        assert!((r.resolved[0].quantity_grams - 20.0).abs() < 1e-9);
        assert!((r.resolved[1].quantity_grams - 40.0).abs() < 1e-9);
    }

    #[test]
    fn duration_is_quantity_over_flow_rate() {
        // 20 g at 5 g/s dispenses in exactly 4 seconds.
        let configs = vec![slot(1, "sal", Some(5.0), None)];
        let ingredients = vec![ingredient("sal", 20.0)];

        let r = resolve(&configs, &ingredients, 1, 1).unwrap();

        assert!((r.resolved[0].duration_seconds - 4.0).abs() < 1e-9);
    }

    #[test]
    fn duration_helper_never_divides_by_zero() {
        assert_eq!(duration_seconds(20.0, None), 0.0);
        assert_eq!(duration_seconds(20.0, Some(0.0)), 0.0);
        assert_eq!(duration_seconds(20.0, Some(-1.0)), 0.0);
        assert!((duration_seconds(20.0, Some(4.0)) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn label_matching_is_case_insensitive() {
        let configs = vec![slot(3, "PIMENTA-DO-REINO", Some(2.0), None)];
        let ingredients = vec![ingredient("pimenta-do-reino", 6.0)];

        let r = resolve(&configs, &ingredients, 1, 1).unwrap();

        assert_eq!(r.resolved.len(), 1);
        assert_eq!(r.resolved[0].slot, 3);
    }

    #[test]
    fn unmatched_labels_are_reported_missing() {
        let configs = vec![slot(1, "sal", Some(5.0), None)];
        let ingredients = vec![ingredient("sal", 5.0), ingredient("cominho", 3.0)];

        let r = resolve(&configs, &ingredients, 1, 1).unwrap();

        assert_eq!(r.resolved.len(), 1);
        assert_eq!(r.missing, vec!["cominho".to_string()]);
        assert!(r.uncalibrated.is_empty());
    }

    #[test]
    fn matched_slot_without_flow_rate_is_uncalibrated() {
        let configs = vec![
            slot(1, "sal", None, None),
            slot(2, "oregano", Some(0.0), None),
        ];
        let ingredients = vec![ingredient("sal", 5.0), ingredient("oregano", 2.0)];

        let r = resolve(&configs, &ingredients, 1, 1).unwrap();

        assert!(r.resolved.is_empty());
        assert!(r.missing.is_empty());
        assert_eq!(
            r.uncalibrated,
            vec!["sal".to_string(), "oregano".to_string()]
        );
    }

    #[test]
    fn calibrated_slot_preferred_over_uncalibrated_duplicate() {
        // Same label in two slots; only slot 4 is calibrated.
        let configs = vec![slot(1, "sal", None, None), slot(4, "sal", Some(3.0), None)];
        let ingredients = vec![ingredient("sal", 9.0)];

        let r = resolve(&configs, &ingredients, 1, 1).unwrap();

        assert_eq!(r.resolved[0].slot, 4);
        assert!((r.resolved[0].duration_seconds - 3.0).abs() < 1e-9);
    }

    #[test]
    fn ties_break_to_the_lowest_slot() {
        let configs = vec![
            slot(3, "sal", Some(2.0), None),
            slot(2, "sal", Some(4.0), None),
        ];
        let ingredients = vec![ingredient("sal", 8.0)];

        let r = resolve(&configs, &ingredients, 1, 1).unwrap();

        assert_eq!(r.resolved[0].slot, 2);
    }

    #[test]
    fn resolution_is_deterministic() {
        let configs = vec![
            slot(2, "sal", Some(4.0), None),
            slot(1, "pimenta", Some(2.0), None),
            slot(3, "sal", Some(4.0), None),
        ];
        let ingredients = vec![ingredient("sal", 8.0), ingredient("pimenta", 4.0)];

        let first = resolve(&configs, &ingredients, 3, 2).unwrap();
        for _ in 0..10 {
            let again = resolve(&configs, &ingredients, 3, 2).unwrap();
            let slots: Vec<i16> = again.resolved.iter().map(|i| i.slot).collect();
            let expected: Vec<i16> = first.resolved.iter().map(|i| i.slot).collect();
            assert_eq!(slots, expected);
        }
    }

    #[test]
    fn zero_portions_is_a_precondition_failure() {
        let err = resolve(&[], &[], 2, 0).unwrap_err();
        assert!(matches!(err, CoreError::InvalidState(_)));
    }

    #[test]
    fn zero_servings_is_rejected() {
        let err = resolve(&[], &[], 0, 2).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn aggregate_required_sums_per_slot() {
        let resolved = vec![
            ResolvedItem {
                slot: 1,
                label: "sal".into(),
                quantity_grams: 10.0,
                flow_rate_g_per_sec: 5.0,
                duration_seconds: 2.0,
            },
            ResolvedItem {
                slot: 1,
                label: "sal grosso".into(),
                quantity_grams: 7.5,
                flow_rate_g_per_sec: 5.0,
                duration_seconds: 1.5,
            },
            ResolvedItem {
                slot: 2,
                label: "pimenta".into(),
                quantity_grams: 3.0,
                flow_rate_g_per_sec: 3.0,
                duration_seconds: 1.0,
            },
        ];

        let totals = aggregate_required(&resolved);

        assert!((totals[&1] - 17.5).abs() < 1e-9);
        assert!((totals[&2] - 3.0).abs() < 1e-9);
    }
}
