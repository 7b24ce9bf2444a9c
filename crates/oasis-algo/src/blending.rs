//! Blending margin engine (§4.1): pure functions over recipes and crude data.
//!
//! Holds no state; every function takes its inputs by reference and returns a
//! fresh value.

use std::collections::HashMap;

use oasis_core::model::{BlendAllocation, BlendingRecipe, Crude, Tank};

/// primary.margin * primary_fraction + secondary.margin * (1 - primary_fraction), if present.
pub fn blend_margin(recipe: &BlendingRecipe, crudes: &HashMap<String, Crude>) -> f64 {
    let mut margin = 0.0;
    if let Some(crude) = crudes.get(&recipe.primary_grade) {
        margin += crude.margin * recipe.primary_fraction;
    }
    if let Some(secondary_grade) = &recipe.secondary_grade {
        if let Some(crude) = crudes.get(secondary_grade) {
            margin += crude.margin * recipe.secondary_fraction();
        }
    }
    margin
}

fn available_volume(tanks: &[Tank], grade: &str) -> f64 {
    tanks.iter().map(|t| t.volume_of(grade)).sum()
}

/// Maximum rate at which `recipe` could run given the current tank inventory,
/// ignoring recipe.max_rate and remaining processing capacity.
///
/// A zero primary_fraction is unreachable for a validated [`BlendingRecipe`]
/// (the constructor requires `primary_fraction > 0`), so this never divides by
/// zero on the primary side; it can divide by zero on the secondary side when
/// `primary_fraction == 1.0`, in which case there is no secondary grade to
/// divide for (the constructor forbids a secondary grade without also allowing
/// `primary_fraction < 1.0`), so that branch is likewise unreachable — both
/// limits are still computed defensively with `f64::INFINITY` fallbacks to
/// mirror the reference's `primary_fraction > 0 else inf` guard.
pub fn max_feasible_rate(recipe: &BlendingRecipe, tanks: &[Tank]) -> f64 {
    let primary_available = available_volume(tanks, &recipe.primary_grade);
    let max_rate_primary = if recipe.primary_fraction > 0.0 {
        primary_available / recipe.primary_fraction
    } else {
        f64::INFINITY
    };

    let Some(secondary_grade) = &recipe.secondary_grade else {
        return max_rate_primary;
    };
    let secondary_available = available_volume(tanks, secondary_grade);
    let secondary_fraction = recipe.secondary_fraction();
    let max_rate_secondary = if secondary_fraction > 0.0 {
        secondary_available / secondary_fraction
    } else {
        f64::INFINITY
    };
    max_rate_primary.min(max_rate_secondary)
}

/// Select which recipes to run today and at what rate, greedily by margin.
///
/// Viable recipes (feasible rate > 0) are sorted strictly by margin descending;
/// Rust's sort is stable, so recipes of equal margin keep their original
/// relative order, matching the reference's insertion-order tie-break.
pub fn find_optimal_blends(
    recipes: &[BlendingRecipe],
    crudes: &HashMap<String, Crude>,
    tanks: &[Tank],
    max_processing: f64,
) -> Vec<BlendAllocation> {
    let mut viable: Vec<(&BlendingRecipe, f64, f64)> = recipes
        .iter()
        .filter_map(|recipe| {
            let feasible_rate = max_feasible_rate(recipe, tanks);
            if feasible_rate > 0.0 {
                Some((recipe, blend_margin(recipe, crudes), feasible_rate))
            } else {
                None
            }
        })
        .collect();

    viable.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    let mut selected = Vec::new();
    let mut remaining_capacity = max_processing;
    for (recipe, margin, feasible_rate) in viable {
        if remaining_capacity <= 0.0 {
            break;
        }
        let rate = recipe.max_rate.min(feasible_rate).min(remaining_capacity);
        if rate > 0.0 {
            remaining_capacity -= rate;
            selected.push(BlendAllocation {
                recipe_name: recipe.name.clone(),
                margin,
                rate,
            });
        }
    }
    selected
}

#[cfg(test)]
mod tests {
    use super::*;

    fn crude(name: &str, margin: f64) -> (String, Crude) {
        (name.to_string(), Crude::new(name, margin, "Origin"))
    }

    #[test]
    fn margin_combines_primary_and_secondary() {
        let crudes: HashMap<_, _> = [crude("A", 10.0), crude("B", 20.0)].into_iter().collect();
        let recipe = BlendingRecipe::new("R", "A", Some("B".into()), 40.0, 0.75).unwrap();
        let margin = blend_margin(&recipe, &crudes);
        assert!((margin - (10.0 * 0.75 + 20.0 * 0.25)).abs() < 1e-9);
    }

    #[test]
    fn feasible_rate_is_bounded_by_scarcer_grade() {
        let tank = Tank::with_content("T1", 1000.0, vec![("A".into(), 100.0), ("B".into(), 10.0)])
            .unwrap();
        let recipe = BlendingRecipe::new("R", "A", Some("B".into()), 1000.0, 0.5).unwrap();
        // primary: 100/0.5 = 200, secondary: 10/0.5 = 20 -> limited by secondary
        assert!((max_feasible_rate(&recipe, &[tank]) - 20.0).abs() < 1e-9);
    }

    #[test]
    fn s1_single_recipe_greedy_allocation() {
        // Scenario S1 from the testable-properties catalog.
        let tank = Tank::with_content("T1", 100.0, vec![("A".into(), 50.0)]).unwrap();
        let recipe = BlendingRecipe::new("R", "A", None, 40.0, 1.0).unwrap();
        let crudes: HashMap<_, _> = [crude("A", 5.0)].into_iter().collect();
        let allocations = find_optimal_blends(&[recipe], &crudes, &[tank], 100.0);
        assert_eq!(allocations.len(), 1);
        assert_eq!(allocations[0].rate, 40.0);
    }

    #[test]
    fn sorts_by_margin_descending_with_stable_ties() {
        let tank = Tank::with_content("T1", 1000.0, vec![("A".into(), 1000.0)]).unwrap();
        let low = BlendingRecipe::new("low", "A", None, 10.0, 1.0).unwrap();
        let high = BlendingRecipe::new("high", "A", None, 10.0, 1.0).unwrap();
        let crudes: HashMap<_, _> = [crude("A", 1.0)].into_iter().collect();
        // identical margins: order must follow input order (stable sort).
        let allocations = find_optimal_blends(&[low.clone(), high.clone()], &crudes, &[tank.clone()], 100.0);
        assert_eq!(allocations[0].recipe_name, "low");
        assert_eq!(allocations[1].recipe_name, "high");
    }

    #[test]
    fn empty_tanks_yield_empty_result() {
        let recipe = BlendingRecipe::new("R", "A", None, 40.0, 1.0).unwrap();
        let crudes: HashMap<_, _> = [crude("A", 5.0)].into_iter().collect();
        assert!(find_optimal_blends(&[recipe], &crudes, &[], 100.0).is_empty());
    }

    #[test]
    fn nonpositive_capacity_yields_empty_result() {
        let tank = Tank::with_content("T1", 100.0, vec![("A".into(), 50.0)]).unwrap();
        let recipe = BlendingRecipe::new("R", "A", None, 40.0, 1.0).unwrap();
        let crudes: HashMap<_, _> = [crude("A", 5.0)].into_iter().collect();
        assert!(find_optimal_blends(&[recipe], &crudes, &[tank], 0.0).is_empty());
    }
}
