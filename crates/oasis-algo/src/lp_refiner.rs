//! Multi-period LP refinement (§4.4): re-solve an existing day-by-day
//! schedule as a continuous LP to maximize throughput or margin subject to
//! inventory-balance and capacity constraints.

use std::collections::HashMap;

use good_lp::solvers::clarabel::clarabel;
use good_lp::{constraint, variable, variables, Expression, Solution, SolverModel, Variable};
use oasis_core::model::{BlendAllocation, BlendingRecipe, Crude, DailyPlan, Tank, Vessel};
use tracing::warn;

use crate::blending::blend_margin;

/// Which quantity the LP maximizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefinerObjective {
    Throughput,
    Margin,
}

/// Tunables for a refinement solve. There is deliberately no `max_deviation`
/// field: the reference gates a deviation-limit constraint block behind a
/// flag that is hardcoded off, so no behavior from it is ported (§4.4, §11
/// Open Question 1).
#[derive(Debug, Clone, Copy)]
pub struct LpRefinerConfig {
    pub max_processing_rate: f64,
    pub time_limit_seconds: f64,
    pub relative_mip_gap: f64,
}

impl Default for LpRefinerConfig {
    fn default() -> Self {
        Self {
            max_processing_rate: 100.0,
            time_limit_seconds: 3000.0,
            relative_mip_gap: 0.05,
        }
    }
}

/// Maximize total throughput (Σ rate) over the planning horizon in `schedule`.
pub fn optimize_throughput(
    schedule: &[DailyPlan],
    recipes: &[BlendingRecipe],
    crudes: &HashMap<String, Crude>,
    vessels: &[Vessel],
    config: &LpRefinerConfig,
) -> Vec<DailyPlan> {
    optimize(schedule, recipes, crudes, vessels, RefinerObjective::Throughput, config)
}

/// Maximize total margin (Σ rate · blend_margin(recipe)) over the horizon.
pub fn optimize_margin(
    schedule: &[DailyPlan],
    recipes: &[BlendingRecipe],
    crudes: &HashMap<String, Crude>,
    vessels: &[Vessel],
    config: &LpRefinerConfig,
) -> Vec<DailyPlan> {
    optimize(schedule, recipes, crudes, vessels, RefinerObjective::Margin, config)
}

fn all_grades(recipes: &[BlendingRecipe], schedule: &[DailyPlan], vessels: &[Vessel]) -> Vec<String> {
    let mut grades: Vec<String> = Vec::new();
    let mut seen = |grades: &mut Vec<String>, g: &str| {
        if !grades.iter().any(|x| x == g) {
            grades.push(g.to_string());
        }
    };
    for recipe in recipes {
        seen(&mut grades, &recipe.primary_grade);
        if let Some(secondary) = &recipe.secondary_grade {
            seen(&mut grades, secondary);
        }
    }
    if let Some(first) = schedule.first() {
        for (grade, _) in &first.inventory_by_grade {
            seen(&mut grades, grade);
        }
    }
    for vessel in vessels {
        for parcel in &vessel.cargo {
            seen(&mut grades, &parcel.grade);
        }
    }
    grades
}

fn deliveries_of(vessels: &[Vessel], day: u32, grade: &str) -> f64 {
    vessels
        .iter()
        .filter(|v| v.arrival_day == day)
        .flat_map(|v| &v.cargo)
        .filter(|p| p.grade == grade)
        .map(|p| p.volume)
        .sum()
}

fn optimize(
    schedule: &[DailyPlan],
    recipes: &[BlendingRecipe],
    crudes: &HashMap<String, Crude>,
    vessels: &[Vessel],
    objective: RefinerObjective,
    config: &LpRefinerConfig,
) -> Vec<DailyPlan> {
    if schedule.is_empty() || recipes.is_empty() {
        return schedule.to_vec();
    }

    let days = schedule.len() as u32;
    let grades = all_grades(recipes, schedule, vessels);
    // §4.4 "Initial inventory": inventory[0, g] is pinned to day 1 of the
    // input schedule's snapshot rather than modeled as a free variable.
    let inventory0: HashMap<String, f64> = schedule[0].inventory_by_grade.iter().cloned().collect();

    let mut vars = variables!();

    let mut rate_vars: HashMap<(u32, String), Variable> = HashMap::new();
    for day in 1..=days {
        for recipe in recipes {
            let v = vars.add(variable().min(0.0).max(recipe.max_rate));
            rate_vars.insert((day, recipe.name.clone()), v);
        }
    }

    let mut inventory_vars: HashMap<(u32, String), Variable> = HashMap::new();
    for day in 1..=days {
        for grade in &grades {
            let v = vars.add(variable().min(0.0));
            inventory_vars.insert((day, grade.clone()), v);
        }
    }

    let mut objective_expr = Expression::from(0.0);
    for day in 1..=days {
        for recipe in recipes {
            let rate_var = rate_vars[&(day, recipe.name.clone())];
            match objective {
                RefinerObjective::Throughput => objective_expr += rate_var,
                RefinerObjective::Margin => objective_expr += blend_margin(recipe, crudes) * rate_var,
            }
        }
    }

    let mut model = vars.maximise(objective_expr).using(clarabel);

    let previous_inventory = |day: u32, grade: &str| -> Expression {
        if day == 1 {
            (*inventory0.get(grade).unwrap_or(&0.0)).into()
        } else {
            inventory_vars[&(day - 1, grade.to_string())].into()
        }
    };

    // Balance.
    for day in 1..=days {
        for grade in &grades {
            let prev = previous_inventory(day, grade);
            let delivery = deliveries_of(vessels, day, grade);
            let mut consumption = Expression::from(0.0);
            for recipe in recipes {
                let rate_var = rate_vars[&(day, recipe.name.clone())];
                if recipe.primary_grade == *grade {
                    consumption += recipe.primary_fraction * rate_var;
                }
                if recipe.secondary_grade.as_deref() == Some(grade.as_str()) {
                    consumption += recipe.secondary_fraction() * rate_var;
                }
            }
            let inventory = inventory_vars[&(day, grade.clone())];
            model = model.with(constraint!(inventory == prev + delivery - consumption));
        }
    }

    // Capacity.
    for day in 1..=days {
        let mut total_rate = Expression::from(0.0);
        for recipe in recipes {
            total_rate += rate_vars[&(day, recipe.name.clone())];
        }
        model = model.with(constraint!(total_rate <= config.max_processing_rate));
    }

    // Availability.
    for day in 1..=days {
        for recipe in recipes {
            let rate_var = rate_vars[&(day, recipe.name.clone())];
            let prev_primary = previous_inventory(day, &recipe.primary_grade);
            model = model.with(constraint!(recipe.primary_fraction * rate_var <= prev_primary));
            if let Some(secondary_grade) = &recipe.secondary_grade {
                let prev_secondary = previous_inventory(day, secondary_grade);
                model = model.with(constraint!(
                    recipe.secondary_fraction() * rate_var <= prev_secondary
                ));
            }
        }
    }

    let solution = match model.solve() {
        Ok(solution) => solution,
        Err(err) => {
            warn!("LP refiner solve failed, returning input schedule unchanged: {err:?}");
            return schedule.to_vec();
        }
    };

    let reference_tanks = &schedule[0].tank_snapshot;
    let mut refined = Vec::with_capacity(days as usize);
    for day in 1..=days {
        let mut blending_details = Vec::new();
        for recipe in recipes {
            let rate = solution.value(rate_vars[&(day, recipe.name.clone())]);
            if rate < 0.001 {
                continue;
            }
            blending_details.push(BlendAllocation {
                recipe_name: recipe.name.clone(),
                margin: blend_margin(recipe, crudes),
                rate,
            });
        }
        let processing_rates: Vec<(String, f64)> = blending_details
            .iter()
            .map(|a| (a.recipe_name.clone(), a.rate))
            .collect();
        let daily_margin: f64 = blending_details.iter().map(|a| a.margin * a.rate).sum();

        let mut grade_totals: HashMap<String, f64> = HashMap::new();
        for grade in &grades {
            let value = solution.value(inventory_vars[&(day, grade.clone())]);
            if value > 0.001 {
                grade_totals.insert(grade.clone(), value);
            }
        }
        let inventory_by_grade: Vec<(String, f64)> = grade_totals
            .iter()
            .map(|(g, v)| (g.clone(), *v))
            .collect();
        let total_inventory: f64 = inventory_by_grade.iter().map(|(_, v)| v).sum();
        let tank_snapshot = redistribute_tanks(reference_tanks, &grade_totals);

        refined.push(DailyPlan {
            day,
            processing_rates,
            blending_details,
            total_inventory,
            inventory_by_grade,
            tank_snapshot,
            daily_margin,
            hourly_schedule: None,
        });
    }
    refined
}

/// Reconstruct a tank snapshot from per-grade totals: first honor each
/// reference tank's original grade assignment up to capacity, then spread
/// any residual to tanks with spare headroom (§4.4 "Tank distribution after
/// solve").
fn redistribute_tanks(reference_tanks: &[Tank], grade_totals: &HashMap<String, f64>) -> Vec<Tank> {
    let mut tanks: Vec<Tank> = reference_tanks
        .iter()
        .map(|t| Tank {
            name: t.name.clone(),
            capacity: t.capacity,
            content: Vec::new(),
        })
        .collect();
    let mut remaining = grade_totals.clone();

    for (tank, reference) in tanks.iter_mut().zip(reference_tanks.iter()) {
        for (grade, _) in &reference.content {
            let Some(target) = remaining.get_mut(grade) else {
                continue;
            };
            if *target <= 0.0 {
                continue;
            }
            let take = target.min(tank.headroom());
            if take > 0.0 {
                tank.content.push((grade.clone(), take));
                *target -= take;
            }
        }
    }

    for (grade, remaining_volume) in remaining.iter_mut() {
        for tank in tanks.iter_mut() {
            if *remaining_volume <= 0.0 {
                break;
            }
            let take = remaining_volume.min(tank.headroom());
            if take > 0.0 {
                if let Some(entry) = tank.content.iter_mut().find(|(g, _)| g == grade) {
                    entry.1 += take;
                } else {
                    tank.content.push((grade.clone(), take));
                }
                *remaining_volume -= take;
            }
        }
    }

    tanks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn crude_map(pairs: &[(&str, f64)]) -> HashMap<String, Crude> {
        pairs
            .iter()
            .map(|(name, margin)| (name.to_string(), Crude::new(*name, *margin, "Origin")))
            .collect()
    }

    fn base_schedule() -> Vec<DailyPlan> {
        let tank = Tank::with_content("T1", 200.0, vec![("A".into(), 100.0), ("B".into(), 100.0)]).unwrap();
        vec![DailyPlan {
            day: 1,
            processing_rates: vec![("R10".into(), 30.0)],
            blending_details: vec![BlendAllocation {
                recipe_name: "R10".into(),
                margin: 10.0,
                rate: 30.0,
            }],
            total_inventory: 200.0,
            inventory_by_grade: vec![("A".into(), 100.0), ("B".into(), 100.0)],
            tank_snapshot: vec![tank],
            daily_margin: 300.0,
            hourly_schedule: None,
        }]
    }

    #[test]
    fn s3_optimize_margin_prefers_higher_margin_recipe() {
        let schedule = base_schedule();
        let r10 = BlendingRecipe::new("R10", "A", None, 100.0, 1.0).unwrap();
        let r20 = BlendingRecipe::new("R20", "B", None, 100.0, 1.0).unwrap();
        let crudes = crude_map(&[("A", 10.0), ("B", 20.0)]);
        let config = LpRefinerConfig {
            max_processing_rate: 100.0,
            ..LpRefinerConfig::default()
        };

        let refined = optimize_margin(&schedule, &[r10, r20], &crudes, &[], &config);

        assert_eq!(refined.len(), 1);
        let total_margin: f64 = refined[0].blending_details.iter().map(|a| a.margin * a.rate).sum();
        assert!(total_margin > 300.0);
        assert!(refined[0].rate_of("R10") < 30.0);
    }

    #[test]
    fn empty_schedule_is_returned_unchanged() {
        let recipe = BlendingRecipe::new("R", "A", None, 40.0, 1.0).unwrap();
        let refined = optimize_throughput(&[], &[recipe], &HashMap::new(), &[], &LpRefinerConfig::default());
        assert!(refined.is_empty());
    }

    #[test]
    fn redistribute_honors_original_grade_assignment_first() {
        let reference = vec![
            Tank::with_content("T1", 100.0, vec![("A".into(), 10.0)]).unwrap(),
            Tank::with_content("T2", 100.0, vec![("B".into(), 10.0)]).unwrap(),
        ];
        let mut totals = HashMap::new();
        totals.insert("A".to_string(), 60.0);
        totals.insert("B".to_string(), 30.0);

        let tanks = redistribute_tanks(&reference, &totals);
        assert_eq!(tanks[0].volume_of("A"), 60.0);
        assert_eq!(tanks[1].volume_of("B"), 30.0);
    }
}
