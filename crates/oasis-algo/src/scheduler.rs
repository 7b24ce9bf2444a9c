//! Greedy day-by-day scheduler (§4.3).
//!
//! Simulates the refinery one day at a time: discharge arriving vessels,
//! select blends by margin-ranking (§4.1), withdraw the selected volumes, and
//! snapshot the result into a [`DailyPlan`]. Tanks are exclusively owned by
//! the scheduler for the duration of a run (§5).

use std::collections::HashMap;

use oasis_core::error::{OasisError, OasisResult};
use oasis_core::model::{BlendingRecipe, Crude, DailyPlan, Tank, Vessel};
use tracing::warn;

use crate::blending::find_optimal_blends;
use crate::tanks::TankManager;

/// Tunables for a scheduling run; currently just the plant-wide rate cap, kept
/// as its own struct (rather than a bare `f64` parameter) so future knobs can
/// land here without changing [`Scheduler::new`]'s signature.
#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfig {
    pub max_processing_rate: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_processing_rate: 100.0,
        }
    }
}

/// The day-by-day greedy simulator. Owns the tank state exclusively for the
/// duration of a run; vessels are mutated in place as they're deferred.
pub struct Scheduler {
    tank_manager: TankManager,
    recipes: Vec<BlendingRecipe>,
    vessels: Vec<Vessel>,
    crudes: HashMap<String, Crude>,
    config: SchedulerConfig,
    daily_plans: Vec<DailyPlan>,
}

impl Scheduler {
    /// Construct a scheduler, validating the fatal preconditions from §4.3:
    /// at least one tank, at least one recipe, and crude data for every grade
    /// any recipe references.
    pub fn new(
        tanks: Vec<Tank>,
        recipes: Vec<BlendingRecipe>,
        vessels: Vec<Vessel>,
        crudes: HashMap<String, Crude>,
        config: SchedulerConfig,
    ) -> OasisResult<Self> {
        if tanks.is_empty() {
            return Err(OasisError::Validation("no tanks available for scheduling".into()));
        }
        if recipes.is_empty() {
            return Err(OasisError::Validation(
                "no blending recipes provided for scheduling".into(),
            ));
        }

        let mut missing: Vec<&str> = Vec::new();
        for recipe in &recipes {
            if !crudes.contains_key(&recipe.primary_grade) {
                missing.push(&recipe.primary_grade);
            }
            if let Some(secondary) = &recipe.secondary_grade {
                if !crudes.contains_key(secondary) {
                    missing.push(secondary);
                }
            }
        }
        if !missing.is_empty() {
            return Err(OasisError::Validation(format!(
                "missing crude data for grades: {}",
                missing.join(", ")
            )));
        }

        Ok(Self {
            tank_manager: TankManager::new(tanks),
            recipes,
            vessels,
            crudes,
            config,
            daily_plans: Vec::new(),
        })
    }

    pub fn tanks(&self) -> &[Tank] {
        self.tank_manager.tanks()
    }

    pub fn vessels(&self) -> &[Vessel] {
        &self.vessels
    }

    pub fn daily_plans(&self) -> &[DailyPlan] {
        &self.daily_plans
    }

    /// Run the simulation for `days` days in ascending order, appending one
    /// [`DailyPlan`] per day.
    pub fn run(&mut self, days: u32) -> &[DailyPlan] {
        for day in 1..=days {
            self.discharge_vessels(day);
            let blends = find_optimal_blends(
                &self.recipes,
                &self.crudes,
                self.tank_manager.tanks(),
                self.config.max_processing_rate,
            );
            self.apply_plan(day, blends);
        }
        &self.daily_plans
    }

    /// Step 1 of §4.3: unload every arriving vessel's cargo whole-parcel into
    /// the first tank (in insertion order) with enough headroom. Parcels that
    /// fail to unload stay in `vessel.cargo` and are retried the next day;
    /// the vessel is deferred exactly once per day it still holds cargo.
    fn discharge_vessels(&mut self, day: u32) {
        for vessel in self.vessels.iter_mut() {
            if vessel.arrival_day != day {
                continue;
            }

            let mut remaining_cargo = Vec::new();
            let mut any_failed = false;

            for parcel in vessel.cargo.drain(..) {
                let placed = self
                    .tank_manager
                    .first_tank_with_headroom(parcel.volume)
                    .map(str::to_string)
                    .is_some_and(|tank_name| self.tank_manager.add(&tank_name, &parcel));

                if !placed {
                    any_failed = true;
                    remaining_cargo.push(parcel);
                }
            }
            vessel.cargo = remaining_cargo;

            if any_failed {
                warn!(
                    vessel_id = %vessel.vessel_id,
                    day,
                    "insufficient tank capacity, deferring vessel to day {}",
                    day + 1
                );
                vessel.defer_arrival();
            }
        }
    }

    /// Steps 3-4 of §4.3: withdraw the volumes `find_optimal_blends` decided
    /// on and persist the resulting snapshot. Blend selection itself is a
    /// pure function over immutable inputs and cannot fail in this port (the
    /// reference's try/except around `_select_blends` guards against runtime
    /// errors that have no equivalent here); the empty-blends fallback it
    /// describes is preserved by simply calling it unconditionally.
    fn apply_plan(&mut self, day: u32, blends: Vec<oasis_core::model::BlendAllocation>) {
        for allocation in &blends {
            let Some(recipe) = self.recipes.iter().find(|r| r.name == allocation.recipe_name) else {
                continue;
            };
            let primary_volume = allocation.rate * recipe.primary_fraction;
            self.tank_manager
                .withdraw_across_tanks(&recipe.primary_grade, primary_volume);

            if let Some(secondary_grade) = &recipe.secondary_grade {
                let secondary_volume = allocation.rate * recipe.secondary_fraction();
                self.tank_manager
                    .withdraw_across_tanks(secondary_grade, secondary_volume);
            }
        }

        let processing_rates: Vec<(String, f64)> = blends
            .iter()
            .map(|a| (a.recipe_name.clone(), a.rate))
            .collect();
        let daily_margin: f64 = blends.iter().map(|a| a.margin * a.rate).sum();
        let tank_snapshot: Vec<Tank> = self.tank_manager.tanks().to_vec();

        let mut inventory_by_grade: Vec<(String, f64)> = Vec::new();
        for tank in &tank_snapshot {
            for (grade, volume) in &tank.content {
                if let Some(entry) = inventory_by_grade.iter_mut().find(|(g, _)| g == grade) {
                    entry.1 += volume;
                } else {
                    inventory_by_grade.push((grade.clone(), *volume));
                }
            }
        }
        let total_inventory: f64 = inventory_by_grade.iter().map(|(_, v)| v).sum();

        self.daily_plans.push(DailyPlan {
            day,
            processing_rates,
            blending_details: blends,
            total_inventory,
            inventory_by_grade,
            tank_snapshot,
            daily_margin,
            hourly_schedule: None,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oasis_core::model::{DayRange, FeedstockParcel};

    fn crude_map(pairs: &[(&str, f64)]) -> HashMap<String, Crude> {
        pairs
            .iter()
            .map(|(name, margin)| (name.to_string(), Crude::new(*name, *margin, "Origin")))
            .collect()
    }

    #[test]
    fn rejects_empty_tanks() {
        let recipe = BlendingRecipe::new("R", "A", None, 40.0, 1.0).unwrap();
        let result = Scheduler::new(
            vec![],
            vec![recipe],
            vec![],
            crude_map(&[("A", 5.0)]),
            SchedulerConfig::default(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn rejects_missing_crude_data_for_recipe_grade() {
        let tank = Tank::with_content("T1", 100.0, vec![("A".into(), 50.0)]).unwrap();
        let recipe = BlendingRecipe::new("R", "A", None, 40.0, 1.0).unwrap();
        let result = Scheduler::new(
            vec![tank],
            vec![recipe],
            vec![],
            HashMap::new(),
            SchedulerConfig::default(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn s1_greedy_single_recipe_depletes_over_two_days() {
        let tank = Tank::with_content("T1", 100.0, vec![("A".into(), 50.0)]).unwrap();
        let recipe = BlendingRecipe::new("R", "A", None, 40.0, 1.0).unwrap();
        let mut scheduler = Scheduler::new(
            vec![tank],
            vec![recipe],
            vec![],
            crude_map(&[("A", 5.0)]),
            SchedulerConfig {
                max_processing_rate: 100.0,
            },
        )
        .unwrap();

        scheduler.run(2);
        let plans = scheduler.daily_plans();
        assert_eq!(plans.len(), 2);
        assert_eq!(plans[0].rate_of("R"), 40.0);
        assert_eq!(plans[1].rate_of("R"), 10.0);
        assert_eq!(plans[1].inventory_of("A"), 0.0);
    }

    #[test]
    fn s2_vessel_deferred_when_tank_is_full() {
        let tank = Tank::with_content("T1", 100.0, vec![("B".into(), 90.0)]).unwrap();
        let recipe = BlendingRecipe::new("R", "B", None, 40.0, 1.0).unwrap();
        let mut vessel = Vessel::new("V1", 1, 100.0, 500.0);
        vessel
            .cargo
            .push(FeedstockParcel::new("A", 20.0, DayRange::new(1, 1).unwrap(), "Origin").unwrap());

        let mut scheduler = Scheduler::new(
            vec![tank],
            vec![recipe],
            vec![vessel],
            crude_map(&[("A", 5.0), ("B", 3.0)]),
            SchedulerConfig {
                max_processing_rate: 100.0,
            },
        )
        .unwrap();

        scheduler.run(2);

        let vessel = &scheduler.vessels()[0];
        assert_eq!(vessel.days_held, 1);
        assert_eq!(vessel.arrival_day, 2);
        assert!(vessel.cargo.is_empty());
        assert_eq!(scheduler.tanks()[0].volume_of("A"), 20.0);
    }

    #[test]
    fn blend_selection_failure_records_empty_processing_rates() {
        // A recipe whose feasible rate is zero (empty tank) should simply be
        // skipped by find_optimal_blends rather than causing a panic.
        let tank = Tank::new("T1", 100.0).unwrap();
        let recipe = BlendingRecipe::new("R", "A", None, 40.0, 1.0).unwrap();
        let mut scheduler = Scheduler::new(
            vec![tank],
            vec![recipe],
            vec![],
            crude_map(&[("A", 5.0)]),
            SchedulerConfig::default(),
        )
        .unwrap();

        scheduler.run(1);
        assert!(scheduler.daily_plans()[0].processing_rates.is_empty());
    }
}
