//! Quality-constrained 5-tank LP variant (§4.5): a comparison-study
//! formulation over five fixed-capacity tanks with API/sulfur mixture
//! constraints on top of the §4.4 balance/capacity structure.

use std::collections::HashMap;

use good_lp::solvers::clarabel::clarabel;
use good_lp::{constraint, variable, variables, Expression, Solution, SolverModel, Variable};
use oasis_core::error::{OasisError, OasisResult};
use oasis_core::model::{Tank, Vessel};
use tracing::warn;

/// Fixed tank layout for this variant: T1-T4 at 250,000 bbl, T5 at 180,000 bbl.
pub const TANK_NAMES: [&str; 5] = ["T1", "T2", "T3", "T4", "T5"];
pub const TANK_CAPACITIES: [f64; 5] = [250_000.0, 250_000.0, 250_000.0, 250_000.0, 180_000.0];

/// API/sulfur and purchase price for one crude grade.
#[derive(Debug, Clone, Copy)]
pub struct CrudeQuality {
    pub api: f64,
    pub sulfur: f64,
    pub price: f64,
}

impl CrudeQuality {
    pub fn new(api: f64, sulfur: f64, price: f64) -> Self {
        Self { api, sulfur, price }
    }
}

/// A finished-product blend with quality windows, a sale price, and a daily
/// production cap.
#[derive(Debug, Clone)]
pub struct ProductSpec {
    pub name: String,
    pub min_api: f64,
    pub max_api: f64,
    pub min_sulfur: f64,
    pub max_sulfur: f64,
    pub price: f64,
    pub max_per_day: f64,
}

impl ProductSpec {
    pub fn new(
        name: impl Into<String>,
        min_api: f64,
        max_api: f64,
        min_sulfur: f64,
        max_sulfur: f64,
        price: f64,
        max_per_day: f64,
    ) -> OasisResult<Self> {
        if min_api > max_api {
            return Err(OasisError::Validation(format!(
                "product min_api {min_api} must be <= max_api {max_api}"
            )));
        }
        if min_sulfur > max_sulfur {
            return Err(OasisError::Validation(format!(
                "product min_sulfur {min_sulfur} must be <= max_sulfur {max_sulfur}"
            )));
        }
        if max_per_day <= 0.0 {
            return Err(OasisError::Validation(format!(
                "product max_per_day must be positive, got {max_per_day}"
            )));
        }
        Ok(Self {
            name: name.into(),
            min_api,
            max_api,
            min_sulfur,
            max_sulfur,
            price,
            max_per_day,
        })
    }
}

/// Refinery-wide daily processing cap, with optional per-day overrides.
#[derive(Debug, Clone)]
pub struct FiveTankConfig {
    pub default_capacity: f64,
    pub capacity_overrides: HashMap<u32, f64>,
}

impl Default for FiveTankConfig {
    fn default() -> Self {
        Self {
            default_capacity: 200_000.0,
            capacity_overrides: HashMap::new(),
        }
    }
}

impl FiveTankConfig {
    fn capacity_for_day(&self, day: u32) -> f64 {
        self.capacity_overrides.get(&day).copied().unwrap_or(self.default_capacity)
    }
}

#[derive(Debug, Clone)]
pub struct FiveTankResult {
    pub profit: f64,
    /// (blend, day) -> produced volume, values below 0.001 omitted.
    pub blend_production: Vec<((String, u32), f64)>,
    /// Tank volumes by grade at the end of each day.
    pub tank_snapshots: Vec<(u32, Vec<Tank>)>,
}

/// Distribute opening inventory across the five tanks: fill each to 80% of
/// capacity sequentially, then spread any leftover proportionally to each
/// tank's capacity share. The proportional pass does not re-check the 80%
/// cap, matching the reference's distribution exactly (§4.5).
fn distribute_opening_inventory(opening_inventory: &[(String, f64)]) -> Vec<Tank> {
    let mut tanks: Vec<Tank> = TANK_NAMES
        .iter()
        .zip(TANK_CAPACITIES.iter())
        .map(|(name, &capacity)| Tank::new(*name, capacity).expect("fixed tank capacities are positive"))
        .collect();

    for (grade, opening) in opening_inventory {
        if *opening <= 0.0 {
            continue;
        }
        let mut remaining = *opening;
        for tank in tanks.iter_mut() {
            if remaining <= 0.0 {
                break;
            }
            let max_fill = tank.capacity * 0.8;
            let available = (max_fill - tank.total_volume()).max(0.0);
            let take = remaining.min(available);
            if take > 0.0 {
                add_to_content(&mut tank.content, grade, take);
                remaining -= take;
            }
        }
        if remaining > 0.0 {
            let total_capacity: f64 = TANK_CAPACITIES.iter().sum();
            for tank in tanks.iter_mut() {
                let additional = remaining * (tank.capacity / total_capacity);
                if additional > 0.0 {
                    add_to_content(&mut tank.content, grade, additional);
                }
            }
        }
    }
    tanks
}

fn add_to_content(content: &mut Vec<(String, f64)>, grade: &str, volume: f64) {
    if let Some(entry) = content.iter_mut().find(|(g, _)| g == grade) {
        entry.1 += volume;
    } else {
        content.push((grade.to_string(), volume));
    }
}

/// Solve the quality-constrained 5-tank variant over `start_day..=end_day`.
///
/// Vessel deployment is treated as fixed input here (produced upstream by the
/// vessel optimizer, §2): the only tank-allocation decision this LP makes is
/// which tank receives each vessel's cargo, not whether the vessel is
/// accepted. Crude purchase and vessel cost are therefore known constants
/// subtracted from the optimized revenue rather than decision variables, a
/// simplification consistent with §4.5's constraint list (it names no
/// vessel-selection variable).
pub fn solve(
    start_day: u32,
    end_day: u32,
    crudes: &HashMap<String, CrudeQuality>,
    products: &[ProductSpec],
    opening_inventory: &[(String, f64)],
    vessels: &[Vessel],
    config: &FiveTankConfig,
) -> OasisResult<FiveTankResult> {
    if start_day > end_day {
        return Err(OasisError::Validation(format!(
            "start_day {start_day} must be <= end_day {end_day}"
        )));
    }
    if products.is_empty() {
        return Err(OasisError::Validation("no product blends provided".into()));
    }

    let opening_tanks = distribute_opening_inventory(opening_inventory);
    let days: Vec<u32> = (start_day..=end_day).collect();
    let grades: Vec<String> = crudes.keys().cloned().collect();

    let mut vars = variables!();

    let mut tank_inventory: HashMap<(String, String, u32), Variable> = HashMap::new();
    for tank_name in TANK_NAMES {
        for grade in &grades {
            for &day in &days {
                tank_inventory.insert(
                    (tank_name.to_string(), grade.clone(), day),
                    vars.add(variable().min(0.0)),
                );
            }
        }
    }

    let mut blend_from_tank: HashMap<(String, String, String, u32), Variable> = HashMap::new();
    for tank_name in TANK_NAMES {
        for grade in &grades {
            for product in products {
                for &day in &days {
                    blend_from_tank.insert(
                        (tank_name.to_string(), grade.clone(), product.name.clone(), day),
                        vars.add(variable().min(0.0)),
                    );
                }
            }
        }
    }

    // Per-vessel tank-allocation decision: which tank each arriving grade lands in.
    let mut crude_to_tank: HashMap<(String, String, String), Variable> = HashMap::new();
    for vessel in vessels {
        let mut grade_totals: HashMap<String, f64> = HashMap::new();
        for parcel in &vessel.cargo {
            *grade_totals.entry(parcel.grade.clone()).or_insert(0.0) += parcel.volume;
        }
        for grade in grade_totals.keys() {
            for tank_name in TANK_NAMES {
                crude_to_tank.insert(
                    (vessel.vessel_id.clone(), grade.clone(), tank_name.to_string()),
                    vars.add(variable().min(0.0)),
                );
            }
        }
    }

    let mut revenue_expr = Expression::from(0.0);
    for product in products {
        for &day in &days {
            for tank_name in TANK_NAMES {
                for grade in &grades {
                    if let Some(&v) = blend_from_tank.get(&(
                        tank_name.to_string(),
                        grade.clone(),
                        product.name.clone(),
                        day,
                    )) {
                        revenue_expr += product.price * v;
                    }
                }
            }
        }
    }

    let mut model = vars.maximise(revenue_expr).using(clarabel);

    // Tank capacity.
    for tank_name in TANK_NAMES {
        for &day in &days {
            let mut total = Expression::from(0.0);
            for grade in &grades {
                total += tank_inventory[&(tank_name.to_string(), grade.clone(), day)];
            }
            let capacity = TANK_CAPACITIES[TANK_NAMES.iter().position(|t| *t == tank_name).unwrap()];
            model = model.with(constraint!(total <= capacity));
        }
    }

    // Tank inventory balance.
    for tank_name in TANK_NAMES {
        for grade in &grades {
            for &day in &days {
                let mut inflow = Expression::from(0.0);
                for vessel in vessels {
                    if vessel.arrival_day != day {
                        continue;
                    }
                    if let Some(&v) = crude_to_tank.get(&(
                        vessel.vessel_id.clone(),
                        grade.clone(),
                        tank_name.to_string(),
                    )) {
                        inflow += v;
                    }
                }
                let mut outflow = Expression::from(0.0);
                for product in products {
                    outflow += blend_from_tank[&(
                        tank_name.to_string(),
                        grade.clone(),
                        product.name.clone(),
                        day,
                    )];
                }
                let previous: Expression = if day == start_day {
                    let opening_tank = opening_tanks.iter().find(|t| t.name == tank_name).unwrap();
                    opening_tank.volume_of(grade).into()
                } else {
                    tank_inventory[&(tank_name.to_string(), grade.clone(), day - 1)].into()
                };
                let current = tank_inventory[&(tank_name.to_string(), grade.clone(), day)];
                model = model.with(constraint!(current == previous + inflow - outflow));
            }
        }
    }

    // Vessel volume-discharge: the whole of each vessel's grade goes to tanks.
    for vessel in vessels {
        let mut grade_totals: HashMap<String, f64> = HashMap::new();
        for parcel in &vessel.cargo {
            *grade_totals.entry(parcel.grade.clone()).or_insert(0.0) += parcel.volume;
        }
        for (grade, volume) in &grade_totals {
            let mut total_assigned = Expression::from(0.0);
            for tank_name in TANK_NAMES {
                if let Some(&v) =
                    crude_to_tank.get(&(vessel.vessel_id.clone(), grade.clone(), tank_name.to_string()))
                {
                    total_assigned += v;
                }
            }
            model = model.with(constraint!(total_assigned == *volume));
        }
    }

    // Blend capacity, quality windows (unconditional per §4.5/§11 Q3), refinery capacity.
    for &day in &days {
        let mut total_production = Expression::from(0.0);
        for product in products {
            let mut production = Expression::from(0.0);
            let mut total_api = Expression::from(0.0);
            let mut total_sulfur = Expression::from(0.0);
            for tank_name in TANK_NAMES {
                for grade in &grades {
                    let v = blend_from_tank[&(
                        tank_name.to_string(),
                        grade.clone(),
                        product.name.clone(),
                        day,
                    )];
                    production += v;
                    let quality = &crudes[grade];
                    total_api += quality.api * v;
                    total_sulfur += quality.sulfur * v;
                }
            }
            model = model.with(constraint!(production.clone() <= product.max_per_day));
            model = model.with(constraint!(total_api.clone() >= product.min_api * production.clone()));
            model = model.with(constraint!(total_api <= product.max_api * production.clone()));
            model = model.with(constraint!(total_sulfur.clone() >= product.min_sulfur * production.clone()));
            model = model.with(constraint!(total_sulfur <= product.max_sulfur * production.clone()));
            total_production += production;
        }
        let capacity = config.capacity_for_day(day);
        model = model.with(constraint!(total_production <= capacity));
    }

    let solution = match model.solve() {
        Ok(solution) => solution,
        Err(err) => {
            return Err(OasisError::Solver(format!("5-tank LP solve failed: {err:?}")));
        }
    };

    let crude_cost: f64 = vessels
        .iter()
        .flat_map(|v| &v.cargo)
        .filter_map(|p| crudes.get(&p.grade).map(|q| q.price * p.volume))
        .sum();
    let vessel_cost: f64 = vessels.iter().map(|v| v.cost).sum();

    let mut blend_production = Vec::new();
    let mut revenue = 0.0;
    for product in products {
        for &day in &days {
            let mut total = 0.0;
            for tank_name in TANK_NAMES {
                for grade in &grades {
                    total += solution.value(blend_from_tank[&(
                        tank_name.to_string(),
                        grade.clone(),
                        product.name.clone(),
                        day,
                    )]);
                }
            }
            if total > 0.001 {
                revenue += product.price * total;
                blend_production.push(((product.name.clone(), day), total));
            }
        }
    }
    if revenue == 0.0 {
        warn!("5-tank LP produced no blend volume across the horizon");
    }

    let mut tank_snapshots = Vec::with_capacity(days.len());
    for &day in &days {
        let mut tanks = Vec::with_capacity(TANK_NAMES.len());
        for (i, tank_name) in TANK_NAMES.iter().enumerate() {
            let mut content = Vec::new();
            for grade in &grades {
                let value = solution.value(tank_inventory[&(tank_name.to_string(), grade.clone(), day)]);
                if value > 0.001 {
                    content.push((grade.clone(), value));
                }
            }
            tanks.push(Tank {
                name: tank_name.to_string(),
                capacity: TANK_CAPACITIES[i],
                content,
            });
        }
        tank_snapshots.push((day, tanks));
    }

    Ok(FiveTankResult {
        profit: revenue - crude_cost - vessel_cost,
        blend_production,
        tank_snapshots,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opening_inventory_fills_to_80_percent_before_spilling() {
        let tanks = distribute_opening_inventory(&[("A".into(), 100_000.0)]);
        assert_eq!(tanks[0].volume_of("A"), 100_000.0);
        assert_eq!(tanks[1].volume_of("A"), 0.0);
    }

    #[test]
    fn opening_inventory_spills_to_next_tank_past_80_percent() {
        // T1 80% of 250,000 = 200,000; request more to force spillover.
        let tanks = distribute_opening_inventory(&[("A".into(), 250_000.0)]);
        assert_eq!(tanks[0].volume_of("A"), 200_000.0);
        assert_eq!(tanks[1].volume_of("A"), 50_000.0);
    }

    #[test]
    fn single_crude_single_blend_one_day_hits_capacity() {
        let mut crudes = HashMap::new();
        crudes.insert("A".to_string(), CrudeQuality::new(30.0, 0.5, 50.0));
        let product = ProductSpec::new("P1", 25.0, 35.0, 0.0, 1.0, 80.0, 50_000.0).unwrap();
        let config = FiveTankConfig {
            default_capacity: 50_000.0,
            capacity_overrides: HashMap::new(),
        };

        let result = solve(
            1,
            1,
            &crudes,
            &[product],
            &[("A".to_string(), 100_000.0)],
            &[],
            &config,
        )
        .unwrap();

        let produced: f64 = result.blend_production.iter().map(|(_, v)| *v).sum();
        assert!((produced - 50_000.0).abs() < 1.0);
        assert!((result.profit - 80.0 * 50_000.0).abs() < 1.0);
    }

    #[test]
    fn rejects_inverted_day_range() {
        let config = FiveTankConfig::default();
        let err = solve(5, 1, &HashMap::new(), &[], &[], &[], &config);
        assert!(err.is_err());
    }

    #[test]
    fn rejects_empty_products() {
        let config = FiveTankConfig::default();
        let err = solve(1, 1, &HashMap::new(), &[], &[], &[], &config);
        assert!(err.is_err());
    }
}
