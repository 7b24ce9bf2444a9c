//! Hour-granular genetic schedule optimizer (§4.7): evolves a short-horizon
//! hour-by-hour schedule jointly optimizing margin, throughput, and
//! operational stability, with a feasibility simulation gating fitness.

use std::collections::HashMap;

use oasis_core::error::{OasisError, OasisResult};
use oasis_core::model::{BlendingRecipe, Crude, HourlyOperation};
use rand::Rng;
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;

use crate::blending::blend_margin;

/// Weights for the three fitness components (§4.7 "Fitness").
#[derive(Debug, Clone, Copy)]
pub struct FitnessWeights {
    pub margin: f64,
    pub throughput: f64,
    pub operational: f64,
}

impl Default for FitnessWeights {
    fn default() -> Self {
        Self {
            margin: 0.5,
            throughput: 0.3,
            operational: 0.2,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct GeneticConfig {
    pub days: u32,
    pub population_size: usize,
    pub crossover_rate: f64,
    pub mutation_rate: f64,
    pub generations: u32,
    pub changeover_duration_hours: u8,
    pub min_recipe_run_hours: u8,
    pub max_daily_capacity: f64,
    pub weights: FitnessWeights,
}

impl Default for GeneticConfig {
    fn default() -> Self {
        Self {
            days: 7,
            population_size: 50,
            crossover_rate: 0.8,
            mutation_rate: 0.1,
            generations: 100,
            changeover_duration_hours: 2,
            min_recipe_run_hours: 4,
            max_daily_capacity: 95.0,
            weights: FitnessWeights::default(),
        }
    }
}

/// An ordered sequence of days, each a fixed 24-hour slot array.
#[derive(Debug, Clone)]
pub struct Chromosome {
    pub days: Vec<Vec<HourlyOperation>>,
}

#[derive(Debug, Clone)]
pub struct FitnessRecord {
    pub margin_score: f64,
    pub throughput_score: f64,
    pub operational_score: f64,
    pub total: f64,
    pub feasible: bool,
    pub penalty_reason: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GeneticResult {
    pub chromosome: Chromosome,
    pub fitness: FitnessRecord,
    pub history: Vec<f64>,
    pub generations_run: u32,
    pub success: bool,
}

fn hourly_ceiling(recipe: &BlendingRecipe, config: &GeneticConfig) -> f64 {
    (config.max_daily_capacity / 24.0).min(recipe.max_rate / 24.0)
}

fn idle_day() -> Vec<HourlyOperation> {
    (0..24).map(HourlyOperation::idle).collect()
}

fn single_recipe_day(recipe: &BlendingRecipe, config: &GeneticConfig) -> Vec<HourlyOperation> {
    let rate = hourly_ceiling(recipe, config);
    (0..24).map(|h| HourlyOperation::productive(h, recipe.name.clone(), rate)).collect()
}

fn two_recipe_day(a: &BlendingRecipe, b: &BlendingRecipe, config: &GeneticConfig, rng: &mut impl Rng) -> Vec<HourlyOperation> {
    let duration = config.changeover_duration_hours as u32;
    let start = rng.gen_range(6..=18u32).min(24u32.saturating_sub(duration));
    let rate_a = hourly_ceiling(a, config);
    let rate_b = hourly_ceiling(b, config);
    let mut day = Vec::with_capacity(24);
    for hour in 0..24u8 {
        let h = hour as u32;
        if h < start {
            day.push(HourlyOperation::productive(hour, a.name.clone(), rate_a));
        } else if h < start + duration {
            let progress = (h - start + 1) as f64 / duration as f64;
            day.push(HourlyOperation::changeover(hour, a.name.clone(), b.name.clone(), progress));
        } else {
            day.push(HourlyOperation::productive(hour, b.name.clone(), rate_b));
        }
    }
    day
}

fn initialize_chromosome(recipes: &[BlendingRecipe], config: &GeneticConfig, rng: &mut impl Rng) -> Chromosome {
    let mut days = Vec::with_capacity(config.days as usize);
    for _ in 0..config.days {
        let day = if recipes.len() >= 2 && rng.gen_bool(0.5) {
            let i = rng.gen_range(0..recipes.len());
            let mut j = rng.gen_range(0..recipes.len());
            if j == i {
                j = (j + 1) % recipes.len();
            }
            two_recipe_day(&recipes[i], &recipes[j], config, rng)
        } else {
            let i = rng.gen_range(0..recipes.len());
            single_recipe_day(&recipes[i], config)
        };
        days.push(day);
    }
    Chromosome { days }
}

fn enforce_min_run_length(day: &mut [HourlyOperation], min_run: u8) {
    let min_run = min_run as usize;
    let mut i = 0;
    while i < day.len() {
        if day[i].is_changeover || day[i].recipe.is_none() {
            i += 1;
            continue;
        }
        let recipe = day[i].recipe.clone();
        let mut j = i;
        while j < day.len() && !day[j].is_changeover && day[j].recipe == recipe {
            j += 1;
        }
        if j - i < min_run && i > 0 {
            if let Some(prev_recipe) = day[i - 1].recipe.clone() {
                let rate = day[i - 1].processing_rate;
                for slot in day.iter_mut().take(j).skip(i) {
                    slot.recipe = Some(prev_recipe.clone());
                    slot.processing_rate = rate;
                    slot.is_changeover = false;
                }
            }
        }
        i = j;
    }
}

fn repair(chromosome: &mut Chromosome, config: &GeneticConfig) {
    for day in chromosome.days.iter_mut() {
        enforce_min_run_length(day, config.min_recipe_run_hours);
        let total: f64 = day.iter().map(|op| op.processing_rate).sum();
        if total > config.max_daily_capacity && total > 0.0 {
            let scale = config.max_daily_capacity / total;
            for op in day.iter_mut() {
                if op.is_productive() {
                    op.processing_rate *= scale;
                }
            }
        }
    }
}

fn productive_run_at(day: &[HourlyOperation], hour: usize) -> Option<(usize, usize)> {
    if day.get(hour).map_or(true, |op| !op.is_productive()) {
        return None;
    }
    let recipe = day[hour].recipe.clone();
    let mut start = hour;
    while start > 0 && !day[start - 1].is_changeover && day[start - 1].recipe == recipe {
        start -= 1;
    }
    let mut end = hour;
    while end + 1 < day.len() && !day[end + 1].is_changeover && day[end + 1].recipe == recipe {
        end += 1;
    }
    Some((start, end))
}

fn mutate_recipe_change(chromosome: &mut Chromosome, recipes: &[BlendingRecipe], config: &GeneticConfig, rng: &mut impl Rng) {
    if recipes.len() < 2 || chromosome.days.is_empty() {
        return;
    }
    let day_idx = rng.gen_range(0..chromosome.days.len());
    let day = &mut chromosome.days[day_idx];
    let hour = rng.gen_range(0..day.len());
    let Some((start, end)) = productive_run_at(day, hour) else {
        return;
    };
    let span = rng.gen_range(2..=8usize).min(end - start + 1);
    let new_recipe = &recipes[rng.gen_range(0..recipes.len())];
    let rate = hourly_ceiling(new_recipe, config);
    for slot in day.iter_mut().skip(start).take(span) {
        slot.recipe = Some(new_recipe.name.clone());
        slot.processing_rate = rate;
        slot.is_changeover = false;
    }
}

fn mutate_changeover_timing(chromosome: &mut Chromosome, rng: &mut impl Rng) {
    for day in chromosome.days.iter_mut() {
        if let Some(start) = day.iter().position(|op| op.is_changeover) {
            let duration = day[start..].iter().take_while(|op| op.is_changeover).count();
            let shift: i32 = rng.gen_range(1..=3) * if rng.gen_bool(0.5) { 1 } else { -1 };
            let new_start = (start as i32 + shift).clamp(0, (day.len() - duration) as i32) as usize;
            if new_start == start {
                return;
            }
            let from = day[start].changeover_from.clone();
            let to = day[start].changeover_to.clone();
            let before_rate = day.first().map(|op| op.processing_rate).unwrap_or(0.0);
            let after_rate = day.last().map(|op| op.processing_rate).unwrap_or(0.0);
            for (offset, hour) in (new_start..new_start + duration).enumerate() {
                let progress = (offset + 1) as f64 / duration as f64;
                day[hour] = HourlyOperation::changeover(hour as u8, from.clone().unwrap_or_default(), to.clone().unwrap_or_default(), progress);
            }
            for (hour, slot) in day.iter_mut().enumerate() {
                if hour < new_start {
                    slot.processing_rate = before_rate;
                } else if hour >= new_start + duration {
                    slot.processing_rate = after_rate;
                }
            }
            return;
        }
    }
}

fn mutate_rate_adjustment(chromosome: &mut Chromosome, recipes: &[BlendingRecipe], config: &GeneticConfig, rng: &mut impl Rng) {
    if chromosome.days.is_empty() {
        return;
    }
    let day_idx = rng.gen_range(0..chromosome.days.len());
    for op in chromosome.days[day_idx].iter_mut() {
        if !op.is_productive() {
            continue;
        }
        let factor = rng.gen_range(0.9..=1.1);
        let ceiling = op
            .recipe
            .as_ref()
            .and_then(|name| recipes.iter().find(|r| &r.name == name))
            .map(|r| hourly_ceiling(r, config))
            .unwrap_or(op.processing_rate);
        op.processing_rate = (op.processing_rate * factor).min(ceiling).max(0.0);
    }
}

fn mutate_recipe_duration(chromosome: &mut Chromosome, rng: &mut impl Rng) {
    if chromosome.days.is_empty() {
        return;
    }
    let day_idx = rng.gen_range(0..chromosome.days.len());
    let day = &mut chromosome.days[day_idx];
    let hour = rng.gen_range(0..day.len());
    let Some((start, end)) = productive_run_at(day, hour) else {
        return;
    };
    let delta: i32 = rng.gen_range(1..=2) * if rng.gen_bool(0.5) { 1 } else { -1 };
    if delta > 0 && end + 1 < day.len() && !day[end + 1].is_changeover {
        let rate = day[start].processing_rate;
        let recipe = day[start].recipe.clone();
        day[end + 1].recipe = recipe;
        day[end + 1].processing_rate = rate;
        day[end + 1].is_changeover = false;
    } else if delta < 0 && end > start {
        day[end].recipe = None;
        day[end].processing_rate = 0.0;
    }
}

fn mutate(chromosome: &mut Chromosome, recipes: &[BlendingRecipe], config: &GeneticConfig, rng: &mut impl Rng) {
    if rng.gen::<f64>() > config.mutation_rate {
        return;
    }
    match rng.gen_range(0..4u8) {
        0 => mutate_recipe_change(chromosome, recipes, config, rng),
        1 => mutate_changeover_timing(chromosome, rng),
        2 => mutate_rate_adjustment(chromosome, recipes, config, rng),
        _ => mutate_recipe_duration(chromosome, rng),
    }
    repair(chromosome, config);
}

fn crossover(parent1: &Chromosome, parent2: &Chromosome, config: &GeneticConfig, rng: &mut impl Rng) -> (Chromosome, Chromosome) {
    let mut child1 = parent1.clone();
    let mut child2 = parent2.clone();
    if rng.gen::<f64>() < config.crossover_rate {
        for day in 0..child1.days.len() {
            if rng.gen_bool(0.5) {
                child1.days[day] = parent2.days[day].clone();
                child2.days[day] = parent1.days[day].clone();
            }
        }
    }
    repair(&mut child1, config);
    repair(&mut child2, config);
    (child1, child2)
}

/// Run the inventory feasibility simulation of §4.7 "Fitness". Returns
/// `(feasible, penalty_reason)`.
fn simulate_feasibility(
    chromosome: &Chromosome,
    recipes: &[BlendingRecipe],
    initial_inventory: &HashMap<String, f64>,
    vessel_arrivals: &[HashMap<String, f64>],
) -> (bool, Option<String>) {
    let mut inventory = initial_inventory.clone();
    for (day_idx, day) in chromosome.days.iter().enumerate() {
        if let Some(arrivals) = vessel_arrivals.get(day_idx) {
            for (grade, volume) in arrivals {
                *inventory.entry(grade.clone()).or_insert(0.0) += volume;
            }
        }
        for op in day {
            if !op.is_productive() {
                continue;
            }
            let Some(recipe) = op.recipe.as_ref().and_then(|name| recipes.iter().find(|r| &r.name == name)) else {
                continue;
            };
            let primary = op.processing_rate * recipe.primary_fraction;
            let entry = inventory.entry(recipe.primary_grade.clone()).or_insert(0.0);
            *entry -= primary;
            if *entry < -1e-6 {
                return (
                    false,
                    Some(format!("day {}: grade '{}' went negative", day_idx + 1, recipe.primary_grade)),
                );
            }
            if let Some(secondary_grade) = &recipe.secondary_grade {
                let secondary = op.processing_rate * recipe.secondary_fraction();
                let entry = inventory.entry(secondary_grade.clone()).or_insert(0.0);
                *entry -= secondary;
                if *entry < -1e-6 {
                    return (
                        false,
                        Some(format!("day {}: grade '{}' went negative", day_idx + 1, secondary_grade)),
                    );
                }
            }
        }
    }
    (true, None)
}

fn evaluate_fitness(
    chromosome: &Chromosome,
    recipes: &[BlendingRecipe],
    crudes: &HashMap<String, Crude>,
    initial_inventory: &HashMap<String, f64>,
    vessel_arrivals: &[HashMap<String, f64>],
    config: &GeneticConfig,
) -> FitnessRecord {
    let (feasible, penalty_reason) = simulate_feasibility(chromosome, recipes, initial_inventory, vessel_arrivals);
    if !feasible {
        return FitnessRecord {
            margin_score: 0.0,
            throughput_score: 0.0,
            operational_score: 0.0,
            total: -1000.0,
            feasible: false,
            penalty_reason,
        };
    }

    let days = chromosome.days.len() as f64;
    let mut margin_sum = 0.0;
    let mut throughput_sum = 0.0;
    let mut changeover_hours = 0usize;
    let mut idle_hours = 0usize;
    let mut recipe_switches = 0usize;

    for day in &chromosome.days {
        let mut prev_recipe: Option<&str> = None;
        for op in day {
            if op.is_changeover {
                changeover_hours += 1;
                prev_recipe = None;
                continue;
            }
            if !op.is_productive() {
                idle_hours += 1;
                prev_recipe = None;
                continue;
            }
            let recipe_name = op.recipe.as_deref().unwrap();
            if let Some(recipe) = recipes.iter().find(|r| r.name == recipe_name) {
                margin_sum += op.processing_rate * blend_margin(recipe, crudes);
            }
            throughput_sum += op.processing_rate;
            if prev_recipe.is_some_and(|p| p != recipe_name) {
                recipe_switches += 1;
            }
            prev_recipe = Some(recipe_name);
        }
    }

    let margin_score = (margin_sum / 1000.0).clamp(0.0, 100.0);
    let throughput_score = (100.0 * throughput_sum / (config.max_daily_capacity * days)).min(100.0);
    let operational_score =
        (100.0 - 2.0 * changeover_hours as f64 - 5.0 * recipe_switches as f64 - idle_hours as f64).max(0.0);
    let total = config.weights.margin * margin_score
        + config.weights.throughput * throughput_score
        + config.weights.operational * operational_score;

    FitnessRecord {
        margin_score,
        throughput_score,
        operational_score,
        total,
        feasible: true,
        penalty_reason: None,
    }
}

fn tournament_select<'a>(population: &'a [Chromosome], fitnesses: &[FitnessRecord], rng: &mut impl Rng) -> &'a Chromosome {
    let mut best_idx = rng.gen_range(0..population.len());
    for _ in 0..2 {
        let candidate = rng.gen_range(0..population.len());
        if fitnesses[candidate].total > fitnesses[best_idx].total {
            best_idx = candidate;
        }
    }
    &population[best_idx]
}

fn rank(fitnesses: &[FitnessRecord]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..fitnesses.len()).collect();
    order.sort_by(|&a, &b| match (fitnesses[a].feasible, fitnesses[b].feasible) {
        (true, false) => std::cmp::Ordering::Less,
        (false, true) => std::cmp::Ordering::Greater,
        _ => fitnesses[b].total.partial_cmp(&fitnesses[a].total).unwrap(),
    });
    order
}

fn constant_recipe_chromosome(recipe: &BlendingRecipe, config: &GeneticConfig) -> Chromosome {
    Chromosome {
        days: (0..config.days).map(|_| single_recipe_day(recipe, config)).collect(),
    }
}

fn idle_chromosome(config: &GeneticConfig) -> Chromosome {
    Chromosome {
        days: (0..config.days).map(|_| idle_day()).collect(),
    }
}

/// Evolve a schedule over `config.days` days (§4.7). `vessel_arrivals[d]`
/// holds grade->volume deliveries credited at the start of day `d` (0-indexed).
pub fn run(
    recipes: &[BlendingRecipe],
    crudes: &HashMap<String, Crude>,
    initial_inventory: &HashMap<String, f64>,
    vessel_arrivals: &[HashMap<String, f64>],
    config: &GeneticConfig,
) -> OasisResult<GeneticResult> {
    if recipes.is_empty() {
        return Err(OasisError::Validation("no recipes provided for genetic optimization".into()));
    }
    if config.population_size == 0 {
        return Err(OasisError::Validation("population_size must be positive".into()));
    }

    let mut rng = rand::thread_rng();
    let mut population: Vec<Chromosome> =
        (0..config.population_size).map(|_| initialize_chromosome(recipes, config, &mut rng)).collect();

    let pool = ThreadPoolBuilder::new()
        .num_threads(num_cpus::get())
        .build()
        .map_err(|e| OasisError::Other(format!("building GA thread pool: {e}")))?;

    let elite_size = (config.population_size / 10).max(5).min(config.population_size);
    let mut history: Vec<f64> = Vec::new();
    let mut generations_run = 0u32;
    let mut best: Option<(Chromosome, FitnessRecord)> = None;

    for generation in 0..config.generations {
        generations_run = generation + 1;
        let fitnesses: Vec<FitnessRecord> = pool.install(|| {
            population
                .par_iter()
                .map(|c| evaluate_fitness(c, recipes, crudes, initial_inventory, vessel_arrivals, config))
                .collect()
        });

        let order = rank(&fitnesses);
        let champion = order[0];
        if best.as_ref().map_or(true, |(_, f)| fitnesses[champion].total > f.total) {
            best = Some((population[champion].clone(), fitnesses[champion].clone()));
        }
        let best_feasible = order.iter().find(|&&idx| fitnesses[idx].feasible).map(|&idx| fitnesses[idx].total);
        history.push(best_feasible.unwrap_or(-1000.0));

        let elite: Vec<Chromosome> = order.iter().take(elite_size).map(|&idx| population[idx].clone()).collect();

        let needed = config.population_size.saturating_sub(elite.len());
        let mut offspring = Vec::with_capacity(needed);
        while offspring.len() < needed {
            let parent1 = tournament_select(&population, &fitnesses, &mut rng);
            let parent2 = tournament_select(&population, &fitnesses, &mut rng);
            let (mut child1, mut child2) = crossover(parent1, parent2, config, &mut rng);
            mutate(&mut child1, recipes, config, &mut rng);
            mutate(&mut child2, recipes, config, &mut rng);
            offspring.push(child1);
            if offspring.len() < needed {
                offspring.push(child2);
            }
        }

        population = elite.into_iter().chain(offspring).collect();

        if generation > 20 && history.len() >= 10 {
            let recent = &history[history.len() - 10..];
            let max = recent.iter().cloned().fold(f64::MIN, f64::max);
            let min = recent.iter().cloned().fold(f64::MAX, f64::min);
            if (max - min).abs() < 0.1 {
                break;
            }
        }
    }

    let (best_chromosome, best_fitness) = best.expect("at least one generation was evaluated");
    if best_fitness.feasible {
        return Ok(GeneticResult {
            chromosome: best_chromosome,
            fitness: best_fitness,
            history,
            generations_run,
            success: true,
        });
    }

    let fallback_recipe = recipes
        .iter()
        .filter(|r| {
            let primary_ok = initial_inventory.get(&r.primary_grade).copied().unwrap_or(0.0) > 0.0;
            let secondary_ok = r
                .secondary_grade
                .as_ref()
                .is_none_or(|g| initial_inventory.get(g).copied().unwrap_or(0.0) > 0.0);
            primary_ok && secondary_ok
        })
        .max_by(|a, b| blend_margin(a, crudes).partial_cmp(&blend_margin(b, crudes)).unwrap());

    let fallback_chromosome = match fallback_recipe {
        Some(recipe) => constant_recipe_chromosome(recipe, config),
        None => idle_chromosome(config),
    };
    let fallback_fitness = evaluate_fitness(&fallback_chromosome, recipes, crudes, initial_inventory, vessel_arrivals, config);

    Ok(GeneticResult {
        chromosome: fallback_chromosome,
        fitness: fallback_fitness,
        history,
        generations_run,
        success: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recipes_fixture() -> Vec<BlendingRecipe> {
        vec![
            BlendingRecipe::new("R1", "A", None, 50.0, 1.0).unwrap(),
            BlendingRecipe::new("R2", "B", None, 60.0, 1.0).unwrap(),
            BlendingRecipe::new("R3", "A", Some("B".to_string()), 40.0, 0.6).unwrap(),
            BlendingRecipe::new("R4", "B", None, 30.0, 1.0).unwrap(),
        ]
    }

    fn crude_map(pairs: &[(&str, f64)]) -> HashMap<String, Crude> {
        pairs.iter().map(|(name, margin)| (name.to_string(), Crude::new(*name, *margin, "Origin"))).collect()
    }

    #[test]
    fn rejects_empty_recipes() {
        let config = GeneticConfig::default();
        let result = run(&[], &HashMap::new(), &HashMap::new(), &[], &config);
        assert!(result.is_err());
    }

    #[test]
    fn s5_ga_converges_above_constant_schedule_with_ample_inventory() {
        let recipes = recipes_fixture();
        let crudes = crude_map(&[("A", 10.0), ("B", 15.0)]);
        let mut inventory = HashMap::new();
        inventory.insert("A".to_string(), 100_000.0);
        inventory.insert("B".to_string(), 100_000.0);
        let config = GeneticConfig {
            population_size: 30,
            generations: 25,
            days: 7,
            ..GeneticConfig::default()
        };

        let result = run(&recipes, &crudes, &inventory, &[], &config).unwrap();
        assert!(result.success);

        let constant = constant_recipe_chromosome(&recipes[0], &config);
        let constant_fitness = evaluate_fitness(&constant, &recipes, &crudes, &inventory, &[], &config);
        assert!(result.fitness.total >= constant_fitness.total);
    }

    #[test]
    fn s6_infeasible_initial_inventory_returns_fallback() {
        let recipes = recipes_fixture();
        let crudes = crude_map(&[("A", 10.0), ("B", 15.0)]);
        let inventory = HashMap::new();
        let config = GeneticConfig {
            population_size: 20,
            generations: 10,
            days: 3,
            ..GeneticConfig::default()
        };

        let result = run(&recipes, &crudes, &inventory, &[], &config).unwrap();
        assert!(!result.success);
        assert!(result.chromosome.days.iter().flatten().all(|op| !op.is_productive()));
    }

    #[test]
    fn repair_scales_down_overcapacity_day() {
        let recipe = BlendingRecipe::new("R1", "A", None, 200.0, 1.0).unwrap();
        let config = GeneticConfig {
            max_daily_capacity: 50.0,
            ..GeneticConfig::default()
        };
        let mut chromosome = Chromosome {
            days: vec![(0..24).map(|h| HourlyOperation::productive(h, "R1", 200.0 / 24.0)).collect()],
        };
        let _ = recipe;
        repair(&mut chromosome, &config);
        let total: f64 = chromosome.days[0].iter().map(|op| op.processing_rate).sum();
        assert!(total <= 50.0 + 1e-6);
    }
}
