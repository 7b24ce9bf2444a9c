use std::collections::HashMap;
use std::path::Path;

use anyhow::Result;
use oasis_algo::genetic;
use tracing::info;

use crate::common::OutputFormat;
use crate::scenario;

/// Evolve an hour-granular schedule (§4.7). Initial inventory is the sum of
/// the scenario's tank contents by grade; vessel arrivals are read from the
/// scenario's vessels, credited to the start of the 0-indexed day matching
/// each vessel's `arrival_day`.
pub fn run(path: &Path, format: OutputFormat) -> Result<()> {
    let doc = scenario::load(path)?;
    let recipes = doc.recipes()?;
    let crudes = doc.crudes();
    let tanks = doc.tanks()?;
    let vessels = doc.vessels()?;
    let config = doc.genetic_config();

    let mut initial_inventory: HashMap<String, f64> = HashMap::new();
    for tank in &tanks {
        for (grade, volume) in &tank.content {
            *initial_inventory.entry(grade.clone()).or_insert(0.0) += volume;
        }
    }

    let mut vessel_arrivals: Vec<HashMap<String, f64>> = vec![HashMap::new(); config.days as usize];
    for vessel in &vessels {
        let day_index = vessel.arrival_day.saturating_sub(1) as usize;
        if let Some(day) = vessel_arrivals.get_mut(day_index) {
            for parcel in &vessel.cargo {
                *day.entry(parcel.grade.clone()).or_insert(0.0) += parcel.volume;
            }
        }
    }

    info!(
        days = config.days,
        population = config.population_size,
        generations = config.generations,
        "evolving hourly schedule"
    );
    let result = genetic::run(&recipes, &crudes, &initial_inventory, &vessel_arrivals, &config)?;

    match format {
        OutputFormat::Json => {
            let payload = serde_json::json!({
                "success": result.success,
                "best_fitness": result.fitness.total,
                "feasible": result.fitness.feasible,
                "penalty_reason": result.fitness.penalty_reason,
                "generations_run": result.generations_run,
                "convergence_history": result.history,
            });
            println!("{}", serde_json::to_string_pretty(&payload)?);
        }
        OutputFormat::Table => {
            println!("success: {}", result.success);
            println!("generations run: {}", result.generations_run);
            println!(
                "best fitness: {:.2} (margin {:.2}, throughput {:.2}, operational {:.2})",
                result.fitness.total,
                result.fitness.margin_score,
                result.fitness.throughput_score,
                result.fitness.operational_score
            );
            if let Some(reason) = &result.fitness.penalty_reason {
                println!("penalty reason: {reason}");
            }
        }
    }
    Ok(())
}
