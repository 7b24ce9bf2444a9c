use std::path::Path;

use anyhow::Result;
use oasis_algo::lp_refiner;
use tracing::info;

use crate::cli::RefineObjective;
use crate::common::OutputFormat;
use crate::scenario;

use super::schedule;

/// Run the greedy scheduler, then re-solve its output as a multi-period LP
/// (§4.4) maximizing either throughput or total margin.
pub fn run(path: &Path, days: Option<u32>, objective: RefineObjective, format: OutputFormat) -> Result<()> {
    let doc = scenario::load(path)?;
    let recipes = doc.recipes()?;
    let vessels = doc.vessels()?;
    let crudes = doc.crudes();
    let config = doc.lp_refiner_config();

    let (greedy_plans, _days) = schedule::build_and_run(path, days)?;
    let greedy_margin: f64 = greedy_plans.iter().map(|p| p.daily_margin).sum();

    info!(?objective, "refining greedy schedule via LP");
    let refined = match objective {
        RefineObjective::Throughput => {
            lp_refiner::optimize_throughput(&greedy_plans, &recipes, &crudes, &vessels, &config)
        }
        RefineObjective::Margin => {
            lp_refiner::optimize_margin(&greedy_plans, &recipes, &crudes, &vessels, &config)
        }
    };
    let refined_margin: f64 = refined.iter().map(|p| p.daily_margin).sum();

    schedule::print_plans(&refined, format)?;
    eprintln!(
        "greedy total margin: {greedy_margin:.2}; refined total margin: {refined_margin:.2}"
    );
    Ok(())
}
