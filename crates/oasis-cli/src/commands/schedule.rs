use std::path::Path;

use anyhow::Result;
use oasis_algo::scheduler::{Scheduler, SchedulerConfig};
use oasis_core::model::DailyPlan;
use tracing::info;

use crate::common::{print_table, OutputFormat};
use crate::scenario;

/// Build and run the greedy scheduler over a scenario, returning its
/// [`DailyPlan`]s. Shared with [`crate::commands::refine`], which re-solves
/// this same greedy schedule as an LP.
pub fn build_and_run(path: &Path, days: Option<u32>) -> Result<(Vec<DailyPlan>, u32)> {
    let doc = scenario::load(path)?;
    let tanks = doc.tanks()?;
    let recipes = doc.recipes()?;
    let vessels = doc.vessels()?;
    let crudes = doc.crudes();
    let max_processing_rate = doc.max_processing_rate(100.0);
    let days = days.unwrap_or_else(|| doc.horizon_days(7));

    let mut scheduler = Scheduler::new(
        tanks,
        recipes,
        vessels,
        crudes,
        SchedulerConfig { max_processing_rate },
    )?;
    info!(days, max_processing_rate, "running greedy scheduler");
    scheduler.run(days);
    Ok((scheduler.daily_plans().to_vec(), days))
}

pub fn run(path: &Path, days: Option<u32>, format: OutputFormat) -> Result<()> {
    let (plans, _days) = build_and_run(path, days)?;
    print_plans(&plans, format)
}

pub fn print_plans(plans: &[DailyPlan], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(plans)?);
        }
        OutputFormat::Table => {
            let rows = plans
                .iter()
                .map(|plan| {
                    vec![
                        plan.day.to_string(),
                        format!("{:.2}", plan.total_rate()),
                        format!("{:.2}", plan.daily_margin),
                        format!("{:.2}", plan.total_inventory),
                    ]
                })
                .collect::<Vec<_>>();
            print_table(&["day", "total_rate", "daily_margin", "total_inventory"], &rows)?;
        }
    }
    Ok(())
}
