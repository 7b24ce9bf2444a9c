use std::path::Path;

use anyhow::Result;
use oasis_algo::vessel_optimizer;
use tracing::info;

use crate::common::{print_table, OutputFormat};
use crate::scenario;

/// Plan a vessel deployment satisfying as many feedstock requirements as
/// possible within the fleet cap (§4.6).
pub fn run(path: &Path, format: OutputFormat) -> Result<()> {
    let doc = scenario::load(path)?;
    let requirements = doc.requirements()?;
    let routes = doc.routes();
    let vessel_types = doc.vessel_types();
    let config = doc.vessel_optimizer_config();

    info!(
        requirements = requirements.len(),
        max_vessels = config.max_vessels,
        "optimizing vessel deployment"
    );
    let fleet = vessel_optimizer::optimize(&requirements, &routes, &vessel_types, &config)?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&fleet)?);
        }
        OutputFormat::Table => {
            let rows = fleet
                .iter()
                .map(|v| {
                    vec![
                        v.vessel_id.clone(),
                        v.arrival_day.to_string(),
                        format!("{:.2}", v.cargo_volume()),
                        v.cargo.len().to_string(),
                        v.days_held.to_string(),
                    ]
                })
                .collect::<Vec<_>>();
            print_table(&["vessel_id", "arrival_day", "cargo_volume", "parcels", "days_held"], &rows)?;
            println!(
                "{} requirements, {} vessels deployed",
                requirements.len(),
                fleet.len()
            );
        }
    }
    Ok(())
}
