use std::path::Path;

use anyhow::Result;
use oasis_algo::lp_five_tank;
use tracing::info;

use crate::common::{print_table, OutputFormat};
use crate::scenario;

/// Solve the §4.5 quality-constrained 5-tank variant over `start_day..=end_day`.
pub fn run(path: &Path, start_day: u32, end_day: u32, format: OutputFormat) -> Result<()> {
    let doc = scenario::load_five_tank(path)?;
    let crudes = doc.crude_qualities();
    let products = doc.product_specs()?;
    let opening_inventory = doc.opening_inventory();
    let vessels = doc.vessels()?;
    let config = doc.five_tank_config();

    info!(start_day, end_day, products = products.len(), "solving 5-tank LP variant");
    let result = lp_five_tank::solve(start_day, end_day, &crudes, &products, &opening_inventory, &vessels, &config)?;

    match format {
        OutputFormat::Json => {
            let payload = serde_json::json!({
                "profit": result.profit,
                "blend_production": result.blend_production.iter().map(|((blend, day), volume)| {
                    serde_json::json!({"blend": blend, "day": day, "volume": volume})
                }).collect::<Vec<_>>(),
            });
            println!("{}", serde_json::to_string_pretty(&payload)?);
        }
        OutputFormat::Table => {
            println!("profit: {:.2}", result.profit);
            let rows = result
                .blend_production
                .iter()
                .map(|((blend, day), volume)| vec![blend.clone(), day.to_string(), format!("{volume:.2}")])
                .collect::<Vec<_>>();
            print_table(&["blend", "day", "volume"], &rows)?;
        }
    }
    Ok(())
}
