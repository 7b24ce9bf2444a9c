use std::path::Path;

use anyhow::{bail, Result};
use tracing::info;

use crate::scenario::{self, Scenario};

/// Parse a scenario and check the §4.3 construction-time validation rules:
/// at least one tank, at least one recipe, and crude data for every grade a
/// recipe references.
pub fn run(path: &Path) -> Result<()> {
    let doc = scenario::load(path)?;
    let tanks = doc.tanks()?;
    let recipes = doc.recipes()?;
    let crudes = doc.crudes();

    if tanks.is_empty() {
        bail!("scenario has no tanks");
    }
    if recipes.is_empty() {
        bail!("scenario has no blending recipes");
    }

    let missing = missing_crude_grades(&doc, &recipes);
    if !missing.is_empty() {
        bail!("missing crude data for grades: {}", missing.join(", "));
    }

    info!(
        tanks = tanks.len(),
        recipes = recipes.len(),
        crudes = crudes.len(),
        "scenario is valid"
    );
    println!(
        "OK: {} tanks, {} recipes, {} crude grades",
        tanks.len(),
        recipes.len(),
        crudes.len()
    );
    Ok(())
}

fn missing_crude_grades(doc: &Scenario, recipes: &[oasis_core::model::BlendingRecipe]) -> Vec<String> {
    let crudes = doc.crudes();
    let mut missing = Vec::new();
    for recipe in recipes {
        if !crudes.contains_key(&recipe.primary_grade) && !missing.contains(&recipe.primary_grade) {
            missing.push(recipe.primary_grade.clone());
        }
        if let Some(secondary) = &recipe.secondary_grade {
            if !crudes.contains_key(secondary) && !missing.contains(secondary) {
                missing.push(secondary.clone());
            }
        }
    }
    missing
}
