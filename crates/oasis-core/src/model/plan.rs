use serde::{Deserialize, Serialize};

use super::tank::Tank;
use crate::error::{OasisError, OasisResult};

/// One (recipe, margin, rate) allocation decided by the blending margin engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlendAllocation {
    pub recipe_name: String,
    pub margin: f64,
    pub rate: f64,
}

/// Tolerance used when comparing hourly totals against daily totals (§8.5).
pub const HOURLY_CONSISTENCY_TOLERANCE: f64 = 0.01;

/// One hour of plant operation: either productive (recipe + rate) or mid-changeover.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyOperation {
    pub hour: u8,
    pub recipe: Option<String>,
    pub processing_rate: f64,
    pub is_changeover: bool,
    pub changeover_from: Option<String>,
    pub changeover_to: Option<String>,
    pub changeover_progress: f64,
}

impl HourlyOperation {
    pub fn idle(hour: u8) -> Self {
        Self {
            hour,
            recipe: None,
            processing_rate: 0.0,
            is_changeover: false,
            changeover_from: None,
            changeover_to: None,
            changeover_progress: 0.0,
        }
    }

    pub fn productive(hour: u8, recipe: impl Into<String>, rate: f64) -> Self {
        Self {
            hour,
            recipe: Some(recipe.into()),
            processing_rate: rate,
            is_changeover: false,
            changeover_from: None,
            changeover_to: None,
            changeover_progress: 0.0,
        }
    }

    pub fn changeover(
        hour: u8,
        from: impl Into<String>,
        to: impl Into<String>,
        progress: f64,
    ) -> Self {
        Self {
            hour,
            recipe: None,
            processing_rate: 0.0,
            is_changeover: true,
            changeover_from: Some(from.into()),
            changeover_to: Some(to.into()),
            changeover_progress: progress.clamp(0.0, 1.0),
        }
    }

    pub fn is_productive(&self) -> bool {
        !self.is_changeover && self.recipe.is_some() && self.processing_rate > 0.0
    }
}

/// The outcome of simulating or optimizing a single day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyPlan {
    pub day: u32,
    pub processing_rates: Vec<(String, f64)>,
    pub blending_details: Vec<BlendAllocation>,
    pub total_inventory: f64,
    pub inventory_by_grade: Vec<(String, f64)>,
    pub tank_snapshot: Vec<Tank>,
    pub daily_margin: f64,
    pub hourly_schedule: Option<Vec<HourlyOperation>>,
}

impl DailyPlan {
    pub fn total_rate(&self) -> f64 {
        self.processing_rates.iter().map(|(_, r)| r).sum()
    }

    pub fn rate_of(&self, recipe: &str) -> f64 {
        self.processing_rates
            .iter()
            .find(|(name, _)| name == recipe)
            .map(|(_, r)| *r)
            .unwrap_or(0.0)
    }

    pub fn inventory_of(&self, grade: &str) -> f64 {
        self.inventory_by_grade
            .iter()
            .find(|(g, _)| g == grade)
            .map(|(_, v)| *v)
            .unwrap_or(0.0)
    }

    /// Validate the §8.5 hourly/daily consistency property, if an hourly schedule is present.
    pub fn validate_hourly_consistency(&self) -> OasisResult<()> {
        let Some(hourly) = &self.hourly_schedule else {
            return Ok(());
        };
        let mut per_recipe: Vec<(String, f64)> = Vec::new();
        for op in hourly {
            if let Some(recipe) = &op.recipe {
                if op.processing_rate <= 0.0 {
                    continue;
                }
                if let Some(entry) = per_recipe.iter_mut().find(|(name, _)| name == recipe) {
                    entry.1 += op.processing_rate;
                } else {
                    per_recipe.push((recipe.clone(), op.processing_rate));
                }
            }
        }
        for (recipe, hourly_total) in &per_recipe {
            let daily_total = self.rate_of(recipe);
            if (hourly_total - daily_total).abs() > HOURLY_CONSISTENCY_TOLERANCE {
                return Err(OasisError::Validation(format!(
                    "day {}: hourly total for '{}' ({}) diverges from daily total ({})",
                    self.day, recipe, hourly_total, daily_total
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_plan() -> DailyPlan {
        DailyPlan {
            day: 1,
            processing_rates: vec![("R1".into(), 24.0)],
            blending_details: vec![],
            total_inventory: 0.0,
            inventory_by_grade: vec![],
            tank_snapshot: vec![],
            daily_margin: 0.0,
            hourly_schedule: Some(
                (0..24)
                    .map(|h| HourlyOperation::productive(h, "R1", 1.0))
                    .collect(),
            ),
        }
    }

    #[test]
    fn hourly_consistency_passes_when_sums_match() {
        assert!(sample_plan().validate_hourly_consistency().is_ok());
    }

    #[test]
    fn hourly_consistency_fails_when_sums_diverge() {
        let mut plan = sample_plan();
        plan.processing_rates = vec![("R1".into(), 10.0)];
        assert!(plan.validate_hourly_consistency().is_err());
    }
}
