use serde::{Deserialize, Serialize};

use crate::error::{OasisError, OasisResult};

/// A blending recipe: a pairing of a primary (and optional secondary) crude grade
/// producing a product stream at a bounded daily rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlendingRecipe {
    pub name: String,
    pub primary_grade: String,
    pub secondary_grade: Option<String>,
    /// Maximum processing rate in kb/day.
    pub max_rate: f64,
    /// Fraction of the blend that is the primary grade, in (0, 1].
    pub primary_fraction: f64,
}

impl BlendingRecipe {
    pub fn new(
        name: impl Into<String>,
        primary_grade: impl Into<String>,
        secondary_grade: Option<String>,
        max_rate: f64,
        primary_fraction: f64,
    ) -> OasisResult<Self> {
        if max_rate <= 0.0 {
            return Err(OasisError::Validation(format!(
                "recipe max_rate must be positive, got {max_rate}"
            )));
        }
        if secondary_grade.is_none() && primary_fraction != 1.0 {
            return Err(OasisError::Validation(
                "recipe without a secondary grade must have primary_fraction == 1".into(),
            ));
        }
        if !(0.0..=1.0).contains(&primary_fraction) || primary_fraction <= 0.0 {
            return Err(OasisError::Validation(format!(
                "recipe primary_fraction must be in (0, 1], got {primary_fraction}"
            )));
        }
        Ok(Self {
            name: name.into(),
            primary_grade: primary_grade.into(),
            secondary_grade,
            max_rate,
            primary_fraction,
        })
    }

    pub fn secondary_fraction(&self) -> f64 {
        1.0 - self.primary_fraction
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_grade_recipe_requires_full_fraction() {
        assert!(BlendingRecipe::new("R", "A", None, 40.0, 0.9).is_err());
        assert!(BlendingRecipe::new("R", "A", None, 40.0, 1.0).is_ok());
    }

    #[test]
    fn two_grade_recipe_allows_partial_fraction() {
        let r = BlendingRecipe::new("R", "A", Some("B".into()), 40.0, 0.7).unwrap();
        assert!((r.secondary_fraction() - 0.3).abs() < 1e-12);
    }
}
