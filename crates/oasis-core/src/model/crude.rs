use serde::{Deserialize, Serialize};

/// Immutable reference data describing a crude grade available to the refinery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Crude {
    pub name: String,
    /// Margin in currency units per kb (thousand barrels) processed.
    pub margin: f64,
    pub origin: String,
}

impl Crude {
    pub fn new(name: impl Into<String>, margin: f64, origin: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            margin,
            origin: origin.into(),
        }
    }
}
