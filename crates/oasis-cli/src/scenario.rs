//! Scenario ingestion: deserialize a TOML or JSON document into the §3
//! record types and run the per-engine `*Config` overlay described in
//! SPEC_FULL.md §6/§10.
//!
//! Normalizes the wire shapes the spec names at the boundary (tank content
//! as a list of single-entry grade maps, routes keyed by a composite
//! `"origin_destination"` string) into the ordered/typed forms the engines
//! expect, per the "ad-hoc dictionaries for entities" design note.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{bail, Context, Result};
use oasis_algo::genetic::{FitnessWeights, GeneticConfig};
use oasis_algo::lp_five_tank::{CrudeQuality, FiveTankConfig, ProductSpec};
use oasis_algo::lp_refiner::LpRefinerConfig;
use oasis_algo::vessel_optimizer::{VesselOptimizerConfig, VesselType};
use oasis_core::model::{
    BlendingRecipe, Crude, DayRange, FeedstockParcel, FeedstockRequirement, Route, Tank, Vessel,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub tanks: HashMap<String, TankSpec>,
    #[serde(default)]
    pub crudes: HashMap<String, CrudeSpec>,
    #[serde(default)]
    pub blending_recipes: Vec<RecipeSpec>,
    #[serde(default)]
    pub vessels: Vec<VesselSpec>,
    #[serde(default)]
    pub feedstock_requirements: Vec<RequirementSpec>,
    #[serde(default)]
    pub routes: HashMap<String, RouteSpec>,
    #[serde(default)]
    pub vessel_types: Vec<VesselTypeSpec>,
    #[serde(default)]
    pub config: ConfigOverlay,
}

#[derive(Debug, Deserialize)]
pub struct TankSpec {
    pub capacity: f64,
    #[serde(default)]
    pub content: Vec<HashMap<String, f64>>,
}

#[derive(Debug, Deserialize)]
pub struct CrudeSpec {
    pub margin: f64,
    pub origin: String,
}

#[derive(Debug, Deserialize)]
pub struct RecipeSpec {
    pub name: String,
    pub primary_grade: String,
    #[serde(default)]
    pub secondary_grade: Option<String>,
    pub max_rate: f64,
    pub primary_fraction: f64,
}

#[derive(Debug, Deserialize)]
pub struct ParcelSpec {
    pub grade: String,
    pub volume: f64,
    pub ldr: LdrSpec,
    pub origin: String,
}

#[derive(Debug, Deserialize)]
pub struct LdrSpec {
    pub start: u32,
    pub end: u32,
}

#[derive(Debug, Deserialize)]
pub struct VesselSpec {
    pub vessel_id: String,
    pub arrival_day: u32,
    pub capacity: f64,
    pub cost: f64,
    #[serde(default)]
    pub cargo: Vec<ParcelSpec>,
}

#[derive(Debug, Deserialize)]
pub struct RequirementSpec {
    pub grade: String,
    pub volume: f64,
    pub origin: String,
    pub allowed_ldr: LdrSpec,
    pub required_arrival_by: u32,
}

#[derive(Debug, Deserialize)]
pub struct RouteSpec {
    pub time_travel: u32,
    pub cost: f64,
}

#[derive(Debug, Deserialize)]
pub struct VesselTypeSpec {
    pub capacity: f64,
    pub cost: f64,
}

#[derive(Debug, Default, Deserialize)]
pub struct ConfigOverlay {
    pub horizon_days: Option<u32>,
    pub max_processing_rate: Option<f64>,
    #[serde(default)]
    pub solver: SolverOverlay,
    #[serde(default)]
    pub ga: GaOverlay,
    pub max_vessels: Option<u32>,
    pub cost_per_deployed_vessel: Option<f64>,
    pub penalty_per_unmet_requirement: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SolverOverlay {
    pub time_limit_seconds: Option<f64>,
    pub relative_mip_gap: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct GaOverlay {
    pub population: Option<usize>,
    pub generations: Option<u32>,
    pub mutation_rate: Option<f64>,
    pub crossover_rate: Option<f64>,
    pub days: Option<u32>,
    pub weights: Option<WeightsOverlay>,
}

#[derive(Debug, Deserialize)]
pub struct WeightsOverlay {
    pub margin: f64,
    pub throughput: f64,
    pub operational: f64,
}

/// Load a scenario document, dispatching on file extension (`.toml` or
/// `.json`); any other extension is rejected rather than guessed.
pub fn load(path: &Path) -> Result<Scenario> {
    read_document(path)
}

fn read_document<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading scenario file {}", path.display()))?;
    match path.extension().and_then(|e| e.to_str()) {
        Some("toml") => {
            toml::from_str(&raw).with_context(|| format!("parsing {} as TOML", path.display()))
        }
        Some("json") => {
            serde_json::from_str(&raw).with_context(|| format!("parsing {} as JSON", path.display()))
        }
        other => bail!(
            "unsupported scenario extension {:?} for {}; expected .toml or .json",
            other,
            path.display()
        ),
    }
}

/// §4.5 variant scenario: quality-annotated crudes, product specs with
/// API/sulfur windows, and opening inventory in place of the base
/// scenario's `tanks`/`blending_recipes`/`crudes`.
#[derive(Debug, Deserialize)]
pub struct FiveTankScenario {
    pub crudes: HashMap<String, QualitySpec>,
    pub products: Vec<ProductSpecDoc>,
    #[serde(default)]
    pub opening_inventory: HashMap<String, f64>,
    #[serde(default)]
    pub vessels: Vec<VesselSpec>,
    #[serde(default)]
    pub capacity: CapacitySpec,
}

#[derive(Debug, Deserialize)]
pub struct QualitySpec {
    pub api: f64,
    pub sulfur: f64,
    pub price: f64,
}

#[derive(Debug, Deserialize)]
pub struct ProductSpecDoc {
    pub name: String,
    pub min_api: f64,
    pub max_api: f64,
    pub min_sulfur: f64,
    pub max_sulfur: f64,
    pub price: f64,
    pub max_per_day: f64,
}

#[derive(Debug, Default, Deserialize)]
pub struct CapacitySpec {
    pub default: Option<f64>,
    /// Day -> capacity, keyed by its string representation (TOML/JSON map
    /// keys are always strings at the document boundary).
    #[serde(default)]
    pub overrides: HashMap<String, f64>,
}

pub fn load_five_tank(path: &Path) -> Result<FiveTankScenario> {
    read_document(path)
}

impl FiveTankScenario {
    pub fn crude_qualities(&self) -> HashMap<String, CrudeQuality> {
        self.crudes
            .iter()
            .map(|(name, spec)| (name.clone(), CrudeQuality::new(spec.api, spec.sulfur, spec.price)))
            .collect()
    }

    pub fn product_specs(&self) -> Result<Vec<ProductSpec>> {
        self.products
            .iter()
            .map(|spec| {
                ProductSpec::new(
                    spec.name.clone(),
                    spec.min_api,
                    spec.max_api,
                    spec.min_sulfur,
                    spec.max_sulfur,
                    spec.price,
                    spec.max_per_day,
                )
                .with_context(|| format!("product '{}'", spec.name))
            })
            .collect()
    }

    pub fn opening_inventory(&self) -> Vec<(String, f64)> {
        self.opening_inventory.iter().map(|(g, v)| (g.clone(), *v)).collect()
    }

    pub fn vessels(&self) -> Result<Vec<Vessel>> {
        build_vessels(&self.vessels)
    }

    pub fn five_tank_config(&self) -> FiveTankConfig {
        let mut config = FiveTankConfig::default();
        if let Some(default) = self.capacity.default {
            config.default_capacity = default;
        }
        config.capacity_overrides = self
            .capacity
            .overrides
            .iter()
            .filter_map(|(day, capacity)| day.parse::<u32>().ok().map(|d| (d, *capacity)))
            .collect();
        config
    }
}

fn build_vessels(specs: &[VesselSpec]) -> Result<Vec<Vessel>> {
    specs
        .iter()
        .map(|spec| {
            let mut vessel = Vessel::new(spec.vessel_id.clone(), spec.arrival_day, spec.capacity, spec.cost);
            for parcel in &spec.cargo {
                let ldr = DayRange::new(parcel.ldr.start, parcel.ldr.end)
                    .with_context(|| format!("vessel '{}' cargo ldr", spec.vessel_id))?;
                vessel.cargo.push(
                    FeedstockParcel::new(parcel.grade.clone(), parcel.volume, ldr, parcel.origin.clone())
                        .with_context(|| format!("vessel '{}' cargo parcel", spec.vessel_id))?,
                );
            }
            Ok(vessel)
        })
        .collect()
}

impl Scenario {
    pub fn tanks(&self) -> Result<Vec<Tank>> {
        let mut tanks = Vec::with_capacity(self.tanks.len());
        for (name, spec) in &self.tanks {
            let content: Vec<(String, f64)> = spec
                .content
                .iter()
                .flat_map(|entry| entry.iter().map(|(g, v)| (g.clone(), *v)))
                .collect();
            tanks.push(
                Tank::with_content(name.clone(), spec.capacity, content)
                    .with_context(|| format!("tank '{name}'"))?,
            );
        }
        tanks.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(tanks)
    }

    pub fn crudes(&self) -> HashMap<String, Crude> {
        self.crudes
            .iter()
            .map(|(name, spec)| (name.clone(), Crude::new(name.clone(), spec.margin, spec.origin.clone())))
            .collect()
    }

    pub fn recipes(&self) -> Result<Vec<BlendingRecipe>> {
        self.blending_recipes
            .iter()
            .map(|spec| {
                BlendingRecipe::new(
                    spec.name.clone(),
                    spec.primary_grade.clone(),
                    spec.secondary_grade.clone(),
                    spec.max_rate,
                    spec.primary_fraction,
                )
                .with_context(|| format!("recipe '{}'", spec.name))
            })
            .collect()
    }

    pub fn vessels(&self) -> Result<Vec<Vessel>> {
        build_vessels(&self.vessels)
    }

    pub fn requirements(&self) -> Result<Vec<FeedstockRequirement>> {
        self.feedstock_requirements
            .iter()
            .map(|spec| {
                let ldr = DayRange::new(spec.allowed_ldr.start, spec.allowed_ldr.end)
                    .context("requirement allowed_ldr")?;
                FeedstockRequirement::new(
                    spec.grade.clone(),
                    spec.volume,
                    spec.origin.clone(),
                    ldr,
                    spec.required_arrival_by,
                )
                .context("requirement")
            })
            .collect()
    }

    /// Routes keyed by composite `"origin_destination"` string, per §6.
    pub fn routes(&self) -> HashMap<(String, String), Route> {
        self.routes
            .iter()
            .filter_map(|(key, spec)| {
                let (origin, destination) = key.split_once('_')?;
                Some((
                    (origin.to_string(), destination.to_string()),
                    Route::new(spec.time_travel, spec.cost),
                ))
            })
            .collect()
    }

    pub fn vessel_types(&self) -> Vec<VesselType> {
        self.vessel_types
            .iter()
            .map(|spec| VesselType::new(spec.capacity, spec.cost))
            .collect()
    }

    pub fn max_processing_rate(&self, default: f64) -> f64 {
        self.config.max_processing_rate.unwrap_or(default)
    }

    pub fn horizon_days(&self, default: u32) -> u32 {
        self.config.horizon_days.unwrap_or(default)
    }

    pub fn lp_refiner_config(&self) -> LpRefinerConfig {
        let mut config = LpRefinerConfig {
            max_processing_rate: self.max_processing_rate(100.0),
            ..LpRefinerConfig::default()
        };
        if let Some(limit) = self.config.solver.time_limit_seconds {
            config.time_limit_seconds = limit;
        }
        if let Some(gap) = self.config.solver.relative_mip_gap {
            config.relative_mip_gap = gap;
        }
        config
    }

    pub fn vessel_optimizer_config(&self) -> VesselOptimizerConfig {
        let mut config = VesselOptimizerConfig {
            horizon_days: self.horizon_days(30),
            ..VesselOptimizerConfig::default()
        };
        if let Some(limit) = self.config.solver.time_limit_seconds {
            config.time_limit_seconds = limit;
        }
        if let Some(gap) = self.config.solver.relative_mip_gap {
            config.relative_mip_gap = gap;
        }
        if let Some(max_vessels) = self.config.max_vessels {
            config.max_vessels = max_vessels;
        }
        if let Some(cost) = self.config.cost_per_deployed_vessel {
            config.cost_per_deployed_vessel = cost;
        }
        if let Some(penalty) = self.config.penalty_per_unmet_requirement {
            config.penalty_per_unmet_requirement = penalty;
        }
        config
    }

    pub fn genetic_config(&self) -> GeneticConfig {
        let mut config = GeneticConfig::default();
        let ga = &self.config.ga;
        if let Some(population) = ga.population {
            config.population_size = population;
        }
        if let Some(generations) = ga.generations {
            config.generations = generations;
        }
        if let Some(mutation_rate) = ga.mutation_rate {
            config.mutation_rate = mutation_rate;
        }
        if let Some(crossover_rate) = ga.crossover_rate {
            config.crossover_rate = crossover_rate;
        }
        if let Some(days) = ga.days {
            config.days = days;
        }
        if let Some(weights) = &ga.weights {
            config.weights = FitnessWeights {
                margin: weights.margin,
                throughput: weights.throughput,
                operational: weights.operational,
            };
        }
        config
    }
}
