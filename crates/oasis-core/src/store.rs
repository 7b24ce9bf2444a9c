//! Persistence capability boundary (§9 design note: "cyclic dependencies via
//! module-level state").
//!
//! The scheduler and optimizers never open a database handle themselves; a
//! caller that wants to persist results implements [`DataStore`] and injects it.
//! No implementation ships in this crate — the SQLite schema and its triggers
//! are an external collaborator's concern (SPEC_FULL.md §6), not this crate's.

use crate::error::OasisResult;
use crate::model::DailyPlan;

/// Capability a persistence collaborator implements to receive planning output.
///
/// Intentionally tiny: the core only ever calls `save_daily_plan`, never reads
/// back through this trait, keeping the dependency one-directional.
pub trait DataStore: Send + Sync {
    fn save_daily_plan(&self, plan: &DailyPlan) -> OasisResult<()>;
}

/// A `DataStore` that discards everything, for runs with no persistence collaborator.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullStore;

impl DataStore for NullStore {
    fn save_daily_plan(&self, _plan: &DailyPlan) -> OasisResult<()> {
        Ok(())
    }
}
