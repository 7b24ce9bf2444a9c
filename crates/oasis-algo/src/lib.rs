//! # oasis-algo: refinery planning decision engines
//!
//! The four tightly coupled decision engines described in SPEC_FULL.md §4,
//! built on the [`oasis_core`] data model:
//!
//! | Module | Responsibility |
//! |---|---|
//! | [`blending`] | margin-ranking blend selection (§4.1) |
//! | [`tanks`] | capacity-safe withdraw/add/store across an ordered tank bank (§4.2) |
//! | [`scheduler`] | greedy day-by-day simulator producing [`oasis_core::model::DailyPlan`]s (§4.3) |
//! | [`lp_refiner`] | multi-period throughput/margin LP refinement (§4.4) |
//! | [`lp_five_tank`] | quality-constrained 5-tank LP variant (§4.5) |
//! | [`vessel_optimizer`] | time-space network MIP for vessel deployment (§4.6) |
//! | [`genetic`] | hour-granular evolutionary schedule optimizer (§4.7) |
//!
//! Dependency order mirrors SPEC_FULL.md §2: `blending` and `tanks` have no
//! internal dependencies; `scheduler` depends on both; `lp_refiner`,
//! `lp_five_tank`, and `genetic` are peers of `scheduler` that re-solve or
//! extend its output; `vessel_optimizer` is independent and produces the
//! vessel fleet `scheduler` consumes.

pub mod blending;
pub mod genetic;
pub mod lp_five_tank;
pub mod lp_refiner;
pub mod scheduler;
pub mod tanks;
pub mod vessel_optimizer;
