//! # oasis-core: refinery planning domain model
//!
//! Provides the entity types shared by every OASIS decision engine (§3 of the
//! design spec): crudes, tanks, blending recipes, feedstock parcels and
//! requirements, vessels, routes, and the daily/hourly plan records produced by
//! the scheduler and optimizers.
//!
//! ## Design philosophy
//!
//! Every entity is a validated record type constructed through a fallible
//! constructor rather than an unconstrained map — see [`error::OasisError`] for
//! the uniform error type those constructors return. `Tank::content` and a
//! `DailyPlan`'s `processing_rates`/`inventory_by_grade` are ordered
//! `Vec<(String, f64)>` pairs rather than hash maps, because the greedy
//! scheduler's withdraw/add order is part of its observable behavior.
//!
//! ## Quick start
//!
//! ```
//! use oasis_core::model::{BlendingRecipe, Tank};
//!
//! let tank = Tank::with_content("T1", 100.0, vec![("A".into(), 40.0)]).unwrap();
//! let recipe = BlendingRecipe::new("R1", "A", None, 40.0, 1.0).unwrap();
//! assert_eq!(tank.volume_of(&recipe.primary_grade), 40.0);
//! ```

pub mod error;
pub mod model;
pub mod store;

pub use error::{OasisError, OasisResult};
