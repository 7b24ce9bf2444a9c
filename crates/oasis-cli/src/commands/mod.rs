//! One subcommand per decision engine, following the teacher's
//! subcommand-per-file convention.

pub mod evolve;
pub mod five_tank;
pub mod refine;
pub mod schedule;
pub mod validate;
pub mod vessels;
