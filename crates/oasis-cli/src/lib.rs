//! # oasis-cli: refinery planning command-line interface
//!
//! Thin binary that wires a scenario file (§6) through one of the four
//! decision engines in [`oasis_algo`] and prints the result. One subcommand
//! per engine, following the teacher's subcommand-per-file convention:
//!
//! ```text
//! oasis
//! ├── validate    # scenario parses, crude coverage is complete
//! ├── schedule    # §4.3 greedy day-by-day scheduler
//! ├── refine      # §4.4 multi-period LP refinement
//! ├── five-tank   # §4.5 quality-constrained 5-tank variant
//! ├── vessels     # §4.6 time-space network vessel optimizer
//! └── evolve      # §4.7 genetic schedule optimizer
//! ```
//!
//! `main.rs` is the sole place a `tracing_subscriber` is installed
//! (`-v`/`RUST_LOG` controlled); every library crate below it only emits
//! `tracing` events.

pub mod cli;
pub mod commands;
pub mod common;
pub mod scenario;

pub use cli::{Cli, Commands};
