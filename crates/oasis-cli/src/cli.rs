use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::common::OutputFormat;

#[derive(Parser, Debug)]
#[command(author, version, about = "OASIS refinery planning pipeline", long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v, -vv); overridden by RUST_LOG if set.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check a scenario file parses and its recipes reference known crude grades.
    Validate {
        /// Path to a TOML or JSON scenario document.
        scenario: PathBuf,
    },
    /// Run the greedy day-by-day tank/blending scheduler (§4.3).
    Schedule {
        scenario: PathBuf,
        /// Number of days to simulate; defaults to the scenario's config.horizon_days.
        #[arg(long)]
        days: Option<u32>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
    /// Re-solve a greedy schedule as a multi-period LP (§4.4).
    Refine {
        scenario: PathBuf,
        #[arg(long)]
        days: Option<u32>,
        #[arg(long, value_enum, default_value_t = RefineObjective::Margin)]
        objective: RefineObjective,
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
    /// Solve the quality-constrained 5-tank comparison variant (§4.5).
    FiveTank {
        /// Path to a TOML or JSON five-tank scenario document.
        scenario: PathBuf,
        #[arg(long)]
        start_day: u32,
        #[arg(long)]
        end_day: u32,
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
    /// Plan a minimum-cost vessel deployment against a bounded fleet (§4.6).
    Vessels {
        scenario: PathBuf,
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
    /// Evolve an hour-granular schedule with the genetic optimizer (§4.7).
    Evolve {
        scenario: PathBuf,
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
    /// Generate shell completion scripts.
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefineObjective {
    Throughput,
    Margin,
}
