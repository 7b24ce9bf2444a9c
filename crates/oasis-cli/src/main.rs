use std::io;

use clap::{CommandFactory, Parser};
use clap_complete::generate;
use tracing_subscriber::EnvFilter;

use oasis_cli::cli::{Cli, Commands};
use oasis_cli::commands;

fn init_tracing(verbosity: u8) {
    let default_level = match verbosity {
        0 => "oasis=info",
        1 => "oasis=debug",
        _ => "oasis=trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Commands::Validate { scenario } => commands::validate::run(scenario),
        Commands::Schedule { scenario, days, format } => commands::schedule::run(scenario, *days, *format),
        Commands::Refine { scenario, days, objective, format } => {
            commands::refine::run(scenario, *days, *objective, *format)
        }
        Commands::FiveTank { scenario, start_day, end_day, format } => {
            commands::five_tank::run(scenario, *start_day, *end_day, *format)
        }
        Commands::Vessels { scenario, format } => commands::vessels::run(scenario, *format),
        Commands::Evolve { scenario, format } => commands::evolve::run(scenario, *format),
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(*shell, &mut cmd, name, &mut io::stdout());
            Ok(())
        }
    }
}
