//! greatquest-rs: inspect and sample Frogger: The Great Quest animation tracks

mod cli;
mod commands;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use log::LevelFilter;

use crate::cli::{Cli, Commands};

/// Log level requested on the command line, if it overrides the environment.
///
/// `-q` only lowers the level when no `-v` was given.
fn requested_log_level(verbose: u8, quiet: bool) -> Option<LevelFilter> {
    match (verbose, quiet) {
        (0, false) => None,
        (0, true) => Some(LevelFilter::Error),
        (1, _) => Some(LevelFilter::Info),
        (2, _) => Some(LevelFilter::Debug),
        _ => Some(LevelFilter::Trace),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Malformed track data is reported at warn level.
    let mut logger =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if let Some(level) = requested_log_level(cli.verbose, cli.quiet) {
        logger.filter_level(level);
    }
    logger.init();

    log::debug!(
        "greatquest-rs {} (gq-track {})",
        env!("CARGO_PKG_VERSION"),
        gq_track::VERSION
    );

    match cli.command {
        Commands::Track { command } => commands::track::execute(command),
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            let name = command.get_name().to_string();
            clap_complete::generate(shell, &mut command, name, &mut std::io::stdout());
            Ok(())
        }
    }
}
