//! Command Line Interface module
//!
//! Argument parsing, the terminal implementation of the orchestrator host
//! and the command implementations.

pub mod args;
pub mod commands;
pub mod host;

pub use args::*;
pub use host::TerminalHost;

use anyhow::Result;

use crate::utils::logging::init_cli_logging;

/// Main CLI application runner
pub async fn run() -> Result<()> {
    let cli = Cli::parse_args();
    init_cli_logging(cli.verbose, cli.quiet)?;

    commands::execute_command(cli.command.clone(), &cli).await
}
