//! ## bufstore
//! **Operational interface for the packet buffer pool**
//!
//! - `layout`: build the configured pool and print its arena layout
//! - `exercise`: drive a seeded acquire/lock/release workload and report
//!   pool statistics and Prometheus metrics

use clap::Parser;

mod commands;
mod error;

use commands::Cli;
use error::CliError;

fn main() -> Result<(), CliError> {
    let cli = Cli::parse();
    commands::run_command(cli)
}
