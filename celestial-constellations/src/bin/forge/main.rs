//! Forge: constellation catalog build CLI
//!
//! Reads constellation properties and boundary files and produces a
//! versioned, self-describing Parquet catalog.

mod build;
mod cli;

use clap::Parser;
use cli::{Cli, Commands};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Build(args) => build::run(args, &cli),
        Commands::Verify(args) => build::verify(args, &cli),
    }
}
