//! CLI argument definitions for forge

use celestial_constellations::build::Compression;
use celestial_constellations::schema::Column;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "forge")]
#[command(about = "Constellation catalog build pipeline")]
#[command(version)]
pub struct Cli {
    /// Enable verbose output (debug-level logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build the constellation catalog from properties and boundary files
    Build(BuildArgs),

    /// Check an existing catalog against the expected record count and spot check
    Verify(VerifyArgs),
}

#[derive(Parser)]
pub struct BuildArgs {
    /// Directory holding constellations.json and boundaries/
    #[arg(long, default_value = "data")]
    pub data_dir: PathBuf,

    /// Directory for the versioned catalog file
    #[arg(long, default_value = "build")]
    pub output_dir: PathBuf,

    /// Catalog version tag (defaults to the crate version)
    #[arg(long)]
    pub version: Option<String>,

    /// Records buffered per write batch
    #[arg(long, default_value = "100")]
    pub chunk_size: usize,

    /// Maximum rows per Parquet row group
    #[arg(long, default_value = "100")]
    pub row_group_size: usize,

    /// Page compression: none, snappy, zstd[:level], gzip[:level]
    #[arg(long, default_value = "none")]
    pub compression: Compression,

    /// Declare row ordering by these columns (rows must already be ordered)
    #[arg(long, value_delimiter = ',')]
    pub sort_by: Vec<Column>,

    /// Write the catalog without the pk column
    #[arg(long)]
    pub legacy_schema: bool,

    /// Also write build logs to this file
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Log filter directive, e.g. info or celestial_constellations=debug
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Skip the post-build self check
    #[arg(long)]
    pub no_verify: bool,
}

#[derive(Parser)]
pub struct VerifyArgs {
    /// Catalog file to check
    #[arg(long)]
    pub catalog: PathBuf,

    /// Expected number of records
    #[arg(long, default_value = "89")]
    pub expected_rows: usize,
}
