//! `forge build` and `forge verify`.

use crate::cli::{BuildArgs, Cli, VerifyArgs};
use anyhow::Context;
use celestial_constellations::build::{
    build_with, verify_catalog, BuildConfig, BuildReport, Verification, WriteOptions,
};
use celestial_constellations::logging::{LogConfig, LogDestination};
use celestial_constellations::schema::CatalogSchema;

pub fn run(args: &BuildArgs, cli: &Cli) -> anyhow::Result<()> {
    let config = config_from_args(args, cli);
    print_plan(&config, args);

    let report = build_with(&config)
        .with_context(|| format!("Failed to build catalog from {:?}", config.data_dir))?;

    print_report(&report);
    Ok(())
}

pub fn verify(args: &VerifyArgs, cli: &Cli) -> anyhow::Result<()> {
    let expected = Verification {
        expected_rows: args.expected_rows,
        ..Verification::default()
    };
    let catalog = verify_catalog(&args.catalog, &expected)
        .with_context(|| format!("Catalog check failed for {:?}", args.catalog))?;
    if cli.verbose {
        println!("{}", catalog.info());
    }
    println!("Validation passed.");
    Ok(())
}

fn config_from_args(args: &BuildArgs, cli: &Cli) -> BuildConfig {
    let defaults = BuildConfig::default();
    let schema = if args.legacy_schema {
        CatalogSchema::legacy()
    } else {
        CatalogSchema::canonical()
    };
    let level = if cli.verbose {
        "debug".to_string()
    } else {
        args.log_level.clone()
    };
    let mut log = LogConfig {
        destination: LogDestination::Console,
        level,
    };
    if let Some(path) = &args.log_file {
        log = log.with_file(path);
    }

    BuildConfig {
        data_dir: args.data_dir.clone(),
        output_dir: args.output_dir.clone(),
        version: args.version.clone().unwrap_or(defaults.version),
        write: WriteOptions {
            chunk_size: args.chunk_size,
            schema,
            sorting_columns: args.sort_by.clone(),
            compression: args.compression,
            row_group_size: args.row_group_size,
            metadata: None,
        },
        verification: (!args.no_verify).then(Verification::default),
        log,
    }
}

fn print_plan(config: &BuildConfig, args: &BuildArgs) {
    println!("=== Build Constellation Catalog ===");
    println!("Data directory: {:?}", config.data_dir);
    println!("Output: {:?}", config.output_path());
    println!("Version: {}", config.version);
    println!("Chunk size: {}", config.write.chunk_size);
    println!("Row group size: {}", config.write.row_group_size);
    println!("Compression: {}", config.write.compression);
    if !args.sort_by.is_empty() {
        let names: Vec<&str> = args.sort_by.iter().map(|c| c.name()).collect();
        println!("Sorted by: {}", names.join(", "));
    }
    println!("Verify: {}", config.verification.is_some());
    println!();
}

fn print_report(report: &BuildReport) {
    println!();
    println!("=== Catalog Statistics ===");
    println!("Records: {}", report.summary.rows);
    println!("Chunks: {}", report.summary.chunks);
    println!("Row groups: {}", report.summary.row_groups);
    println!("Schema version: {}", report.metadata.schema_version);
    if let Some(checksum) = &report.metadata.source_checksum {
        println!("Source SHA-256: {}", checksum);
    }
    if let Ok(meta) = std::fs::metadata(&report.summary.path) {
        println!("File size: {} bytes", meta.len());
    }
    println!("Time: {:.2}s", report.elapsed.as_secs_f64());
    if report.verified {
        println!("Validation passed.");
    }
    println!("Catalog written to {:?}", report.summary.path);
}
