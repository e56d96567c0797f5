//! End-to-end catalog build.
//!
//! [`build_with`] ties the stages together: load properties, stream records
//! (assembling each boundary on demand) into the chunked writer, then reopen
//! the result and verify it. Every stage error aborts the build and no
//! catalog is left at the destination; a catalog that fails verification is
//! removed.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::{SubsecRound, Utc};
use tracing::{info, warn};

use super::properties::read_properties;
use super::records::{records_from, DataSources};
use super::verify::{verify_catalog, Verification};
use super::writer::{write_catalog, WriteOptions, WriteSummary};
use crate::error::{CatalogError, CatalogResult};
use crate::logging::{LogConfig, LogSink};
use crate::metadata::BuildMetadata;

pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_OUTPUT_DIR: &str = "build";

/// Catalog file name for a build version.
pub fn catalog_file_name(version: &str) -> String {
    format!("constellations.{}.parquet", version)
}

/// Everything one build needs.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildConfig {
    /// Holds `constellations.json` and `boundaries/<id>.txt`.
    pub data_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Version tag used in the output file name and the footer metadata.
    pub version: String,
    /// Layout options. `metadata` is filled in by the build.
    pub write: WriteOptions,
    /// Post-build check; `None` skips verification.
    pub verification: Option<Verification>,
    pub log: LogConfig,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            version: env!("CARGO_PKG_VERSION").to_string(),
            write: WriteOptions::default(),
            verification: Some(Verification::default()),
            log: LogConfig::default(),
        }
    }
}

impl BuildConfig {
    pub fn sources(&self) -> DataSources {
        DataSources::in_dir(&self.data_dir)
    }

    /// `<output_dir>/constellations.<version>.parquet`
    pub fn output_path(&self) -> PathBuf {
        self.output_dir.join(catalog_file_name(&self.version))
    }
}

/// Outcome of a successful build.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildReport {
    pub summary: WriteSummary,
    pub metadata: BuildMetadata,
    pub verified: bool,
    pub elapsed: Duration,
}

/// Build with every default: `data/` in, `build/` out, crate version.
pub fn build() -> CatalogResult<BuildReport> {
    build_with(&BuildConfig::default())
}

/// Run one build as configured.
///
/// The log sink in `config.log` is active for the duration of the call only.
pub fn build_with(config: &BuildConfig) -> CatalogResult<BuildReport> {
    let _sink = LogSink::install(&config.log)?;
    let start = Instant::now();
    let sources = config.sources();
    let destination = config.output_path();
    info!(
        version = %config.version,
        chunk_size = config.write.chunk_size,
        "building constellation catalog from {:?}",
        config.data_dir
    );

    let document = read_properties(&sources.properties)?;
    let metadata = BuildMetadata::new(config.write.schema.version(), config.version.clone())
        .with_source_checksum(document.checksum)
        .with_built_at(Utc::now().trunc_subsecs(0));

    let records = records_from(document.entries, &sources.boundaries);
    info!(constellations = records.len(), "loaded constellation properties");

    let options = WriteOptions {
        metadata: Some(metadata.clone()),
        ..config.write.clone()
    };
    let summary = write_catalog(records, &destination, &options)?;

    let verified = match &config.verification {
        Some(expected) => {
            if let Err(err) = verify_catalog(&destination, expected) {
                return Err(discard_catalog(&destination, err));
            }
            true
        }
        None => false,
    };

    let elapsed = start.elapsed();
    info!(
        rows = summary.rows,
        row_groups = summary.row_groups,
        verified,
        elapsed_ms = elapsed.as_millis() as u64,
        "build complete: {:?}",
        destination
    );
    Ok(BuildReport {
        summary,
        metadata,
        verified,
        elapsed,
    })
}

/// Remove a catalog that failed verification, keeping `cause` as the error.
fn discard_catalog(path: &Path, cause: CatalogError) -> CatalogError {
    if let Err(err) = fs::remove_file(path) {
        warn!(error = %err, "could not remove unverified catalog {:?}", path);
    }
    cause
}
