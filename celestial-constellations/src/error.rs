//! Error types for the constellation catalog pipeline.
//!
//! A single error type, [`CatalogError`], covers every failure the build and
//! query paths can produce. Build-side errors are fatal to the whole build:
//! there is no per-record recovery, so a successful build means every record
//! was valid. Read-side errors are scoped to the one open or lookup that
//! raised them.
//!
//! # Error Categories
//!
//! | Variant | Raised by | Side |
//! |---------|-----------|------|
//! | [`MalformedCoordinate`](CatalogError::MalformedCoordinate) | coordinate parser, boundary lines | build |
//! | [`BoundarySourceMissing`](CatalogError::BoundarySourceMissing) | boundary assembler | build |
//! | [`InsufficientVertices`](CatalogError::InsufficientVertices) | boundary assembler | build |
//! | [`CatalogSourceUnavailable`](CatalogError::CatalogSourceUnavailable) | property loader | build |
//! | [`MalformedMetadata`](CatalogError::MalformedMetadata) | property loader | build |
//! | [`InvalidOptions`](CatalogError::InvalidOptions) | catalog writer, log sink | build |
//! | [`VerificationFailed`](CatalogError::VerificationFailed) | post-build self check | build |
//! | [`CatalogNotFound`](CatalogError::CatalogNotFound) | catalog reader | read |
//! | [`CatalogCorrupt`](CatalogError::CatalogCorrupt) | catalog reader | read |
//! | [`RecordNotFound`](CatalogError::RecordNotFound) | catalog lookups | read |

use std::io;
use std::path::{Path, PathBuf};

use arrow_schema::ArrowError;
use parquet::errors::ParquetError;
use thiserror::Error;

/// Unified error type for building and reading constellation catalogs.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// Right ascension or declination text that cannot be normalized.
    #[error("Malformed coordinate '{input}': {reason}")]
    MalformedCoordinate { input: String, reason: String },

    /// No boundary file exists for the constellation.
    #[error("Boundary source for '{constellation_id}' not found at {path:?}")]
    BoundarySourceMissing {
        constellation_id: String,
        path: PathBuf,
    },

    /// Fewer than three distinct vertices survived line filtering.
    #[error("Boundary for '{constellation_id}' has {found} distinct vertices, at least 3 required")]
    InsufficientVertices {
        constellation_id: String,
        found: usize,
    },

    /// The properties document could not be read.
    #[error("Constellation properties unavailable at {path:?}: {source}")]
    CatalogSourceUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The properties document, or one of its entries, lacks required fields.
    #[error("Malformed metadata for '{constellation_id}': {message}")]
    MalformedMetadata {
        constellation_id: String,
        message: String,
    },

    /// Writer, schema or logging options that cannot be honored.
    #[error("Invalid options: {0}")]
    InvalidOptions(String),

    /// The freshly written catalog did not pass its self check.
    #[error("Catalog verification failed: {0}")]
    VerificationFailed(String),

    /// No catalog file at the given path.
    #[error("Catalog not found at {path:?}")]
    CatalogNotFound { path: PathBuf },

    /// The file exists but is not a readable constellation catalog.
    #[error("Catalog at {path:?} is corrupt: {message}")]
    CatalogCorrupt { path: PathBuf, message: String },

    /// Lookup matched no row.
    #[error("No constellation record with key '{key}'")]
    RecordNotFound { key: String },

    #[error("Parquet storage error: {0}")]
    Storage(#[from] ParquetError),

    #[error("Arrow error: {0}")]
    Arrow(#[from] ArrowError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Convenience alias for `Result<T, CatalogError>`.
pub type CatalogResult<T> = Result<T, CatalogError>;

impl CatalogError {
    /// Creates a [`MalformedCoordinate`](Self::MalformedCoordinate) error.
    pub fn malformed_coordinate(input: &str, reason: &str) -> Self {
        Self::MalformedCoordinate {
            input: input.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Creates a [`MalformedMetadata`](Self::MalformedMetadata) error.
    pub fn malformed_metadata(constellation_id: &str, message: &str) -> Self {
        Self::MalformedMetadata {
            constellation_id: constellation_id.to_string(),
            message: message.to_string(),
        }
    }

    /// Creates a [`CatalogCorrupt`](Self::CatalogCorrupt) error.
    pub fn corrupt(path: &Path, message: &str) -> Self {
        Self::CatalogCorrupt {
            path: path.to_path_buf(),
            message: message.to_string(),
        }
    }

    /// Creates a [`RecordNotFound`](Self::RecordNotFound) error.
    pub fn record_not_found(key: impl ToString) -> Self {
        Self::RecordNotFound {
            key: key.to_string(),
        }
    }

    /// Returns `true` for errors scoped to a single catalog read.
    ///
    /// Read-side failures never invalidate other reads of the same catalog.
    pub fn is_read_side(&self) -> bool {
        matches!(
            self,
            Self::CatalogNotFound { .. } | Self::CatalogCorrupt { .. } | Self::RecordNotFound { .. }
        )
    }
}
