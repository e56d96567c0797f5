//! Constellation catalog build pipeline and Parquet-backed catalog reader.
//!
//! A build turns two raw sources into one versioned catalog file:
//!
//! - `constellations.json`, one properties entry per constellation (display
//!   name, label position, Hipparcos line pairs)
//! - `boundaries/<id>.txt`, the vertices of each constellation's sky region
//!
//! Records are produced lazily, one constellation at a time, and streamed
//! into a chunked Parquet writer, so peak memory stays proportional to the
//! chunk size rather than the catalog. The finished file is reopened and
//! spot-checked before the build reports success.
//!
//! # Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`build`] | Coordinate parsing, boundary assembly, property loading, record building, [`write_catalog`](build::write_catalog), [`build_with`](build::build_with) |
//! | [`query`] | [`Catalog`](query::Catalog) reader: iterate, look up by IAU id or primary key |
//! | [`schema`] | [`CatalogSchema`](schema::CatalogSchema) and [`Column`](schema::Column), shared by writer and reader |
//! | [`record`] | [`ConstellationRecord`](record::ConstellationRecord) and its [`Boundary`](record::Boundary) polygon |
//! | [`metadata`] | [`BuildMetadata`](metadata::BuildMetadata) stored in the catalog footer |
//! | [`logging`] | Scoped per-build log sink |
//! | [`error`] | [`CatalogError`](error::CatalogError) |
//!
//! # Quick Start
//!
//! ```ignore
//! use celestial_constellations::build::{build_with, BuildConfig};
//! use celestial_constellations::query::Catalog;
//!
//! let report = build_with(&BuildConfig::default())?;
//! let catalog = Catalog::open(&report.summary.path)?;
//!
//! let canis_major = catalog.get("cma")?;
//! println!("{} has {} stars", canis_major.display_name, canis_major.star_hip_ids.len());
//! ```
//!
//! # Features
//!
//! - **`cli`**: Enables the `forge` and `query-constellations` binaries for
//!   building and inspecting catalogs from the command line.

pub mod build;
pub mod error;
pub mod logging;
pub mod metadata;
pub mod query;
pub mod record;
pub mod schema;

pub use error::{CatalogError, CatalogResult};
pub use record::{Boundary, ConstellationRecord};
