//! Catalog build stages.
//!
//! | Module | Stage |
//! |--------|-------|
//! | [`coords`] | RA/Dec text to rounded decimal degrees |
//! | [`boundary`] | Boundary files to polygons |
//! | [`properties`] | Properties document loading, star id derivation |
//! | [`records`] | Lazy record production in document order |
//! | [`writer`] | Chunked Parquet output |
//! | [`verify`] | Post-build self check |
//! | [`pipeline`] | The stages wired together |

pub mod boundary;
pub mod coords;
pub mod pipeline;
pub mod properties;
pub mod records;
pub mod verify;
pub mod writer;

pub use boundary::{assemble_boundary, parse_boundary, BoundarySource};
pub use coords::{parse_declination, parse_right_ascension};
pub use pipeline::{build, build_with, catalog_file_name, BuildConfig, BuildReport};
pub use properties::{
    derive_star_ids, load_properties, read_properties, source_checksum, ConstellationProperties,
    PropertiesDocument,
};
pub use records::{build_records, records_from, ConstellationRecords, DataSources};
pub use verify::{verify, verify_catalog, SpotCheck, Verification};
pub use writer::{write_catalog, Compression, WriteOptions, WriteSummary};
