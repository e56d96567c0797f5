//! Lazy production of constellation records.
//!
//! [`build_records`] reads the properties document and returns a
//! [`ConstellationRecords`] iterator. Boundaries are assembled only when a
//! record is pulled, so a consumer that writes records in chunks never holds
//! more than one chunk of geometry in memory.

use std::path::{Path, PathBuf};
use std::vec::IntoIter;

use tracing::debug;

use super::boundary::{assemble_boundary, BoundarySource};
use super::properties::{
    derive_star_ids, load_properties, ConstellationProperties, PropertyEntries,
};
use crate::error::CatalogResult;
use crate::record::ConstellationRecord;

pub const PROPERTIES_FILENAME: &str = "constellations.json";
pub const BOUNDARIES_DIRNAME: &str = "boundaries";

/// Locations of the two raw inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSources {
    pub properties: PathBuf,
    pub boundaries: BoundarySource,
}

impl DataSources {
    /// Standard layout: `<dir>/constellations.json` and `<dir>/boundaries/<id>.txt`.
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            properties: dir.join(PROPERTIES_FILENAME),
            boundaries: BoundarySource::new(dir.join(BOUNDARIES_DIRNAME)),
        }
    }
}

/// Start a fresh pass over the sources.
///
/// The properties document is re-read on every call; calling again restarts
/// production from the first constellation.
pub fn build_records(sources: &DataSources) -> CatalogResult<ConstellationRecords> {
    let properties = load_properties(&sources.properties)?;
    debug!(
        entries = properties.len(),
        "loaded properties from {:?}", sources.properties
    );
    Ok(records_from(properties, &sources.boundaries))
}

/// Produce records for properties already loaded, numbering from pk 1.
pub fn records_from(
    entries: PropertyEntries,
    boundaries: &BoundarySource,
) -> ConstellationRecords {
    ConstellationRecords {
        entries: entries.into_iter(),
        boundaries: boundaries.clone(),
        next_pk: 1,
    }
}

/// Assemble one record: `pk`, derived star ids and the boundary polygon.
pub fn build_record(
    primary_key: u64,
    constellation_id: &str,
    props: ConstellationProperties,
    boundaries: &BoundarySource,
) -> CatalogResult<ConstellationRecord> {
    let boundary = assemble_boundary(boundaries, constellation_id)?;
    let star_hip_ids = derive_star_ids(&props.hip_lines);
    Ok(ConstellationRecord {
        primary_key: Some(primary_key),
        display_name: props.name,
        center_ra: props.ra,
        center_dec: props.dec,
        iau_id: constellation_id.to_string(),
        constellation_id: constellation_id.to_string(),
        star_hip_ids,
        star_hip_lines: props.hip_lines,
        boundary,
    })
}

/// Single-pass stream of records in properties-document order.
///
/// Yields `Err` for the first constellation that fails to build; callers are
/// expected to stop there.
#[derive(Debug)]
pub struct ConstellationRecords {
    entries: IntoIter<(String, ConstellationProperties)>,
    boundaries: BoundarySource,
    next_pk: u64,
}

impl Iterator for ConstellationRecords {
    type Item = CatalogResult<ConstellationRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        let (constellation_id, props) = self.entries.next()?;
        let pk = self.next_pk;
        self.next_pk += 1;
        Some(build_record(pk, &constellation_id, props, &self.boundaries))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.entries.size_hint()
    }
}

impl ExactSizeIterator for ConstellationRecords {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CatalogError;
    use std::collections::BTreeSet;
    use std::fs;
    use tempfile::TempDir;

    const SQUARE: &str = "header\n\
        00 00 00| 0.0|X\n01 00 00| 0.0|X\n01 00 00| 10.0|X\n00 00 00| 10.0|X\n";

    fn write_sources(dir: &Path, doc: &str, boundary_ids: &[&str]) -> DataSources {
        let sources = DataSources::in_dir(dir);
        fs::create_dir_all(sources.boundaries.dir()).unwrap();
        fs::write(&sources.properties, doc).unwrap();
        for id in boundary_ids {
            fs::write(sources.boundaries.path_for(id), SQUARE).unwrap();
        }
        sources
    }

    const DOC: &str = r#"{
        "ori": {"name": "Orion", "ra": 83.0, "dec": 5.0, "hip_lines": [[26727, 26311], [26311, 25930]]},
        "lyr": {"name": "Lyra", "ra": 283.0, "dec": 36.0, "hip_lines": [[91262, 91919]]},
        "cma": {"name": "Canis Major", "ra": 105.0, "dec": -22.0, "hip_lines": []}
    }"#;

    #[test]
    fn test_records_in_document_order_with_contiguous_pks() {
        let dir = TempDir::new().unwrap();
        let sources = write_sources(dir.path(), DOC, &["ori", "lyr", "cma"]);

        let records: Vec<ConstellationRecord> = build_records(&sources)
            .unwrap()
            .collect::<CatalogResult<_>>()
            .unwrap();

        let ids: Vec<&str> = records.iter().map(|r| r.iau_id.as_str()).collect();
        assert_eq!(ids, vec!["ori", "lyr", "cma"]);
        let pks: Vec<Option<u64>> = records.iter().map(|r| r.primary_key).collect();
        assert_eq!(pks, vec![Some(1), Some(2), Some(3)]);
    }

    #[test]
    fn test_record_fields_merged() {
        let dir = TempDir::new().unwrap();
        let sources = write_sources(dir.path(), DOC, &["ori", "lyr", "cma"]);

        let orion = build_records(&sources).unwrap().next().unwrap().unwrap();
        assert_eq!(orion.display_name, "Orion");
        assert_eq!(orion.center_ra, 83.0);
        assert_eq!(orion.center_dec, 5.0);
        assert_eq!(orion.constellation_id, "ori");
        assert_eq!(orion.star_hip_ids, BTreeSet::from([25930, 26311, 26727]));
        assert_eq!(orion.star_hip_lines, vec![[26727, 26311], [26311, 25930]]);
        assert_eq!(orion.boundary.vertices().len(), 4);
    }

    #[test]
    fn test_restartable_by_calling_again() {
        let dir = TempDir::new().unwrap();
        let sources = write_sources(dir.path(), DOC, &["ori", "lyr", "cma"]);

        let first = build_records(&sources).unwrap();
        assert_eq!(first.len(), 3);
        let mut second = build_records(&sources).unwrap();
        second.next();
        assert_eq!(second.len(), 2);
        assert_eq!(
            build_records(&sources).unwrap().next().unwrap().unwrap().primary_key,
            Some(1)
        );
    }

    #[test]
    fn test_missing_boundary_surfaces_on_pull() {
        let dir = TempDir::new().unwrap();
        let sources = write_sources(dir.path(), DOC, &["ori", "cma"]);

        let mut records = build_records(&sources).unwrap();
        assert!(records.next().unwrap().is_ok());
        let err = records.next().unwrap().err().expect("expected error");
        assert!(matches!(
            err,
            CatalogError::BoundarySourceMissing { ref constellation_id, .. } if constellation_id == "lyr"
        ));
    }

    #[test]
    fn test_missing_properties() {
        let dir = TempDir::new().unwrap();
        let sources = DataSources::in_dir(dir.path());
        assert!(matches!(
            build_records(&sources),
            Err(CatalogError::CatalogSourceUnavailable { .. })
        ));
    }
}
