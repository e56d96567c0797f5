//! Post-build self check.
//!
//! After a build the catalog is reopened from disk and compared against
//! known facts about the source data: the number of records, and one fully
//! specified record.

use std::collections::BTreeSet;
use std::path::Path;

use tracing::{info, warn};

use crate::error::{CatalogError, CatalogResult};
use crate::query::Catalog;

/// Constellations in the standard data set.
pub const EXPECTED_CONSTELLATIONS: usize = 89;

/// One record whose content is known in advance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpotCheck {
    pub iau_id: String,
    pub display_name: String,
    pub star_hip_ids: BTreeSet<u32>,
}

impl SpotCheck {
    /// Canis Major, as drawn in the standard data set.
    pub fn canis_major() -> Self {
        Self {
            iau_id: "cma".to_string(),
            display_name: "Canis Major".to_string(),
            star_hip_ids: BTreeSet::from([
                35904, 33152, 33347, 31592, 33160, 33579, 34444, 30324, 34045, 32349,
            ]),
        }
    }
}

/// What a freshly built catalog must contain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verification {
    pub expected_rows: usize,
    pub spot_check: Option<SpotCheck>,
}

impl Default for Verification {
    fn default() -> Self {
        Self {
            expected_rows: EXPECTED_CONSTELLATIONS,
            spot_check: Some(SpotCheck::canis_major()),
        }
    }
}

/// Reopen the catalog at `path` and check it against `expected`.
pub fn verify_catalog(path: &Path, expected: &Verification) -> CatalogResult<Catalog> {
    let catalog = Catalog::open(path)?;
    verify(&catalog, expected)?;
    Ok(catalog)
}

/// Check an open catalog against `expected`.
///
/// # Errors
/// [`CatalogError::VerificationFailed`] describing the first mismatch.
pub fn verify(catalog: &Catalog, expected: &Verification) -> CatalogResult<()> {
    let rows = catalog.len();
    if rows != expected.expected_rows {
        return Err(failed(format!(
            "expected {} records, found {}",
            expected.expected_rows, rows
        )));
    }

    if let Some(check) = &expected.spot_check {
        let record = match catalog.get(&check.iau_id) {
            Ok(record) => record,
            Err(CatalogError::RecordNotFound { .. }) => {
                return Err(failed(format!("record '{}' is missing", check.iau_id)));
            }
            Err(e) => return Err(e),
        };
        if record.display_name != check.display_name {
            return Err(failed(format!(
                "record '{}' is named '{}', expected '{}'",
                check.iau_id, record.display_name, check.display_name
            )));
        }
        if record.star_hip_ids != check.star_hip_ids {
            return Err(failed(format!(
                "record '{}' has star ids {:?}, expected {:?}",
                check.iau_id, record.star_hip_ids, check.star_hip_ids
            )));
        }
    }

    info!(rows, "verified catalog {:?}", catalog.path());
    Ok(())
}

fn failed(message: String) -> CatalogError {
    warn!("{}", message);
    CatalogError::VerificationFailed(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::{write_catalog, WriteOptions};
    use crate::record::{Boundary, ConstellationRecord};
    use tempfile::TempDir;

    fn record(pk: u64, id: &str, name: &str, stars: &[u32]) -> ConstellationRecord {
        ConstellationRecord {
            primary_key: Some(pk),
            display_name: name.to_string(),
            center_ra: 0.0,
            center_dec: 0.0,
            iau_id: id.to_string(),
            constellation_id: id.to_string(),
            star_hip_ids: stars.iter().copied().collect(),
            star_hip_lines: Vec::new(),
            boundary: Boundary::from_vertices(vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0)]),
        }
    }

    fn catalog(dir: &TempDir, records: Vec<ConstellationRecord>) -> Catalog {
        let path = dir.path().join("verify.parquet");
        write_catalog(records.into_iter().map(Ok), &path, &WriteOptions::default()).unwrap();
        Catalog::open(&path).unwrap()
    }

    fn expectation(rows: usize) -> Verification {
        Verification {
            expected_rows: rows,
            spot_check: Some(SpotCheck {
                iau_id: "lyr".to_string(),
                display_name: "Lyra".to_string(),
                star_hip_ids: BTreeSet::from([91262, 91919]),
            }),
        }
    }

    #[test]
    fn test_default_expectations() {
        let v = Verification::default();
        assert_eq!(v.expected_rows, 89);
        let check = v.spot_check.unwrap();
        assert_eq!(check.iau_id, "cma");
        assert_eq!(check.star_hip_ids.len(), 10);
    }

    #[test]
    fn test_verify_passes() {
        let dir = TempDir::new().unwrap();
        let catalog = catalog(
            &dir,
            vec![
                record(1, "ori", "Orion", &[1, 2]),
                record(2, "lyr", "Lyra", &[91919, 91262]),
            ],
        );
        verify(&catalog, &expectation(2)).unwrap();
    }

    #[test]
    fn test_verify_row_count_mismatch() {
        let dir = TempDir::new().unwrap();
        let catalog = catalog(&dir, vec![record(1, "lyr", "Lyra", &[91262, 91919])]);
        let err = verify(&catalog, &expectation(89)).err().expect("expected error");
        assert!(matches!(err, CatalogError::VerificationFailed(_)));
        assert!(err.to_string().contains("expected 89 records, found 1"));
    }

    #[test]
    fn test_verify_spot_check_mismatch() {
        let dir = TempDir::new().unwrap();
        let lyra = catalog(&dir, vec![record(1, "lyr", "Lyra", &[91262])]);
        let err = verify(&lyra, &expectation(1)).err().expect("expected error");
        assert!(err.to_string().contains("star ids"), "{}", err);

        let dir = TempDir::new().unwrap();
        let orion = catalog(&dir, vec![record(1, "ori", "Orion", &[1])]);
        let err = verify(&orion, &expectation(1)).err().expect("expected error");
        assert!(err.to_string().contains("'lyr' is missing"), "{}", err);
    }

    #[test]
    fn test_row_count_only() {
        let dir = TempDir::new().unwrap();
        let catalog = catalog(&dir, vec![record(1, "ori", "Orion", &[1])]);
        let v = Verification {
            expected_rows: 1,
            spot_check: None,
        };
        verify(&catalog, &v).unwrap();
    }
}
