mod common;

use std::fs;
use std::sync::Arc;

use celestial_constellations::build::{
    build_records, build_with, BuildConfig, Compression, DataSources, Verification,
    WriteOptions,
};
use celestial_constellations::logging::LogConfig;
use celestial_constellations::query::Catalog;
use celestial_constellations::schema::{CatalogSchema, Column, SCHEMA_VERSION};
use celestial_constellations::{CatalogError, CatalogResult, ConstellationRecord};
use tempfile::TempDir;

fn config_for(dir: &TempDir) -> BuildConfig {
    BuildConfig {
        data_dir: common::write_standard_dataset(dir.path()),
        output_dir: dir.path().join("build"),
        version: "0.0.1".to_string(),
        ..BuildConfig::default()
    }
}

#[test]
fn test_build_produces_89_verified_records() {
    let dir = TempDir::new().unwrap();
    let config = config_for(&dir);

    let report = build_with(&config).expect("build failed");
    assert!(report.verified);
    assert_eq!(report.summary.rows, 89);
    assert_eq!(report.summary.chunks, 1);
    assert_eq!(
        report.summary.path,
        dir.path().join("build").join("constellations.0.0.1.parquet")
    );

    let catalog = Catalog::open(&report.summary.path).unwrap();
    assert_eq!(catalog.len(), 89);

    let cma = catalog.get("cma").unwrap();
    assert_eq!(cma.display_name, "Canis Major");
    assert_eq!(cma.star_hip_ids, common::canis_major_stars());
    assert_eq!(cma.star_hip_lines, common::CANIS_MAJOR_LINES.to_vec());
}

#[test]
fn test_primary_keys_follow_document_order() {
    let dir = TempDir::new().unwrap();
    let report = build_with(&config_for(&dir)).unwrap();
    let catalog = Catalog::open(&report.summary.path).unwrap();

    let records: Vec<ConstellationRecord> =
        catalog.iter().unwrap().collect::<CatalogResult<_>>().unwrap();
    for (i, (record, id)) in records.iter().zip(common::CONSTELLATION_IDS).enumerate() {
        assert_eq!(record.primary_key, Some(i as u64 + 1));
        assert_eq!(record.iau_id, id);
        assert_eq!(record.constellation_id, id);
    }
    assert_eq!(catalog.get_by_pk(20).unwrap().iau_id, "cma");
}

#[test]
fn test_catalog_matches_built_records() {
    let dir = TempDir::new().unwrap();
    let config = config_for(&dir);
    let report = build_with(&config).unwrap();

    let built: Vec<ConstellationRecord> = build_records(&DataSources::in_dir(&config.data_dir))
        .unwrap()
        .collect::<CatalogResult<_>>()
        .unwrap();
    let read: Vec<ConstellationRecord> = Catalog::open(&report.summary.path)
        .unwrap()
        .iter()
        .unwrap()
        .collect::<CatalogResult<_>>()
        .unwrap();
    assert_eq!(read, built);

    // Header lines in every boundary file were skipped.
    assert!(read.iter().all(|r| r.boundary.vertices().len() == 4));
}

#[test]
fn test_boundaries_are_rounded_and_closed() {
    let dir = TempDir::new().unwrap();
    let report = build_with(&config_for(&dir)).unwrap();
    let catalog = Catalog::open(&report.summary.path).unwrap();

    let and = catalog.get("and").unwrap();
    assert_eq!(
        and.boundary.vertices(),
        vec![(0.0, -80.0), (7.5, -80.0), (7.5, -75.0), (0.0, -75.0)]
    );
    let ring: Vec<(f64, f64)> = and.boundary.ring().collect();
    assert_eq!(ring.first(), ring.last());
}

#[test]
fn test_degenerate_boundary_leaves_no_catalog() {
    let dir = TempDir::new().unwrap();
    let config = config_for(&dir);
    common::overwrite_boundary(
        &config.data_dir,
        "lyr",
        "header\n18 00 00| 30.0|LYR\n18 30 00| 30.0|LYR\n",
    );

    let err = build_with(&config).err().expect("build should fail");
    match err {
        CatalogError::InsufficientVertices {
            constellation_id,
            found,
        } => {
            assert_eq!(constellation_id, "lyr");
            assert_eq!(found, 2);
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(!config.output_path().exists());
    let leftovers: Vec<_> = fs::read_dir(&config.output_dir)
        .map(|entries| entries.flatten().collect())
        .unwrap_or_default();
    assert!(leftovers.is_empty(), "unexpected files: {:?}", leftovers);
}

#[test]
fn test_missing_boundary_file_fails_build() {
    let dir = TempDir::new().unwrap();
    let config = config_for(&dir);
    fs::remove_file(config.data_dir.join("boundaries").join("vul.txt")).unwrap();

    let err = build_with(&config).err().expect("build should fail");
    assert!(matches!(
        err,
        CatalogError::BoundarySourceMissing { ref constellation_id, .. } if constellation_id == "vul"
    ));
    assert!(!config.output_path().exists());
}

#[test]
fn test_malformed_coordinate_fails_build() {
    let dir = TempDir::new().unwrap();
    let config = config_for(&dir);
    common::overwrite_boundary(
        &config.data_dir,
        "ori",
        "05 00 00| 0.0|ORI\n05 xx 00| 0.0|ORI\n06 00 00| 10.0|ORI\n",
    );

    let err = build_with(&config).err().expect("build should fail");
    assert!(matches!(err, CatalogError::MalformedCoordinate { .. }), "{:?}", err);
    assert!(err.to_string().contains("ori line 2"), "{}", err);
}

#[test]
fn test_lookup_miss() {
    let dir = TempDir::new().unwrap();
    let report = build_with(&config_for(&dir)).unwrap();
    let catalog = Catalog::open(&report.summary.path).unwrap();

    let err = catalog.get("xyz").err().expect("lookup should miss");
    assert!(matches!(err, CatalogError::RecordNotFound { ref key } if key == "xyz"));
    assert!(err.is_read_side());
    assert!(catalog.get_by_pk(90).is_err());
}

#[test]
fn test_chunked_compressed_build() {
    let dir = TempDir::new().unwrap();
    let config = BuildConfig {
        write: WriteOptions {
            chunk_size: 10,
            row_group_size: 4,
            compression: Compression::Zstd(3),
            sorting_columns: vec![Column::Pk],
            ..WriteOptions::default()
        },
        ..config_for(&dir)
    };

    let report = build_with(&config).unwrap();
    assert_eq!(report.summary.rows, 89);
    assert_eq!(report.summary.chunks, 9);
    // Eight chunks of 10 rows make 3 groups each; the last 9 rows make 3.
    assert_eq!(report.summary.row_groups, 27);

    let catalog = Catalog::open(&report.summary.path).unwrap();
    assert_eq!(catalog.num_row_groups(), 27);
    assert_eq!(catalog.get("vul").unwrap().primary_key, Some(89));
}

#[test]
fn test_legacy_schema_build() {
    let dir = TempDir::new().unwrap();
    let config = BuildConfig {
        write: WriteOptions {
            schema: CatalogSchema::legacy(),
            ..WriteOptions::default()
        },
        ..config_for(&dir)
    };

    let report = build_with(&config).unwrap();
    assert!(report.verified);
    let catalog = Catalog::open(&report.summary.path).unwrap();
    assert!(!catalog.schema_columns().contains(&Column::Pk));
    assert_eq!(catalog.get("cma").unwrap().primary_key, None);
    assert_eq!(catalog.build_metadata().unwrap().schema_version, 1);
}

#[test]
fn test_build_metadata_in_footer() {
    let dir = TempDir::new().unwrap();
    let report = build_with(&config_for(&dir)).unwrap();
    let catalog = Catalog::open(&report.summary.path).unwrap();

    let meta = catalog.build_metadata().unwrap();
    assert_eq!(meta.schema_version, SCHEMA_VERSION);
    assert_eq!(meta.build_version, "0.0.1");
    assert_eq!(meta, report.metadata);
    assert_eq!(meta.source_checksum.as_ref().map(String::len), Some(64));
}

#[test]
fn test_verification_mismatch_fails_build() {
    let dir = TempDir::new().unwrap();
    let data = common::write_dataset(dir.path(), &common::CONSTELLATION_IDS[..20]);
    let config = BuildConfig {
        data_dir: data,
        output_dir: dir.path().join("build"),
        version: "short".to_string(),
        ..BuildConfig::default()
    };

    let err = build_with(&config).err().expect("verification should fail");
    assert!(matches!(err, CatalogError::VerificationFailed(_)));
    assert!(!config.output_path().exists());

    let relaxed = BuildConfig {
        verification: Some(Verification {
            expected_rows: 20,
            ..Verification::default()
        }),
        ..config
    };
    assert!(build_with(&relaxed).unwrap().verified);
}

#[test]
fn test_build_log_written_to_file() {
    let dir = TempDir::new().unwrap();
    let log_path = dir.path().join("logs").join("forge.log");
    let config = BuildConfig {
        log: LogConfig::default().with_file(&log_path),
        ..config_for(&dir)
    };

    build_with(&config).unwrap();
    let log = fs::read_to_string(&log_path).unwrap();
    assert!(log.contains("build complete"), "{}", log);
}

#[test]
fn test_concurrent_lookups() {
    let dir = TempDir::new().unwrap();
    let report = build_with(&config_for(&dir)).unwrap();
    let catalog = Arc::new(Catalog::open(&report.summary.path).unwrap());

    std::thread::scope(|scope| {
        for chunk in common::CONSTELLATION_IDS.chunks(23) {
            let catalog = Arc::clone(&catalog);
            scope.spawn(move || {
                for id in chunk {
                    let record = catalog.get(id).unwrap();
                    assert_eq!(record.iau_id, *id);
                    assert_eq!(record.display_name, common::display_name(id));
                }
            });
        }
    });
}
