//! Parquet reader for constellation catalogs.
//!
//! A catalog is a single Parquet file written by
//! [`write_catalog`](crate::build::write_catalog). Opening it reads only the
//! footer; record data is decoded on demand:
//!
//! - [`Catalog::iter`] streams every record, one Arrow batch at a time
//! - [`Catalog::get`] scans the `iau_id` column alone, then decodes the one
//!   matching row through a row selection
//! - [`Catalog::get_by_pk`] does the same over `pk`
//!
//! Columns are resolved by name, so files written with the legacy schema
//! (no `pk`) open normally and yield records with `primary_key: None`.

use std::collections::VecDeque;
use std::fmt;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use arrow_array::types::{Float64Type, UInt32Type};
use arrow_array::{
    Array, ArrayRef, ArrowPrimitiveType, FixedSizeListArray, Float64Array, ListArray,
    PrimitiveArray, RecordBatch, StringArray, UInt32Array, UInt64Array,
};
use arrow_schema::DataType;
use parquet::arrow::arrow_reader::{
    ArrowReaderMetadata, ArrowReaderOptions, ParquetRecordBatchReader,
    ParquetRecordBatchReaderBuilder, RowSelection, RowSelector,
};
use parquet::arrow::ProjectionMask;
use tracing::debug;

use crate::error::{CatalogError, CatalogResult};
use crate::metadata::BuildMetadata;
use crate::record::{Boundary, ConstellationRecord};
use crate::schema::Column;

/// Rows decoded per Arrow batch while iterating.
pub const DEFAULT_BATCH_SIZE: usize = 64;

/// Read-only handle to a finished catalog file.
///
/// Holds the parsed footer only. Every read opens its own file handle, so a
/// `Catalog` can be shared across threads and queried concurrently.
#[derive(Debug, Clone)]
pub struct Catalog {
    path: PathBuf,
    metadata: ArrowReaderMetadata,
    columns: Vec<Column>,
}

impl Catalog {
    /// Open a catalog and validate its layout.
    ///
    /// # Errors
    /// - [`CatalogError::CatalogNotFound`] if nothing exists at `path`
    /// - [`CatalogError::CatalogCorrupt`] if the file is not Parquet, lacks a
    ///   required column, or stores a column with an incompatible type
    pub fn open(path: impl AsRef<Path>) -> CatalogResult<Self> {
        let path = path.as_ref();
        let file = open_file(path)?;
        let metadata = ArrowReaderMetadata::load(&file, ArrowReaderOptions::new())
            .map_err(|e| CatalogError::corrupt(path, &e.to_string()))?;

        let schema = metadata.schema();
        let mut columns = Vec::new();
        for field in schema.fields() {
            let Ok(column) = field.name().parse::<Column>() else {
                continue;
            };
            if !same_shape(&column.data_type(), field.data_type()) {
                return Err(CatalogError::corrupt(
                    path,
                    &format!(
                        "column '{}' has type {}, expected {}",
                        column,
                        field.data_type(),
                        column.data_type()
                    ),
                ));
            }
            columns.push(column);
        }
        if let Some(missing) = Column::ALL
            .into_iter()
            .find(|c| c.is_required() && !columns.contains(c))
        {
            return Err(CatalogError::corrupt(
                path,
                &format!("missing required column '{}'", missing),
            ));
        }

        let catalog = Self {
            path: path.to_path_buf(),
            metadata,
            columns,
        };
        debug!(
            rows = catalog.len(),
            row_groups = catalog.num_row_groups(),
            "opened catalog {:?}",
            catalog.path
        );
        Ok(catalog)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of records in the catalog.
    pub fn len(&self) -> usize {
        self.metadata.metadata().file_metadata().num_rows().max(0) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn num_row_groups(&self) -> usize {
        self.metadata.metadata().num_row_groups()
    }

    /// Catalog columns present in the file, in file order.
    pub fn schema_columns(&self) -> &[Column] {
        &self.columns
    }

    /// Build provenance stored in the footer, if the file carries it.
    pub fn build_metadata(&self) -> Option<BuildMetadata> {
        self.metadata
            .metadata()
            .file_metadata()
            .key_value_metadata()
            .and_then(|kv| BuildMetadata::from_key_values(kv))
    }

    pub fn info(&self) -> CatalogInfo {
        CatalogInfo {
            path: self.path.clone(),
            rows: self.len(),
            row_groups: self.num_row_groups(),
            columns: self.columns.clone(),
            build: self.build_metadata(),
        }
    }

    /// Stream every record in file order.
    ///
    /// Each call opens a fresh reader, so iteration can be restarted by
    /// calling again. Memory use is bounded by one batch of
    /// [`DEFAULT_BATCH_SIZE`] rows.
    pub fn iter(&self) -> CatalogResult<CatalogIter> {
        let builder = self.reader_builder()?;
        let mask = self.projection(&builder);
        let reader = builder
            .with_projection(mask)
            .with_batch_size(DEFAULT_BATCH_SIZE)
            .build()?;
        Ok(CatalogIter {
            path: self.path.clone(),
            reader,
            buffered: VecDeque::new(),
            done: false,
        })
    }

    /// Look up a record by IAU identifier.
    ///
    /// If the identifier occurs more than once, the first row wins.
    pub fn get(&self, iau_id: &str) -> CatalogResult<ConstellationRecord> {
        let row = self.find_row(Column::IauId, iau_id, |array| {
            let ids = downcast::<StringArray>(&self.path, Column::IauId, array)?;
            Ok((0..ids.len()).find(|&i| ids.is_valid(i) && ids.value(i) == iau_id))
        })?;
        self.read_row(row)
    }

    /// Look up a record by primary key.
    ///
    /// Catalogs without a `pk` column have no keys, so every lookup misses.
    pub fn get_by_pk(&self, pk: u64) -> CatalogResult<ConstellationRecord> {
        if !self.columns.contains(&Column::Pk) {
            return Err(CatalogError::record_not_found(pk));
        }
        let row = self.find_row(Column::Pk, &pk.to_string(), |array| {
            let keys = downcast::<UInt64Array>(&self.path, Column::Pk, array)?;
            Ok((0..keys.len()).find(|&i| keys.is_valid(i) && keys.value(i) == pk))
        })?;
        self.read_row(row)
    }

    fn reader_builder(&self) -> CatalogResult<ParquetRecordBatchReaderBuilder<File>> {
        let file = open_file(&self.path)?;
        Ok(ParquetRecordBatchReaderBuilder::new_with_metadata(
            file,
            self.metadata.clone(),
        ))
    }

    /// Mask selecting the known catalog columns and nothing else.
    fn projection(&self, builder: &ParquetRecordBatchReaderBuilder<File>) -> ProjectionMask {
        let schema = builder.schema();
        let roots: Vec<usize> = self
            .columns
            .iter()
            .filter_map(|c| schema.index_of(c.name()).ok())
            .collect();
        ProjectionMask::roots(builder.parquet_schema(), roots)
    }

    /// Absolute index of the first row whose `column` satisfies `matches`.
    fn find_row<F>(&self, column: Column, key: &str, matches: F) -> CatalogResult<usize>
    where
        F: Fn(&ArrayRef) -> CatalogResult<Option<usize>>,
    {
        let builder = self.reader_builder()?;
        let index = builder
            .schema()
            .index_of(column.name())
            .map_err(|_| CatalogError::record_not_found(key))?;
        let mask = ProjectionMask::roots(builder.parquet_schema(), [index]);
        let reader = builder.with_projection(mask).build()?;

        let mut offset = 0;
        for batch in reader {
            let batch = batch?;
            if let Some(i) = matches(batch.column(0))? {
                debug!(key, row = offset + i, "located {} row", column);
                return Ok(offset + i);
            }
            offset += batch.num_rows();
        }
        Err(CatalogError::record_not_found(key))
    }

    /// Decode exactly one row, reading only the row group that holds it.
    fn read_row(&self, row: usize) -> CatalogResult<ConstellationRecord> {
        let (group, offset) = self.locate_row_group(row)?;
        let builder = self.reader_builder()?;
        let mask = self.projection(&builder);
        let selection = RowSelection::from(vec![RowSelector::skip(offset), RowSelector::select(1)]);
        let mut reader = builder
            .with_projection(mask)
            .with_row_groups(vec![group])
            .with_row_selection(selection)
            .build()?;

        let batch = reader
            .next()
            .transpose()?
            .ok_or_else(|| CatalogError::corrupt(&self.path, &format!("row {} not readable", row)))?;
        decode_batch(&self.path, &batch)?
            .into_iter()
            .next()
            .ok_or_else(|| CatalogError::corrupt(&self.path, &format!("row {} not readable", row)))
    }

    fn locate_row_group(&self, row: usize) -> CatalogResult<(usize, usize)> {
        let mut start = 0;
        for (group, meta) in self.metadata.metadata().row_groups().iter().enumerate() {
            let rows = meta.num_rows().max(0) as usize;
            if row < start + rows {
                return Ok((group, row - start));
            }
            start += rows;
        }
        Err(CatalogError::corrupt(
            &self.path,
            &format!("row {} beyond the last row group", row),
        ))
    }
}

/// Summary of an open catalog, printable for inspection tools.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogInfo {
    pub path: PathBuf,
    pub rows: usize,
    pub row_groups: usize,
    pub columns: Vec<Column>,
    pub build: Option<BuildMetadata>,
}

impl fmt::Display for CatalogInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.columns.iter().map(|c| c.name()).collect();
        writeln!(f, "Catalog: {}", self.path.display())?;
        writeln!(f, "Records: {}", self.rows)?;
        writeln!(f, "Row groups: {}", self.row_groups)?;
        write!(f, "Columns: {}", names.join(", "))?;
        if let Some(build) = &self.build {
            write!(f, "\nSchema version: {}", build.schema_version)?;
            write!(f, "\nBuild version: {}", build.build_version)?;
            if let Some(checksum) = &build.source_checksum {
                write!(f, "\nSource SHA-256: {}", checksum)?;
            }
            if let Some(built_at) = &build.built_at {
                write!(f, "\nBuilt at: {}", built_at.to_rfc3339())?;
            }
        }
        Ok(())
    }
}

/// Lazy record stream over a catalog. See [`Catalog::iter`].
///
/// Ends after the first error.
pub struct CatalogIter {
    path: PathBuf,
    reader: ParquetRecordBatchReader,
    buffered: VecDeque<ConstellationRecord>,
    done: bool,
}

impl Iterator for CatalogIter {
    type Item = CatalogResult<ConstellationRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(record) = self.buffered.pop_front() {
                return Some(Ok(record));
            }
            if self.done {
                return None;
            }
            let decoded = match self.reader.next()? {
                Ok(batch) => decode_batch(&self.path, &batch),
                Err(e) => Err(e.into()),
            };
            match decoded {
                Ok(records) => self.buffered = records.into(),
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

fn open_file(path: &Path) -> CatalogResult<File> {
    File::open(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => CatalogError::CatalogNotFound {
            path: path.to_path_buf(),
        },
        _ => CatalogError::Io(e),
    })
}

/// Type compatibility ignoring list item names and nullability.
///
/// Pairs may be stored as variable-length lists as well as fixed-size ones.
fn same_shape(expected: &DataType, actual: &DataType) -> bool {
    match (expected, actual) {
        (DataType::List(e), DataType::List(a)) => same_shape(e.data_type(), a.data_type()),
        (DataType::FixedSizeList(e, n), DataType::FixedSizeList(a, m)) => {
            n == m && same_shape(e.data_type(), a.data_type())
        }
        (DataType::FixedSizeList(e, _), DataType::List(a)) => {
            same_shape(e.data_type(), a.data_type())
        }
        _ => expected == actual,
    }
}

fn downcast<'a, A: Array + 'static>(
    path: &Path,
    column: Column,
    array: &'a ArrayRef,
) -> CatalogResult<&'a A> {
    array.as_any().downcast_ref::<A>().ok_or_else(|| {
        CatalogError::corrupt(
            path,
            &format!("column '{}' has unexpected type {}", column, array.data_type()),
        )
    })
}

fn batch_column<'a, A: Array + 'static>(
    path: &Path,
    batch: &'a RecordBatch,
    column: Column,
) -> CatalogResult<&'a A> {
    let array = batch
        .column_by_name(column.name())
        .ok_or_else(|| CatalogError::corrupt(path, &format!("missing column '{}'", column)))?;
    downcast(path, column, array)
}

/// Rebuild records from one batch holding every required column.
fn decode_batch(path: &Path, batch: &RecordBatch) -> CatalogResult<Vec<ConstellationRecord>> {
    let pk = match batch.column_by_name(Column::Pk.name()) {
        Some(array) => Some(downcast::<UInt64Array>(path, Column::Pk, array)?),
        None => None,
    };
    let name = batch_column::<StringArray>(path, batch, Column::Name)?;
    let ra = batch_column::<Float64Array>(path, batch, Column::Ra)?;
    let dec = batch_column::<Float64Array>(path, batch, Column::Dec)?;
    let iau_id = batch_column::<StringArray>(path, batch, Column::IauId)?;
    let constellation_id = batch_column::<StringArray>(path, batch, Column::ConstellationId)?;
    let star_hip_ids = batch_column::<ListArray>(path, batch, Column::StarHipIds)?;
    let star_hip_lines = batch_column::<ListArray>(path, batch, Column::StarHipLines)?;
    let boundary = batch_column::<ListArray>(path, batch, Column::Boundary)?;

    let mut records = Vec::with_capacity(batch.num_rows());
    for row in 0..batch.num_rows() {
        let ids = star_hip_ids.value(row);
        let ids = downcast::<UInt32Array>(path, Column::StarHipIds, &ids)?;
        records.push(ConstellationRecord {
            primary_key: pk.filter(|keys| keys.is_valid(row)).map(|keys| keys.value(row)),
            display_name: name.value(row).to_string(),
            center_ra: ra.value(row),
            center_dec: dec.value(row),
            iau_id: iau_id.value(row).to_string(),
            constellation_id: constellation_id.value(row).to_string(),
            star_hip_ids: ids.iter().flatten().collect(),
            star_hip_lines: pairs::<UInt32Type>(
                path,
                Column::StarHipLines,
                &star_hip_lines.value(row),
            )?,
            boundary: Boundary::from_vertices(
                pairs::<Float64Type>(path, Column::Boundary, &boundary.value(row))?
                    .into_iter()
                    .map(|[ra, dec]| (ra, dec))
                    .collect(),
            ),
        });
    }
    Ok(records)
}

/// Decode a list of 2-element lists, fixed-size or not.
fn pairs<T: ArrowPrimitiveType>(
    path: &Path,
    column: Column,
    values: &ArrayRef,
) -> CatalogResult<Vec<[T::Native; 2]>> {
    let items: Vec<ArrayRef> = if let Some(fixed) = values.as_any().downcast_ref::<FixedSizeListArray>() {
        (0..fixed.len()).map(|i| fixed.value(i)).collect()
    } else if let Some(list) = values.as_any().downcast_ref::<ListArray>() {
        (0..list.len()).map(|i| list.value(i)).collect()
    } else {
        return Err(CatalogError::corrupt(
            path,
            &format!("column '{}' does not hold pairs", column),
        ));
    };

    items
        .iter()
        .map(|item| {
            let pair = downcast::<PrimitiveArray<T>>(path, column, item)?;
            if pair.len() != 2 {
                return Err(CatalogError::corrupt(
                    path,
                    &format!("column '{}' holds a {}-element pair", column, pair.len()),
                ));
            }
            Ok([pair.value(0), pair.value(1)])
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::{write_catalog, WriteOptions};
    use crate::schema::CatalogSchema;
    use std::collections::BTreeSet;
    use tempfile::TempDir;

    fn record(pk: u64, id: &str) -> ConstellationRecord {
        let base = pk as f64;
        ConstellationRecord {
            primary_key: Some(pk),
            display_name: format!("Name {}", id),
            center_ra: base * 3.5,
            center_dec: -base,
            iau_id: id.to_string(),
            constellation_id: id.to_string(),
            star_hip_ids: BTreeSet::from([pk as u32, pk as u32 + 1]),
            star_hip_lines: vec![[pk as u32 + 1, pk as u32]],
            boundary: Boundary::from_vertices(vec![
                (base, 0.0),
                (base + 1.25, 0.0),
                (base + 1.25, 2.5),
                (base, 2.5),
            ]),
        }
    }

    fn write(dir: &TempDir, records: &[ConstellationRecord], options: &WriteOptions) -> PathBuf {
        let path = dir.path().join("constellations.test.parquet");
        write_catalog(records.iter().cloned().map(Ok), &path, options).unwrap();
        path
    }

    fn sample(n: u64) -> Vec<ConstellationRecord> {
        (1..=n).map(|i| record(i, &format!("c{:02}", i))).collect()
    }

    #[test]
    fn test_open_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = Catalog::open(dir.path().join("nope.parquet"))
            .err()
            .expect("expected error");
        assert!(matches!(err, CatalogError::CatalogNotFound { .. }));
    }

    #[test]
    fn test_open_not_parquet() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.parquet");
        std::fs::write(&path, b"definitely not a parquet file").unwrap();
        let err = Catalog::open(&path).err().expect("expected error");
        assert!(matches!(err, CatalogError::CatalogCorrupt { .. }), "{:?}", err);
    }

    #[test]
    fn test_open_missing_required_column() {
        let dir = TempDir::new().unwrap();
        let options = WriteOptions {
            schema: CatalogSchema::new(vec![Column::IauId, Column::Name]).unwrap(),
            ..WriteOptions::default()
        };
        let path = write(&dir, &sample(2), &options);
        let err = Catalog::open(&path).err().expect("expected error");
        assert!(err.to_string().contains("missing required column"), "{}", err);
    }

    #[test]
    fn test_iter_round_trips_records() {
        let dir = TempDir::new().unwrap();
        let records = sample(7);
        let options = WriteOptions {
            chunk_size: 3,
            ..WriteOptions::default()
        };
        let catalog = Catalog::open(write(&dir, &records, &options)).unwrap();

        assert_eq!(catalog.len(), 7);
        assert!(!catalog.is_empty());
        assert_eq!(catalog.num_row_groups(), 3);
        let read: Vec<ConstellationRecord> =
            catalog.iter().unwrap().collect::<CatalogResult<_>>().unwrap();
        assert_eq!(read, records);
    }

    #[test]
    fn test_iter_is_restartable() {
        let dir = TempDir::new().unwrap();
        let catalog = Catalog::open(write(&dir, &sample(4), &WriteOptions::default())).unwrap();
        let mut first = catalog.iter().unwrap();
        first.next();
        first.next();
        assert_eq!(catalog.iter().unwrap().count(), 4);
        assert_eq!(first.count(), 2);
    }

    #[test]
    fn test_get_across_row_groups() {
        let dir = TempDir::new().unwrap();
        let records = sample(10);
        let options = WriteOptions {
            chunk_size: 4,
            row_group_size: 2,
            ..WriteOptions::default()
        };
        let catalog = Catalog::open(write(&dir, &records, &options)).unwrap();

        for expected in &records {
            assert_eq!(&catalog.get(&expected.iau_id).unwrap(), expected);
        }
        assert_eq!(catalog.get_by_pk(9).unwrap(), records[8]);
    }

    #[test]
    fn test_get_missing_key() {
        let dir = TempDir::new().unwrap();
        let catalog = Catalog::open(write(&dir, &sample(3), &WriteOptions::default())).unwrap();
        let err = catalog.get("xyz").err().expect("expected error");
        assert!(matches!(err, CatalogError::RecordNotFound { ref key } if key == "xyz"));
        assert!(matches!(
            catalog.get_by_pk(42),
            Err(CatalogError::RecordNotFound { .. })
        ));
    }

    #[test]
    fn test_duplicate_key_returns_first() {
        let dir = TempDir::new().unwrap();
        let mut records = sample(3);
        records[2].iau_id = "c01".to_string();
        let catalog = Catalog::open(write(&dir, &records, &WriteOptions::default())).unwrap();
        assert_eq!(catalog.get("c01").unwrap().primary_key, Some(1));
    }

    #[test]
    fn test_legacy_schema_has_no_keys() {
        let dir = TempDir::new().unwrap();
        let options = WriteOptions {
            schema: CatalogSchema::legacy(),
            ..WriteOptions::default()
        };
        let catalog = Catalog::open(write(&dir, &sample(3), &options)).unwrap();

        assert!(!catalog.schema_columns().contains(&Column::Pk));
        let record = catalog.get("c02").unwrap();
        assert_eq!(record.primary_key, None);
        assert_eq!(record.display_name, "Name c02");
        assert!(matches!(
            catalog.get_by_pk(2),
            Err(CatalogError::RecordNotFound { .. })
        ));
    }

    #[test]
    fn test_build_metadata_from_footer() {
        let dir = TempDir::new().unwrap();
        let options = WriteOptions {
            metadata: Some(BuildMetadata::new(2, "1.2.3").with_source_checksum("00ff")),
            ..WriteOptions::default()
        };
        let catalog = Catalog::open(write(&dir, &sample(1), &options)).unwrap();
        let meta = catalog.build_metadata().unwrap();
        assert_eq!(meta.build_version, "1.2.3");
        assert_eq!(meta.source_checksum.as_deref(), Some("00ff"));

        let info = catalog.info().to_string();
        assert!(info.contains("Records: 1"), "{}", info);
        assert!(info.contains("Build version: 1.2.3"), "{}", info);
    }

    #[test]
    fn test_same_shape_accepts_variable_pairs() {
        let expected = Column::Boundary.data_type();
        let variable = DataType::List(std::sync::Arc::new(arrow_schema::Field::new(
            "element",
            DataType::List(std::sync::Arc::new(arrow_schema::Field::new(
                "element",
                DataType::Float64,
                true,
            ))),
            true,
        )));
        assert!(same_shape(&expected, &variable));
        assert!(!same_shape(&expected, &DataType::Utf8));
    }

    #[test]
    fn test_send_sync() {
        fn _assert_send<T: Send>() {}
        fn _assert_sync<T: Sync>() {}
        _assert_send::<Catalog>();
        _assert_sync::<Catalog>();
    }
}
