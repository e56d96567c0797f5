//! Chunked Parquet writer for constellation records.
//!
//! Records are pulled one at a time from the producer and buffered into chunks
//! of at most `chunk_size`. Each chunk becomes one Arrow [`RecordBatch`]
//! restricted to the configured [`CatalogSchema`], is written, and flushed, so
//! row groups never span chunks and are further bounded by `row_group_size`.
//!
//! Output goes to `<destination>.tmp` and is renamed into place only once the
//! file has been closed. If any record fails to build, or the engine reports
//! an error, the temporary file is removed and nothing appears at
//! `destination`.

use std::cmp::Ordering;
use std::fmt;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use arrow_array::builder::{
    FixedSizeListBuilder, Float64Builder, ListBuilder, UInt32Builder,
};
use arrow_array::{ArrayRef, Float64Array, RecordBatch, StringArray, UInt64Array};
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression as ParquetCompression, GzipLevel, ZstdLevel};
use parquet::file::properties::WriterProperties;
use parquet::format::SortingColumn;
use tracing::{debug, info};

use crate::error::{CatalogError, CatalogResult};
use crate::metadata::BuildMetadata;
use crate::record::ConstellationRecord;
use crate::schema::{
    coordinate_field, hip_id_field, hip_pair_field, vertex_field, CatalogSchema, Column,
};

pub const DEFAULT_CHUNK_SIZE: usize = 100;
pub const DEFAULT_ROW_GROUP_SIZE: usize = 100;
const DEFAULT_ZSTD_LEVEL: i32 = 3;
const DEFAULT_GZIP_LEVEL: u32 = 6;

/// Page compression codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
    #[default]
    None,
    Snappy,
    Zstd(i32),
    Gzip(u32),
}

impl Compression {
    fn to_parquet(self) -> CatalogResult<ParquetCompression> {
        let invalid = |e: parquet::errors::ParquetError| {
            CatalogError::InvalidOptions(format!("compression {}: {}", self, e))
        };
        Ok(match self {
            Compression::None => ParquetCompression::UNCOMPRESSED,
            Compression::Snappy => ParquetCompression::SNAPPY,
            Compression::Zstd(level) => {
                ParquetCompression::ZSTD(ZstdLevel::try_new(level).map_err(invalid)?)
            }
            Compression::Gzip(level) => {
                ParquetCompression::GZIP(GzipLevel::try_new(level).map_err(invalid)?)
            }
        })
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Compression::None => write!(f, "none"),
            Compression::Snappy => write!(f, "snappy"),
            Compression::Zstd(level) => write!(f, "zstd:{}", level),
            Compression::Gzip(level) => write!(f, "gzip:{}", level),
        }
    }
}

impl FromStr for Compression {
    type Err = CatalogError;

    /// Accepts `none`, `uncompressed`, `snappy`, `zstd[:level]`, `gzip[:level]`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        let (codec, level) = match lower.split_once(':') {
            Some((codec, level)) => (codec, Some(level)),
            None => (lower.as_str(), None),
        };
        let bad_level = || CatalogError::InvalidOptions(format!("invalid compression level in '{}'", s));
        match (codec, level) {
            ("none" | "uncompressed", None) => Ok(Compression::None),
            ("snappy", None) => Ok(Compression::Snappy),
            ("zstd", None) => Ok(Compression::Zstd(DEFAULT_ZSTD_LEVEL)),
            ("zstd", Some(l)) => l.parse().map(Compression::Zstd).map_err(|_| bad_level()),
            ("gzip", None) => Ok(Compression::Gzip(DEFAULT_GZIP_LEVEL)),
            ("gzip", Some(l)) => l.parse().map(Compression::Gzip).map_err(|_| bad_level()),
            _ => Err(CatalogError::InvalidOptions(format!(
                "unknown compression '{}'",
                s
            ))),
        }
    }
}

/// How records are laid out in the catalog file.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteOptions {
    /// Records buffered per batch; each chunk is flushed before the next.
    pub chunk_size: usize,
    /// Persisted columns, in file order. Record fields not listed are dropped.
    pub schema: CatalogSchema,
    /// Per-row-group ordering hints. Rows must already be in this order.
    pub sorting_columns: Vec<Column>,
    pub compression: Compression,
    /// Upper bound on rows per row group.
    pub row_group_size: usize,
    /// Footer metadata. When `None`, only the schema version is recorded.
    pub metadata: Option<BuildMetadata>,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            schema: CatalogSchema::canonical(),
            sorting_columns: Vec::new(),
            compression: Compression::None,
            row_group_size: DEFAULT_ROW_GROUP_SIZE,
            metadata: None,
        }
    }
}

impl WriteOptions {
    /// Check option consistency before any file is created.
    pub fn validate(&self) -> CatalogResult<()> {
        if self.chunk_size == 0 {
            return Err(CatalogError::InvalidOptions(
                "chunk_size must be positive".into(),
            ));
        }
        if self.row_group_size == 0 {
            return Err(CatalogError::InvalidOptions(
                "row_group_size must be positive".into(),
            ));
        }
        for column in &self.sorting_columns {
            if !self.schema.contains(*column) {
                return Err(CatalogError::InvalidOptions(format!(
                    "sorting column '{}' is not in the schema",
                    column
                )));
            }
            if sort_key(column, None).is_none() {
                return Err(CatalogError::InvalidOptions(format!(
                    "sorting column '{}' is not a scalar column",
                    column
                )));
            }
        }
        self.compression.to_parquet()?;
        Ok(())
    }

    fn writer_properties(&self) -> CatalogResult<WriterProperties> {
        let metadata = self
            .metadata
            .clone()
            .unwrap_or_else(|| BuildMetadata::new(self.schema.version(), ""));

        let mut builder = WriterProperties::builder()
            .set_compression(self.compression.to_parquet()?)
            .set_max_row_group_size(self.row_group_size)
            .set_key_value_metadata(Some(metadata.to_key_values()));

        if !self.sorting_columns.is_empty() {
            // Every catalog column has exactly one leaf, so the root position
            // is also the leaf index Parquet expects.
            let sorting = self
                .sorting_columns
                .iter()
                .filter_map(|c| self.schema.position(*c))
                .map(|idx| SortingColumn::new(idx as i32, false, false))
                .collect();
            builder = builder.set_sorting_columns(Some(sorting));
        }
        Ok(builder.build())
    }
}

/// Outcome of a successful write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteSummary {
    pub path: PathBuf,
    pub rows: usize,
    pub chunks: usize,
    pub row_groups: usize,
}

/// Stream `records` into a new catalog at `destination`.
///
/// Stops at the first `Err` from the producer and returns it; in that case no
/// file is left at `destination` by this call. A file already present there
/// from an earlier build is only replaced when this write succeeds.
pub fn write_catalog<I>(
    records: I,
    destination: &Path,
    options: &WriteOptions,
) -> CatalogResult<WriteSummary>
where
    I: IntoIterator<Item = CatalogResult<ConstellationRecord>>,
{
    options.validate()?;
    if let Some(parent) = destination.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }

    let temp_path = temp_path_for(destination);
    match write_to_file(records, &temp_path, options) {
        Ok((rows, chunks, row_groups)) => {
            if let Err(err) = fs::rename(&temp_path, destination) {
                let _ = fs::remove_file(&temp_path);
                return Err(err.into());
            }
            info!(
                rows,
                chunks,
                row_groups,
                compression = %options.compression,
                "wrote catalog {:?}",
                destination
            );
            Ok(WriteSummary {
                path: destination.to_path_buf(),
                rows,
                chunks,
                row_groups,
            })
        }
        Err(err) => {
            if temp_path.exists() {
                let _ = fs::remove_file(&temp_path);
            }
            Err(err)
        }
    }
}

fn temp_path_for(destination: &Path) -> PathBuf {
    let mut name = destination.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

fn write_to_file<I>(
    records: I,
    path: &Path,
    options: &WriteOptions,
) -> CatalogResult<(usize, usize, usize)>
where
    I: IntoIterator<Item = CatalogResult<ConstellationRecord>>,
{
    let file = File::create(path)?;
    let mut writer = ArrowWriter::try_new(
        file,
        options.schema.arrow_schema(),
        Some(options.writer_properties()?),
    )?;

    let mut chunk: Vec<ConstellationRecord> = Vec::with_capacity(options.chunk_size);
    let mut rows = 0;
    let mut chunks = 0;
    for record in records {
        chunk.push(record?);
        if chunk.len() == options.chunk_size {
            write_chunk(&mut writer, &chunk, options, chunks)?;
            rows += chunk.len();
            chunks += 1;
            chunk.clear();
        }
    }
    if !chunk.is_empty() {
        write_chunk(&mut writer, &chunk, options, chunks)?;
        rows += chunk.len();
        chunks += 1;
    }

    let row_groups = writer.flushed_row_groups().len();
    writer.close()?;
    Ok((rows, chunks, row_groups))
}

fn write_chunk(
    writer: &mut ArrowWriter<File>,
    chunk: &[ConstellationRecord],
    options: &WriteOptions,
    index: usize,
) -> CatalogResult<()> {
    check_sorted(chunk, &options.sorting_columns)?;
    let batch = records_to_batch(chunk, &options.schema)?;
    writer.write(&batch)?;
    writer.flush()?;
    debug!(chunk = index, rows = chunk.len(), "flushed chunk");
    Ok(())
}

/// Convert records to one batch holding exactly the columns of `schema`.
pub fn records_to_batch(
    records: &[ConstellationRecord],
    schema: &CatalogSchema,
) -> CatalogResult<RecordBatch> {
    let columns = schema
        .columns()
        .iter()
        .map(|column| column_array(*column, records))
        .collect::<CatalogResult<Vec<ArrayRef>>>()?;
    Ok(RecordBatch::try_new(schema.arrow_schema(), columns)?)
}

fn column_array(column: Column, records: &[ConstellationRecord]) -> CatalogResult<ArrayRef> {
    let array: ArrayRef = match column {
        Column::Pk => {
            let keys = records
                .iter()
                .map(|r| {
                    r.primary_key.ok_or_else(|| {
                        CatalogError::InvalidOptions(format!(
                            "record '{}' has no primary key but the schema has a pk column",
                            r.iau_id
                        ))
                    })
                })
                .collect::<CatalogResult<Vec<u64>>>()?;
            Arc::new(UInt64Array::from(keys))
        }
        Column::Name => Arc::new(StringArray::from_iter_values(
            records.iter().map(|r| r.display_name.as_str()),
        )),
        Column::Ra => Arc::new(Float64Array::from_iter_values(
            records.iter().map(|r| r.center_ra),
        )),
        Column::Dec => Arc::new(Float64Array::from_iter_values(
            records.iter().map(|r| r.center_dec),
        )),
        Column::IauId => Arc::new(StringArray::from_iter_values(
            records.iter().map(|r| r.iau_id.as_str()),
        )),
        Column::ConstellationId => Arc::new(StringArray::from_iter_values(
            records.iter().map(|r| r.constellation_id.as_str()),
        )),
        Column::StarHipIds => {
            let mut builder = ListBuilder::new(UInt32Builder::new()).with_field(hip_id_field());
            for record in records {
                for id in &record.star_hip_ids {
                    builder.values().append_value(*id);
                }
                builder.append(true);
            }
            Arc::new(builder.finish())
        }
        Column::StarHipLines => {
            let pairs = FixedSizeListBuilder::new(UInt32Builder::new(), 2).with_field(hip_id_field());
            let mut builder = ListBuilder::new(pairs).with_field(hip_pair_field());
            for record in records {
                for [a, b] in &record.star_hip_lines {
                    let pair = builder.values();
                    pair.values().append_value(*a);
                    pair.values().append_value(*b);
                    pair.append(true);
                }
                builder.append(true);
            }
            Arc::new(builder.finish())
        }
        Column::Boundary => {
            let vertices =
                FixedSizeListBuilder::new(Float64Builder::new(), 2).with_field(coordinate_field());
            let mut builder = ListBuilder::new(vertices).with_field(vertex_field());
            for record in records {
                for (ra, dec) in record.boundary.ring() {
                    let vertex = builder.values();
                    vertex.values().append_value(ra);
                    vertex.values().append_value(dec);
                    vertex.append(true);
                }
                builder.append(true);
            }
            Arc::new(builder.finish())
        }
    };
    Ok(array)
}

#[derive(Debug, PartialEq, PartialOrd)]
enum SortKey<'a> {
    Int(u64),
    Float(f64),
    Text(&'a str),
}

/// Comparable value of a scalar column; `None` for list columns.
///
/// With no record, reports whether the column is sortable at all.
fn sort_key<'a>(column: &Column, record: Option<&'a ConstellationRecord>) -> Option<SortKey<'a>> {
    let key = match (column, record) {
        (Column::Pk, Some(r)) => SortKey::Int(r.primary_key.unwrap_or(0)),
        (Column::Name, Some(r)) => SortKey::Text(&r.display_name),
        (Column::Ra, Some(r)) => SortKey::Float(r.center_ra),
        (Column::Dec, Some(r)) => SortKey::Float(r.center_dec),
        (Column::IauId, Some(r)) => SortKey::Text(&r.iau_id),
        (Column::ConstellationId, Some(r)) => SortKey::Text(&r.constellation_id),
        (Column::Pk | Column::Name | Column::IauId | Column::ConstellationId, None) => {
            SortKey::Int(0)
        }
        (Column::Ra | Column::Dec, None) => SortKey::Float(0.0),
        (Column::StarHipIds | Column::StarHipLines | Column::Boundary, _) => return None,
    };
    Some(key)
}

fn compare_rows(a: &ConstellationRecord, b: &ConstellationRecord, columns: &[Column]) -> Ordering {
    for column in columns {
        let ord = sort_key(column, Some(a))
            .partial_cmp(&sort_key(column, Some(b)))
            .unwrap_or(Ordering::Equal);
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

/// Row groups never span chunks, so ordering within each chunk is what the
/// declared sorting hints promise.
fn check_sorted(chunk: &[ConstellationRecord], columns: &[Column]) -> CatalogResult<()> {
    if columns.is_empty() {
        return Ok(());
    }
    for pair in chunk.windows(2) {
        if compare_rows(&pair[0], &pair[1], columns) == Ordering::Greater {
            let names: Vec<&str> = columns.iter().map(|c| c.name()).collect();
            return Err(CatalogError::InvalidOptions(format!(
                "rows '{}' and '{}' are not ordered by [{}]",
                pair[0].iau_id,
                pair[1].iau_id,
                names.join(", ")
            )));
        }
    }
    Ok(())
}
