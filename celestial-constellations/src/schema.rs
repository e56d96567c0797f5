//! Column schema shared by the catalog writer and reader.
//!
//! The catalog layout is defined once, here, as an ordered list of named
//! [`Column`]s. The writer persists exactly the columns of its
//! [`CatalogSchema`] in that order; the reader resolves columns by name, so a
//! catalog written with a narrower schema (for example [`CatalogSchema::legacy`],
//! which predates the `pk` column) still opens.
//!
//! | Column | Arrow type |
//! |--------|------------|
//! | `pk` | `UInt64` |
//! | `name` | `Utf8` |
//! | `ra` | `Float64` |
//! | `dec` | `Float64` |
//! | `iau_id` | `Utf8` |
//! | `constellation_id` | `Utf8` |
//! | `star_hip_ids` | `List<UInt32>` |
//! | `star_hip_lines` | `List<FixedSizeList<UInt32, 2>>` |
//! | `boundary` | `List<FixedSizeList<Float64, 2>>` |

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use arrow_schema::{DataType, Field, Schema, SchemaRef};

use crate::error::{CatalogError, CatalogResult};

/// Schema version written by catalogs that carry the `pk` column.
pub const SCHEMA_VERSION: u32 = 2;
/// Schema version of catalogs written without `pk`.
pub const LEGACY_SCHEMA_VERSION: u32 = 1;

/// Name of the list item fields used inside nested columns.
pub(crate) const ITEM_FIELD: &str = "item";

/// One named catalog column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Pk,
    Name,
    Ra,
    Dec,
    IauId,
    ConstellationId,
    StarHipIds,
    StarHipLines,
    Boundary,
}

impl Column {
    /// All columns in canonical order.
    pub const ALL: [Column; 9] = [
        Column::Pk,
        Column::Name,
        Column::Ra,
        Column::Dec,
        Column::IauId,
        Column::ConstellationId,
        Column::StarHipIds,
        Column::StarHipLines,
        Column::Boundary,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Column::Pk => "pk",
            Column::Name => "name",
            Column::Ra => "ra",
            Column::Dec => "dec",
            Column::IauId => "iau_id",
            Column::ConstellationId => "constellation_id",
            Column::StarHipIds => "star_hip_ids",
            Column::StarHipLines => "star_hip_lines",
            Column::Boundary => "boundary",
        }
    }

    pub fn data_type(self) -> DataType {
        match self {
            Column::Pk => DataType::UInt64,
            Column::Name | Column::IauId | Column::ConstellationId => DataType::Utf8,
            Column::Ra | Column::Dec => DataType::Float64,
            Column::StarHipIds => DataType::List(hip_id_field()),
            Column::StarHipLines => DataType::List(hip_pair_field()),
            Column::Boundary => DataType::List(vertex_field()),
        }
    }

    pub fn field(self) -> Field {
        Field::new(self.name(), self.data_type(), false)
    }

    /// Whether a reader needs this column to rebuild a full record.
    ///
    /// Only `pk` is optional: it was introduced after the first schema version.
    pub fn is_required(self) -> bool {
        self != Column::Pk
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Column {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Column::ALL
            .into_iter()
            .find(|c| c.name() == s)
            .ok_or_else(|| CatalogError::InvalidOptions(format!("unknown column '{}'", s)))
    }
}

pub(crate) fn hip_id_field() -> Arc<Field> {
    Arc::new(Field::new(ITEM_FIELD, DataType::UInt32, false))
}

pub(crate) fn hip_pair_field() -> Arc<Field> {
    Arc::new(Field::new(
        ITEM_FIELD,
        DataType::FixedSizeList(hip_id_field(), 2),
        false,
    ))
}

pub(crate) fn coordinate_field() -> Arc<Field> {
    Arc::new(Field::new(ITEM_FIELD, DataType::Float64, false))
}

pub(crate) fn vertex_field() -> Arc<Field> {
    Arc::new(Field::new(
        ITEM_FIELD,
        DataType::FixedSizeList(coordinate_field(), 2),
        false,
    ))
}

/// Ordered, duplicate-free set of columns persisted in a catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogSchema {
    columns: Vec<Column>,
}

impl CatalogSchema {
    /// Build a schema from an ordered column list.
    ///
    /// # Errors
    /// [`CatalogError::InvalidOptions`] if the list is empty or repeats a column.
    pub fn new(columns: Vec<Column>) -> CatalogResult<Self> {
        if columns.is_empty() {
            return Err(CatalogError::InvalidOptions(
                "schema must contain at least one column".into(),
            ));
        }
        for (i, column) in columns.iter().enumerate() {
            if columns[..i].contains(column) {
                return Err(CatalogError::InvalidOptions(format!(
                    "column '{}' listed twice",
                    column
                )));
            }
        }
        Ok(Self { columns })
    }

    /// Every column, `pk` first.
    pub fn canonical() -> Self {
        Self {
            columns: Column::ALL.to_vec(),
        }
    }

    /// The original column set, before `pk` was introduced.
    pub fn legacy() -> Self {
        Self {
            columns: Column::ALL
                .into_iter()
                .filter(|c| *c != Column::Pk)
                .collect(),
        }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn contains(&self, column: Column) -> bool {
        self.columns.contains(&column)
    }

    /// Position of `column` in this schema, which is also its root index in
    /// the written file.
    pub fn position(&self, column: Column) -> Option<usize> {
        self.columns.iter().position(|c| *c == column)
    }

    pub fn version(&self) -> u32 {
        if self.contains(Column::Pk) {
            SCHEMA_VERSION
        } else {
            LEGACY_SCHEMA_VERSION
        }
    }

    pub fn arrow_schema(&self) -> SchemaRef {
        let fields: Vec<Field> = self.columns.iter().map(|c| c.field()).collect();
        Arc::new(Schema::new(fields))
    }
}

impl Default for CatalogSchema {
    fn default() -> Self {
        Self::canonical()
    }
}
