//! Build metadata embedded in the catalog footer.
//!
//! Stored as Parquet key/value metadata under the `constellations.` prefix so
//! a catalog describes its own schema version, build version and source data
//! without relying on the filename.

use chrono::{DateTime, SecondsFormat, Utc};
use parquet::format::KeyValue;

use crate::schema::LEGACY_SCHEMA_VERSION;

const KEY_SCHEMA_VERSION: &str = "constellations.schema_version";
const KEY_BUILD_VERSION: &str = "constellations.build_version";
const KEY_SOURCE_SHA256: &str = "constellations.source_sha256";
const KEY_BUILT_AT: &str = "constellations.built_at";

/// Provenance of one catalog build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildMetadata {
    /// Layout version, see [`crate::schema::SCHEMA_VERSION`].
    pub schema_version: u32,
    /// Version tag of the build, also used in the catalog filename.
    pub build_version: String,
    /// SHA-256 of the properties document the catalog was built from.
    pub source_checksum: Option<String>,
    pub built_at: Option<DateTime<Utc>>,
}

impl BuildMetadata {
    pub fn new(schema_version: u32, build_version: impl Into<String>) -> Self {
        Self {
            schema_version,
            build_version: build_version.into(),
            source_checksum: None,
            built_at: None,
        }
    }

    pub fn with_source_checksum(mut self, checksum: impl Into<String>) -> Self {
        self.source_checksum = Some(checksum.into());
        self
    }

    pub fn with_built_at(mut self, built_at: DateTime<Utc>) -> Self {
        self.built_at = Some(built_at);
        self
    }

    pub(crate) fn to_key_values(&self) -> Vec<KeyValue> {
        let mut kv = vec![
            KeyValue::new(
                KEY_SCHEMA_VERSION.to_string(),
                self.schema_version.to_string(),
            ),
            KeyValue::new(KEY_BUILD_VERSION.to_string(), self.build_version.clone()),
        ];
        if let Some(checksum) = &self.source_checksum {
            kv.push(KeyValue::new(KEY_SOURCE_SHA256.to_string(), checksum.clone()));
        }
        if let Some(built_at) = &self.built_at {
            kv.push(KeyValue::new(
                KEY_BUILT_AT.to_string(),
                built_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            ));
        }
        kv
    }

    /// Recover metadata from footer key/values.
    ///
    /// Returns `None` when the file carries no schema version, i.e. it was not
    /// written by this crate. Catalogs lacking a build version report `""`.
    pub(crate) fn from_key_values(kv: &[KeyValue]) -> Option<Self> {
        let lookup = |key: &str| {
            kv.iter()
                .find(|entry| entry.key == key)
                .and_then(|entry| entry.value.clone())
        };
        let schema_version = lookup(KEY_SCHEMA_VERSION)?
            .parse()
            .unwrap_or(LEGACY_SCHEMA_VERSION);
        Some(Self {
            schema_version,
            build_version: lookup(KEY_BUILD_VERSION).unwrap_or_default(),
            source_checksum: lookup(KEY_SOURCE_SHA256),
            built_at: lookup(KEY_BUILT_AT)
                .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
                .map(|dt| dt.with_timezone(&Utc)),
        })
    }
}
