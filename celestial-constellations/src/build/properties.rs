//! Constellation properties ingestion.
//!
//! The properties document is one JSON object keyed by constellation id:
//!
//! ```json
//! {
//!   "cma": {
//!     "name": "Canis Major",
//!     "ra": 105.0,
//!     "dec": -22.0,
//!     "hip_lines": [[32349, 33160], [33160, 34045]]
//!   }
//! }
//! ```
//!
//! Document order is preserved (serde_json's `preserve_order` map), since it
//! fixes the primary keys assigned later.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::error::{CatalogError, CatalogResult};

/// Metadata bundle for one constellation.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ConstellationProperties {
    pub name: String,
    pub ra: f64,
    pub dec: f64,
    /// Hipparcos id pairs, one per drawn line segment.
    pub hip_lines: Vec<[u32; 2]>,
}

/// Constellation ids with their properties, in document order.
pub type PropertyEntries = Vec<(String, ConstellationProperties)>;

/// The properties document as read for one build: its entries and the
/// checksum of the exact bytes they were parsed from.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertiesDocument {
    pub entries: PropertyEntries,
    /// SHA-256 hex digest, recorded in build metadata.
    pub checksum: String,
}

/// Read the properties document once, parsing and hashing the same bytes.
///
/// # Errors
/// - [`CatalogError::CatalogSourceUnavailable`] if the file cannot be read
/// - [`CatalogError::MalformedMetadata`] if the document is not UTF-8 JSON
///   object text, or an entry lacks or mistypes `name`, `ra`, `dec` or
///   `hip_lines`
pub fn read_properties(path: &Path) -> CatalogResult<PropertiesDocument> {
    let bytes = fs::read(path).map_err(|source| CatalogError::CatalogSourceUnavailable {
        path: path.to_path_buf(),
        source,
    })?;
    let content = std::str::from_utf8(&bytes).map_err(|e| {
        CatalogError::malformed_metadata("<document>", &format!("not UTF-8: {}", e))
    })?;
    Ok(PropertiesDocument {
        entries: parse_properties(content)?,
        checksum: source_checksum(&bytes),
    })
}

/// Load the properties document, keyed by constellation id in document order.
///
/// # Errors
/// See [`read_properties`].
pub fn load_properties(path: &Path) -> CatalogResult<PropertyEntries> {
    read_properties(path).map(|document| document.entries)
}

/// Parse a properties document already in memory. See [`load_properties`].
pub fn parse_properties(content: &str) -> CatalogResult<PropertyEntries> {
    let document: Map<String, Value> = serde_json::from_str(content).map_err(|e| {
        CatalogError::malformed_metadata("<document>", &format!("expected a JSON object: {}", e))
    })?;

    document
        .into_iter()
        .map(|(constellation_id, entry)| {
            let props: ConstellationProperties = serde_json::from_value(entry).map_err(|e| {
                CatalogError::malformed_metadata(&constellation_id, &e.to_string())
            })?;
            Ok((constellation_id, props))
        })
        .collect()
}

/// Every distinct star id appearing in `pairs`.
pub fn derive_star_ids(pairs: &[[u32; 2]]) -> BTreeSet<u32> {
    pairs.iter().flatten().copied().collect()
}

/// SHA-256 hex digest of raw properties bytes.
pub fn source_checksum(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}
