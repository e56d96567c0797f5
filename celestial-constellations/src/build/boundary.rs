//! Boundary file ingestion.
//!
//! Each constellation has one text file, `<id>.txt`, under the boundary
//! directory. Data lines are pipe-delimited:
//!
//! ```text
//! 06 12 37.0421| -11.0254459|CMA
//! ```
//!
//! Field 1 is right ascension (`H M S`), field 2 declination in decimal
//! degrees, anything after is ignored. Lines without a `|` (headers, blank
//! lines) are skipped.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use tracing::debug;

use super::coords::{parse_declination, parse_right_ascension};
use crate::error::{CatalogError, CatalogResult};
use crate::record::{distinct_vertex_count, Boundary};

const FIELD_DELIMITER: char = '|';
const MIN_FIELDS: usize = 3;
const MIN_VERTICES: usize = 3;

/// Directory of per-constellation boundary files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundarySource {
    dir: PathBuf,
}

impl BoundarySource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, constellation_id: &str) -> PathBuf {
        self.dir.join(format!("{}.txt", constellation_id))
    }
}

/// Read and assemble the boundary polygon for one constellation.
///
/// # Errors
/// - [`CatalogError::BoundarySourceMissing`] if `<id>.txt` does not exist
/// - [`CatalogError::InsufficientVertices`] if fewer than 3 distinct vertices remain
/// - [`CatalogError::MalformedCoordinate`] for unparseable data lines
pub fn assemble_boundary(source: &BoundarySource, constellation_id: &str) -> CatalogResult<Boundary> {
    let path = source.path_for(constellation_id);
    if !path.is_file() {
        return Err(CatalogError::BoundarySourceMissing {
            constellation_id: constellation_id.to_string(),
            path,
        });
    }
    let file = File::open(&path)?;
    let boundary = parse_boundary(constellation_id, BufReader::new(file))?;
    debug!(
        constellation = constellation_id,
        vertices = boundary.vertices().len(),
        "assembled boundary from {:?}",
        path
    );
    Ok(boundary)
}

/// Parse boundary lines from any reader. See [`assemble_boundary`].
pub fn parse_boundary<R: BufRead>(constellation_id: &str, reader: R) -> CatalogResult<Boundary> {
    let mut vertices = Vec::new();
    for (line_num, line) in reader.lines().enumerate() {
        let line = line?;
        if let Some(vertex) = parse_boundary_line(constellation_id, line_num + 1, &line)? {
            vertices.push(vertex);
        }
    }

    let found = distinct_vertex_count(&vertices);
    if found < MIN_VERTICES {
        return Err(CatalogError::InsufficientVertices {
            constellation_id: constellation_id.to_string(),
            found,
        });
    }
    Ok(Boundary::from_vertices(vertices))
}

fn parse_boundary_line(
    constellation_id: &str,
    line_num: usize,
    line: &str,
) -> CatalogResult<Option<(f64, f64)>> {
    if !line.contains(FIELD_DELIMITER) {
        return Ok(None);
    }
    let fields: Vec<&str> = line.split(FIELD_DELIMITER).collect();
    if fields.len() < MIN_FIELDS {
        return Err(CatalogError::malformed_coordinate(
            line,
            &format!(
                "{} line {}: expected at least {} '|' separated fields, found {}",
                constellation_id,
                line_num,
                MIN_FIELDS,
                fields.len()
            ),
        ));
    }
    let ra = parse_right_ascension(fields[0]).map_err(|e| in_line(e, constellation_id, line_num))?;
    let dec = parse_declination(fields[1]).map_err(|e| in_line(e, constellation_id, line_num))?;
    Ok(Some((ra, dec)))
}

fn in_line(err: CatalogError, constellation_id: &str, line_num: usize) -> CatalogError {
    match err {
        CatalogError::MalformedCoordinate { input, reason } => CatalogError::MalformedCoordinate {
            input,
            reason: format!("{} line {}: {}", constellation_id, line_num, reason),
        },
        other => other,
    }
}
