//! The constellation record, the unit stored in a catalog.
//!
//! Records are built once per source constellation during a build and never
//! mutated afterwards. The same type comes back out of
//! [`Catalog`](crate::query::Catalog) lookups.

use std::collections::{BTreeSet, HashSet};

/// A constellation's sky region as a closed polygon over `(ra, dec)` degrees.
///
/// Stored as an open vertex sequence in source order; the closing edge back
/// to the first vertex is implicit. A closed input ring (last vertex equal to
/// the first) is accepted and opened on construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Boundary {
    vertices: Vec<(f64, f64)>,
}

impl Boundary {
    /// Build a boundary from vertices in file order.
    ///
    /// No validity checks are made; use [`distinct_vertex_count`] first if the
    /// input may be degenerate.
    pub fn from_vertices(mut vertices: Vec<(f64, f64)>) -> Self {
        if vertices.len() > 1 && vertices.first() == vertices.last() {
            vertices.pop();
        }
        Self { vertices }
    }

    /// Vertices in order, without the closing repeat of the first vertex.
    pub fn vertices(&self) -> &[(f64, f64)] {
        &self.vertices
    }

    /// The closed ring: vertices followed by the first vertex again.
    pub fn ring(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.vertices
            .iter()
            .chain(self.vertices.first())
            .copied()
    }

    /// Number of ring points, closing vertex included.
    pub fn ring_len(&self) -> usize {
        if self.vertices.is_empty() {
            0
        } else {
            self.vertices.len() + 1
        }
    }
}

/// Number of distinct `(ra, dec)` pairs, compared bit-exactly.
pub fn distinct_vertex_count(vertices: &[(f64, f64)]) -> usize {
    vertices
        .iter()
        .map(|(ra, dec)| (ra.to_bits(), dec.to_bits()))
        .collect::<HashSet<_>>()
        .len()
}

/// One normalized constellation row.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstellationRecord {
    /// Surrogate key, 1-based position in build order. `None` when read from a
    /// catalog whose schema predates the `pk` column.
    pub primary_key: Option<u64>,
    /// Human-readable name, e.g. "Canis Major".
    pub display_name: String,
    /// Label position right ascension, in degrees.
    pub center_ra: f64,
    /// Label position declination, in degrees.
    pub center_dec: f64,
    /// IAU code, unique within a catalog.
    pub iau_id: String,
    /// Source identifier the record was built from.
    pub constellation_id: String,
    /// Every distinct Hipparcos id referenced by `star_hip_lines`.
    pub star_hip_ids: BTreeSet<u32>,
    /// Connecting-line pairs in source order.
    pub star_hip_lines: Vec<[u32; 2]>,
    pub boundary: Boundary,
}
