//! Read access to finished constellation catalogs.
//!
//! - [`catalog`]: open a catalog file, stream its records, look records up by
//!   IAU identifier or primary key

pub mod catalog;

pub use catalog::{Catalog, CatalogInfo, CatalogIter};
