//! Common types shared across `countyconv` crates.
//!
//! This crate provides the in-memory feature table and CRS descriptor that
//! flow between the shapefile reader, the core pipeline and the Parquet
//! writer, preventing circular dependencies between them.

pub mod crs;
pub mod table;

// Re-export commonly used types
pub use crs::{Crs, WGS84_EPSG};
pub use table::{FeatureTable, FeatureTableError};
