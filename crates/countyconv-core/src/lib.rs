//! `countyconv-core` converts zipped county shapefiles into uncompressed
//! Parquet files whose geometry column holds EPSG:4326 WKT.
//!
//! This crate includes:
//! - **Operations**: [`convert`] and [`convert_with_options`], the full
//!   load, reproject, textualize and persist pipeline.
//! - **Reprojection**: [`reproject::Reprojector`], coordinate transforms via `proj4rs`.
//! - **WKT**: geometry serialization and the WKT column builder.
//! - **Errors**: the [`ConvertError`] taxonomy with user-facing messages.
//!
//! ```no_run
//! let summary = countyconv_core::convert("tl_2019_us_county.zip", "tl_2019_us_county.parquet")?;
//! println!("wrote {} rows", summary.rows);
//! # Ok::<(), countyconv_core::ConvertError>(())
//! ```

pub mod error;
pub mod operations;
pub mod reproject;
pub mod types;
pub mod utils;
pub mod wkt;

pub use error::{ConvertError, Result};
pub use operations::{ConvertOptions, convert, convert_with_options};
pub use types::{ConversionSummary, FieldInfo};
