//! Zipped shapefile reader.
//!
//! Opens a `.zip` archive, locates a shapefile dataset inside it and decodes
//! it into a [`countyconv_core_common::FeatureTable`]: attributes as Arrow
//! columns, shapes as `geo-types` geometries, and the `.prj` as a
//! [`countyconv_core_common::Crs`].
//!
//! ```no_run
//! use shapefile_zip::{ShapefileReadOptions, read_shapefile_archive};
//!
//! let table = read_shapefile_archive("tl_2019_us_county.zip", &ShapefileReadOptions::default())?;
//! println!("{} counties", table.num_rows());
//! # Ok::<(), format_shared::SpatialFormatReadError>(())
//! ```

pub mod archive;
pub mod fields;
#[cfg(any(test, feature = "fixtures"))]
pub mod fixtures;
pub mod geometry;
pub mod reader;

pub use archive::{DatasetMembers, ShapefileArchive};
pub use reader::{ShapefileReadOptions, read_shapefile_archive};
