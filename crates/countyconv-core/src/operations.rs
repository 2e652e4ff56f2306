//! County conversion pipeline.
//!
//! [`convert`] loads a zipped shapefile, reprojects its geometries into
//! EPSG:4326, serializes them as WKT and writes an uncompressed Parquet file.
//! The steps run once, in order, on a single in-memory table.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use arrow_array::RecordBatch;
use arrow_schema::{Field, Schema};
use countyconv_core_common::{Crs, WGS84_EPSG};
use log::info;
use parquet_wkt::{ParquetWriterOptions, write_parquet_file};
use shapefile_zip::{ShapefileReadOptions, read_shapefile_archive};

use crate::error::{ConfigError, ConvertError, CrsError, Result, read_error, write_error};
use crate::reproject::Reprojector;
use crate::types::{ConversionSummary, FieldInfo};
use crate::wkt::textualize;

/// Footer and field metadata key holding the geometry CRS.
pub const CRS_METADATA_KEY: &str = "crs";

/// Field metadata key naming the geometry encoding.
pub const ENCODING_METADATA_KEY: &str = "encoding";

/// Options for [`convert_with_options`].
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    /// EPSG code geometries are written in (default: 4326)
    pub target_epsg: u16,
    /// Name of the WKT column (default: "geometry")
    pub geometry_column: String,
    /// Shapefile to read when the archive holds several (default: the first)
    pub layer: Option<String>,
    /// Maximum rows per Parquet row group (default: writer default)
    pub max_row_group_size: Option<usize>,
    /// Record the target CRS in the file and field metadata (default: false)
    pub crs_metadata: bool,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            target_epsg: WGS84_EPSG,
            geometry_column: "geometry".to_string(),
            layer: None,
            max_row_group_size: None,
            crs_metadata: false,
        }
    }
}

impl ConvertOptions {
    /// Create new options with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the target EPSG code
    #[must_use]
    pub fn with_target_epsg(mut self, code: u16) -> Self {
        self.target_epsg = code;
        self
    }

    /// Set the name of the WKT column
    #[must_use]
    pub fn with_geometry_column(mut self, name: impl Into<String>) -> Self {
        self.geometry_column = name.into();
        self
    }

    /// Select the shapefile by layer name
    #[must_use]
    pub fn with_layer(mut self, layer: impl Into<String>) -> Self {
        self.layer = Some(layer.into());
        self
    }

    /// Set the maximum number of rows per row group
    #[must_use]
    pub fn with_max_row_group_size(mut self, rows: usize) -> Self {
        self.max_row_group_size = Some(rows);
        self
    }

    /// Enable or disable CRS metadata in the output
    #[must_use]
    pub fn with_crs_metadata(mut self, enabled: bool) -> Self {
        self.crs_metadata = enabled;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.geometry_column.trim().is_empty() {
            return Err(ConfigError::InvalidOption {
                option: "geometry_column".to_string(),
                message: "column name must not be empty".to_string(),
            }
            .into());
        }
        if self.max_row_group_size == Some(0) {
            return Err(ConfigError::InvalidOption {
                option: "max_row_group_size".to_string(),
                message: "row groups must hold at least one row".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

/// Converts a zipped county shapefile into an uncompressed Parquet file with
/// WKT geometries in EPSG:4326.
///
/// # Arguments
///
/// * `input` - Path to the zip archive holding the shapefile.
/// * `output` - Path of the Parquet file to create or overwrite.
///
/// # Errors
///
/// This function will return an error if:
/// - The archive is missing, corrupt or holds no shapefile.
/// - The dataset has no `.prj` or its CRS is not supported.
/// - A geometry cannot be reprojected or serialized.
/// - The output file cannot be written.
///
/// On error nothing is written at `output`.
pub fn convert(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Result<ConversionSummary> {
    convert_with_options(input, output, &ConvertOptions::default())
}

/// Like [`convert`], with explicit options.
///
/// # Errors
///
/// See [`convert`]; additionally fails with [`ConfigError`] on invalid options.
pub fn convert_with_options(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    options: &ConvertOptions,
) -> Result<ConversionSummary> {
    let input = input.as_ref();
    let output = output.as_ref();
    options.validate()?;

    info!("Starting conversion:");
    info!("Input: {}", input.display());
    info!("Output: {}", output.display());

    let mut read_options = ShapefileReadOptions::new();
    if let Some(layer) = &options.layer {
        read_options = read_options.with_layer(layer.clone());
    }
    let table = read_shapefile_archive(input, &read_options)
        .map_err(|err| read_error("shapefile archive", input, err))?;
    info!("Loaded {} feature(s)", table.num_rows());

    let source_crs = table.crs().cloned().ok_or_else(|| CrsError::Missing {
        path: input.to_path_buf(),
    })?;
    let reprojector = Reprojector::new(&source_crs, options.target_epsg)?;
    let table = reprojector.reproject_table(table)?;
    let target_crs = reprojector.target().clone();

    let null_geometries = table.geometries().iter().filter(|g| g.is_none()).count();
    let mut batch = textualize(&table, &options.geometry_column)?;
    info!(
        "Serialized geometries to WKT column '{}'",
        options.geometry_column
    );

    let mut writer_options = ParquetWriterOptions::new();
    if let Some(rows) = options.max_row_group_size {
        writer_options = writer_options.with_max_row_group_size(rows);
    }
    if options.crs_metadata {
        batch = with_geometry_metadata(batch, &options.geometry_column, &target_crs)?;
        writer_options = writer_options.with_metadata(CRS_METADATA_KEY, target_crs.identifier());
    }

    info!("Writing Parquet file: {}", output.display());
    write_parquet_file(output, batch.schema(), std::slice::from_ref(&batch), &writer_options)
        .map_err(|err| write_error("Parquet", output, err))?;
    info!("Conversion completed successfully");

    Ok(ConversionSummary {
        input: input.to_path_buf(),
        output: output.to_path_buf(),
        rows: batch.num_rows(),
        null_geometries,
        source_crs: source_crs.to_string(),
        target_crs: target_crs.identifier(),
        reprojected: !reprojector.is_identity(),
        geometry_column: options.geometry_column.clone(),
        fields: FieldInfo::from_schema(&batch.schema()),
    })
}

/// Tags the WKT field with the CRS and encoding it holds.
fn with_geometry_metadata(batch: RecordBatch, column: &str, crs: &Crs) -> Result<RecordBatch> {
    let schema = batch.schema();
    let fields: Vec<Field> = schema
        .fields()
        .iter()
        .map(|field| {
            let field = field.as_ref().clone();
            if field.name() == column {
                field.with_metadata(HashMap::from([
                    (CRS_METADATA_KEY.to_string(), crs.identifier()),
                    (ENCODING_METADATA_KEY.to_string(), "WKT".to_string()),
                ]))
            } else {
                field
            }
        })
        .collect();

    batch
        .with_schema(Arc::new(Schema::new_with_metadata(
            fields,
            schema.metadata().clone(),
        )))
        .map_err(|err| ConvertError::Other(anyhow::Error::new(err)))
}
