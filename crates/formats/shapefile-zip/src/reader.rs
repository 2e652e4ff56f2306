//! Reads a zipped shapefile dataset into a [`FeatureTable`].

use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

use arrow_schema::Schema;
use countyconv_core_common::{Crs, FeatureTable};
use format_shared::{SourcePosition, SpatialFormatReadError, SpatialFormatResult};
use geo_types::Geometry;
use log::{debug, info, warn};
use shapefile::dbase;

use crate::archive::{DatasetMembers, ShapefileArchive};
use crate::fields::{AttributeDecoder, FieldSpec};
use crate::geometry::shape_to_geometry;

/// Options for reading a shapefile out of a zip archive.
#[derive(Debug, Clone, Default)]
pub struct ShapefileReadOptions {
    /// Dataset to read when the archive holds several (default: the first)
    pub layer: Option<String>,
}

impl ShapefileReadOptions {
    /// Create new reader options with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Select the dataset by layer name (the `.shp` stem)
    #[must_use]
    pub fn with_layer(mut self, layer: impl Into<String>) -> Self {
        self.layer = Some(layer.into());
        self
    }
}

/// Read the selected shapefile dataset of a zip archive.
///
/// Attributes are decoded in `.dbf` field order; the CRS is taken from the
/// `.prj` member when present.
///
/// # Errors
///
/// Returns an error if the archive is missing or corrupt, the requested
/// layer does not exist, the `.dbf` member is missing, or any shape or
/// record cannot be decoded.
pub fn read_shapefile_archive(
    path: impl AsRef<Path>,
    options: &ShapefileReadOptions,
) -> SpatialFormatResult<FeatureTable> {
    let mut archive = ShapefileArchive::open(path)?;
    let context = archive.path().display().to_string();

    let members = select_dataset(&archive, options)
        .map_err(|err| err.with_additional_context(context.clone()))?;
    info!("Reading layer '{}' from {context}", members.layer);

    let dbf_name = members
        .dbf
        .clone()
        .ok_or_else(|| SpatialFormatReadError::Archive {
            message: format!("Layer '{}' has no .dbf attribute member", members.layer),
            context: Some(context.clone()),
        })?;
    if members.shx.is_none() {
        warn!("Layer '{}' has no .shx index member", members.layer);
    }

    let crs = match &members.prj {
        Some(prj) => {
            let crs = Crs::from_prj(&archive.read_text_member(prj)?);
            debug!("Layer CRS: {crs}");
            Some(crs)
        },
        None => {
            warn!("Layer '{}' has no .prj member; CRS is unknown", members.layer);
            None
        },
    };
    if let Some(cpg) = &members.cpg {
        debug!("Layer code page: {}", archive.read_text_member(cpg)?);
    }

    let shp_bytes = archive.read_member(&members.shp)?;
    let dbf_bytes = archive.read_member(&dbf_name)?;

    let dbf_reader = dbase::Reader::new(Cursor::new(dbf_bytes.as_slice())).map_err(|err| {
        SpatialFormatReadError::Parse {
            message: format!("Invalid dBASE header: {err}"),
            position: Some(SourcePosition {
                member: Some(dbf_name.clone()),
                ..SourcePosition::default()
            }),
            context: Some(context.clone()),
        }
    })?;
    let field_specs = FieldSpec::from_header(dbf_reader.fields(), &dbf_bytes);
    debug!(
        "Attribute fields: {}",
        field_specs
            .iter()
            .map(|spec| format!("{} ({:?}, {} decimals)", spec.name, spec.field_type, spec.decimals))
            .collect::<Vec<_>>()
            .join(", ")
    );

    let shape_reader = shapefile::ShapeReader::new(Cursor::new(shp_bytes)).map_err(|err| {
        SpatialFormatReadError::Parse {
            message: format!("Invalid shapefile header: {err}"),
            position: Some(SourcePosition {
                member: Some(members.shp.clone()),
                ..SourcePosition::default()
            }),
            context: Some(context.clone()),
        }
    })?;
    let mut reader = shapefile::Reader::new(shape_reader, dbf_reader);

    let mut geometries: Vec<Option<Geometry<f64>>> = Vec::new();
    let mut records = Vec::new();
    for (index, item) in reader.iter_shapes_and_records().enumerate() {
        let record_number = index as u64 + 1;
        let (shape, record) = item.map_err(|err| SpatialFormatReadError::Parse {
            message: err.to_string(),
            position: Some(SourcePosition::record(&members.shp, record_number)),
            context: Some(context.clone()),
        })?;
        let geometry = shape_to_geometry(shape, || {
            SourcePosition::record(&members.shp, record_number)
        })
        .map_err(|err| err.with_additional_context(context.clone()))?;

        geometries.push(geometry);
        records.push(record);
    }

    let (fields, columns) = AttributeDecoder::new(&dbf_name, &field_specs)
        .decode(&records)
        .map_err(|err| err.with_additional_context(context.clone()))?;

    let null_shapes = geometries.iter().filter(|g| g.is_none()).count();
    info!(
        "Read {} feature(s) with {} attribute field(s) ({null_shapes} null shape(s))",
        geometries.len(),
        fields.len()
    );

    FeatureTable::from_columns(Arc::new(Schema::new(fields)), columns, geometries, crs).map_err(
        |err| SpatialFormatReadError::Schema {
            message: err.to_string(),
            context: Some(context),
        },
    )
}

fn select_dataset(
    archive: &ShapefileArchive,
    options: &ShapefileReadOptions,
) -> SpatialFormatResult<DatasetMembers> {
    let datasets = archive.datasets();
    match &options.layer {
        Some(layer) => archive.dataset(layer).cloned().ok_or_else(|| {
            let available = datasets
                .iter()
                .map(|d| d.layer.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            SpatialFormatReadError::Archive {
                message: format!("Layer '{layer}' not found. Available layers: {available}"),
                context: None,
            }
        }),
        None => {
            if datasets.len() > 1 {
                warn!(
                    "Archive holds {} shapefiles; reading the first ('{}')",
                    datasets.len(),
                    datasets[0].layer
                );
            }
            datasets
                .first()
                .cloned()
                .ok_or_else(|| SpatialFormatReadError::Archive {
                    message: "No shapefile (.shp) found in archive".to_string(),
                    context: None,
                })
        },
    }
}
