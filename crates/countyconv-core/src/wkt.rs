//! Geometry to Well-Known Text serialization.

use std::sync::Arc;

use arrow_array::{ArrayRef, RecordBatch, StringArray};
use arrow_schema::{DataType, Field, Schema};
use countyconv_core_common::FeatureTable;
use geo_types::Geometry;
use geozero::wkt::Wkt;
use geozero::{ToGeo, ToWkt};
use log::debug;

use crate::error::{ConfigError, ConvertError, FormatError, Result};

/// Serialize a geometry as WKT.
///
/// # Errors
///
/// Returns [`FormatError::InvalidGeometry`] if the writer rejects the geometry.
pub fn geometry_to_wkt(geometry: &Geometry<f64>) -> Result<String> {
    geometry.to_wkt().map_err(|err| {
        ConvertError::from(FormatError::InvalidGeometry {
            message: err.to_string(),
            feature: None,
        })
    })
}

/// Parse WKT back into a geometry.
///
/// # Errors
///
/// Returns [`FormatError::InvalidGeometry`] if the text is not valid WKT.
pub fn wkt_to_geometry(text: &str) -> Result<Geometry<f64>> {
    Wkt(text).to_geo().map_err(|err| {
        ConvertError::from(FormatError::InvalidGeometry {
            message: err.to_string(),
            feature: None,
        })
    })
}

/// Append the geometry column to the attributes as a `Utf8` WKT column.
///
/// The column is nullable; null shapes become null values.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidOption`] if `column_name` is empty or clashes
/// with an attribute column, and [`FormatError::InvalidGeometry`] naming the
/// row if a geometry cannot be serialized.
pub fn textualize(table: &FeatureTable, column_name: &str) -> Result<RecordBatch> {
    let schema = table.schema();
    if column_name.is_empty() || schema.column_with_name(column_name).is_some() {
        return Err(ConfigError::InvalidOption {
            option: "geometry_column".to_string(),
            message: format!("'{column_name}' is empty or already an attribute column"),
        }
        .into());
    }

    let values = table
        .geometries()
        .iter()
        .enumerate()
        .map(|(feature, geometry)| {
            geometry
                .as_ref()
                .map(|g| {
                    g.to_wkt().map_err(|err| FormatError::InvalidGeometry {
                        message: err.to_string(),
                        feature: Some(feature),
                    })
                })
                .transpose()
        })
        .collect::<std::result::Result<Vec<Option<String>>, _>>()?;
    debug!("Serialized {} geometries to WKT", values.len());

    let mut fields: Vec<Field> = schema.fields().iter().map(|f| f.as_ref().clone()).collect();
    fields.push(Field::new(column_name, DataType::Utf8, true));

    let mut columns: Vec<ArrayRef> = table.attributes().columns().to_vec();
    columns.push(Arc::new(StringArray::from(values)));

    RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)
        .map_err(|err| ConvertError::Other(anyhow::Error::new(err)))
}
