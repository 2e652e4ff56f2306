//! Shape decoding into `geo-types` geometries.

use std::convert::TryFrom;

use format_shared::{SourcePosition, SpatialFormatReadError, SpatialFormatResult};
use geo_types::Geometry;
use shapefile::Shape;

/// Convert a decoded shape into a geometry.
///
/// Null shapes yield `None`. Polygon and polyline shapes are decoded as
/// multi-geometries by the shapefile reader; single-member collections are
/// collapsed so a county with one outer ring is reported as a `POLYGON`.
pub fn shape_to_geometry(
    shape: Shape,
    position: impl FnOnce() -> SourcePosition,
) -> SpatialFormatResult<Option<Geometry<f64>>> {
    if matches!(shape, Shape::NullShape) {
        return Ok(None);
    }

    let shape_type = shape.shapetype();
    let geometry =
        Geometry::<f64>::try_from(shape).map_err(|err| SpatialFormatReadError::Parse {
            message: format!("Cannot convert {shape_type:?} shape to a geometry: {err}"),
            position: Some(position()),
            context: None,
        })?;

    Ok(Some(collapse_single_member(geometry)))
}

/// Unwrap multi-geometries that hold exactly one member.
#[must_use]
pub fn collapse_single_member(geometry: Geometry<f64>) -> Geometry<f64> {
    match geometry {
        Geometry::MultiPolygon(mut multi) if multi.0.len() == 1 => {
            Geometry::Polygon(multi.0.remove(0))
        },
        Geometry::MultiLineString(mut multi) if multi.0.len() == 1 => {
            Geometry::LineString(multi.0.remove(0))
        },
        other => other,
    }
}
