//! Coordinate transformation of the geometry column.

use countyconv_core_common::{Crs, FeatureTable};
use geo::MapCoords;
use geo_types::{Coord, Geometry};
use log::{debug, info};
use proj4rs::Proj;
use proj4rs::transform::transform;

use crate::error::{ConvertError, CrsError, Result};

/// Source and target projections resolved from EPSG codes.
struct Projections {
    source: Proj,
    target: Proj,
}

/// Transforms geometries from one CRS into another.
///
/// When source and target refer to the same EPSG code no projection is set up
/// and geometries are passed through untouched.
pub struct Reprojector {
    source: Crs,
    target: Crs,
    projections: Option<Projections>,
}

impl Reprojector {
    /// Prepare a transformation from `source` into `EPSG:target_epsg`.
    ///
    /// # Errors
    ///
    /// Returns [`CrsError::Unsupported`] if either CRS has no EPSG code or
    /// the code is not in the bundled definitions.
    pub fn new(source: &Crs, target_epsg: u16) -> Result<Self> {
        let target = Crs::epsg(target_epsg);
        let source_epsg = source.epsg.ok_or_else(|| CrsError::Unsupported {
            crs: source.to_string(),
        })?;

        let projections = if source.is_epsg(target_epsg) {
            debug!("Source CRS is already {}; skipping transform", target.identifier());
            None
        } else {
            Some(Projections {
                source: projection(source, source_epsg)?,
                target: projection(&target, target_epsg)?,
            })
        };

        Ok(Self {
            source: source.clone(),
            target,
            projections,
        })
    }

    /// True if geometries are returned unchanged.
    #[must_use]
    pub fn is_identity(&self) -> bool {
        self.projections.is_none()
    }

    /// The CRS geometries are transformed into.
    #[must_use]
    pub fn target(&self) -> &Crs {
        &self.target
    }

    /// Transform one geometry.
    ///
    /// # Errors
    ///
    /// Returns the projection library's message if any coordinate fails.
    pub fn reproject_geometry(
        &self,
        geometry: &Geometry<f64>,
    ) -> std::result::Result<Geometry<f64>, String> {
        match &self.projections {
            None => Ok(geometry.clone()),
            Some(projections) => geometry.try_map_coords(|coord| projections.apply(coord)),
        }
    }

    /// Transform every geometry of `table`, tagging it with the target CRS.
    ///
    /// Null geometries stay null and attributes are not touched.
    ///
    /// # Errors
    ///
    /// Returns [`CrsError::Transform`] naming the first feature that fails.
    pub fn reproject_table(&self, table: FeatureTable) -> Result<FeatureTable> {
        info!(
            "Reprojecting {} feature(s) from {} to {}",
            table.num_rows(),
            self.source,
            self.target
        );
        let reprojected = table
            .geometries()
            .iter()
            .enumerate()
            .map(|(feature, geometry)| {
                geometry
                    .as_ref()
                    .map(|g| self.reproject_geometry(g))
                    .transpose()
                    .map_err(|message| CrsError::Transform {
                        feature,
                        from: self.source.identifier(),
                        to: self.target.identifier(),
                        message,
                    })
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;

        table
            .with_geometries(reprojected, Some(self.target.clone()))
            .map_err(|err| ConvertError::Other(anyhow::Error::new(err)))
    }
}

impl Projections {
    /// `proj4rs` works in radians for geographic CRSs.
    fn apply(&self, coord: Coord<f64>) -> std::result::Result<Coord<f64>, String> {
        let mut point = if self.source.is_latlong() {
            (coord.x.to_radians(), coord.y.to_radians(), 0.0)
        } else {
            (coord.x, coord.y, 0.0)
        };

        transform(&self.source, &self.target, &mut point).map_err(|err| err.to_string())?;

        if self.target.is_latlong() {
            Ok(Coord {
                x: point.0.to_degrees(),
                y: point.1.to_degrees(),
            })
        } else {
            Ok(Coord {
                x: point.0,
                y: point.1,
            })
        }
    }
}

fn projection(crs: &Crs, code: u16) -> Result<Proj> {
    Proj::from_epsg_code(code).map_err(|err| {
        debug!("No projection for {crs}: {err}");
        ConvertError::from(CrsError::Unsupported {
            crs: crs.to_string(),
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow_array::{ArrayRef, RecordBatch, StringArray};
    use arrow_schema::{DataType, Field, Schema};
    use geo_types::{Point, polygon};
    use std::sync::Arc;

    fn assert_close(a: f64, b: f64, tolerance: f64) {
        assert!((a - b).abs() < tolerance, "{a} != {b}");
    }

    fn point_of(geometry: &Geometry<f64>) -> Point<f64> {
        match geometry {
            Geometry::Point(p) => *p,
            other => panic!("expected point, got {other:?}"),
        }
    }

    #[test]
    fn test_web_mercator_to_wgs84() {
        let reprojector = Reprojector::new(&Crs::epsg(3857), 4326).unwrap();
        assert!(!reprojector.is_identity());

        let geometry = Geometry::Point(Point::new(-9_621_000.0, 3_825_000.0));
        let result = point_of(&reprojector.reproject_geometry(&geometry).unwrap());
        assert_close(result.x(), -86.426_913_485_139_17, 1e-6);
        assert_close(result.y(), 32.468_751_088_702_07, 1e-6);
    }

    #[test]
    fn test_round_trip_through_wgs84() {
        let forward = Reprojector::new(&Crs::epsg(3857), 4326).unwrap();
        let back = Reprojector::new(&Crs::wgs84(), 3857).unwrap();

        let original = Geometry::Polygon(polygon![
            (x: -9_621_000.0, y: 3_825_000.0),
            (x: -9_621_000.0, y: 3_865_000.0),
            (x: -9_581_000.0, y: 3_865_000.0),
            (x: -9_581_000.0, y: 3_825_000.0),
            (x: -9_621_000.0, y: 3_825_000.0),
        ]);
        let degrees = forward.reproject_geometry(&original).unwrap();
        let meters = back.reproject_geometry(&degrees).unwrap();

        let (Geometry::Polygon(a), Geometry::Polygon(b)) = (&original, &meters) else {
            panic!("expected polygons");
        };
        for (ca, cb) in a.exterior().coords().zip(b.exterior().coords()) {
            assert_close(ca.x, cb.x, 1e-6);
            assert_close(ca.y, cb.y, 1e-6);
        }
    }

    #[test]
    fn test_same_crs_is_identity() {
        let reprojector = Reprojector::new(&Crs::wgs84(), 4326).unwrap();
        assert!(reprojector.is_identity());

        let geometry = Geometry::Point(Point::new(-75.123_456_789, 39.987_654_321));
        assert_eq!(reprojector.reproject_geometry(&geometry).unwrap(), geometry);
    }

    #[test]
    fn test_nad83_to_wgs84_stays_close() {
        let reprojector = Reprojector::new(&Crs::epsg(4269), 4326).unwrap();
        let geometry = Geometry::Point(Point::new(-86.5, 32.5));
        let result = point_of(&reprojector.reproject_geometry(&geometry).unwrap());
        assert_close(result.x(), -86.5, 1e-4);
        assert_close(result.y(), 32.5, 1e-4);
    }

    #[test]
    fn test_unknown_crs_is_unsupported() {
        let crs = Crs::from_prj(r#"LOCAL_CS["Site grid"]"#);
        let err = Reprojector::new(&crs, 4326).err().unwrap();
        assert!(matches!(err, ConvertError::Crs(CrsError::Unsupported { .. })));
        assert!(err.to_string().contains("Site grid"));
    }

    #[test]
    fn test_reproject_table_keeps_nulls_and_attributes() {
        let schema = Arc::new(Schema::new(vec![Field::new("NAME", DataType::Utf8, true)]));
        let names: ArrayRef = Arc::new(StringArray::from(vec!["Autauga", "Empty"]));
        let batch = RecordBatch::try_new(schema, vec![names]).unwrap();
        let table = FeatureTable::try_new(
            batch.clone(),
            vec![Some(Geometry::Point(Point::new(0.0, 0.0))), None],
            Some(Crs::epsg(3857)),
        )
        .unwrap();

        let reprojected = Reprojector::new(&Crs::epsg(3857), 4326)
            .unwrap()
            .reproject_table(table)
            .unwrap();

        assert_eq!(reprojected.attributes(), &batch);
        assert_eq!(reprojected.crs(), Some(&Crs::wgs84()));
        assert!(reprojected.geometries()[1].is_none());
        let origin = point_of(reprojected.geometries()[0].as_ref().unwrap());
        assert_close(origin.x(), 0.0, 1e-9);
        assert_close(origin.y(), 0.0, 1e-9);
    }

    #[test]
    fn test_identity_table_is_retagged_with_target() {
        let source = Crs::from_prj(
            r#"GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]]"#,
        );
        let geometries = vec![None, Some(Geometry::Point(Point::new(-86.5, 32.5)))];
        let table = FeatureTable::from_columns(
            Arc::new(Schema::empty()),
            Vec::new(),
            geometries.clone(),
            Some(source.clone()),
        )
        .unwrap();

        let reprojector = Reprojector::new(&source, 4326).unwrap();
        assert!(reprojector.is_identity());
        let result = reprojector.reproject_table(table).unwrap();
        assert_eq!(result.geometries(), geometries.as_slice());
        assert_eq!(result.crs(), Some(&Crs::wgs84()));
    }
}
