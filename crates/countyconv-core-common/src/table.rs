//! In-memory feature table.
//!
//! A [`FeatureTable`] pairs an Arrow [`RecordBatch`] of attribute columns with
//! one geometry per row. The geometry column stays outside Arrow until it is
//! serialized, so reprojection can work on `geo-types` values directly.

use std::fmt;

use arrow_array::{RecordBatch, RecordBatchOptions};
use arrow_schema::{ArrowError, SchemaRef};
use geo_types::Geometry;

use crate::crs::Crs;

/// Errors raised when assembling a [`FeatureTable`].
#[derive(Debug)]
pub enum FeatureTableError {
    /// Attribute and geometry columns disagree on the number of rows.
    LengthMismatch {
        /// Rows in the attribute batch
        attributes: usize,
        /// Entries in the geometry column
        geometries: usize,
    },
    /// Arrow refused to build the attribute batch.
    Arrow(ArrowError),
}

impl fmt::Display for FeatureTableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureTableError::LengthMismatch {
                attributes,
                geometries,
            } => write!(
                f,
                "Attribute rows ({attributes}) and geometries ({geometries}) differ in length"
            ),
            FeatureTableError::Arrow(err) => write!(f, "Invalid attribute batch: {err}"),
        }
    }
}

impl std::error::Error for FeatureTableError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FeatureTableError::Arrow(err) => Some(err),
            FeatureTableError::LengthMismatch { .. } => None,
        }
    }
}

impl From<ArrowError> for FeatureTableError {
    fn from(err: ArrowError) -> Self {
        FeatureTableError::Arrow(err)
    }
}

/// Attribute columns plus one optional geometry per record.
///
/// Invariant: `attributes.num_rows() == geometries.len()`.
#[derive(Debug, Clone)]
pub struct FeatureTable {
    attributes: RecordBatch,
    geometries: Vec<Option<Geometry<f64>>>,
    crs: Option<Crs>,
}

impl FeatureTable {
    /// Creates a table, checking that both columns have the same length.
    ///
    /// # Errors
    ///
    /// Returns [`FeatureTableError::LengthMismatch`] if the row counts differ.
    pub fn try_new(
        attributes: RecordBatch,
        geometries: Vec<Option<Geometry<f64>>>,
        crs: Option<Crs>,
    ) -> Result<Self, FeatureTableError> {
        if attributes.num_rows() != geometries.len() {
            return Err(FeatureTableError::LengthMismatch {
                attributes: attributes.num_rows(),
                geometries: geometries.len(),
            });
        }
        Ok(Self {
            attributes,
            geometries,
            crs,
        })
    }

    /// Builds the attribute batch from columns and creates the table.
    ///
    /// Unlike [`RecordBatch::try_new`] this accepts an empty column list, in
    /// which case the row count is taken from `geometries`.
    ///
    /// # Errors
    ///
    /// Returns an error if Arrow rejects the columns or the lengths differ.
    pub fn from_columns(
        schema: SchemaRef,
        columns: Vec<arrow_array::ArrayRef>,
        geometries: Vec<Option<Geometry<f64>>>,
        crs: Option<Crs>,
    ) -> Result<Self, FeatureTableError> {
        let options = RecordBatchOptions::new().with_row_count(Some(geometries.len()));
        let attributes = RecordBatch::try_new_with_options(schema, columns, &options)?;
        Self::try_new(attributes, geometries, crs)
    }

    /// Number of records.
    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.geometries.len()
    }

    /// Schema of the attribute columns (geometry excluded).
    #[must_use]
    pub fn schema(&self) -> SchemaRef {
        self.attributes.schema()
    }

    /// The attribute columns.
    #[must_use]
    pub fn attributes(&self) -> &RecordBatch {
        &self.attributes
    }

    /// The geometry column; `None` entries are null shapes.
    #[must_use]
    pub fn geometries(&self) -> &[Option<Geometry<f64>>] {
        &self.geometries
    }

    /// CRS the geometries are expressed in, if known.
    #[must_use]
    pub fn crs(&self) -> Option<&Crs> {
        self.crs.as_ref()
    }

    /// Replaces the geometry column, e.g. after reprojection.
    ///
    /// # Errors
    ///
    /// Returns [`FeatureTableError::LengthMismatch`] if the new column has a
    /// different number of entries.
    pub fn with_geometries(
        self,
        geometries: Vec<Option<Geometry<f64>>>,
        crs: Option<Crs>,
    ) -> Result<Self, FeatureTableError> {
        Self::try_new(self.attributes, geometries, crs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow_array::{ArrayRef, StringArray};
    use arrow_schema::{DataType, Field, Schema};
    use geo_types::{Point, point};
    use std::sync::Arc;

    fn names_batch(values: Vec<&str>) -> RecordBatch {
        let schema = Arc::new(Schema::new(vec![Field::new("NAME", DataType::Utf8, true)]));
        let column: ArrayRef = Arc::new(StringArray::from(values));
        RecordBatch::try_new(schema, vec![column]).unwrap()
    }

    fn point_geometry(x: f64, y: f64) -> Option<Geometry<f64>> {
        let p: Point<f64> = point!(x: x, y: y);
        Some(Geometry::Point(p))
    }

    #[test]
    fn test_try_new_checks_lengths() {
        let batch = names_batch(vec!["Autauga", "Baldwin"]);
        let err = FeatureTable::try_new(batch, vec![point_geometry(0.0, 0.0)], None).unwrap_err();
        assert!(matches!(
            err,
            FeatureTableError::LengthMismatch {
                attributes: 2,
                geometries: 1
            }
        ));
        assert_eq!(
            err.to_string(),
            "Attribute rows (2) and geometries (1) differ in length"
        );
    }

    #[test]
    fn test_from_columns_without_attributes() {
        let table = FeatureTable::from_columns(
            Arc::new(Schema::empty()),
            vec![],
            vec![point_geometry(1.0, 2.0), None, point_geometry(3.0, 4.0)],
            Some(Crs::wgs84()),
        )
        .unwrap();

        assert_eq!(table.num_rows(), 3);
        assert_eq!(table.attributes().num_rows(), 3);
        assert_eq!(table.schema().fields().len(), 0);
        assert!(table.geometries()[1].is_none());
    }

    #[test]
    fn test_with_geometries_keeps_attributes() {
        let batch = names_batch(vec!["Autauga"]);
        let table = FeatureTable::try_new(batch, vec![point_geometry(0.0, 0.0)], None).unwrap();

        let table = table
            .with_geometries(vec![point_geometry(5.0, 6.0)], Some(Crs::epsg(3857)))
            .unwrap();
        assert_eq!(table.crs().and_then(|c| c.epsg), Some(3857));
        assert_eq!(table.geometries()[0], point_geometry(5.0, 6.0));
        assert_eq!(table.attributes().num_rows(), 1);

        let err = table
            .with_geometries(vec![None, None], None)
            .unwrap_err();
        assert!(matches!(err, FeatureTableError::LengthMismatch { .. }));
    }
}
