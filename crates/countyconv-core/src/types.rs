//! Data types describing a finished conversion.

use std::path::PathBuf;

use arrow_schema::Schema;

use crate::utils::ArrowDataTypeExt;

/// Outcome of a successful [`convert`](crate::operations::convert) run.
#[derive(Debug, Clone)]
pub struct ConversionSummary {
    /// Path of the input archive
    pub input: PathBuf,
    /// Path of the written Parquet file
    pub output: PathBuf,
    /// Number of records written
    pub rows: usize,
    /// Number of records whose geometry was null
    pub null_geometries: usize,
    /// CRS read from the input, e.g. `EPSG:3857 (WGS_1984_Web_Mercator_Auxiliary_Sphere)`
    pub source_crs: String,
    /// CRS of the written geometries, e.g. `EPSG:4326`
    pub target_crs: String,
    /// False if the input was already in the target CRS
    pub reprojected: bool,
    /// Name of the WKT column
    pub geometry_column: String,
    /// Output schema, WKT column included
    pub fields: Vec<FieldInfo>,
}

/// Information about a field/column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldInfo {
    /// Field name
    pub name: String,
    /// Data type
    pub data_type: String,
    /// Whether the field is nullable
    pub nullable: bool,
}

impl FieldInfo {
    /// One entry per field of `schema`, in column order.
    #[must_use]
    pub fn from_schema(schema: &Schema) -> Vec<Self> {
        schema
            .fields()
            .iter()
            .map(|field| Self {
                name: field.name().clone(),
                data_type: field.data_type().display_name(),
                nullable: field.is_nullable(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow_schema::{DataType, Field};

    #[test]
    fn test_field_info_from_schema() {
        let schema = Schema::new(vec![
            Field::new("GEOID", DataType::Utf8, true),
            Field::new("ALAND", DataType::Int64, false),
        ]);

        let fields = FieldInfo::from_schema(&schema);
        assert_eq!(
            fields,
            vec![
                FieldInfo {
                    name: "GEOID".to_string(),
                    data_type: "String".to_string(),
                    nullable: true,
                },
                FieldInfo {
                    name: "ALAND".to_string(),
                    data_type: "Int64".to_string(),
                    nullable: false,
                },
            ]
        );
    }
}
