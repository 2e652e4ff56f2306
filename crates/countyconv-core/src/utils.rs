//! Helpers for presenting Arrow schemas.

use arrow_schema::{DataType, TimeUnit};

/// Short, user-facing names for the Arrow types attribute columns decode to.
///
/// ```
/// use arrow_schema::DataType;
/// use countyconv_core::utils::ArrowDataTypeExt;
///
/// assert_eq!(DataType::Utf8.display_name(), "String");
/// assert_eq!(DataType::Int64.display_name(), "Int64");
/// ```
pub trait ArrowDataTypeExt {
    /// Name shown in summaries and field tables.
    fn display_name(&self) -> String;
}

impl ArrowDataTypeExt for DataType {
    fn display_name(&self) -> String {
        match self {
            DataType::Utf8 | DataType::LargeUtf8 => "String".to_string(),
            DataType::Boolean => "Boolean".to_string(),
            DataType::Int32 => "Int32".to_string(),
            DataType::Int64 => "Int64".to_string(),
            DataType::Float64 => "Float64".to_string(),
            DataType::Date32 => "Date".to_string(),
            DataType::Timestamp(unit, tz) => {
                let unit = match unit {
                    TimeUnit::Second => "s",
                    TimeUnit::Millisecond => "ms",
                    TimeUnit::Microsecond => "us",
                    TimeUnit::Nanosecond => "ns",
                };
                match tz {
                    Some(tz) => format!("Timestamp({unit}, {tz})"),
                    None => format!("Timestamp({unit})"),
                }
            },
            other => format!("{other:?}"),
        }
    }
}
