//! dBASE attribute decoding into Arrow columns.
//!
//! Each `.dbf` field becomes one nullable Arrow column whose type follows the
//! field's header declaration, so an empty table keeps its schema. `N` and
//! `F` fields without decimals become `Int64`, with decimals `Float64`.

use std::sync::Arc;

use arrow_array::ArrayRef;
use arrow_array::builder::{
    BooleanBuilder, Date32Builder, Float64Builder, Int32Builder, Int64Builder, StringBuilder,
    TimestampMillisecondBuilder,
};
use arrow_schema::{DataType, Field, TimeUnit};
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use format_shared::{SourcePosition, SpatialFormatReadError, SpatialFormatResult};
use shapefile::dbase::{self, FieldType, FieldValue, Record};

/// Largest magnitude an `f64` holds without losing integer precision.
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

/// `num_days_from_ce` of 1970-01-01.
const EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Size of the `.dbf` table header and of each field descriptor.
const DBF_BLOCK_LEN: usize = 32;

/// Offset of the decimal count inside a field descriptor.
const DECIMALS_OFFSET: usize = 17;

/// Name, type and decimal count declared for one `.dbf` field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    /// Field name
    pub name: String,
    /// Declared dBASE type
    pub field_type: FieldType,
    /// Declared number of decimal places
    pub decimals: u8,
}

impl FieldSpec {
    /// Create a field declaration
    #[must_use]
    pub fn new(name: impl Into<String>, field_type: FieldType, decimals: u8) -> Self {
        Self {
            name: name.into(),
            field_type,
            decimals,
        }
    }

    /// Pairs the reader's field descriptors with the decimal counts stored in
    /// the raw `.dbf` header, which `dbase` does not expose.
    #[must_use]
    pub fn from_header(fields: &[dbase::FieldInfo], dbf: &[u8]) -> Vec<Self> {
        fields
            .iter()
            .enumerate()
            .map(|(index, info)| {
                let offset = DBF_BLOCK_LEN * (index + 1) + DECIMALS_OFFSET;
                let decimals = dbf.get(offset).copied().unwrap_or_default();
                Self::new(info.name(), info.field_type(), decimals)
            })
            .collect()
    }
}

/// Arrow representation chosen for a declared field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Text,
    Integer64,
    Float64,
    Integer32,
    Logical,
    Date,
    DateTime,
}

impl ColumnKind {
    fn of(spec: &FieldSpec) -> Self {
        match spec.field_type {
            FieldType::Character | FieldType::Memo => ColumnKind::Text,
            FieldType::Numeric | FieldType::Float if spec.decimals == 0 => ColumnKind::Integer64,
            FieldType::Numeric | FieldType::Float | FieldType::Double | FieldType::Currency => {
                ColumnKind::Float64
            },
            FieldType::Integer => ColumnKind::Integer32,
            FieldType::Logical => ColumnKind::Logical,
            FieldType::Date => ColumnKind::Date,
            FieldType::DateTime => ColumnKind::DateTime,
        }
    }

    fn data_type(self) -> DataType {
        match self {
            ColumnKind::Text => DataType::Utf8,
            ColumnKind::Integer64 => DataType::Int64,
            ColumnKind::Float64 => DataType::Float64,
            ColumnKind::Integer32 => DataType::Int32,
            ColumnKind::Logical => DataType::Boolean,
            ColumnKind::Date => DataType::Date32,
            ColumnKind::DateTime => DataType::Timestamp(TimeUnit::Millisecond, None),
        }
    }

    fn accepts(self, value: &FieldValue) -> bool {
        match self {
            ColumnKind::Text => matches!(value, FieldValue::Character(_) | FieldValue::Memo(_)),
            ColumnKind::Integer64 => matches!(value, FieldValue::Numeric(_) | FieldValue::Float(_)),
            ColumnKind::Float64 => matches!(
                value,
                FieldValue::Numeric(_)
                    | FieldValue::Float(_)
                    | FieldValue::Double(_)
                    | FieldValue::Currency(_)
            ),
            ColumnKind::Integer32 => matches!(value, FieldValue::Integer(_)),
            ColumnKind::Logical => matches!(value, FieldValue::Logical(_)),
            ColumnKind::Date => matches!(value, FieldValue::Date(_)),
            ColumnKind::DateTime => matches!(value, FieldValue::DateTime(_)),
        }
    }
}

/// Decodes attribute records of one `.dbf` member into Arrow columns.
pub struct AttributeDecoder<'a> {
    member: &'a str,
    fields: &'a [FieldSpec],
}

impl<'a> AttributeDecoder<'a> {
    /// Create a decoder for the given field declarations, in `.dbf` header order.
    #[must_use]
    pub fn new(member: &'a str, fields: &'a [FieldSpec]) -> Self {
        Self { member, fields }
    }

    /// Build one Arrow field and column per `.dbf` field.
    ///
    /// # Errors
    ///
    /// Returns a schema error if a value does not match its declared type and
    /// a parse error if a value cannot be represented in its column.
    pub fn decode(&self, records: &[Record]) -> SpatialFormatResult<(Vec<Field>, Vec<ArrayRef>)> {
        let mut fields = Vec::with_capacity(self.fields.len());
        let mut columns = Vec::with_capacity(self.fields.len());

        for spec in self.fields {
            let (field, column) = self.decode_field(spec, records)?;
            fields.push(field);
            columns.push(column);
        }

        Ok((fields, columns))
    }

    fn decode_field(
        &self,
        spec: &FieldSpec,
        records: &[Record],
    ) -> SpatialFormatResult<(Field, ArrayRef)> {
        let name = spec.name.as_str();
        let values = records
            .iter()
            .enumerate()
            .map(|(index, record)| {
                record.get(name).ok_or_else(|| SpatialFormatReadError::Parse {
                    message: "Record is missing a field declared in the header".to_string(),
                    position: Some(self.position(index, name)),
                    context: None,
                })
            })
            .collect::<SpatialFormatResult<Vec<&FieldValue>>>()?;

        let kind = ColumnKind::of(spec);
        if let Some((index, value)) = values.iter().enumerate().find(|(_, v)| !kind.accepts(v)) {
            return Err(SpatialFormatReadError::Schema {
                message: format!(
                    "Field '{name}' is declared {:?} but holds a {:?} value at {}",
                    spec.field_type,
                    value.field_type(),
                    self.position(index, name)
                ),
                context: Some(self.member.to_string()),
            });
        }

        let column = match kind {
            ColumnKind::Text => text_column(&values),
            ColumnKind::Integer64 => self.integer64_column(name, &values)?,
            ColumnKind::Float64 => float64_column(&values),
            ColumnKind::Integer32 => integer32_column(&values),
            ColumnKind::Logical => logical_column(&values),
            ColumnKind::Date => self.date_column(name, &values)?,
            ColumnKind::DateTime => self.datetime_column(name, &values)?,
        };

        Ok((Field::new(name, kind.data_type(), true), column))
    }

    #[allow(clippy::cast_possible_truncation)]
    fn integer64_column(&self, name: &str, values: &[&FieldValue]) -> SpatialFormatResult<ArrayRef> {
        let mut builder = Int64Builder::with_capacity(values.len());
        for (index, value) in values.iter().enumerate() {
            let number = match value {
                FieldValue::Numeric(number) => *number,
                FieldValue::Float(number) => number.map(f64::from),
                _ => None,
            };
            match number {
                Some(n) if n.is_finite() && n.fract() == 0.0 && n.abs() <= MAX_EXACT_INTEGER => {
                    builder.append_value(n as i64);
                },
                Some(n) => {
                    return Err(SpatialFormatReadError::Parse {
                        message: format!("Value {n} does not fit an integer field"),
                        position: Some(self.position(index, name)),
                        context: None,
                    });
                },
                None => builder.append_null(),
            }
        }
        Ok(Arc::new(builder.finish()))
    }

    fn position(&self, index: usize, field: &str) -> SourcePosition {
        SourcePosition {
            field: Some(field.to_string()),
            ..SourcePosition::record(self.member, index as u64 + 1)
        }
    }

    fn date_column(&self, name: &str, values: &[&FieldValue]) -> SpatialFormatResult<ArrayRef> {
        let mut builder = Date32Builder::with_capacity(values.len());
        for (index, value) in values.iter().enumerate() {
            match value {
                FieldValue::Date(Some(date)) => {
                    let days = self.to_naive_date(date, index, name)?;
                    builder.append_value(days_since_epoch(days));
                },
                _ => builder.append_null(),
            }
        }
        Ok(Arc::new(builder.finish()))
    }

    fn datetime_column(
        &self,
        name: &str,
        values: &[&FieldValue],
    ) -> SpatialFormatResult<ArrayRef> {
        let mut builder = TimestampMillisecondBuilder::with_capacity(values.len());
        for (index, value) in values.iter().enumerate() {
            match value {
                FieldValue::DateTime(datetime) => {
                    let date = self.to_naive_date(&datetime.date(), index, name)?;
                    let time = datetime.time();
                    let timestamp = date
                        .and_hms_opt(time.hours(), time.minutes(), time.seconds())
                        .map(|dt: NaiveDateTime| dt.and_utc().timestamp_millis())
                        .ok_or_else(|| SpatialFormatReadError::Parse {
                            message: "Invalid time of day".to_string(),
                            position: Some(self.position(index, name)),
                            context: None,
                        })?;
                    builder.append_value(timestamp);
                },
                _ => builder.append_null(),
            }
        }
        Ok(Arc::new(builder.finish()))
    }

    fn to_naive_date(
        &self,
        date: &dbase::Date,
        index: usize,
        name: &str,
    ) -> SpatialFormatResult<NaiveDate> {
        i32::try_from(date.year())
            .ok()
            .and_then(|year| NaiveDate::from_ymd_opt(year, date.month(), date.day()))
            .ok_or_else(|| SpatialFormatReadError::Parse {
                message: format!(
                    "Invalid date {}-{}-{}",
                    date.year(),
                    date.month(),
                    date.day()
                ),
                position: Some(self.position(index, name)),
                context: None,
            })
    }
}

fn days_since_epoch(date: NaiveDate) -> i32 {
    date.num_days_from_ce() - EPOCH_DAYS_FROM_CE
}

fn text_column(values: &[&FieldValue]) -> ArrayRef {
    let mut builder = StringBuilder::with_capacity(values.len(), values.len() * 16);
    for value in values {
        match value {
            FieldValue::Character(Some(text)) | FieldValue::Memo(text) => {
                builder.append_value(text);
            },
            _ => builder.append_null(),
        }
    }
    Arc::new(builder.finish())
}

fn float64_column(values: &[&FieldValue]) -> ArrayRef {
    let mut builder = Float64Builder::with_capacity(values.len());
    for value in values {
        match value {
            FieldValue::Numeric(number) => builder.append_option(*number),
            FieldValue::Float(number) => builder.append_option(number.map(f64::from)),
            FieldValue::Double(number) | FieldValue::Currency(number) => {
                builder.append_value(*number);
            },
            _ => builder.append_null(),
        }
    }
    Arc::new(builder.finish())
}

fn integer32_column(values: &[&FieldValue]) -> ArrayRef {
    let mut builder = Int32Builder::with_capacity(values.len());
    for value in values {
        match value {
            FieldValue::Integer(number) => builder.append_value(*number),
            _ => builder.append_null(),
        }
    }
    Arc::new(builder.finish())
}

fn logical_column(values: &[&FieldValue]) -> ArrayRef {
    let mut builder = BooleanBuilder::with_capacity(values.len());
    for value in values {
        match value {
            FieldValue::Logical(flag) => builder.append_option(*flag),
            _ => builder.append_null(),
        }
    }
    Arc::new(builder.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow_array::{Array, BooleanArray, Date32Array, Float64Array, Int64Array, StringArray};

    fn record(values: Vec<(&str, FieldValue)>) -> Record {
        let mut record = Record::default();
        for (name, value) in values {
            record.insert(name.to_string(), value);
        }
        record
    }

    #[test]
    fn test_decode_county_like_records() {
        let records = vec![
            record(vec![
                ("NAME", FieldValue::Character(Some("Autauga".to_string()))),
                ("ALAND", FieldValue::Numeric(Some(1_539_602_123.0))),
                ("INTPTLAT", FieldValue::Numeric(Some(32.532_237))),
            ]),
            record(vec![
                ("NAME", FieldValue::Character(None)),
                ("ALAND", FieldValue::Numeric(None)),
                ("INTPTLAT", FieldValue::Numeric(Some(30.659_218))),
            ]),
        ];
        let specs = vec![
            FieldSpec::new("NAME", FieldType::Character, 0),
            FieldSpec::new("ALAND", FieldType::Numeric, 0),
            FieldSpec::new("INTPTLAT", FieldType::Numeric, 7),
        ];

        let (fields, columns) = AttributeDecoder::new("counties.dbf", &specs)
            .decode(&records)
            .unwrap();

        assert_eq!(fields.len(), 3);
        assert_eq!(fields[0].data_type(), &DataType::Utf8);
        assert_eq!(fields[1].data_type(), &DataType::Int64);
        assert_eq!(fields[2].data_type(), &DataType::Float64);
        assert!(fields.iter().all(|f| f.is_nullable()));

        let names = columns[0].as_any().downcast_ref::<StringArray>().unwrap();
        assert_eq!(names.value(0), "Autauga");
        assert!(names.is_null(1));

        let aland = columns[1].as_any().downcast_ref::<Int64Array>().unwrap();
        assert_eq!(aland.value(0), 1_539_602_123);
        assert!(aland.is_null(1));

        let lat = columns[2].as_any().downcast_ref::<Float64Array>().unwrap();
        assert!((lat.value(1) - 30.659_218).abs() < 1e-9);
    }

    #[test]
    fn test_whole_values_in_decimal_field_stay_float() {
        let records = vec![
            record(vec![("PCT", FieldValue::Numeric(Some(5.0)))]),
            record(vec![("PCT", FieldValue::Numeric(Some(7.0)))]),
        ];
        let specs = vec![FieldSpec::new("PCT", FieldType::Numeric, 2)];

        let (fields, columns) = AttributeDecoder::new("pct.dbf", &specs)
            .decode(&records)
            .unwrap();

        assert_eq!(fields[0].data_type(), &DataType::Float64);
        let pct = columns[0].as_any().downcast_ref::<Float64Array>().unwrap();
        assert_eq!(pct.values().to_vec(), vec![5.0, 7.0]);
    }

    #[test]
    fn test_decode_logical_and_date() {
        let records = vec![
            record(vec![
                ("ACTIVE", FieldValue::Logical(Some(true))),
                ("SINCE", FieldValue::Date(Some(dbase::Date::new(2, 1, 1970)))),
            ]),
            record(vec![
                ("ACTIVE", FieldValue::Logical(None)),
                ("SINCE", FieldValue::Date(None)),
            ]),
        ];
        let specs = vec![
            FieldSpec::new("ACTIVE", FieldType::Logical, 0),
            FieldSpec::new("SINCE", FieldType::Date, 0),
        ];

        let (fields, columns) = AttributeDecoder::new("flags.dbf", &specs)
            .decode(&records)
            .unwrap();

        assert_eq!(fields[0].data_type(), &DataType::Boolean);
        assert_eq!(fields[1].data_type(), &DataType::Date32);

        let active = columns[0].as_any().downcast_ref::<BooleanArray>().unwrap();
        assert!(active.value(0));
        assert!(active.is_null(1));

        let since = columns[1].as_any().downcast_ref::<Date32Array>().unwrap();
        assert_eq!(since.value(0), 1);
        assert!(since.is_null(1));
    }

    #[test]
    fn test_empty_table_keeps_declared_types() {
        let specs = vec![
            FieldSpec::new("NAME", FieldType::Character, 0),
            FieldSpec::new("ALAND", FieldType::Numeric, 0),
            FieldSpec::new("PCT", FieldType::Numeric, 2),
            FieldSpec::new("COUNT", FieldType::Integer, 0),
            FieldSpec::new("ACTIVE", FieldType::Logical, 0),
            FieldSpec::new("SINCE", FieldType::Date, 0),
            FieldSpec::new("UPDATED", FieldType::DateTime, 0),
        ];
        let (fields, columns) = AttributeDecoder::new("empty.dbf", &specs)
            .decode(&[])
            .unwrap();

        let types: Vec<&DataType> = fields.iter().map(Field::data_type).collect();
        assert_eq!(
            types,
            vec![
                &DataType::Utf8,
                &DataType::Int64,
                &DataType::Float64,
                &DataType::Int32,
                &DataType::Boolean,
                &DataType::Date32,
                &DataType::Timestamp(TimeUnit::Millisecond, None),
            ]
        );
        assert!(columns.iter().all(|c| c.is_empty()));
    }

    #[test]
    fn test_fractional_value_in_integer_field_is_rejected() {
        let records = vec![record(vec![("ALAND", FieldValue::Numeric(Some(12.5)))])];
        let specs = vec![FieldSpec::new("ALAND", FieldType::Numeric, 0)];

        let err = AttributeDecoder::new("counties.dbf", &specs)
            .decode(&records)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Parse error at member counties.dbf, record 1, field ALAND: Value 12.5 does not fit an integer field"
        );
    }

    #[test]
    fn test_missing_field_reports_position() {
        let records = vec![record(vec![(
            "NAME",
            FieldValue::Character(Some("x".to_string())),
        )])];
        let specs = vec![
            FieldSpec::new("NAME", FieldType::Character, 0),
            FieldSpec::new("GEOID", FieldType::Character, 0),
        ];

        let err = AttributeDecoder::new("counties.dbf", &specs)
            .decode(&records)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Parse error at member counties.dbf, record 1, field GEOID: Record is missing a field declared in the header"
        );
    }

    #[test]
    fn test_value_not_matching_declaration_is_rejected() {
        let records = vec![
            record(vec![("VALUE", FieldValue::Integer(1))]),
            record(vec![("VALUE", FieldValue::Character(Some("2".to_string())))]),
        ];
        let specs = vec![FieldSpec::new("VALUE", FieldType::Integer, 0)];

        let err = AttributeDecoder::new("mixed.dbf", &specs)
            .decode(&records)
            .unwrap_err();
        assert!(matches!(err, SpatialFormatReadError::Schema { .. }));
        assert!(
            err.to_string()
                .contains("declared Integer but holds a Character value"),
            "{err}"
        );
    }

    #[test]
    fn test_field_specs_read_decimals_from_header() {
        let mut dbf = std::io::Cursor::new(Vec::new());
        {
            let mut writer = dbase::TableWriterBuilder::new()
                .add_character_field(dbase::FieldName::try_from("NAME").unwrap(), 20)
                .add_numeric_field(dbase::FieldName::try_from("ALAND").unwrap(), 14, 0)
                .add_numeric_field(dbase::FieldName::try_from("PCT").unwrap(), 10, 2)
                .build_with_dest(&mut dbf);
            writer.close().unwrap();
        }
        let bytes = dbf.into_inner();
        let reader = dbase::Reader::new(std::io::Cursor::new(bytes.as_slice())).unwrap();

        let specs = FieldSpec::from_header(reader.fields(), &bytes);
        assert_eq!(
            specs,
            vec![
                FieldSpec::new("NAME", FieldType::Character, 0),
                FieldSpec::new("ALAND", FieldType::Numeric, 0),
                FieldSpec::new("PCT", FieldType::Numeric, 2),
            ]
        );
    }
}
