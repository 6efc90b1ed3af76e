//! Inference of portable types from native values and columns.
//!
//! Scalars infer to their exact native type and are non-nullable unless the
//! value itself is null. Columns infer from their element values, and are
//! nullable if any element is null or the column wasn't declared non-null.
use quarry_error::{DbError, Result};
use tracing::trace;

use crate::arrays::datatype::{DataType, IntervalUnit};
use crate::arrays::field::Schema;
use crate::arrays::native::{ColumnarSource, NativeArray, NativeColumn};
use crate::arrays::scalar::ScalarValue;
use crate::functions::implicit::common_supertype;

/// Infer the type of a single value.
///
/// Lists whose elements can't be unified infer to a list of `Unknown`.
pub fn infer_scalar(value: &ScalarValue) -> DataType {
    let typ = match value {
        ScalarValue::Null => return DataType::null(),
        ScalarValue::Boolean(_) => DataType::boolean(),
        ScalarValue::Int8(_) => DataType::int8(),
        ScalarValue::Int16(_) => DataType::int16(),
        ScalarValue::Int32(_) => DataType::int32(),
        ScalarValue::Int64(_) => DataType::int64(),
        ScalarValue::UInt8(_) => DataType::uint8(),
        ScalarValue::UInt16(_) => DataType::uint16(),
        ScalarValue::UInt32(_) => DataType::uint32(),
        ScalarValue::UInt64(_) => DataType::uint64(),
        ScalarValue::Float16(_) => DataType::float16(),
        ScalarValue::Float32(_) => DataType::float32(),
        ScalarValue::Float64(_) => DataType::float64(),
        ScalarValue::Decimal(v) => DataType::decimal(v.precision(), v.scale),
        ScalarValue::Utf8(_) => DataType::utf8(),
        ScalarValue::Binary(_) => DataType::binary(),
        ScalarValue::Date(_) => DataType::date(),
        ScalarValue::Time(_) => DataType::time(),
        ScalarValue::Timestamp(v) => DataType::timestamp(v.timezone.as_deref()),
        ScalarValue::Interval(v) => DataType::interval(v.unit),
        ScalarValue::List(values) => {
            let elem = unify_all(values.iter().map(infer_scalar)).unwrap_or(DataType::unknown());
            DataType::list(elem)
        }
        ScalarValue::Struct(fields) => DataType::structure(
            fields
                .iter()
                .map(|(name, v)| (name.clone(), infer_scalar(v))),
        ),
    };

    typ.non_null()
}

/// Unify a sequence of types, returning `Null` for an empty sequence and None
/// if any pair can't be unified.
fn unify_all(types: impl IntoIterator<Item = DataType>) -> Option<DataType> {
    let mut types = types.into_iter();
    let mut acc = match types.next() {
        Some(first) => first,
        None => return Some(DataType::null()),
    };
    for typ in types {
        acc = common_supertype(&acc, &typ)?;
    }
    Some(acc)
}

/// Infer the type of a column.
pub fn infer_column(column: &NativeColumn) -> Result<DataType> {
    let typ = match &column.array {
        NativeArray::Boolean(_) => DataType::boolean(),
        NativeArray::Int8(_) => DataType::int8(),
        NativeArray::Int16(_) => DataType::int16(),
        NativeArray::Int32(_) => DataType::int32(),
        NativeArray::Int64(_) => DataType::int64(),
        NativeArray::UInt8(_) => DataType::uint8(),
        NativeArray::UInt16(_) => DataType::uint16(),
        NativeArray::UInt32(_) => DataType::uint32(),
        NativeArray::UInt64(_) => DataType::uint64(),
        NativeArray::Float16(_) => DataType::float16(),
        NativeArray::Float32(_) => DataType::float32(),
        NativeArray::Float64(_) => DataType::float64(),
        NativeArray::Utf8(_) => DataType::utf8(),
        NativeArray::Binary(_) => DataType::binary(),
        NativeArray::Date(_) => DataType::date(),
        NativeArray::Time(_) => DataType::time(),
        // Categories are always strings, the dictionary encoding is dropped.
        NativeArray::Categorical { .. } => DataType::utf8(),
        NativeArray::Timestamp { timezone, .. } => DataType::timestamp(timezone.as_deref()),
        NativeArray::Duration { unit, .. } => DataType::interval(*unit),
        NativeArray::Object(values) => infer_object_column(&column.name, values)?,
    };

    let nullable = !column.non_null || column.array.null_count() > 0;
    let typ = typ.with_nullable(nullable);
    trace!(column = %column.name, datatype = %typ, "inferred column type");

    Ok(typ)
}

fn infer_object_column(name: &str, values: &[ScalarValue]) -> Result<DataType> {
    let mut acc = DataType::null();
    for (idx, value) in values.iter().enumerate() {
        let typ = infer_scalar(value);
        acc = common_supertype(&acc, &typ).ok_or_else(|| {
            DbError::schema(format!(
                "Cannot infer a single type for column '{name}', found {acc} and {typ}"
            ))
            .with_field("row", idx)
        })?;
    }
    Ok(acc)
}

/// Infer a schema from a columnar source. Output order matches the source.
pub fn infer_schema(source: &ColumnarSource) -> Result<Schema> {
    let fields = source
        .columns
        .iter()
        .map(|col| Ok((col.name.clone(), infer_column(col)?)))
        .collect::<Result<Vec<_>>>()?;
    Schema::try_new(fields)
}

/// The interval unit a typed duration column would be declared with for the
/// given values.
///
/// Uses the finest unit needed across all values.
pub fn finest_interval_unit(values: &[ScalarValue]) -> Option<IntervalUnit> {
    values
        .iter()
        .filter_map(|v| match v {
            ScalarValue::Interval(i) => Some(i.unit),
            _ => None,
        })
        .reduce(IntervalUnit::finest)
}
