//! Client side columnar data.
//!
//! This is what callers hand to schema inference, `create_table`, and
//! `insert`. Typed arrays carry their element type statically, object arrays
//! hold arbitrary scalars and have their type inferred from the values.
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use half::f16;
use quarry_error::{DbError, Result};

use super::batch::{Array, Batch};
use super::datatype::IntervalUnit;
use super::field::Schema;
use super::scalar::{IntervalValue, ScalarValue, TimestampValue};

#[derive(Debug, Clone, PartialEq)]
pub enum NativeArray {
    Boolean(Vec<Option<bool>>),
    Int8(Vec<Option<i8>>),
    Int16(Vec<Option<i16>>),
    Int32(Vec<Option<i32>>),
    Int64(Vec<Option<i64>>),
    UInt8(Vec<Option<u8>>),
    UInt16(Vec<Option<u16>>),
    UInt32(Vec<Option<u32>>),
    UInt64(Vec<Option<u64>>),
    Float16(Vec<Option<f16>>),
    Float32(Vec<Option<f32>>),
    Float64(Vec<Option<f64>>),
    Utf8(Vec<Option<String>>),
    Binary(Vec<Option<Vec<u8>>>),
    Date(Vec<Option<NaiveDate>>),
    Time(Vec<Option<NaiveTime>>),
    /// Dictionary encoded strings.
    Categorical {
        categories: Vec<String>,
        codes: Vec<Option<u32>>,
    },
    Timestamp {
        timezone: Option<String>,
        values: Vec<Option<NaiveDateTime>>,
    },
    /// Durations stored as counts of `unit`.
    Duration {
        unit: IntervalUnit,
        values: Vec<Option<i64>>,
    },
    /// Untyped values. Type is inferred from the elements.
    Object(Vec<ScalarValue>),
}

impl NativeArray {
    pub fn len(&self) -> usize {
        match self {
            Self::Boolean(v) => v.len(),
            Self::Int8(v) => v.len(),
            Self::Int16(v) => v.len(),
            Self::Int32(v) => v.len(),
            Self::Int64(v) => v.len(),
            Self::UInt8(v) => v.len(),
            Self::UInt16(v) => v.len(),
            Self::UInt32(v) => v.len(),
            Self::UInt64(v) => v.len(),
            Self::Float16(v) => v.len(),
            Self::Float32(v) => v.len(),
            Self::Float64(v) => v.len(),
            Self::Utf8(v) => v.len(),
            Self::Binary(v) => v.len(),
            Self::Date(v) => v.len(),
            Self::Time(v) => v.len(),
            Self::Categorical { codes, .. } => codes.len(),
            Self::Timestamp { values, .. } => values.len(),
            Self::Duration { values, .. } => values.len(),
            Self::Object(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Count of null slots.
    pub fn null_count(&self) -> usize {
        fn nulls<T>(v: &[Option<T>]) -> usize {
            v.iter().filter(|v| v.is_none()).count()
        }

        match self {
            Self::Boolean(v) => nulls(v),
            Self::Int8(v) => nulls(v),
            Self::Int16(v) => nulls(v),
            Self::Int32(v) => nulls(v),
            Self::Int64(v) => nulls(v),
            Self::UInt8(v) => nulls(v),
            Self::UInt16(v) => nulls(v),
            Self::UInt32(v) => nulls(v),
            Self::UInt64(v) => nulls(v),
            Self::Float16(v) => nulls(v),
            Self::Float32(v) => nulls(v),
            Self::Float64(v) => nulls(v),
            Self::Utf8(v) => nulls(v),
            Self::Binary(v) => nulls(v),
            Self::Date(v) => nulls(v),
            Self::Time(v) => nulls(v),
            Self::Categorical { codes, .. } => nulls(codes),
            Self::Timestamp { values, .. } => nulls(values),
            Self::Duration { values, .. } => nulls(values),
            Self::Object(v) => v.iter().filter(|v| v.is_null()).count(),
        }
    }

    /// Convert every element to a scalar value.
    pub fn to_scalars(&self) -> Result<Vec<ScalarValue>> {
        fn conv<T: Clone + Into<ScalarValue>>(v: &[Option<T>]) -> Vec<ScalarValue> {
            v.iter().map(|v| v.clone().into()).collect()
        }

        Ok(match self {
            Self::Boolean(v) => conv(v),
            Self::Int8(v) => conv(v),
            Self::Int16(v) => conv(v),
            Self::Int32(v) => conv(v),
            Self::Int64(v) => conv(v),
            Self::UInt8(v) => conv(v),
            Self::UInt16(v) => conv(v),
            Self::UInt32(v) => conv(v),
            Self::UInt64(v) => conv(v),
            Self::Float16(v) => conv(v),
            Self::Float32(v) => conv(v),
            Self::Float64(v) => conv(v),
            Self::Utf8(v) => conv(v),
            Self::Binary(v) => conv(v),
            Self::Date(v) => conv(v),
            Self::Time(v) => conv(v),
            Self::Categorical { categories, codes } => codes
                .iter()
                .map(|code| match code {
                    Some(code) => categories
                        .get(*code as usize)
                        .map(|s| ScalarValue::Utf8(s.clone()))
                        .ok_or_else(|| {
                            DbError::schema(format!(
                                "Categorical code {code} out of range for {} categories",
                                categories.len()
                            ))
                        }),
                    None => Ok(ScalarValue::Null),
                })
                .collect::<Result<Vec<_>>>()?,
            Self::Timestamp { timezone, values } => values
                .iter()
                .map(|v| match v {
                    Some(v) => ScalarValue::Timestamp(TimestampValue {
                        value: *v,
                        timezone: timezone.clone(),
                    }),
                    None => ScalarValue::Null,
                })
                .collect(),
            Self::Duration { unit, values } => values
                .iter()
                .map(|v| match v {
                    Some(v) => ScalarValue::Interval(IntervalValue::new(*v, *unit)),
                    None => ScalarValue::Null,
                })
                .collect(),
            Self::Object(v) => v.clone(),
        })
    }
}

/// Native element types that map directly onto a typed array.
pub trait NativeType: Sized {
    fn into_array(values: Vec<Option<Self>>) -> NativeArray;
}

macro_rules! impl_native_type {
    ($native:ty, $variant:ident) => {
        impl NativeType for $native {
            fn into_array(values: Vec<Option<Self>>) -> NativeArray {
                NativeArray::$variant(values)
            }
        }
    };
}

impl_native_type!(bool, Boolean);
impl_native_type!(i8, Int8);
impl_native_type!(i16, Int16);
impl_native_type!(i32, Int32);
impl_native_type!(i64, Int64);
impl_native_type!(u8, UInt8);
impl_native_type!(u16, UInt16);
impl_native_type!(u32, UInt32);
impl_native_type!(u64, UInt64);
impl_native_type!(f16, Float16);
impl_native_type!(f32, Float32);
impl_native_type!(f64, Float64);
impl_native_type!(String, Utf8);
impl_native_type!(Vec<u8>, Binary);
impl_native_type!(NaiveDate, Date);
impl_native_type!(NaiveTime, Time);

impl NativeType for NaiveDateTime {
    fn into_array(values: Vec<Option<Self>>) -> NativeArray {
        NativeArray::Timestamp {
            timezone: None,
            values,
        }
    }
}

impl NativeType for &str {
    fn into_array(values: Vec<Option<Self>>) -> NativeArray {
        NativeArray::Utf8(values.into_iter().map(|v| v.map(|s| s.to_string())).collect())
    }
}

/// A named column of native values.
#[derive(Debug, Clone, PartialEq)]
pub struct NativeColumn {
    pub name: String,
    pub array: NativeArray,
    /// If the column was statically declared to never contain nulls.
    pub non_null: bool,
}

impl NativeColumn {
    pub fn new(name: impl Into<String>, array: NativeArray, non_null: bool) -> Self {
        NativeColumn {
            name: name.into(),
            array,
            non_null,
        }
    }

    /// Column built from plain values. Declared non-nullable.
    pub fn from_values<T: NativeType>(name: impl Into<String>, values: Vec<T>) -> Self {
        let values = values.into_iter().map(Some).collect();
        Self::new(name, T::into_array(values), true)
    }

    /// Column built from optional values. Nullable.
    pub fn from_options<T: NativeType>(name: impl Into<String>, values: Vec<Option<T>>) -> Self {
        Self::new(name, T::into_array(values), false)
    }

    pub fn objects(name: impl Into<String>, values: Vec<ScalarValue>) -> Self {
        Self::new(name, NativeArray::Object(values), false)
    }

    pub fn categorical<S: Into<String>>(
        name: impl Into<String>,
        values: impl IntoIterator<Item = S>,
    ) -> Self {
        let mut categories: Vec<String> = Vec::new();
        let mut codes = Vec::new();
        for v in values {
            let v = v.into();
            let code = match categories.iter().position(|c| c == &v) {
                Some(pos) => pos,
                None => {
                    categories.push(v);
                    categories.len() - 1
                }
            };
            codes.push(Some(code as u32));
        }
        Self::new(name, NativeArray::Categorical { categories, codes }, false)
    }

    pub fn timestamps_tz(
        name: impl Into<String>,
        timezone: impl Into<String>,
        values: Vec<Option<NaiveDateTime>>,
    ) -> Self {
        let non_null = values.iter().all(|v| v.is_some());
        Self::new(
            name,
            NativeArray::Timestamp {
                timezone: Some(timezone.into()),
                values,
            },
            non_null,
        )
    }

    pub fn durations(name: impl Into<String>, unit: IntervalUnit, values: Vec<i64>) -> Self {
        Self::new(
            name,
            NativeArray::Duration {
                unit,
                values: values.into_iter().map(Some).collect(),
            },
            true,
        )
    }

    pub fn len(&self) -> usize {
        self.array.len()
    }

    pub fn is_empty(&self) -> bool {
        self.array.is_empty()
    }
}

/// An ordered set of equal-length native columns.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ColumnarSource {
    pub columns: Vec<NativeColumn>,
}

impl ColumnarSource {
    pub fn new(columns: Vec<NativeColumn>) -> Result<Self> {
        if let Some(first) = columns.first() {
            for col in &columns {
                if col.len() != first.len() {
                    return Err(DbError::schema(format!(
                        "Column '{}' has {} rows, expected {}",
                        col.name,
                        col.len(),
                        first.len()
                    )));
                }
            }
        }
        Ok(ColumnarSource { columns })
    }

    pub fn num_rows(&self) -> usize {
        self.columns.first().map(|c| c.len()).unwrap_or(0)
    }

    pub fn column(&self, name: &str) -> Option<&NativeColumn> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// Convert to a batch with columns in `schema` order, matched by name.
    pub fn to_batch(&self, schema: &Schema) -> Result<Batch> {
        let arrays = schema
            .iter()
            .map(|(name, datatype)| {
                let column = self.column(name).ok_or_else(|| {
                    DbError::schema(format!("Missing column '{name}' in source data"))
                })?;
                Ok(Array::new(datatype.clone(), column.array.to_scalars()?))
            })
            .collect::<Result<Vec<_>>>()?;

        if arrays.is_empty() {
            return Ok(Batch::empty_with_num_rows(self.num_rows()));
        }
        Batch::try_new(arrays)
    }

    /// Take the first `n` rows.
    pub fn head(&self, n: usize) -> Result<Self> {
        let columns = self
            .columns
            .iter()
            .map(|c| {
                let vals = c.array.to_scalars()?;
                let vals = vals.into_iter().take(n).collect();
                // Keep the typed representation when we can, otherwise fall
                // back to objects.
                let array = match &c.array {
                    NativeArray::Object(_) => NativeArray::Object(vals),
                    other => truncate_typed(other, n),
                };
                Ok(NativeColumn::new(c.name.clone(), array, c.non_null))
            })
            .collect::<Result<Vec<_>>>()?;
        ColumnarSource::new(columns)
    }
}

fn truncate_typed(array: &NativeArray, n: usize) -> NativeArray {
    fn t<T: Clone>(v: &[T], n: usize) -> Vec<T> {
        v.iter().take(n).cloned().collect()
    }

    match array {
        NativeArray::Boolean(v) => NativeArray::Boolean(t(v, n)),
        NativeArray::Int8(v) => NativeArray::Int8(t(v, n)),
        NativeArray::Int16(v) => NativeArray::Int16(t(v, n)),
        NativeArray::Int32(v) => NativeArray::Int32(t(v, n)),
        NativeArray::Int64(v) => NativeArray::Int64(t(v, n)),
        NativeArray::UInt8(v) => NativeArray::UInt8(t(v, n)),
        NativeArray::UInt16(v) => NativeArray::UInt16(t(v, n)),
        NativeArray::UInt32(v) => NativeArray::UInt32(t(v, n)),
        NativeArray::UInt64(v) => NativeArray::UInt64(t(v, n)),
        NativeArray::Float16(v) => NativeArray::Float16(t(v, n)),
        NativeArray::Float32(v) => NativeArray::Float32(t(v, n)),
        NativeArray::Float64(v) => NativeArray::Float64(t(v, n)),
        NativeArray::Utf8(v) => NativeArray::Utf8(t(v, n)),
        NativeArray::Binary(v) => NativeArray::Binary(t(v, n)),
        NativeArray::Date(v) => NativeArray::Date(t(v, n)),
        NativeArray::Time(v) => NativeArray::Time(t(v, n)),
        NativeArray::Categorical { categories, codes } => NativeArray::Categorical {
            categories: categories.clone(),
            codes: t(codes, n),
        },
        NativeArray::Timestamp { timezone, values } => NativeArray::Timestamp {
            timezone: timezone.clone(),
            values: t(values, n),
        },
        NativeArray::Duration { unit, values } => NativeArray::Duration {
            unit: *unit,
            values: t(values, n),
        },
        NativeArray::Object(v) => NativeArray::Object(t(v, n)),
    }
}
