use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use super::datatype::IntervalUnit;
use super::scalar::ScalarValue;

/// Hashable form of a scalar value, used for join keys, group keys and
/// distinct counting.
///
/// Numeric values are normalized so that values equal under SQL comparison
/// produce equal keys, e.g. `Int32(1)`, `Int64(1)`, `Float64(1.0)` and
/// `Decimal(100, scale=2)` are all the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HashKey {
    Null,
    Boolean(bool),
    Int(i128),
    /// Non-integral float, stored as its bit pattern.
    Float(u64),
    /// Decimal with trailing zeros removed from the fraction.
    Decimal { value: i128, scale: u8 },
    Utf8(String),
    Binary(Vec<u8>),
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(NaiveDateTime),
    Interval { value: i64, unit: IntervalUnit },
    List(Vec<HashKey>),
    Struct(Vec<(String, HashKey)>),
}

impl HashKey {
    pub const fn is_null(&self) -> bool {
        matches!(self, HashKey::Null)
    }

    fn from_float(v: f64) -> Self {
        if v.fract() == 0.0 && v.abs() < i64::MAX as f64 {
            return HashKey::Int(v as i128);
        }
        if v.is_nan() {
            return HashKey::Float(f64::NAN.to_bits());
        }
        HashKey::Float(v.to_bits())
    }

    fn from_decimal(mut value: i128, mut scale: u8) -> Self {
        while scale > 0 && value % 10 == 0 {
            value /= 10;
            scale -= 1;
        }
        if scale == 0 {
            HashKey::Int(value)
        } else {
            HashKey::Decimal { value, scale }
        }
    }
}

impl From<&ScalarValue> for HashKey {
    fn from(value: &ScalarValue) -> Self {
        match value {
            ScalarValue::Null => HashKey::Null,
            ScalarValue::Boolean(v) => HashKey::Boolean(*v),
            ScalarValue::Int8(v) => HashKey::Int(*v as i128),
            ScalarValue::Int16(v) => HashKey::Int(*v as i128),
            ScalarValue::Int32(v) => HashKey::Int(*v as i128),
            ScalarValue::Int64(v) => HashKey::Int(*v as i128),
            ScalarValue::UInt8(v) => HashKey::Int(*v as i128),
            ScalarValue::UInt16(v) => HashKey::Int(*v as i128),
            ScalarValue::UInt32(v) => HashKey::Int(*v as i128),
            ScalarValue::UInt64(v) => HashKey::Int(*v as i128),
            ScalarValue::Float16(v) => HashKey::from_float(v.to_f64()),
            ScalarValue::Float32(v) => HashKey::from_float(*v as f64),
            ScalarValue::Float64(v) => HashKey::from_float(*v),
            ScalarValue::Decimal(v) => HashKey::from_decimal(v.value, v.scale),
            ScalarValue::Utf8(v) => HashKey::Utf8(v.clone()),
            ScalarValue::Binary(v) => HashKey::Binary(v.clone()),
            ScalarValue::Date(v) => HashKey::Date(*v),
            ScalarValue::Time(v) => HashKey::Time(*v),
            ScalarValue::Timestamp(v) => HashKey::Timestamp(v.value),
            ScalarValue::Interval(v) => match v.as_nanos() {
                Some(nanos) => HashKey::Interval {
                    value: nanos,
                    unit: IntervalUnit::Nanosecond,
                },
                None => HashKey::Interval {
                    value: v.value,
                    unit: v.unit,
                },
            },
            ScalarValue::List(v) => HashKey::List(v.iter().map(HashKey::from).collect()),
            ScalarValue::Struct(v) => HashKey::Struct(
                v.iter()
                    .map(|(name, val)| (name.clone(), HashKey::from(val)))
                    .collect(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arrays::scalar::{DecimalValue, IntervalValue};

    #[test]
    fn numeric_normalization() {
        let expected = HashKey::Int(1);
        assert_eq!(expected, HashKey::from(&ScalarValue::Int32(1)));
        assert_eq!(expected, HashKey::from(&ScalarValue::UInt64(1)));
        assert_eq!(expected, HashKey::from(&ScalarValue::Float64(1.0)));
        assert_eq!(
            expected,
            HashKey::from(&ScalarValue::Decimal(DecimalValue::new(100, 2)))
        );

        assert_eq!(
            HashKey::from(&ScalarValue::Decimal(DecimalValue::new(150, 2))),
            HashKey::from(&ScalarValue::Decimal(DecimalValue::new(15, 1)))
        );
        assert_ne!(
            HashKey::from(&ScalarValue::Float64(1.5)),
            HashKey::from(&ScalarValue::Int32(1))
        );
    }

    #[test]
    fn interval_normalization() {
        let day = ScalarValue::Interval(IntervalValue::new(1, IntervalUnit::Day));
        let hours = ScalarValue::Interval(IntervalValue::new(24, IntervalUnit::Hour));
        assert_eq!(HashKey::from(&day), HashKey::from(&hours));
    }
}
