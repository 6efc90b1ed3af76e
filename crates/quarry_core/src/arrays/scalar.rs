use std::cmp::Ordering;
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use half::f16;
use quarry_error::{DbError, Result};
use serde::{Deserialize, Serialize};

use super::datatype::IntervalUnit;

/// A decimal value stored as an unscaled integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DecimalValue {
    pub value: i128,
    pub scale: u8,
}

impl DecimalValue {
    pub const fn new(value: i128, scale: u8) -> Self {
        DecimalValue { value, scale }
    }

    /// Number of significant digits in the unscaled value.
    ///
    /// Always at least `scale + 1` so "0.5" reports a precision of 2.
    pub fn precision(&self) -> u8 {
        let mut digits = 0u8;
        let mut v = self.value.unsigned_abs();
        while v > 0 {
            digits += 1;
            v /= 10;
        }
        digits.max(self.scale + 1)
    }

    pub fn to_f64(&self) -> f64 {
        self.value as f64 / 10f64.powi(self.scale as i32)
    }
}

impl fmt::Display for DecimalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.scale == 0 {
            return write!(f, "{}", self.value);
        }
        let pow = 10i128.pow(self.scale as u32);
        let sign = if self.value < 0 { "-" } else { "" };
        let abs = self.value.unsigned_abs();
        let pow = pow.unsigned_abs();
        write!(
            f,
            "{sign}{}.{:0width$}",
            abs / pow,
            abs % pow,
            width = self.scale as usize
        )
    }
}

/// A timestamp with an optional timezone name.
///
/// The wall clock value is stored in UTC when a timezone is present.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimestampValue {
    pub value: NaiveDateTime,
    pub timezone: Option<String>,
}

/// An interval expressed as a count of a single unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IntervalValue {
    pub value: i64,
    pub unit: IntervalUnit,
}

impl IntervalValue {
    pub const fn new(value: i64, unit: IntervalUnit) -> Self {
        IntervalValue { value, unit }
    }

    /// Create an interval from a time delta, using the finest unit that has a
    /// non-zero component.
    ///
    /// "1 day" is expressed in days, "-1 day 2 min 3us" in microseconds.
    pub fn from_time_delta(delta: TimeDelta) -> Self {
        // Nanos won't overflow for deltas within ~292 years.
        let nanos = delta.num_nanoseconds().unwrap_or(i64::MAX);
        let units = [
            IntervalUnit::Day,
            IntervalUnit::Hour,
            IntervalUnit::Minute,
            IntervalUnit::Second,
            IntervalUnit::Millisecond,
            IntervalUnit::Microsecond,
        ];
        for unit in units {
            // Units listed all have a fixed length.
            let per = unit.nanos().unwrap_or(1);
            if nanos % per == 0 {
                return IntervalValue::new(nanos / per, unit);
            }
        }
        IntervalValue::new(nanos, IntervalUnit::Nanosecond)
    }

    /// Total nanoseconds, None for calendar units.
    pub fn as_nanos(&self) -> Option<i64> {
        self.unit.nanos().and_then(|n| self.value.checked_mul(n))
    }
}

/// A single owned scalar value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ScalarValue {
    Null,
    Boolean(bool),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    Float16(f16),
    Float32(f32),
    Float64(f64),
    Decimal(DecimalValue),
    Utf8(String),
    Binary(Vec<u8>),
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(TimestampValue),
    Interval(IntervalValue),
    List(Vec<ScalarValue>),
    Struct(Vec<(String, ScalarValue)>),
}

impl ScalarValue {
    pub const fn is_null(&self) -> bool {
        matches!(self, ScalarValue::Null)
    }

    pub fn timestamp(value: NaiveDateTime) -> Self {
        ScalarValue::Timestamp(TimestampValue {
            value,
            timezone: None,
        })
    }

    pub fn timestamp_tz(value: NaiveDateTime, timezone: impl Into<String>) -> Self {
        ScalarValue::Timestamp(TimestampValue {
            value,
            timezone: Some(timezone.into()),
        })
    }

    pub fn list<T: Into<ScalarValue>>(values: impl IntoIterator<Item = T>) -> Self {
        ScalarValue::List(values.into_iter().map(Into::into).collect())
    }

    pub fn interval(delta: TimeDelta) -> Self {
        ScalarValue::Interval(IntervalValue::from_time_delta(delta))
    }

    pub fn try_as_bool(&self) -> Result<bool> {
        match self {
            Self::Boolean(b) => Ok(*b),
            other => Err(DbError::new(format!("Not a bool: {other}"))),
        }
    }

    /// Get the value as an i128 if this is an integer.
    pub fn try_as_i128(&self) -> Result<i128> {
        Ok(match self {
            Self::Int8(v) => *v as i128,
            Self::Int16(v) => *v as i128,
            Self::Int32(v) => *v as i128,
            Self::Int64(v) => *v as i128,
            Self::UInt8(v) => *v as i128,
            Self::UInt16(v) => *v as i128,
            Self::UInt32(v) => *v as i128,
            Self::UInt64(v) => *v as i128,
            other => return Err(DbError::new(format!("Not an integer: {other}"))),
        })
    }

    pub fn try_as_i64(&self) -> Result<i64> {
        let v = self.try_as_i128()?;
        i64::try_from(v).map_err(|_| DbError::new(format!("Integer out of range for i64: {v}")))
    }

    pub fn try_as_u64(&self) -> Result<u64> {
        let v = self.try_as_i128()?;
        u64::try_from(v).map_err(|_| DbError::new(format!("Integer out of range for u64: {v}")))
    }

    /// Get the value as an f64 if this is any numeric value.
    pub fn try_as_f64(&self) -> Result<f64> {
        Ok(match self {
            Self::Float16(v) => v.to_f64(),
            Self::Float32(v) => *v as f64,
            Self::Float64(v) => *v,
            Self::Decimal(v) => v.to_f64(),
            other => other.try_as_i128()? as f64,
        })
    }

    pub fn try_as_str(&self) -> Result<&str> {
        match self {
            Self::Utf8(s) => Ok(s),
            other => Err(DbError::new(format!("Not a string: {other}"))),
        }
    }

    pub fn try_into_string(self) -> Result<String> {
        match self {
            Self::Utf8(s) => Ok(s),
            other => Err(DbError::new(format!("Not a string: {other}"))),
        }
    }

    const fn is_integer(&self) -> bool {
        matches!(
            self,
            Self::Int8(_)
                | Self::Int16(_)
                | Self::Int32(_)
                | Self::Int64(_)
                | Self::UInt8(_)
                | Self::UInt16(_)
                | Self::UInt32(_)
                | Self::UInt64(_)
        )
    }

    const fn is_numeric(&self) -> bool {
        self.is_integer()
            || matches!(
                self,
                Self::Float16(_) | Self::Float32(_) | Self::Float64(_) | Self::Decimal(_)
            )
    }

    /// Total ordering used for sorting.
    ///
    /// Nulls sort last. Numeric values compare across widths. Values of
    /// unrelated kinds compare equal.
    pub fn sort_cmp(&self, other: &ScalarValue) -> Ordering {
        match (self, other) {
            (Self::Null, Self::Null) => Ordering::Equal,
            (Self::Null, _) => Ordering::Greater,
            (_, Self::Null) => Ordering::Less,
            _ => self.partial_cmp_value(other).unwrap_or(Ordering::Equal),
        }
    }

    /// SQL-style comparison. Returns None if either side is null or the
    /// values aren't comparable.
    pub fn partial_cmp_value(&self, other: &ScalarValue) -> Option<Ordering> {
        match (self, other) {
            (Self::Null, _) | (_, Self::Null) => None,
            (a, b) if a.is_integer() && b.is_integer() => {
                Some(a.try_as_i128().ok()?.cmp(&b.try_as_i128().ok()?))
            }
            (a, b) if a.is_numeric() && b.is_numeric() => {
                a.try_as_f64().ok()?.partial_cmp(&b.try_as_f64().ok()?)
            }
            (Self::Boolean(a), Self::Boolean(b)) => Some(a.cmp(b)),
            (Self::Utf8(a), Self::Utf8(b)) => Some(a.cmp(b)),
            (Self::Binary(a), Self::Binary(b)) => Some(a.cmp(b)),
            (Self::Date(a), Self::Date(b)) => Some(a.cmp(b)),
            (Self::Time(a), Self::Time(b)) => Some(a.cmp(b)),
            (Self::Timestamp(a), Self::Timestamp(b)) => Some(a.value.cmp(&b.value)),
            (Self::Interval(a), Self::Interval(b)) => {
                Some(a.as_nanos()?.cmp(&b.as_nanos()?))
            }
            (Self::List(a), Self::List(b)) => {
                for (a, b) in a.iter().zip(b) {
                    match a.partial_cmp_value(b)? {
                        Ordering::Equal => continue,
                        other => return Some(other),
                    }
                }
                Some(a.len().cmp(&b.len()))
            }
            _ => None,
        }
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Boolean(v) => write!(f, "{v}"),
            Self::Int8(v) => write!(f, "{v}"),
            Self::Int16(v) => write!(f, "{v}"),
            Self::Int32(v) => write!(f, "{v}"),
            Self::Int64(v) => write!(f, "{v}"),
            Self::UInt8(v) => write!(f, "{v}"),
            Self::UInt16(v) => write!(f, "{v}"),
            Self::UInt32(v) => write!(f, "{v}"),
            Self::UInt64(v) => write!(f, "{v}"),
            Self::Float16(v) => write!(f, "{v}"),
            Self::Float32(v) => write!(f, "{v}"),
            Self::Float64(v) => write!(f, "{v}"),
            Self::Decimal(v) => write!(f, "{v}"),
            Self::Utf8(v) => write!(f, "{v}"),
            Self::Binary(v) => {
                write!(f, "\\x")?;
                for b in v {
                    write!(f, "{b:02x}")?;
                }
                Ok(())
            }
            Self::Date(v) => write!(f, "{v}"),
            Self::Time(v) => write!(f, "{v}"),
            Self::Timestamp(v) => match &v.timezone {
                Some(tz) => write!(f, "{} {tz}", v.value),
                None => write!(f, "{}", v.value),
            },
            Self::Interval(v) => write!(f, "{} {}", v.value, v.unit),
            Self::List(vals) => {
                write!(f, "[")?;
                for (idx, v) in vals.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{v}")?;
                }
                write!(f, "]")
            }
            Self::Struct(fields) => {
                write!(f, "{{")?;
                for (idx, (name, v)) in fields.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{name}: {v}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

macro_rules! impl_from {
    ($native:ty, $variant:ident) => {
        impl From<$native> for ScalarValue {
            fn from(value: $native) -> Self {
                ScalarValue::$variant(value)
            }
        }
    };
}

impl_from!(bool, Boolean);
impl_from!(i8, Int8);
impl_from!(i16, Int16);
impl_from!(i32, Int32);
impl_from!(i64, Int64);
impl_from!(u8, UInt8);
impl_from!(u16, UInt16);
impl_from!(u32, UInt32);
impl_from!(u64, UInt64);
impl_from!(f16, Float16);
impl_from!(f32, Float32);
impl_from!(f64, Float64);
impl_from!(DecimalValue, Decimal);
impl_from!(String, Utf8);
impl_from!(Vec<u8>, Binary);
impl_from!(NaiveDate, Date);
impl_from!(NaiveTime, Time);
impl_from!(IntervalValue, Interval);

impl From<&str> for ScalarValue {
    fn from(value: &str) -> Self {
        ScalarValue::Utf8(value.to_string())
    }
}

impl From<NaiveDateTime> for ScalarValue {
    fn from(value: NaiveDateTime) -> Self {
        ScalarValue::timestamp(value)
    }
}

impl<T: Into<ScalarValue>> From<Option<T>> for ScalarValue {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => v.into(),
            None => ScalarValue::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decimal_precision() {
        assert_eq!(2, DecimalValue::new(10, 1).precision());
        assert_eq!(2, DecimalValue::new(5, 1).precision());
        assert_eq!(5, DecimalValue::new(-12345, 2).precision());
        assert_eq!("-123.45", DecimalValue::new(-12345, 2).to_string());
        assert_eq!("0.05", DecimalValue::new(5, 2).to_string());
    }

    #[test]
    fn interval_finest_unit() {
        assert_eq!(
            IntervalValue::new(1, IntervalUnit::Day),
            IntervalValue::from_time_delta(TimeDelta::days(1))
        );

        let delta = TimeDelta::days(-1) + TimeDelta::minutes(2) + TimeDelta::microseconds(3);
        assert_eq!(
            IntervalUnit::Microsecond,
            IntervalValue::from_time_delta(delta).unit
        );

        let delta = TimeDelta::seconds(1) + TimeDelta::nanoseconds(7);
        assert_eq!(
            IntervalUnit::Nanosecond,
            IntervalValue::from_time_delta(delta).unit
        );
    }

    #[test]
    fn cross_width_comparison() {
        let a = ScalarValue::Int8(5);
        let b = ScalarValue::UInt64(5);
        assert_eq!(Some(Ordering::Equal), a.partial_cmp_value(&b));

        let c = ScalarValue::Float64(5.5);
        assert_eq!(Some(Ordering::Less), a.partial_cmp_value(&c));
    }

    #[test]
    fn nulls_sort_last() {
        let mut vals = vec![ScalarValue::Null, ScalarValue::Int32(3), ScalarValue::Int32(1)];
        vals.sort_by(|a, b| a.sort_cmp(b));
        assert_eq!(vec![ScalarValue::Int32(1), ScalarValue::Int32(3), ScalarValue::Null], vals);
    }
}
