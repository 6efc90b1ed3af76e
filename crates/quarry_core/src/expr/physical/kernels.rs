//! Row-at-a-time kernels for evaluating scalar operators.
//!
//! Every kernel follows SQL null semantics: a null input produces a null
//! output, except for the null checks and boolean conjunctions.

use std::cmp::Ordering;

use chrono::{Months, NaiveDateTime, TimeDelta};
use half::f16;
use quarry_error::{DbError, OptionExt, Result};

use crate::arrays::datatype::{DataType, DataTypeKind, IntervalUnit};
use crate::arrays::scalar::{DecimalValue, IntervalValue, ScalarValue, TimestampValue};
use crate::expr::arith_expr::ArithOperator;
use crate::expr::comparison_expr::ComparisonOperator;
use crate::expr::conjunction_expr::ConjunctionOperator;
use crate::expr::negate_expr::UnaryOperator;

/// Apply an arithmetic operator, producing a value of `datatype`.
///
/// `datatype` is the operator's return type for the input types.
pub fn eval_arith(
    op: ArithOperator,
    left: &ScalarValue,
    right: &ScalarValue,
    datatype: &DataType,
) -> Result<ScalarValue> {
    if left.is_null() || right.is_null() {
        return Ok(ScalarValue::Null);
    }

    match &datatype.kind {
        _ if datatype.is_floating() => {
            let (a, b) = (left.try_as_f64()?, right.try_as_f64()?);
            let v = match op {
                ArithOperator::Add => a + b,
                ArithOperator::Sub => a - b,
                ArithOperator::Mul => a * b,
                ArithOperator::Div => a / b,
                ArithOperator::Mod => a % b,
            };
            Ok(float_scalar(v, datatype))
        }
        _ if datatype.is_integer() => {
            let (a, b) = (left.try_as_i128()?, right.try_as_i128()?);
            let v = match op {
                ArithOperator::Add => a.checked_add(b),
                ArithOperator::Sub => a.checked_sub(b),
                ArithOperator::Mul => a.checked_mul(b),
                ArithOperator::Div | ArithOperator::Mod if b == 0 => {
                    return Ok(ScalarValue::Null);
                }
                ArithOperator::Div => a.checked_div(b),
                ArithOperator::Mod => a.checked_rem(b),
            };
            let v = v.ok_or_else(|| overflow(left, op, right))?;
            integer_scalar(v, datatype)
        }
        DataTypeKind::Decimal(meta) => {
            let scale = meta.scale;
            let (a, b) = (to_decimal(left, scale)?, to_decimal(right, scale)?);
            let v = match op {
                ArithOperator::Add => a.checked_add(b),
                ArithOperator::Sub => a.checked_sub(b),
                ArithOperator::Mul => a.checked_mul(b).map(|v| v / 10i128.pow(scale as u32)),
                ArithOperator::Div | ArithOperator::Mod if b == 0 => {
                    return Ok(ScalarValue::Null);
                }
                ArithOperator::Div => a
                    .checked_mul(10i128.pow(scale as u32))
                    .and_then(|a| a.checked_div(b)),
                ArithOperator::Mod => a.checked_rem(b),
            };
            let v = v.ok_or_else(|| overflow(left, op, right))?;
            Ok(ScalarValue::Decimal(DecimalValue::new(v, scale)))
        }
        DataTypeKind::Interval(unit) => interval_arith(op, left, right, *unit),
        DataTypeKind::Timestamp(_) | DataTypeKind::Date => temporal_arith(op, left, right),
        _ => Err(DbError::expression(format!(
            "Cannot evaluate {left} {op} {right} as {datatype}"
        ))),
    }
}

fn overflow(left: &ScalarValue, op: ArithOperator, right: &ScalarValue) -> DbError {
    DbError::expression(format!("Overflow evaluating {left} {op} {right}"))
}

fn float_scalar(v: f64, datatype: &DataType) -> ScalarValue {
    match datatype.kind {
        DataTypeKind::Float16 => ScalarValue::Float16(f16::from_f64(v)),
        DataTypeKind::Float32 => ScalarValue::Float32(v as f32),
        _ => ScalarValue::Float64(v),
    }
}

fn integer_scalar(v: i128, datatype: &DataType) -> Result<ScalarValue> {
    let out_of_range = || DbError::expression(format!("Integer {v} out of range for {datatype}"));
    Ok(match datatype.kind {
        DataTypeKind::Int8 => ScalarValue::Int8(v.try_into().map_err(|_| out_of_range())?),
        DataTypeKind::Int16 => ScalarValue::Int16(v.try_into().map_err(|_| out_of_range())?),
        DataTypeKind::Int32 => ScalarValue::Int32(v.try_into().map_err(|_| out_of_range())?),
        DataTypeKind::Int64 => ScalarValue::Int64(v.try_into().map_err(|_| out_of_range())?),
        DataTypeKind::UInt8 => ScalarValue::UInt8(v.try_into().map_err(|_| out_of_range())?),
        DataTypeKind::UInt16 => ScalarValue::UInt16(v.try_into().map_err(|_| out_of_range())?),
        DataTypeKind::UInt32 => ScalarValue::UInt32(v.try_into().map_err(|_| out_of_range())?),
        DataTypeKind::UInt64 => ScalarValue::UInt64(v.try_into().map_err(|_| out_of_range())?),
        _ => return Err(DbError::expression(format!("{datatype} is not an integer type"))),
    })
}

/// Unscaled value of a numeric scalar at the given scale.
fn to_decimal(value: &ScalarValue, scale: u8) -> Result<i128> {
    let (raw, from) = match value {
        ScalarValue::Decimal(d) => (d.value, d.scale),
        other => (other.try_as_i128()?, 0),
    };
    if scale >= from {
        raw.checked_mul(10i128.pow((scale - from) as u32))
            .required("decimal within range")
    } else {
        Ok(raw / 10i128.pow((from - scale) as u32))
    }
}

/// Cast a numeric (or interval) value to a numeric type of the same family
/// or wider.
pub fn cast_numeric(value: &ScalarValue, datatype: &DataType) -> Result<ScalarValue> {
    if value.is_null() {
        return Ok(ScalarValue::Null);
    }
    match &datatype.kind {
        _ if datatype.is_floating() => Ok(float_scalar(value.try_as_f64()?, datatype)),
        _ if datatype.is_integer() => integer_scalar(value.try_as_i128()?, datatype),
        DataTypeKind::Decimal(meta) => Ok(ScalarValue::Decimal(DecimalValue::new(
            to_decimal(value, meta.scale)?,
            meta.scale,
        ))),
        DataTypeKind::Interval(unit) => match value {
            ScalarValue::Interval(iv) => Ok(ScalarValue::Interval(IntervalValue::new(
                convert_interval(iv, *unit)?,
                *unit,
            ))),
            other => Err(DbError::expression(format!("Cannot cast {other} to {datatype}"))),
        },
        _ => Err(DbError::expression(format!(
            "Cannot cast {value} to {datatype}"
        ))),
    }
}

const fn months_per(unit: IntervalUnit) -> Option<i64> {
    match unit {
        IntervalUnit::Year => Some(12),
        IntervalUnit::Quarter => Some(3),
        IntervalUnit::Month => Some(1),
        _ => None,
    }
}

/// Express an interval as a count of `unit`, truncating.
fn convert_interval(interval: &IntervalValue, unit: IntervalUnit) -> Result<i64> {
    if interval.unit == unit {
        return Ok(interval.value);
    }
    match (interval.unit.nanos(), unit.nanos()) {
        (Some(from), Some(to)) => interval
            .value
            .checked_mul(from)
            .map(|nanos| nanos / to)
            .required("interval within range"),
        (None, None) => {
            // Both calendar units.
            let from = months_per(interval.unit).unwrap_or(1);
            let to = months_per(unit).unwrap_or(1);
            interval
                .value
                .checked_mul(from)
                .map(|months| months / to)
                .required("interval within range")
        }
        _ => Err(DbError::expression(format!(
            "Cannot combine calendar and fixed length intervals: {} {} to {}",
            interval.value, interval.unit, unit
        ))),
    }
}

fn interval_arith(
    op: ArithOperator,
    left: &ScalarValue,
    right: &ScalarValue,
    unit: IntervalUnit,
) -> Result<ScalarValue> {
    let value = match (op, left, right) {
        (ArithOperator::Sub, ScalarValue::Timestamp(a), ScalarValue::Timestamp(b)) => (a.value
            - b.value)
            .num_nanoseconds()
            .required("timestamp difference within range")?,
        (ArithOperator::Sub, ScalarValue::Date(a), ScalarValue::Date(b)) => (*a - *b).num_days(),
        (ArithOperator::Add, ScalarValue::Interval(a), ScalarValue::Interval(b)) => {
            convert_interval(a, unit)?
                .checked_add(convert_interval(b, unit)?)
                .ok_or_else(|| overflow(left, op, right))?
        }
        (ArithOperator::Sub, ScalarValue::Interval(a), ScalarValue::Interval(b)) => {
            convert_interval(a, unit)?
                .checked_sub(convert_interval(b, unit)?)
                .ok_or_else(|| overflow(left, op, right))?
        }
        (ArithOperator::Mul, ScalarValue::Interval(a), n)
        | (ArithOperator::Mul, n, ScalarValue::Interval(a)) => a
            .value
            .checked_mul(n.try_as_i64()?)
            .ok_or_else(|| overflow(left, op, right))?,
        _ => {
            return Err(DbError::expression(format!(
                "Cannot evaluate {left} {op} {right} as an interval"
            )));
        }
    };
    Ok(ScalarValue::Interval(IntervalValue::new(value, unit)))
}

fn temporal_arith(
    op: ArithOperator,
    left: &ScalarValue,
    right: &ScalarValue,
) -> Result<ScalarValue> {
    let negate = match op {
        ArithOperator::Add => false,
        ArithOperator::Sub => true,
        _ => {
            return Err(DbError::expression(format!(
                "Cannot evaluate {left} {op} {right}"
            )));
        }
    };

    match (left, right) {
        (ScalarValue::Timestamp(ts), ScalarValue::Interval(iv))
        | (ScalarValue::Interval(iv), ScalarValue::Timestamp(ts))
            if !(negate && matches!(left, ScalarValue::Interval(_))) =>
        {
            Ok(ScalarValue::Timestamp(TimestampValue {
                value: shift_datetime(ts.value, iv, negate)?,
                timezone: ts.timezone.clone(),
            }))
        }
        (ScalarValue::Date(d), ScalarValue::Interval(iv))
        | (ScalarValue::Interval(iv), ScalarValue::Date(d))
            if !(negate && matches!(left, ScalarValue::Interval(_))) =>
        {
            let midnight = d.and_hms_opt(0, 0, 0).required("midnight")?;
            Ok(ScalarValue::Date(shift_datetime(midnight, iv, negate)?.date()))
        }
        _ => Err(DbError::expression(format!(
            "Cannot evaluate {left} {op} {right}"
        ))),
    }
}

fn shift_datetime(
    value: NaiveDateTime,
    interval: &IntervalValue,
    negate: bool,
) -> Result<NaiveDateTime> {
    let amount = if negate {
        interval.value.checked_neg()
    } else {
        Some(interval.value)
    };

    let shifted = amount.and_then(|amount| match months_per(interval.unit) {
        Some(per) => {
            let months = amount.checked_mul(per)?;
            let delta = Months::new(u32::try_from(months.unsigned_abs()).ok()?);
            if months >= 0 {
                value.checked_add_months(delta)
            } else {
                value.checked_sub_months(delta)
            }
        }
        None => {
            let nanos = amount.checked_mul(interval.unit.nanos()?)?;
            value.checked_add_signed(TimeDelta::nanoseconds(nanos))
        }
    });

    shifted.ok_or_else(|| {
        DbError::expression(format!(
            "Datetime out of range shifting {value} by {} {}",
            interval.value, interval.unit
        ))
    })
}

pub fn eval_comparison(
    op: ComparisonOperator,
    left: &ScalarValue,
    right: &ScalarValue,
) -> ScalarValue {
    let ord = match left.partial_cmp_value(right) {
        Some(ord) => ord,
        None => return ScalarValue::Null,
    };
    let result = match op {
        ComparisonOperator::Eq => ord == Ordering::Equal,
        ComparisonOperator::NotEq => ord != Ordering::Equal,
        ComparisonOperator::Lt => ord == Ordering::Less,
        ComparisonOperator::LtEq => ord != Ordering::Greater,
        ComparisonOperator::Gt => ord == Ordering::Greater,
        ComparisonOperator::GtEq => ord != Ordering::Less,
    };
    ScalarValue::Boolean(result)
}

/// Three-valued AND/OR over already evaluated inputs.
pub fn eval_conjunction(
    op: ConjunctionOperator,
    values: impl IntoIterator<Item = ScalarValue>,
) -> Result<ScalarValue> {
    // The value that short circuits the conjunction.
    let decisive = matches!(op, ConjunctionOperator::Or);
    let mut saw_null = false;

    for value in values {
        match value {
            ScalarValue::Null => saw_null = true,
            ScalarValue::Boolean(b) if b == decisive => return Ok(ScalarValue::Boolean(b)),
            ScalarValue::Boolean(_) => (),
            other => {
                return Err(DbError::expression(format!(
                    "{op} expects boolean inputs, got {other}"
                )));
            }
        }
    }

    if saw_null {
        Ok(ScalarValue::Null)
    } else {
        Ok(ScalarValue::Boolean(!decisive))
    }
}

pub fn eval_unary(op: UnaryOperator, value: &ScalarValue) -> Result<ScalarValue> {
    Ok(match op {
        UnaryOperator::IsNull => ScalarValue::Boolean(value.is_null()),
        UnaryOperator::IsNotNull => ScalarValue::Boolean(!value.is_null()),
        _ if value.is_null() => ScalarValue::Null,
        UnaryOperator::Not => ScalarValue::Boolean(!value.try_as_bool()?),
        UnaryOperator::Negate => negate(value)?,
    })
}

fn negate(value: &ScalarValue) -> Result<ScalarValue> {
    let overflow = || DbError::expression(format!("Overflow negating {value}"));
    Ok(match value {
        ScalarValue::Int8(v) => ScalarValue::Int8(v.checked_neg().ok_or_else(overflow)?),
        ScalarValue::Int16(v) => ScalarValue::Int16(v.checked_neg().ok_or_else(overflow)?),
        ScalarValue::Int32(v) => ScalarValue::Int32(v.checked_neg().ok_or_else(overflow)?),
        ScalarValue::Int64(v) => ScalarValue::Int64(v.checked_neg().ok_or_else(overflow)?),
        ScalarValue::Float16(v) => ScalarValue::Float16(-*v),
        ScalarValue::Float32(v) => ScalarValue::Float32(-v),
        ScalarValue::Float64(v) => ScalarValue::Float64(-v),
        ScalarValue::Decimal(v) => ScalarValue::Decimal(DecimalValue::new(-v.value, v.scale)),
        ScalarValue::Interval(v) => ScalarValue::Interval(IntervalValue::new(
            v.value.checked_neg().ok_or_else(overflow)?,
            v.unit,
        )),
        other => return Err(DbError::expression(format!("Cannot negate {other}"))),
    })
}
