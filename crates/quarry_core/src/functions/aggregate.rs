use std::cmp::Ordering;
use std::fmt;

use hashbrown::HashSet;
use quarry_error::{DbError, Result};
use serde::{Deserialize, Serialize};

use crate::arrays::datatype::{DataType, DataTypeKind, DecimalTypeMeta};
use crate::arrays::hash_key::HashKey;
use crate::arrays::scalar::ScalarValue;
use crate::expr::arith_expr::ArithOperator;
use crate::expr::physical::kernels::{cast_numeric, eval_arith};

/// Aggregate functions that can be used as metrics or as windowed
/// aggregates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AggregateFunction {
    /// COUNT(*), counts all rows.
    CountStar,
    /// COUNT(expr), counts non-null values.
    Count,
    CountDistinct,
    Sum,
    Mean,
    Min,
    Max,
}

impl AggregateFunction {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::CountStar | Self::Count | Self::CountDistinct => "count",
            Self::Sum => "sum",
            Self::Mean => "avg",
            Self::Min => "min",
            Self::Max => "max",
        }
    }

    /// Compute the return type given the input type.
    ///
    /// `input` is ignored for `CountStar`.
    pub fn return_type(&self, input: &DataType) -> Result<DataType> {
        Ok(match self {
            Self::CountStar | Self::Count | Self::CountDistinct => DataType::int64().non_null(),
            Self::Sum => match &input.kind {
                _ if input.is_signed_integer() || input.is_boolean() => DataType::int64(),
                _ if input.is_unsigned_integer() => DataType::uint64(),
                _ if input.is_floating() => DataType::float64(),
                DataTypeKind::Decimal(m) => {
                    DataType::decimal(DecimalTypeMeta::MAX_PRECISION, m.scale)
                }
                DataTypeKind::Interval(unit) => DataType::interval(*unit),
                DataTypeKind::Null => DataType::null(),
                _ => return Err(self.invalid_input(input)),
            },
            Self::Mean => match &input.kind {
                _ if input.is_numeric() || input.is_boolean() => DataType::float64(),
                DataTypeKind::Null => DataType::null(),
                _ => return Err(self.invalid_input(input)),
            },
            Self::Min | Self::Max => match &input.kind {
                DataTypeKind::Struct(_) | DataTypeKind::Map(_) => {
                    return Err(self.invalid_input(input));
                }
                _ => input.clone().with_nullable(true),
            },
        })
    }

    fn invalid_input(&self, input: &DataType) -> DbError {
        DbError::expression(format!(
            "Aggregate '{}' not defined for input type {input}",
            self.name()
        ))
    }
}

impl fmt::Display for AggregateFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CountStar => write!(f, "count(*)"),
            Self::CountDistinct => write!(f, "count(DISTINCT)"),
            other => write!(f, "{}", other.name()),
        }
    }
}

/// Running state for a single aggregate over a single group.
#[derive(Debug, Clone)]
pub enum AggregateState {
    Count(i64),
    CountDistinct(HashSet<HashKey>),
    /// Running sum in the aggregate's return type, null until a non-null
    /// value is seen.
    Sum(ScalarValue),
    Mean { sum: f64, count: i64 },
    Min(ScalarValue),
    Max(ScalarValue),
}

impl AggregateState {
    pub fn new(function: AggregateFunction) -> Self {
        match function {
            AggregateFunction::CountStar | AggregateFunction::Count => AggregateState::Count(0),
            AggregateFunction::CountDistinct => AggregateState::CountDistinct(HashSet::new()),
            AggregateFunction::Sum => AggregateState::Sum(ScalarValue::Null),
            AggregateFunction::Mean => AggregateState::Mean { sum: 0.0, count: 0 },
            AggregateFunction::Min => AggregateState::Min(ScalarValue::Null),
            AggregateFunction::Max => AggregateState::Max(ScalarValue::Null),
        }
    }

    /// Update the state with a value.
    ///
    /// COUNT(*) is fed a null for every row, so a count over a null input
    /// only skips nulls when the function takes an input.
    pub fn update_for(
        &mut self,
        function: AggregateFunction,
        value: &ScalarValue,
        return_type: &DataType,
    ) -> Result<()> {
        if function == AggregateFunction::CountStar {
            if let AggregateState::Count(count) = self {
                *count += 1;
            }
            return Ok(());
        }
        self.update(value, return_type)
    }

    /// Update the state with a non-star input value. Nulls are skipped.
    pub fn update(&mut self, value: &ScalarValue, return_type: &DataType) -> Result<()> {
        if value.is_null() {
            return Ok(());
        }

        // Booleans aggregate as 0/1.
        let as_int;
        let value = match value {
            ScalarValue::Boolean(b) if matches!(self, Self::Sum(_) | Self::Mean { .. }) => {
                as_int = ScalarValue::Int64(*b as i64);
                &as_int
            }
            other => other,
        };

        match self {
            Self::Count(count) => *count += 1,
            Self::CountDistinct(set) => {
                set.insert(HashKey::from(value));
            }
            Self::Sum(acc) => {
                *acc = if acc.is_null() {
                    cast_numeric(value, return_type)?
                } else {
                    eval_arith(ArithOperator::Add, acc, value, return_type)?
                };
            }
            Self::Mean { sum, count } => {
                *sum += value.try_as_f64()?;
                *count += 1;
            }
            Self::Min(acc) => {
                if acc.is_null() || value.partial_cmp_value(acc) == Some(Ordering::Less) {
                    *acc = value.clone();
                }
            }
            Self::Max(acc) => {
                if acc.is_null() || value.partial_cmp_value(acc) == Some(Ordering::Greater) {
                    *acc = value.clone();
                }
            }
        }
        Ok(())
    }

    /// Produce the aggregate value. Doesn't consume the state so running
    /// aggregates can keep updating.
    pub fn finalize(&self) -> ScalarValue {
        match self {
            Self::Count(count) => ScalarValue::Int64(*count),
            Self::CountDistinct(set) => ScalarValue::Int64(set.len() as i64),
            Self::Sum(acc) | Self::Min(acc) | Self::Max(acc) => acc.clone(),
            Self::Mean { count: 0, .. } => ScalarValue::Null,
            Self::Mean { sum, count } => ScalarValue::Float64(*sum / *count as f64),
        }
    }
}
