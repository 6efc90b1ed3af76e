use std::fmt;

use quarry_error::{DbError, Result};
use serde::{Deserialize, Serialize};

use super::Expression;
use crate::arrays::datatype::{DataType, DataTypeKind, IntervalUnit};
use crate::functions::implicit::common_supertype;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArithOperator {
    Add,
    Sub,
    Div,
    Mul,
    Mod,
}

impl fmt::Display for ArithOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Add => write!(f, "+"),
            Self::Sub => write!(f, "-"),
            Self::Div => write!(f, "/"),
            Self::Mul => write!(f, "*"),
            Self::Mod => write!(f, "%"),
        }
    }
}

impl ArithOperator {
    /// Compute the output type of applying this operator to the given input
    /// types.
    pub fn return_type(&self, left: &DataType, right: &DataType) -> Result<DataType> {
        let nullable = left.nullable || right.nullable;

        if left.is_null() && right.is_null() {
            return Ok(DataType::null());
        }

        // Null takes on the type of the other side.
        if left.is_null() || right.is_null() {
            let other = if left.is_null() { right } else { left };
            return match self {
                Self::Div if other.is_numeric() => Ok(DataType::float64()),
                _ if other.is_numeric()
                    || other.is_temporal()
                    || matches!(other.kind, DataTypeKind::Interval(_)) =>
                {
                    Ok(other.clone().with_nullable(true))
                }
                _ => Err(self.incompatible(left, right)),
            };
        }

        let typ = match (self, &left.kind, &right.kind) {
            (Self::Div, _, _) if left.is_numeric() && right.is_numeric() => DataType::float64(),
            (_, _, _) if left.is_numeric() && right.is_numeric() => {
                common_supertype(left, right).ok_or_else(|| self.incompatible(left, right))?
            }
            (Self::Sub, DataTypeKind::Timestamp(_), DataTypeKind::Timestamp(_)) => {
                DataType::interval(IntervalUnit::Nanosecond)
            }
            (Self::Sub, DataTypeKind::Date, DataTypeKind::Date) => {
                DataType::interval(IntervalUnit::Day)
            }
            (Self::Add | Self::Sub, DataTypeKind::Timestamp(_), DataTypeKind::Interval(_))
            | (Self::Add | Self::Sub, DataTypeKind::Date, DataTypeKind::Interval(_)) => {
                left.clone()
            }
            (Self::Add, DataTypeKind::Interval(_), DataTypeKind::Timestamp(_))
            | (Self::Add, DataTypeKind::Interval(_), DataTypeKind::Date) => right.clone(),
            (Self::Add | Self::Sub, DataTypeKind::Interval(a), DataTypeKind::Interval(b)) => {
                DataType::interval(a.finest(*b))
            }
            (Self::Mul, DataTypeKind::Interval(_), _) if right.is_integer() => left.clone(),
            (Self::Mul, _, DataTypeKind::Interval(_)) if left.is_integer() => right.clone(),
            _ => return Err(self.incompatible(left, right)),
        };

        Ok(typ.with_nullable(nullable))
    }

    fn incompatible(&self, left: &DataType, right: &DataType) -> DbError {
        DbError::expression(format!(
            "No arithmetic rule for {left} {self} {right}"
        ))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArithExpr {
    pub op: ArithOperator,
    pub left: Box<Expression>,
    pub right: Box<Expression>,
}

impl fmt::Display for ArithExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}",
            self.left.as_operand(),
            self.op,
            self.right.as_operand()
        )
    }
}
