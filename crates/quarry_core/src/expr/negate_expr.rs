use std::fmt;

use quarry_error::{DbError, Result};
use serde::{Deserialize, Serialize};

use super::Expression;
use crate::arrays::datatype::{DataType, DataTypeKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOperator {
    /// Boolean NOT.
    Not,
    /// Numeric negation.
    Negate,
    IsNull,
    IsNotNull,
}

impl UnaryOperator {
    pub fn return_type(&self, input: &DataType) -> Result<DataType> {
        Ok(match self {
            Self::Not => {
                if !(input.is_boolean() || input.is_null()) {
                    return Err(DbError::expression(format!(
                        "NOT requires a boolean input, got {input}"
                    )));
                }
                DataType::boolean().with_nullable(input.nullable)
            }
            Self::Negate => {
                let ok = input.is_signed_integer()
                    || input.is_floating()
                    || input.is_null()
                    || matches!(input.kind, DataTypeKind::Decimal(_) | DataTypeKind::Interval(_));
                if !ok {
                    return Err(DbError::expression(format!("Cannot negate {input}")));
                }
                input.clone()
            }
            Self::IsNull | Self::IsNotNull => DataType::boolean().non_null(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnaryExpr {
    pub op: UnaryOperator,
    pub expr: Box<Expression>,
}

impl fmt::Display for UnaryExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.op {
            UnaryOperator::Not => write!(f, "NOT {}", self.expr.as_operand()),
            UnaryOperator::Negate => write!(f, "-{}", self.expr.as_operand()),
            UnaryOperator::IsNull => write!(f, "{} IS NULL", self.expr.as_operand()),
            UnaryOperator::IsNotNull => write!(f, "{} IS NOT NULL", self.expr.as_operand()),
        }
    }
}
