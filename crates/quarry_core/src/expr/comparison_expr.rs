use std::fmt;

use quarry_error::{DbError, Result};
use serde::{Deserialize, Serialize};

use super::Expression;
use crate::arrays::datatype::DataType;
use crate::functions::implicit::is_comparable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComparisonOperator {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

impl ComparisonOperator {
    /// Flip the operator so that the sides of the comparison can be swapped.
    ///
    /// E.g. 'a >= b' becomes 'b <= a'
    pub const fn flip(self) -> Self {
        match self {
            Self::Eq => Self::Eq,
            Self::NotEq => Self::NotEq,
            Self::Lt => Self::Gt,
            Self::LtEq => Self::GtEq,
            Self::Gt => Self::Lt,
            Self::GtEq => Self::LtEq,
        }
    }

    pub fn return_type(&self, left: &DataType, right: &DataType) -> Result<DataType> {
        if !is_comparable(left, right) {
            return Err(DbError::expression(format!(
                "Cannot compare {left} {self} {right}"
            )));
        }
        Ok(DataType::boolean().with_nullable(left.nullable || right.nullable))
    }
}

impl fmt::Display for ComparisonOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Eq => write!(f, "="),
            Self::NotEq => write!(f, "!="),
            Self::Lt => write!(f, "<"),
            Self::LtEq => write!(f, "<="),
            Self::Gt => write!(f, ">"),
            Self::GtEq => write!(f, ">="),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonExpr {
    pub left: Box<Expression>,
    pub right: Box<Expression>,
    pub op: ComparisonOperator,
}

impl fmt::Display for ComparisonExpr {
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
