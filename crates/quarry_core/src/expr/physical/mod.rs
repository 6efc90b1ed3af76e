pub mod kernels;
pub mod planner;

use std::fmt;

use quarry_error::Result;

use crate::arrays::batch::{Array, Batch};
use crate::arrays::datatype::DataType;
use crate::arrays::scalar::ScalarValue;
use crate::expr::arith_expr::ArithOperator;
use crate::expr::comparison_expr::ComparisonOperator;
use crate::expr::conjunction_expr::ConjunctionOperator;
use crate::expr::negate_expr::UnaryOperator;
use crate::functions::aggregate::{AggregateFunction, AggregateState};

/// A scalar expression with column references resolved to positions in the
/// input row.
#[derive(Debug, Clone, PartialEq)]
pub enum PhysicalScalarExpression {
    Column {
        idx: usize,
        datatype: DataType,
    },
    Literal {
        literal: ScalarValue,
        datatype: DataType,
    },
    Arith {
        op: ArithOperator,
        left: Box<PhysicalScalarExpression>,
        right: Box<PhysicalScalarExpression>,
        datatype: DataType,
    },
    Comparison {
        op: ComparisonOperator,
        left: Box<PhysicalScalarExpression>,
        right: Box<PhysicalScalarExpression>,
        datatype: DataType,
    },
    Conjunction {
        op: ConjunctionOperator,
        expressions: Vec<PhysicalScalarExpression>,
        datatype: DataType,
    },
    Unary {
        op: UnaryOperator,
        expr: Box<PhysicalScalarExpression>,
        datatype: DataType,
    },
}

impl PhysicalScalarExpression {
    pub fn datatype(&self) -> &DataType {
        match self {
            Self::Column { datatype, .. }
            | Self::Literal { datatype, .. }
            | Self::Arith { datatype, .. }
            | Self::Comparison { datatype, .. }
            | Self::Conjunction { datatype, .. }
            | Self::Unary { datatype, .. } => datatype,
        }
    }

    /// Evaluate against a single row.
    pub fn eval(&self, row: &[ScalarValue]) -> Result<ScalarValue> {
        Ok(match self {
            Self::Column { idx, .. } => row.get(*idx).cloned().unwrap_or(ScalarValue::Null),
            Self::Literal { literal, .. } => literal.clone(),
            Self::Arith {
                op,
                left,
                right,
                datatype,
            } => kernels::eval_arith(*op, &left.eval(row)?, &right.eval(row)?, datatype)?,
            Self::Comparison {
                op, left, right, ..
            } => kernels::eval_comparison(*op, &left.eval(row)?, &right.eval(row)?),
            Self::Conjunction {
                op, expressions, ..
            } => {
                let values = expressions
                    .iter()
                    .map(|expr| expr.eval(row))
                    .collect::<Result<Vec<_>>>()?;
                kernels::eval_conjunction(*op, values)?
            }
            Self::Unary { op, expr, .. } => kernels::eval_unary(*op, &expr.eval(row)?)?,
        })
    }

    /// Evaluate against every row in a batch.
    pub fn eval_batch(&self, batch: &Batch) -> Result<Array> {
        let values = batch
            .rows()
            .map(|row| self.eval(&row))
            .collect::<Result<Vec<_>>>()?;
        Ok(Array::new(self.datatype().clone(), values))
    }

    /// Evaluate as a predicate, treating null as false.
    pub fn eval_predicate(&self, row: &[ScalarValue]) -> Result<bool> {
        Ok(matches!(self.eval(row)?, ScalarValue::Boolean(true)))
    }
}

impl fmt::Display for PhysicalScalarExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Column { idx, .. } => write!(f, "#{idx}"),
            Self::Literal { literal, .. } => write!(f, "{literal}"),
            Self::Arith {
                op, left, right, ..
            } => write!(f, "({left} {op} {right})"),
            Self::Comparison {
                op, left, right, ..
            } => write!(f, "({left} {op} {right})"),
            Self::Conjunction {
                op, expressions, ..
            } => {
                write!(f, "(")?;
                for (idx, expr) in expressions.iter().enumerate() {
                    if idx > 0 {
                        write!(f, " {op} ")?;
                    }
                    write!(f, "{expr}")?;
                }
                write!(f, ")")
            }
            Self::Unary { op, expr, .. } => match op {
                UnaryOperator::Not => write!(f, "NOT {expr}"),
                UnaryOperator::Negate => write!(f, "-{expr}"),
                UnaryOperator::IsNull => write!(f, "{expr} IS NULL"),
                UnaryOperator::IsNotNull => write!(f, "{expr} IS NOT NULL"),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PhysicalAggregateExpression {
    pub function: AggregateFunction,
    /// None only for COUNT(*).
    pub input: Option<PhysicalScalarExpression>,
    pub datatype: DataType,
}

impl PhysicalAggregateExpression {
    pub fn new_state(&self) -> AggregateState {
        AggregateState::new(self.function)
    }

    /// Feed one input row into the state.
    pub fn update(&self, state: &mut AggregateState, row: &[ScalarValue]) -> Result<()> {
        let value = match &self.input {
            Some(input) => input.eval(row)?,
            None => ScalarValue::Null,
        };
        state.update_for(self.function, &value, &self.datatype)
    }
}

impl fmt::Display for PhysicalAggregateExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.function, &self.input) {
            (AggregateFunction::CountDistinct, Some(input)) => {
                write!(f, "count(DISTINCT {input})")
            }
            (func, Some(input)) => write!(f, "{}({input})", func.name()),
            (_, None) => write!(f, "count(*)"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PhysicalSortExpression {
    pub column: PhysicalScalarExpression,
    pub desc: bool,
    pub nulls_first: bool,
}

impl fmt::Display for PhysicalSortExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}",
            self.column,
            if self.desc { "DESC" } else { "ASC" },
            if self.nulls_first {
                "NULLS FIRST"
            } else {
                "NULLS LAST"
            }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eval_row() {
        // (#0 + 1) > #1
        let expr = PhysicalScalarExpression::Comparison {
            op: ComparisonOperator::Gt,
            left: Box::new(PhysicalScalarExpression::Arith {
                op: ArithOperator::Add,
                left: Box::new(PhysicalScalarExpression::Column {
                    idx: 0,
                    datatype: DataType::int32(),
                }),
                right: Box::new(PhysicalScalarExpression::Literal {
                    literal: ScalarValue::Int32(1),
                    datatype: DataType::int32().non_null(),
                }),
                datatype: DataType::int32(),
            }),
            right: Box::new(PhysicalScalarExpression::Column {
                idx: 1,
                datatype: DataType::int32(),
            }),
            datatype: DataType::boolean(),
        };

        let row = [ScalarValue::Int32(4), ScalarValue::Int32(4)];
        assert_eq!(ScalarValue::Boolean(true), expr.eval(&row).unwrap());
        assert!(expr.eval_predicate(&row).unwrap());

        let row = [ScalarValue::Null, ScalarValue::Int32(4)];
        assert_eq!(ScalarValue::Null, expr.eval(&row).unwrap());
        assert!(!expr.eval_predicate(&row).unwrap());

        assert_eq!("((#0 + 1) > #1)", expr.to_string());
    }
}
