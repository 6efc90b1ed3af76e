use std::fmt;

use serde::{Deserialize, Serialize};

use super::Expression;
use super::aggregate_expr::AggregateExpr;
use crate::logical::logical_order::OrderByExpr;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WindowFunction {
    /// Zero-based position of the row within its partition.
    RowNumber,
    /// An aggregate over the partition. With an ordering the aggregate is
    /// running, covering all rows up to and including the current row's
    /// peers.
    Aggregate(AggregateExpr),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowExpr {
    pub function: WindowFunction,
    pub partition_by: Vec<Expression>,
    pub order_by: Vec<OrderByExpr>,
}

impl fmt::Display for WindowExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.function {
            WindowFunction::RowNumber => write!(f, "row_number()")?,
            WindowFunction::Aggregate(agg) => write!(f, "{agg}")?,
        }
        write!(f, " OVER (")?;
        if !self.partition_by.is_empty() {
            write!(f, "PARTITION BY ")?;
            for (idx, expr) in self.partition_by.iter().enumerate() {
                if idx > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{expr}")?;
            }
        }
        if !self.order_by.is_empty() {
            if !self.partition_by.is_empty() {
                write!(f, " ")?;
            }
            write!(f, "ORDER BY ")?;
            for (idx, expr) in self.order_by.iter().enumerate() {
                if idx > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{expr}")?;
            }
        }
        write!(f, ")")
    }
}
