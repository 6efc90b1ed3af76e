use std::fmt;

use serde::{Deserialize, Serialize};

use super::Expression;
use crate::functions::aggregate::AggregateFunction;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateExpr {
    pub function: AggregateFunction,
    /// Input to the aggregate. None only for COUNT(*).
    pub input: Option<Box<Expression>>,
}

impl fmt::Display for AggregateExpr {
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
