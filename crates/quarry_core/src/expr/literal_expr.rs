use std::fmt;

use serde::{Deserialize, Serialize};

use crate::arrays::datatype::DataType;
use crate::arrays::scalar::ScalarValue;
use crate::infer::infer_scalar;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiteralExpr {
    pub literal: ScalarValue,
}

impl LiteralExpr {
    pub fn datatype(&self) -> DataType {
        infer_scalar(&self.literal)
    }
}

impl fmt::Display for LiteralExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.literal {
            ScalarValue::Utf8(s) => write!(f, "'{s}'"),
            other => write!(f, "{other}"),
        }
    }
}
