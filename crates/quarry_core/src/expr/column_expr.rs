use std::fmt;

use quarry_error::Result;
use serde::{Deserialize, Serialize};

use crate::arrays::datatype::DataType;
use crate::arrays::field::Schema;
use crate::logical::table_ref::TableRef;

/// Reference to a column by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnExpr {
    /// Table this column was taken from, if known.
    pub table_ref: Option<TableRef>,
    pub name: String,
}

impl ColumnExpr {
    pub fn new(name: impl Into<String>) -> Self {
        ColumnExpr {
            table_ref: None,
            name: name.into(),
        }
    }

    pub fn with_table(table_ref: TableRef, name: impl Into<String>) -> Self {
        ColumnExpr {
            table_ref: Some(table_ref),
            name: name.into(),
        }
    }

    pub fn datatype(&self, schema: &Schema) -> Result<DataType> {
        schema.try_get(&self.name).cloned()
    }
}

impl fmt::Display for ColumnExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}
