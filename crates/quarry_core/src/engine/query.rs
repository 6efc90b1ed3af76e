use serde::{Deserialize, Serialize};

use crate::logical::table::Table;

/// What a query's result looks like once executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResultShape {
    /// Any number of rows and columns.
    Table,
    /// A single column.
    Column,
    /// A single value. Limits never apply.
    Scalar,
}

/// A table expression paired with the shape of its result.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    table: Table,
    shape: ResultShape,
}

impl Query {
    pub fn table(table: Table) -> Self {
        Query {
            table,
            shape: ResultShape::Table,
        }
    }

    pub fn column(table: Table) -> Self {
        Query {
            table,
            shape: ResultShape::Column,
        }
    }

    pub fn scalar(table: Table) -> Self {
        Query {
            table,
            shape: ResultShape::Scalar,
        }
    }

    pub fn shape(&self) -> ResultShape {
        self.shape
    }

    pub fn as_table(&self) -> &Table {
        &self.table
    }
}

impl From<Table> for Query {
    fn from(table: Table) -> Self {
        Query::table(table)
    }
}

impl From<&Table> for Query {
    fn from(table: &Table) -> Self {
        Query::table(table.clone())
    }
}
