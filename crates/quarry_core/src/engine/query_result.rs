use quarry_error::{DbError, Result};
use uuid::Uuid;

use super::query::ResultShape;
use crate::arrays::batch::Batch;
use crate::arrays::field::Schema;
use crate::arrays::scalar::ScalarValue;

#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    pub query_id: Uuid,
    pub output_schema: Schema,
    pub output: Output,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Output {
    /// Rows for table and column shaped queries.
    Batch(Batch),
    /// The single value of a scalar query.
    Scalar(ScalarValue),
}

impl QueryResult {
    /// Build a result from the rows returned by the adapter, unwrapping the
    /// value for scalar queries.
    pub(crate) fn from_batch(
        query_id: Uuid,
        output_schema: Schema,
        shape: ResultShape,
        batch: Batch,
    ) -> Result<Self> {
        let output = match shape {
            ResultShape::Table | ResultShape::Column => Output::Batch(batch),
            ResultShape::Scalar => {
                if batch.num_rows() != 1 || batch.num_columns() != 1 {
                    return Err(DbError::new("Scalar query did not produce a single value")
                        .with_field("rows", batch.num_rows())
                        .with_field("columns", batch.num_columns()));
                }
                let value = batch
                    .array(0)
                    .and_then(|arr| arr.value(0))
                    .cloned()
                    .unwrap_or(ScalarValue::Null);
                Output::Scalar(value)
            }
        };

        Ok(QueryResult {
            query_id,
            output_schema,
            output,
        })
    }

    pub fn num_rows(&self) -> usize {
        match &self.output {
            Output::Batch(batch) => batch.num_rows(),
            Output::Scalar(_) => 1,
        }
    }

    pub fn batch(&self) -> Option<&Batch> {
        match &self.output {
            Output::Batch(batch) => Some(batch),
            Output::Scalar(_) => None,
        }
    }

    pub fn try_into_batch(self) -> Result<Batch> {
        match self.output {
            Output::Batch(batch) => Ok(batch),
            Output::Scalar(_) => Err(DbError::new("Expected rows, got a scalar result")),
        }
    }

    pub fn try_into_scalar(self) -> Result<ScalarValue> {
        match self.output {
            Output::Scalar(value) => Ok(value),
            Output::Batch(_) => Err(DbError::new("Expected a scalar, got rows")),
        }
    }
}
