use quarry_error::{DbError, Result};

use super::ExecuteOperator;
use crate::arrays::batch::Batch;
use crate::arrays::datatype::DataType;
use crate::explain::explainable::{ExplainConfig, ExplainEntry, Explainable};

/// Emits rows carried in the plan.
#[derive(Debug, Clone, PartialEq)]
pub struct PhysicalValues {
    pub batch: Batch,
}

impl ExecuteOperator for PhysicalValues {
    const OPERATOR_NAME: &'static str = "Values";

    fn execute(&self, inputs: Vec<Batch>, _output_types: &[DataType]) -> Result<Batch> {
        if !inputs.is_empty() {
            return Err(DbError::new("Values expects no inputs")
                .with_field("inputs", inputs.len()));
        }
        Ok(self.batch.clone())
    }
}

impl Explainable for PhysicalValues {
    fn explain_entry(&self, _conf: ExplainConfig) -> ExplainEntry {
        ExplainEntry::new(Self::OPERATOR_NAME).with_value("num_rows", self.batch.num_rows())
    }
}
