use quarry_error::Result;

use super::{ExecuteOperator, single_input};
use crate::arrays::batch::Batch;
use crate::arrays::datatype::DataType;
use crate::explain::explainable::{ExplainConfig, ExplainEntry, Explainable};
use crate::expr::physical::PhysicalScalarExpression;

/// Keep rows where the predicate is true. Null counts as false.
#[derive(Debug, Clone, PartialEq)]
pub struct PhysicalFilter {
    pub predicate: PhysicalScalarExpression,
}

impl ExecuteOperator for PhysicalFilter {
    const OPERATOR_NAME: &'static str = "Filter";

    fn execute(&self, inputs: Vec<Batch>, _output_types: &[DataType]) -> Result<Batch> {
        let input = single_input(Self::OPERATOR_NAME, inputs)?;

        let mut selection = Vec::new();
        for (idx, row) in input.rows().enumerate() {
            if self.predicate.eval_predicate(&row)? {
                selection.push(idx);
            }
        }

        input.select(&selection)
    }
}

impl Explainable for PhysicalFilter {
    fn explain_entry(&self, _conf: ExplainConfig) -> ExplainEntry {
        ExplainEntry::new(Self::OPERATOR_NAME).with_value("predicate", &self.predicate)
    }
}
