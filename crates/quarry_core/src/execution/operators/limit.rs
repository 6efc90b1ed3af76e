use quarry_error::Result;

use super::{ExecuteOperator, single_input};
use crate::arrays::batch::Batch;
use crate::arrays::datatype::DataType;
use crate::explain::explainable::{ExplainConfig, ExplainEntry, Explainable};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhysicalLimit {
    pub limit: Option<u64>,
    pub offset: u64,
}

impl ExecuteOperator for PhysicalLimit {
    const OPERATOR_NAME: &'static str = "Limit";

    fn execute(&self, inputs: Vec<Batch>, _output_types: &[DataType]) -> Result<Batch> {
        let input = single_input(Self::OPERATOR_NAME, inputs)?;
        let offset = usize::try_from(self.offset).unwrap_or(usize::MAX);
        let limit = self
            .limit
            .map(|limit| usize::try_from(limit).unwrap_or(usize::MAX));
        input.slice(offset, limit)
    }
}

impl Explainable for PhysicalLimit {
    fn explain_entry(&self, _conf: ExplainConfig) -> ExplainEntry {
        ExplainEntry::new(Self::OPERATOR_NAME)
            .with_optional_value("limit", self.limit)
            .with_value("offset", self.offset)
    }
}
