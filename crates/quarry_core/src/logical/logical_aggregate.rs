use crate::explain::explainable::{ExplainConfig, ExplainEntry, Explainable};
use crate::expr::Expression;

/// Grouped aggregation. Output is the group keys followed by the aggregates.
#[derive(Debug, Clone, PartialEq)]
pub struct LogicalAggregate {
    pub group_by: Vec<Expression>,
    /// Aggregate expressions, each an aggregate optionally wrapped in an
    /// alias.
    pub aggregates: Vec<Expression>,
}

impl Explainable for LogicalAggregate {
    fn explain_entry(&self, _conf: ExplainConfig) -> ExplainEntry {
        let mut ent = ExplainEntry::new("Aggregate").with_values("aggregates", &self.aggregates);
        if !self.group_by.is_empty() {
            ent = ent.with_values("group_by", &self.group_by);
        }
        ent
    }
}
