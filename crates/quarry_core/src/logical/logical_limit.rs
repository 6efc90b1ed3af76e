use crate::explain::explainable::{ExplainConfig, ExplainEntry, Explainable};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogicalLimit {
    /// Max rows to return. None keeps every row after the offset.
    pub limit: Option<u64>,
    pub offset: u64,
}

impl Explainable for LogicalLimit {
    fn explain_entry(&self, _conf: ExplainConfig) -> ExplainEntry {
        let ent = ExplainEntry::new("Limit").with_optional_value("limit", self.limit);
        if self.offset > 0 {
            ent.with_value("offset", self.offset)
        } else {
            ent
        }
    }
}
