use crate::arrays::batch::Batch;
use crate::explain::explainable::{ExplainConfig, ExplainEntry, Explainable};

/// Scan of a named table known to the adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalScan {
    pub table_name: String,
}

impl Explainable for LogicalScan {
    fn explain_entry(&self, _conf: ExplainConfig) -> ExplainEntry {
        ExplainEntry::new("Scan").with_value("table", &self.table_name)
    }
}

/// A relation defined by raw query text. The text is passed through to the
/// adapter untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalSqlQuery {
    pub query: String,
}

impl Explainable for LogicalSqlQuery {
    fn explain_entry(&self, _conf: ExplainConfig) -> ExplainEntry {
        ExplainEntry::new("SqlQuery").with_value("query", &self.query)
    }
}

/// Rows held in the plan itself.
#[derive(Debug, Clone, PartialEq)]
pub struct LogicalValues {
    pub batch: Batch,
}

impl Explainable for LogicalValues {
    fn explain_entry(&self, _conf: ExplainConfig) -> ExplainEntry {
        ExplainEntry::new("Values").with_value("num_rows", self.batch.num_rows())
    }
}
