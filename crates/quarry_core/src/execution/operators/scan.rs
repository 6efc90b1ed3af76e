use crate::explain::explainable::{ExplainConfig, ExplainEntry, Explainable};

/// Read all rows of a table from the data source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhysicalScan {
    pub table_name: String,
}

impl PhysicalScan {
    pub const OPERATOR_NAME: &'static str = "Scan";
}

impl Explainable for PhysicalScan {
    fn explain_entry(&self, _conf: ExplainConfig) -> ExplainEntry {
        ExplainEntry::new(Self::OPERATOR_NAME).with_value("table", &self.table_name)
    }
}

/// Run raw query text against the data source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhysicalSqlQuery {
    pub query: String,
}

impl PhysicalSqlQuery {
    pub const OPERATOR_NAME: &'static str = "SqlQuery";
}

impl Explainable for PhysicalSqlQuery {
    fn explain_entry(&self, _conf: ExplainConfig) -> ExplainEntry {
        ExplainEntry::new(Self::OPERATOR_NAME).with_value("query", &self.query)
    }
}
