use std::fmt;

use serde::{Deserialize, Serialize};

use super::explainable::{ExplainConfig, ExplainEntry, Explainable};
use crate::logical::operator::LogicalOperator;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ExplainNode {
    pub entry: ExplainEntry,
    pub children: Vec<ExplainNode>,
}

impl ExplainNode {
    pub fn walk_logical(config: ExplainConfig, plan: &LogicalOperator) -> Self {
        let mut entry = match plan {
            LogicalOperator::Scan(n) => n.node.explain_entry(config),
            LogicalOperator::SqlQuery(n) => n.node.explain_entry(config),
            LogicalOperator::Values(n) => n.node.explain_entry(config),
            LogicalOperator::Project(n) => n.node.explain_entry(config),
            LogicalOperator::Filter(n) => n.node.explain_entry(config),
            LogicalOperator::Join(n) => n.node.explain_entry(config),
            LogicalOperator::Aggregate(n) => n.node.explain_entry(config),
            LogicalOperator::Order(n) => n.node.explain_entry(config),
            LogicalOperator::Limit(n) => n.node.explain_entry(config),
        };

        if config.verbose {
            entry = entry
                .with_value("table_ref", plan.table_ref())
                .with_values(
                    "schema",
                    plan.schema().iter().map(|(name, typ)| format!("{name}: {typ}")),
                );
        }

        let children = plan
            .children()
            .iter()
            .map(|child| Self::walk_logical(config, child))
            .collect();

        ExplainNode { entry, children }
    }

    fn fmt_indented(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        writeln!(f, "{:indent$}{}", "", self.entry, indent = depth * 2)?;
        for child in &self.children {
            child.fmt_indented(f, depth + 1)?;
        }
        Ok(())
    }
}

impl fmt::Display for ExplainNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_indented(f, 0)
    }
}
