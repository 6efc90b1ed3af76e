mod plan_aggregate;
mod plan_filter;
mod plan_join;
mod plan_limit;
mod plan_project;
mod plan_scan;
mod plan_sort;

use std::sync::Arc;

use quarry_error::{DbError, Result};

use super::operators::PhysicalPlan;
use crate::logical::operator::LogicalOperator;

/// Converts a logical plan into a tree of physical operators.
#[derive(Debug, Default)]
pub struct OperatorPlanner {
    _private: (),
}

impl OperatorPlanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn plan(&self, root: &LogicalOperator) -> Result<PhysicalPlan> {
        let mut state = OperatorPlanState { synthetic_idx: 0 };
        state.plan(root)
    }
}

#[derive(Debug)]
struct OperatorPlanState {
    /// Counter for naming columns the planner introduces.
    synthetic_idx: usize,
}

impl OperatorPlanState {
    fn plan(&mut self, operator: &LogicalOperator) -> Result<PhysicalPlan> {
        match operator {
            LogicalOperator::Scan(node) => Ok(self.plan_scan(node)),
            LogicalOperator::SqlQuery(node) => Ok(self.plan_sql_query(node)),
            LogicalOperator::Values(node) => Ok(self.plan_values(node)),
            LogicalOperator::Project(node) => self.plan_project(node),
            LogicalOperator::Filter(node) => self.plan_filter(node),
            LogicalOperator::Join(node) => self.plan_join(node),
            LogicalOperator::Aggregate(node) => self.plan_aggregate(node),
            LogicalOperator::Order(node) => self.plan_sort(node),
            LogicalOperator::Limit(node) => self.plan_limit(node),
        }
    }

    fn next_synthetic_name(&mut self) -> String {
        let name = format!("__window_{}", self.synthetic_idx);
        self.synthetic_idx += 1;
        name
    }
}

/// Get the only child of a single-input node.
fn one_child<'a>(name: &str, children: &'a [Arc<LogicalOperator>]) -> Result<&'a LogicalOperator> {
    match children {
        [child] => Ok(child.as_ref()),
        _ => Err(DbError::new(format!("{name} expects exactly one child"))
            .with_field("children", children.len())),
    }
}
