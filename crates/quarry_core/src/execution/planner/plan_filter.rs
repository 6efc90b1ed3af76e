use quarry_error::Result;

use super::{OperatorPlanState, one_child};
use crate::execution::operators::filter::PhysicalFilter;
use crate::execution::operators::{PhysicalOperator, PhysicalPlan};
use crate::expr::physical::planner::PhysicalExpressionPlanner;
use crate::logical::logical_filter::LogicalFilter;
use crate::logical::operator::Node;

impl OperatorPlanState {
    pub fn plan_filter(&mut self, filter: &Node<LogicalFilter>) -> Result<PhysicalPlan> {
        let input = one_child("Filter", &filter.children)?;
        let child = self.plan(input)?;

        let predicate =
            PhysicalExpressionPlanner::new(&child.schema).plan_scalar(&filter.node.filter)?;

        Ok(PhysicalPlan::new(
            PhysicalOperator::Filter(PhysicalFilter { predicate }),
            filter.schema.clone(),
            vec![child],
        ))
    }
}
