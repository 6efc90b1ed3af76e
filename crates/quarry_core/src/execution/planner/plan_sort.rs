use quarry_error::Result;

use super::{OperatorPlanState, one_child};
use crate::execution::operators::sort::PhysicalSort;
use crate::execution::operators::{PhysicalOperator, PhysicalPlan};
use crate::expr::physical::planner::PhysicalExpressionPlanner;
use crate::logical::logical_order::LogicalOrder;
use crate::logical::operator::Node;

impl OperatorPlanState {
    pub fn plan_sort(&mut self, order: &Node<LogicalOrder>) -> Result<PhysicalPlan> {
        let input = one_child("Order", &order.children)?;
        let child = self.plan(input)?;

        let exprs = PhysicalExpressionPlanner::new(&child.schema).plan_sorts(&order.node.exprs)?;

        Ok(PhysicalPlan::new(
            PhysicalOperator::Sort(PhysicalSort { exprs }),
            order.schema.clone(),
            vec![child],
        ))
    }
}
