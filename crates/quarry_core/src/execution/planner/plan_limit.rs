use quarry_error::Result;

use super::{OperatorPlanState, one_child};
use crate::execution::operators::limit::PhysicalLimit;
use crate::execution::operators::{PhysicalOperator, PhysicalPlan};
use crate::logical::logical_limit::LogicalLimit;
use crate::logical::operator::Node;

impl OperatorPlanState {
    pub fn plan_limit(&mut self, limit: &Node<LogicalLimit>) -> Result<PhysicalPlan> {
        let input = one_child("Limit", &limit.children)?;
        let child = self.plan(input)?;

        Ok(PhysicalPlan::new(
            PhysicalOperator::Limit(PhysicalLimit {
                limit: limit.node.limit,
                offset: limit.node.offset,
            }),
            limit.schema.clone(),
            vec![child],
        ))
    }
}
