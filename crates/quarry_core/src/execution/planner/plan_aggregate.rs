use quarry_error::Result;

use super::{OperatorPlanState, one_child};
use crate::execution::operators::hash_aggregate::PhysicalHashAggregate;
use crate::execution::operators::{PhysicalOperator, PhysicalPlan};
use crate::expr::physical::planner::PhysicalExpressionPlanner;
use crate::logical::logical_aggregate::LogicalAggregate;
use crate::logical::operator::Node;

impl OperatorPlanState {
    pub fn plan_aggregate(&mut self, agg: &Node<LogicalAggregate>) -> Result<PhysicalPlan> {
        let input = one_child("Aggregate", &agg.children)?;
        let child = self.plan(input)?;

        let planner = PhysicalExpressionPlanner::new(&child.schema);
        let group_by = planner.plan_scalars(&agg.node.group_by)?;
        let aggregates = agg
            .node
            .aggregates
            .iter()
            .map(|expr| planner.plan_aggregate(expr))
            .collect::<Result<Vec<_>>>()?;

        Ok(PhysicalPlan::new(
            PhysicalOperator::HashAggregate(PhysicalHashAggregate {
                group_by,
                aggregates,
            }),
            agg.schema.clone(),
            vec![child],
        ))
    }
}
