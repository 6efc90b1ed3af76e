use quarry_error::{DbError, Result};

use super::OperatorPlanState;
use crate::arrays::field::Schema;
use crate::execution::operators::hash_join::{JoinOutput, PhysicalHashJoin};
use crate::execution::operators::{PhysicalOperator, PhysicalPlan};
use crate::expr::physical::planner::PhysicalExpressionPlanner;
use crate::logical::logical_join::{JoinColumnSource, LogicalJoin};
use crate::logical::operator::Node;

fn column_index(schema: &Schema, name: &str, side: &str) -> Result<usize> {
    schema.index_of(name).ok_or_else(|| {
        DbError::join(format!("Missing join column '{name}' on {side} side"))
    })
}

impl OperatorPlanState {
    pub fn plan_join(&mut self, join: &Node<LogicalJoin>) -> Result<PhysicalPlan> {
        let [left, right] = join.children.as_slice() else {
            return Err(DbError::new("Join expects exactly two children")
                .with_field("children", join.children.len()));
        };

        let left_plan = self.plan(left)?;
        let right_plan = self.plan(right)?;
        let (left_schema, right_schema) = (left.schema(), right.schema());

        let mut left_keys = Vec::with_capacity(join.node.conditions.len());
        let mut right_keys = Vec::with_capacity(join.node.conditions.len());
        for cond in &join.node.conditions {
            left_keys.push(column_index(left_schema, &cond.left, "left")?);
            right_keys.push(column_index(right_schema, &cond.right, "right")?);
        }

        let residual = match &join.node.residual {
            Some(residual) => Some(
                PhysicalExpressionPlanner::new_join(
                    left.table_ref(),
                    left_schema,
                    right.table_ref(),
                    right_schema,
                )
                .plan_scalar(residual)?,
            ),
            None => None,
        };

        let outputs = join
            .node
            .outputs
            .iter()
            .map(|output| {
                Ok(match &output.source {
                    JoinColumnSource::Left(name) => {
                        JoinOutput::Left(column_index(left_schema, name, "left")?)
                    }
                    JoinColumnSource::Right(name) => {
                        JoinOutput::Right(column_index(right_schema, name, "right")?)
                    }
                    JoinColumnSource::Coalesce { left, right } => JoinOutput::Coalesce(
                        column_index(left_schema, left, "left")?,
                        column_index(right_schema, right, "right")?,
                    ),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(PhysicalPlan::new(
            PhysicalOperator::HashJoin(PhysicalHashJoin {
                join_type: join.node.join_type,
                left_keys,
                right_keys,
                residual,
                outputs,
            }),
            join.schema.clone(),
            vec![left_plan, right_plan],
        ))
    }
}
