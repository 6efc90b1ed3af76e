use std::ops::ControlFlow;

use quarry_error::Result;

use super::{OperatorPlanState, one_child};
use crate::arrays::datatype::DataType;
use crate::arrays::field::Schema;
use crate::execution::operators::project::PhysicalProject;
use crate::execution::operators::window::{
    PhysicalWindow,
    PhysicalWindowExpr,
    PhysicalWindowFunction,
};
use crate::execution::operators::{PhysicalOperator, PhysicalPlan};
use crate::expr::Expression;
use crate::expr::column_expr::ColumnExpr;
use crate::expr::physical::planner::PhysicalExpressionPlanner;
use crate::expr::window_expr::{WindowExpr, WindowFunction};
use crate::logical::logical_project::LogicalProject;
use crate::logical::operator::Node;

impl OperatorPlanState {
    /// Plan a projection.
    ///
    /// Window expressions are pulled out into a window operator beneath the
    /// projection. Each is replaced by a reference to a synthetic column the
    /// window operator appends to its input.
    pub fn plan_project(&mut self, project: &Node<LogicalProject>) -> Result<PhysicalPlan> {
        let input = one_child("Project", &project.children)?;
        let mut child = self.plan(input)?;

        let mut windows: Vec<(String, WindowExpr)> = Vec::new();
        let projections = project
            .node
            .projections
            .iter()
            .map(|expr| {
                expr.clone().rewrite(&mut |expr| match expr {
                    Expression::Window(window) => {
                        let name = self.next_synthetic_name();
                        windows.push((name.clone(), window));
                        Ok(ControlFlow::Break(Expression::Column(ColumnExpr::new(name))))
                    }
                    other => Ok(ControlFlow::Continue(other)),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        if !windows.is_empty() {
            child = self.plan_window(child, windows)?;
        }

        let projections = PhysicalExpressionPlanner::new(&child.schema).plan_scalars(&projections)?;

        Ok(PhysicalPlan::new(
            PhysicalOperator::Project(PhysicalProject { projections }),
            project.schema.clone(),
            vec![child],
        ))
    }

    fn plan_window(
        &mut self,
        child: PhysicalPlan,
        windows: Vec<(String, WindowExpr)>,
    ) -> Result<PhysicalPlan> {
        let planner = PhysicalExpressionPlanner::new(&child.schema);

        let mut fields: Vec<(String, DataType)> = child
            .schema
            .iter()
            .map(|(name, datatype)| (name.to_string(), datatype.clone()))
            .collect();
        let mut exprs = Vec::with_capacity(windows.len());

        for (name, window) in windows {
            let (function, datatype) = match &window.function {
                WindowFunction::RowNumber => {
                    (PhysicalWindowFunction::RowNumber, DataType::int64().non_null())
                }
                WindowFunction::Aggregate(agg) => {
                    let agg = planner.plan_aggregate_expr(agg)?;
                    let datatype = agg.datatype.clone();
                    (PhysicalWindowFunction::Aggregate(agg), datatype)
                }
            };

            exprs.push(PhysicalWindowExpr {
                function,
                partition_by: planner.plan_scalars(&window.partition_by)?,
                order_by: planner.plan_sorts(&window.order_by)?,
                datatype: datatype.clone(),
            });
            fields.push((name, datatype));
        }

        let schema = Schema::try_new(fields)?;

        Ok(PhysicalPlan::new(
            PhysicalOperator::Window(PhysicalWindow { windows: exprs }),
            schema,
            vec![child],
        ))
    }
}
