pub mod operators;
pub mod planner;

use quarry_error::Result;
use tracing::trace;

use crate::arrays::batch::Batch;
use crate::arrays::datatype::DataType;
use operators::{ExecuteOperator, PhysicalOperator, PhysicalPlan};

/// Where leaf operators read their rows from.
pub trait DataSource {
    /// Read every row of a named table.
    fn scan(&self, table_name: &str) -> Result<Batch>;

    /// Run raw query text.
    fn query(&self, query: &str) -> Result<Batch>;
}

/// Execute a physical plan to completion, materializing its output.
pub fn execute_plan(plan: &PhysicalPlan, source: &dyn DataSource) -> Result<Batch> {
    let inputs = plan
        .children
        .iter()
        .map(|child| execute_plan(child, source))
        .collect::<Result<Vec<_>>>()?;

    let output_types: Vec<DataType> = plan.schema.types().cloned().collect();

    let output = match &plan.operator {
        PhysicalOperator::Scan(scan) => source.scan(&scan.table_name)?,
        PhysicalOperator::SqlQuery(query) => source.query(&query.query)?,
        PhysicalOperator::Values(op) => op.execute(inputs, &output_types)?,
        PhysicalOperator::Project(op) => op.execute(inputs, &output_types)?,
        PhysicalOperator::Filter(op) => op.execute(inputs, &output_types)?,
        PhysicalOperator::Window(op) => op.execute(inputs, &output_types)?,
        PhysicalOperator::HashJoin(op) => op.execute(inputs, &output_types)?,
        PhysicalOperator::HashAggregate(op) => op.execute(inputs, &output_types)?,
        PhysicalOperator::Sort(op) => op.execute(inputs, &output_types)?,
        PhysicalOperator::Limit(op) => op.execute(inputs, &output_types)?,
    };

    trace!(operator = plan.operator.name(), rows = output.num_rows(), "executed operator");

    Ok(output)
}
