use super::OperatorPlanState;
use crate::execution::operators::scan::{PhysicalScan, PhysicalSqlQuery};
use crate::execution::operators::values::PhysicalValues;
use crate::execution::operators::{PhysicalOperator, PhysicalPlan};
use crate::logical::logical_scan::{LogicalScan, LogicalSqlQuery, LogicalValues};
use crate::logical::operator::Node;

impl OperatorPlanState {
    pub fn plan_scan(&mut self, scan: &Node<LogicalScan>) -> PhysicalPlan {
        PhysicalPlan::new(
            PhysicalOperator::Scan(PhysicalScan {
                table_name: scan.node.table_name.clone(),
            }),
            scan.schema.clone(),
            Vec::new(),
        )
    }

    pub fn plan_sql_query(&mut self, query: &Node<LogicalSqlQuery>) -> PhysicalPlan {
        PhysicalPlan::new(
            PhysicalOperator::SqlQuery(PhysicalSqlQuery {
                query: query.node.query.clone(),
            }),
            query.schema.clone(),
            Vec::new(),
        )
    }

    pub fn plan_values(&mut self, values: &Node<LogicalValues>) -> PhysicalPlan {
        PhysicalPlan::new(
            PhysicalOperator::Values(PhysicalValues {
                batch: values.node.batch.clone(),
            }),
            values.schema.clone(),
            Vec::new(),
        )
    }
}
