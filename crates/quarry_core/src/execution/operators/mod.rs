pub mod filter;
pub mod hash_aggregate;
pub mod hash_join;
pub mod limit;
pub mod project;
pub mod scan;
pub mod sort;
pub mod values;
pub mod window;

use std::fmt;

use quarry_error::{DbError, Result};

use crate::arrays::batch::Batch;
use crate::arrays::datatype::DataType;
use crate::arrays::field::Schema;
use crate::explain::explainable::{ExplainConfig, ExplainEntry, Explainable};
use filter::PhysicalFilter;
use hash_aggregate::PhysicalHashAggregate;
use hash_join::PhysicalHashJoin;
use limit::PhysicalLimit;
use project::PhysicalProject;
use scan::{PhysicalScan, PhysicalSqlQuery};
use sort::PhysicalSort;
use values::PhysicalValues;
use window::PhysicalWindow;

/// An operator that transforms the fully materialized outputs of its children
/// into a single output batch.
pub trait ExecuteOperator: Explainable + fmt::Debug {
    const OPERATOR_NAME: &'static str;

    /// Execute the operator. `inputs` holds one batch per child, in order.
    /// `output_types` are the types of the operator's output columns.
    fn execute(&self, inputs: Vec<Batch>, output_types: &[DataType]) -> Result<Batch>;
}

/// Take the only input of a single-child operator.
pub(crate) fn single_input(name: &str, inputs: Vec<Batch>) -> Result<Batch> {
    let mut inputs = inputs.into_iter();
    match (inputs.next(), inputs.next()) {
        (Some(input), None) => Ok(input),
        _ => Err(DbError::new(format!("{name} expects exactly one input"))),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PhysicalOperator {
    Scan(PhysicalScan),
    SqlQuery(PhysicalSqlQuery),
    Values(PhysicalValues),
    Project(PhysicalProject),
    Filter(PhysicalFilter),
    Window(PhysicalWindow),
    HashJoin(PhysicalHashJoin),
    HashAggregate(PhysicalHashAggregate),
    Sort(PhysicalSort),
    Limit(PhysicalLimit),
}

impl PhysicalOperator {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Scan(_) => PhysicalScan::OPERATOR_NAME,
            Self::SqlQuery(_) => PhysicalSqlQuery::OPERATOR_NAME,
            Self::Values(_) => PhysicalValues::OPERATOR_NAME,
            Self::Project(_) => PhysicalProject::OPERATOR_NAME,
            Self::Filter(_) => PhysicalFilter::OPERATOR_NAME,
            Self::Window(_) => PhysicalWindow::OPERATOR_NAME,
            Self::HashJoin(_) => PhysicalHashJoin::OPERATOR_NAME,
            Self::HashAggregate(_) => PhysicalHashAggregate::OPERATOR_NAME,
            Self::Sort(_) => PhysicalSort::OPERATOR_NAME,
            Self::Limit(_) => PhysicalLimit::OPERATOR_NAME,
        }
    }
}

impl Explainable for PhysicalOperator {
    fn explain_entry(&self, conf: ExplainConfig) -> ExplainEntry {
        match self {
            Self::Scan(op) => op.explain_entry(conf),
            Self::SqlQuery(op) => op.explain_entry(conf),
            Self::Values(op) => op.explain_entry(conf),
            Self::Project(op) => op.explain_entry(conf),
            Self::Filter(op) => op.explain_entry(conf),
            Self::Window(op) => op.explain_entry(conf),
            Self::HashJoin(op) => op.explain_entry(conf),
            Self::HashAggregate(op) => op.explain_entry(conf),
            Self::Sort(op) => op.explain_entry(conf),
            Self::Limit(op) => op.explain_entry(conf),
        }
    }
}

/// A tree of physical operators, each with its output schema.
#[derive(Debug, Clone, PartialEq)]
pub struct PhysicalPlan {
    pub operator: PhysicalOperator,
    pub schema: Schema,
    pub children: Vec<PhysicalPlan>,
}

impl PhysicalPlan {
    pub fn new(operator: PhysicalOperator, schema: Schema, children: Vec<PhysicalPlan>) -> Self {
        PhysicalPlan {
            operator,
            schema,
            children,
        }
    }

    /// Call `func` on every plan node, parents before children.
    pub fn walk<'a, F>(&'a self, func: &mut F)
    where
        F: FnMut(&'a PhysicalPlan),
    {
        func(self);
        for child in &self.children {
            child.walk(func);
        }
    }
}
