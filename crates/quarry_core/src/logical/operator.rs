use std::sync::Arc;

use super::logical_aggregate::LogicalAggregate;
use super::logical_filter::LogicalFilter;
use super::logical_join::LogicalJoin;
use super::logical_limit::LogicalLimit;
use super::logical_order::LogicalOrder;
use super::logical_project::LogicalProject;
use super::logical_scan::{LogicalScan, LogicalSqlQuery, LogicalValues};
use super::table_ref::TableRef;
use crate::arrays::field::Schema;

/// Wrapper around nodes in the logical plan that holds the metadata every
/// node carries.
///
/// Nodes are immutable once built. Children are shared, so deriving a new plan
/// from an existing one never copies the existing subtree.
#[derive(Debug, Clone, PartialEq)]
pub struct Node<N> {
    /// Node specific logic.
    pub node: N,
    /// Unique identity of this node.
    pub table_ref: TableRef,
    /// Output schema, computed when the node was built.
    pub schema: Schema,
    /// Inputs to this node.
    pub children: Vec<Arc<LogicalOperator>>,
}

impl<N> Node<N> {
    pub fn new(node: N, schema: Schema, children: Vec<Arc<LogicalOperator>>) -> Self {
        Node {
            node,
            table_ref: TableRef::next(),
            schema,
            children,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LogicalOperator {
    Scan(Node<LogicalScan>),
    SqlQuery(Node<LogicalSqlQuery>),
    Values(Node<LogicalValues>),
    Project(Node<LogicalProject>),
    Filter(Node<LogicalFilter>),
    Join(Node<LogicalJoin>),
    Aggregate(Node<LogicalAggregate>),
    Order(Node<LogicalOrder>),
    Limit(Node<LogicalLimit>),
}

impl LogicalOperator {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Scan(_) => "Scan",
            Self::SqlQuery(_) => "SqlQuery",
            Self::Values(_) => "Values",
            Self::Project(_) => "Project",
            Self::Filter(_) => "Filter",
            Self::Join(_) => "Join",
            Self::Aggregate(_) => "Aggregate",
            Self::Order(_) => "Order",
            Self::Limit(_) => "Limit",
        }
    }

    pub fn schema(&self) -> &Schema {
        match self {
            Self::Scan(n) => &n.schema,
            Self::SqlQuery(n) => &n.schema,
            Self::Values(n) => &n.schema,
            Self::Project(n) => &n.schema,
            Self::Filter(n) => &n.schema,
            Self::Join(n) => &n.schema,
            Self::Aggregate(n) => &n.schema,
            Self::Order(n) => &n.schema,
            Self::Limit(n) => &n.schema,
        }
    }

    pub fn table_ref(&self) -> TableRef {
        match self {
            Self::Scan(n) => n.table_ref,
            Self::SqlQuery(n) => n.table_ref,
            Self::Values(n) => n.table_ref,
            Self::Project(n) => n.table_ref,
            Self::Filter(n) => n.table_ref,
            Self::Join(n) => n.table_ref,
            Self::Aggregate(n) => n.table_ref,
            Self::Order(n) => n.table_ref,
            Self::Limit(n) => n.table_ref,
        }
    }

    pub fn children(&self) -> &[Arc<LogicalOperator>] {
        match self {
            Self::Scan(n) => &n.children,
            Self::SqlQuery(n) => &n.children,
            Self::Values(n) => &n.children,
            Self::Project(n) => &n.children,
            Self::Filter(n) => &n.children,
            Self::Join(n) => &n.children,
            Self::Aggregate(n) => &n.children,
            Self::Order(n) => &n.children,
            Self::Limit(n) => &n.children,
        }
    }

    /// Walk the plan, calling `func` on every operator, parents before
    /// children.
    pub fn walk<'a, F>(&'a self, func: &mut F)
    where
        F: FnMut(&'a LogicalOperator),
    {
        func(self);
        for child in self.children() {
            child.walk(func);
        }
    }
}
