use std::sync::Arc;

use quarry_error::{DbError, Result};
use tracing::debug;
use uuid::Uuid;

use super::query::{Query, ResultShape};
use crate::adapter::AdapterCapabilities;
use crate::arrays::field::Schema;
use crate::config::session::SessionConfig;
use crate::execution::operators::PhysicalPlan;
use crate::execution::planner::OperatorPlanner;
use crate::logical::logical_join::JoinType;
use crate::logical::logical_limit::LogicalLimit;
use crate::logical::operator::{LogicalOperator, Node};
use crate::sql::render::SqlRenderer;

/// Limit requested by the caller when executing a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LimitArg {
    /// Use the session's `sql.default_limit`, if set.
    #[default]
    Default,
    /// Return at most this many rows.
    Rows(u64),
    /// Don't apply the default limit.
    Unbounded,
}

impl From<u64> for LimitArg {
    fn from(value: u64) -> Self {
        LimitArg::Rows(value)
    }
}

impl From<Option<u64>> for LimitArg {
    fn from(value: Option<u64>) -> Self {
        match value {
            Some(n) => LimitArg::Rows(n),
            None => LimitArg::Unbounded,
        }
    }
}

/// A query lowered for a specific adapter.
#[derive(Debug, Clone)]
pub struct CompiledQuery {
    pub query_id: Uuid,
    /// SQL text in the adapter's dialect.
    pub sql: String,
    /// Physical plan, for adapters that execute plans directly.
    pub plan: PhysicalPlan,
    pub output_schema: Schema,
    pub shape: ResultShape,
    /// Row limit in effect at the root, if any.
    pub limit: Option<u64>,
}

/// Lowers queries against an adapter's capabilities and a session config.
#[derive(Debug)]
pub struct QueryCompiler<'a> {
    pub capabilities: &'a AdapterCapabilities,
    pub config: &'a SessionConfig,
}

impl QueryCompiler<'_> {
    pub fn compile(&self, query: &Query, limit: LimitArg) -> Result<CompiledQuery> {
        let root = query.as_table().root();
        self.check_capabilities(root)?;

        let root = match query.shape() {
            // Scalars are always one row.
            ResultShape::Scalar => root.clone(),
            ResultShape::Table | ResultShape::Column => self.apply_limit(root, limit),
        };
        let effective_limit = match root.as_ref() {
            LogicalOperator::Limit(node) => node.node.limit,
            _ => None,
        };

        let sql = SqlRenderer::new(&self.capabilities.dialect).render(&root)?;
        let plan = OperatorPlanner::new().plan(&root)?;

        let query_id = Uuid::new_v4();
        debug!(%query_id, shape = ?query.shape(), limit = ?effective_limit, %sql, "compiled query");

        Ok(CompiledQuery {
            query_id,
            sql,
            plan,
            output_schema: root.schema().clone(),
            shape: query.shape(),
            limit: effective_limit,
        })
    }

    fn check_capabilities(&self, root: &LogicalOperator) -> Result<()> {
        let mut has_full_join = false;
        root.walk(&mut |op| {
            if let LogicalOperator::Join(join) = op {
                has_full_join |= join.node.join_type == JoinType::Full;
            }
        });

        if has_full_join && !self.capabilities.supports_full_outer_join {
            return Err(DbError::unsupported(
                "Full outer joins are not supported by this adapter",
            ));
        }
        Ok(())
    }

    /// Apply the caller's limit to the root of the plan.
    ///
    /// An explicit limit replaces a limit already at the root. The default
    /// limit only applies when the root isn't already limited.
    fn apply_limit(&self, root: &Arc<LogicalOperator>, limit: LimitArg) -> Arc<LogicalOperator> {
        match (limit, root.as_ref()) {
            (LimitArg::Rows(n), LogicalOperator::Limit(existing)) => {
                let node = Node::new(
                    LogicalLimit {
                        limit: Some(n),
                        offset: existing.node.offset,
                    },
                    existing.schema.clone(),
                    existing.children.clone(),
                );
                Arc::new(LogicalOperator::Limit(node))
            }
            (LimitArg::Rows(n), _) => wrap_limit(root, n),
            (LimitArg::Default, LogicalOperator::Limit(_)) | (LimitArg::Unbounded, _) => {
                root.clone()
            }
            (LimitArg::Default, _) => match self.config.default_limit {
                Some(n) => wrap_limit(root, n),
                None => root.clone(),
            },
        }
    }
}

fn wrap_limit(root: &Arc<LogicalOperator>, limit: u64) -> Arc<LogicalOperator> {
    let node = Node::new(
        LogicalLimit {
            limit: Some(limit),
            offset: 0,
        },
        root.schema().clone(),
        vec![root.clone()],
    );
    Arc::new(LogicalOperator::Limit(node))
}
