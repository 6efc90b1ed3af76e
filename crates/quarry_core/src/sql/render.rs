use std::sync::Arc;

use quarry_error::{DbError, Result};

use super::dialect::SqlDialect;
use crate::arrays::batch::Batch;
use crate::arrays::field::Schema;
use crate::expr::Expression;
use crate::expr::aggregate_expr::AggregateExpr;
use crate::expr::column_expr::ColumnExpr;
use crate::expr::comparison_expr::ComparisonOperator;
use crate::expr::negate_expr::UnaryOperator;
use crate::expr::window_expr::{WindowExpr, WindowFunction};
use crate::functions::aggregate::AggregateFunction;
use crate::logical::logical_join::{JoinColumnSource, JoinType, LogicalJoin};
use crate::logical::logical_limit::LogicalLimit;
use crate::logical::logical_order::OrderByExpr;
use crate::logical::operator::{LogicalOperator, Node};
use crate::logical::table_ref::TableRef;

/// How column references resolve while rendering an expression.
#[derive(Debug, Clone, Copy)]
enum Scope<'a> {
    /// A single unaliased input, columns render by name.
    Single,
    /// A single input, columns render qualified with its alias.
    Qualified(TableRef),
    /// Two aliased inputs, columns render qualified with their side's alias.
    Join {
        left_ref: TableRef,
        left: &'a Schema,
        right_ref: TableRef,
        right: &'a Schema,
    },
}

/// Renders logical plans as SQL text.
///
/// Every node becomes a SELECT over its child rendered as a derived table
/// aliased `t<table_idx>`. A limit is appended to its child's SELECT so it
/// applies after that SELECT's ordering. An ordering below a filter or
/// projection is repeated in the outer SELECT, since a derived table's row
/// order isn't kept.
#[derive(Debug, Clone)]
pub struct SqlRenderer<'a> {
    dialect: &'a SqlDialect,
}

impl<'a> SqlRenderer<'a> {
    pub fn new(dialect: &'a SqlDialect) -> Self {
        SqlRenderer { dialect }
    }

    pub fn render(&self, plan: &LogicalOperator) -> Result<String> {
        match plan {
            LogicalOperator::Scan(_)
            | LogicalOperator::SqlQuery(_)
            | LogicalOperator::Values(_) => Ok(format!("SELECT * FROM {}", self.relation(plan)?)),
            LogicalOperator::Project(node) => {
                let (input, ordering) = self.ordered_input(single_child(&node.children)?);
                let projections = node
                    .node
                    .projections
                    .iter()
                    .map(|expr| self.select_item(expr, Scope::Single))
                    .collect::<Result<Vec<_>>>()?;
                let mut sql = format!(
                    "SELECT {} FROM {}",
                    projections.join(", "),
                    self.relation(input)?
                );
                self.push_order_by(&mut sql, input, ordering)?;
                Ok(sql)
            }
            LogicalOperator::Filter(node) => {
                let (input, ordering) = self.ordered_input(single_child(&node.children)?);
                let mut sql = format!(
                    "SELECT * FROM {} WHERE {}",
                    self.relation(input)?,
                    self.expr(&node.node.filter, Scope::Single)?
                );
                self.push_order_by(&mut sql, input, ordering)?;
                Ok(sql)
            }
            LogicalOperator::Aggregate(node) => {
                let child = single_child(&node.children)?;
                let items = node
                    .node
                    .group_by
                    .iter()
                    .chain(&node.node.aggregates)
                    .map(|expr| self.select_item(expr, Scope::Single))
                    .collect::<Result<Vec<_>>>()?;
                let mut sql = format!(
                    "SELECT {} FROM {}",
                    items.join(", "),
                    self.relation(child)?
                );
                if !node.node.group_by.is_empty() {
                    let keys = node
                        .node
                        .group_by
                        .iter()
                        .map(|expr| self.expr(expr.unaliased(), Scope::Single))
                        .collect::<Result<Vec<_>>>()?;
                    sql.push_str(&format!(" GROUP BY {}", keys.join(", ")));
                }
                Ok(sql)
            }
            LogicalOperator::Order(node) => {
                let child = single_child(&node.children)?;
                Ok(format!(
                    "SELECT * FROM {} ORDER BY {}",
                    self.relation(child)?,
                    self.order_by(&node.node.exprs, Scope::Single)?
                ))
            }
            LogicalOperator::Limit(node) => self.render_limit(node),
            LogicalOperator::Join(node) => self.render_join(node),
        }
    }

    fn render_limit(&self, node: &Node<LogicalLimit>) -> Result<String> {
        let child = single_child(&node.children)?;
        let mut sql = match child {
            // A SELECT can't carry two limits.
            LogicalOperator::Limit(_) => {
                let mut sql = format!("SELECT * FROM {}", self.relation(child)?);
                self.push_order_by(&mut sql, child, output_ordering(child))?;
                sql
            }
            other => self.render(other)?,
        };
        if let Some(limit) = node.node.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
        if node.node.offset > 0 {
            sql.push_str(&format!(" OFFSET {}", node.node.offset));
        }
        Ok(sql)
    }

    /// The relation a filter or projection selects from, and the ordering its
    /// output must keep.
    ///
    /// An ordering child is folded away, its keys are evaluated over the
    /// ordering's own input instead.
    fn ordered_input<'b>(
        &self,
        child: &'b LogicalOperator,
    ) -> (&'b LogicalOperator, Option<&'b [OrderByExpr]>) {
        match child {
            LogicalOperator::Order(order) => match order.children.as_slice() {
                [input] => (input.as_ref(), Some(order.node.exprs.as_slice())),
                _ => (child, None),
            },
            other => (other, output_ordering(other)),
        }
    }

    fn push_order_by(
        &self,
        sql: &mut String,
        input: &LogicalOperator,
        ordering: Option<&[OrderByExpr]>,
    ) -> Result<()> {
        if let Some(exprs) = ordering.filter(|exprs| !exprs.is_empty()) {
            let scope = Scope::Qualified(input.table_ref());
            sql.push_str(&format!(" ORDER BY {}", self.order_by(exprs, scope)?));
        }
        Ok(())
    }

    fn render_join(&self, node: &Node<LogicalJoin>) -> Result<String> {
        let [left, right] = node.children.as_slice() else {
            return Err(DbError::new("Join expects exactly two children"));
        };
        let join = &node.node;
        let left_alias = alias(left.table_ref());
        let right_alias = alias(right.table_ref());
        let scope = Scope::Join {
            left_ref: left.table_ref(),
            left: left.schema(),
            right_ref: right.table_ref(),
            right: right.schema(),
        };

        let mut conditions = join
            .conditions
            .iter()
            .map(|cond| {
                format!(
                    "{left_alias}.{} = {right_alias}.{}",
                    self.dialect.quote_identifier(&cond.left),
                    self.dialect.quote_identifier(&cond.right)
                )
            })
            .collect::<Vec<_>>();
        if let Some(residual) = &join.residual {
            conditions.push(self.expr(residual, scope)?);
        }
        let on = if conditions.is_empty() {
            "TRUE".to_string()
        } else {
            conditions.join(" AND ")
        };

        let outputs = join
            .outputs
            .iter()
            .map(|output| {
                let source = match &output.source {
                    JoinColumnSource::Left(name) => {
                        format!("{left_alias}.{}", self.dialect.quote_identifier(name))
                    }
                    JoinColumnSource::Right(name) => {
                        format!("{right_alias}.{}", self.dialect.quote_identifier(name))
                    }
                    JoinColumnSource::Coalesce { left, right } => format!(
                        "COALESCE({left_alias}.{}, {right_alias}.{})",
                        self.dialect.quote_identifier(left),
                        self.dialect.quote_identifier(right)
                    ),
                };
                format!("{source} AS {}", self.dialect.quote_identifier(&output.name))
            })
            .collect::<Vec<_>>()
            .join(", ");

        let left_rel = self.relation(left)?;
        let right_rel = self.relation(right)?;

        Ok(match join.join_type {
            JoinType::LeftSemi | JoinType::LeftAnti => {
                let exists = if join.join_type == JoinType::LeftSemi {
                    "EXISTS"
                } else {
                    "NOT EXISTS"
                };
                format!(
                    "SELECT {outputs} FROM {left_rel} WHERE {exists} \
                     (SELECT 1 FROM {right_rel} WHERE {on})"
                )
            }
            JoinType::Inner if join.conditions.is_empty() && join.residual.is_none() => {
                format!("SELECT {outputs} FROM {left_rel} CROSS JOIN {right_rel}")
            }
            JoinType::Inner => {
                format!("SELECT {outputs} FROM {left_rel} INNER JOIN {right_rel} ON {on}")
            }
            JoinType::Left => {
                format!("SELECT {outputs} FROM {left_rel} LEFT JOIN {right_rel} ON {on}")
            }
            JoinType::Right => {
                format!("SELECT {outputs} FROM {left_rel} RIGHT JOIN {right_rel} ON {on}")
            }
            JoinType::Full => {
                format!("SELECT {outputs} FROM {left_rel} FULL OUTER JOIN {right_rel} ON {on}")
            }
        })
    }

    /// Render a plan as a FROM item.
    fn relation(&self, plan: &LogicalOperator) -> Result<String> {
        let alias = alias(plan.table_ref());
        Ok(match plan {
            LogicalOperator::Scan(node) => format!(
                "{} AS {alias}",
                self.dialect.quote_identifier(&node.node.table_name)
            ),
            LogicalOperator::SqlQuery(node) => format!("({}) AS {alias}", node.node.query),
            LogicalOperator::Values(node) => self.values(&node.node.batch, &node.schema, &alias)?,
            other => format!("({}) AS {alias}", self.render(other)?),
        })
    }

    /// Render in-plan rows as a VALUES list. Empty rows render as a typed
    /// SELECT that returns nothing.
    fn values(&self, batch: &Batch, schema: &Schema, alias: &str) -> Result<String> {
        let names = schema
            .names()
            .map(|name| self.dialect.quote_identifier(name))
            .collect::<Vec<_>>();

        if batch.num_rows() == 0 {
            let columns = schema
                .iter()
                .zip(&names)
                .map(|((_, datatype), name)| {
                    Ok(format!("CAST(NULL AS {}) AS {name}", self.dialect.type_name(datatype)?))
                })
                .collect::<Result<Vec<_>>>()?;
            return Ok(format!("(SELECT {} LIMIT 0) AS {alias}", columns.join(", ")));
        }

        let rows = batch
            .rows()
            .map(|row| {
                let values = row
                    .iter()
                    .map(|value| self.dialect.literal(value))
                    .collect::<Result<Vec<_>>>()?;
                Ok(format!("({})", values.join(", ")))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(format!(
            "(VALUES {}) AS {alias} ({})",
            rows.join(", "),
            names.join(", ")
        ))
    }

    fn select_item(&self, expr: &Expression, scope: Scope) -> Result<String> {
        let name = expr.output_name();
        let rendered = self.expr(expr.unaliased(), scope)?;
        let quoted = self.dialect.quote_identifier(&name);
        if rendered == quoted {
            Ok(rendered)
        } else {
            Ok(format!("{rendered} AS {quoted}"))
        }
    }

    fn order_by(&self, exprs: &[OrderByExpr], scope: Scope) -> Result<String> {
        let exprs = exprs
            .iter()
            .map(|expr| {
                Ok(format!(
                    "{} {} {}",
                    self.expr(&expr.expr, scope)?,
                    if expr.desc { "DESC" } else { "ASC" },
                    if expr.nulls_first {
                        "NULLS FIRST"
                    } else {
                        "NULLS LAST"
                    }
                ))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(exprs.join(", "))
    }

    fn column(&self, col: &ColumnExpr, scope: Scope) -> Result<String> {
        let name = self.dialect.quote_identifier(&col.name);
        match scope {
            Scope::Single => Ok(name),
            Scope::Qualified(table_ref) => Ok(format!("{}.{name}", alias(table_ref))),
            Scope::Join {
                left_ref,
                left,
                right_ref,
                right,
            } => {
                let table_ref = match col.table_ref {
                    Some(r) if r == left_ref || r == right_ref => r,
                    _ if left.contains(&col.name) => left_ref,
                    _ if right.contains(&col.name) => right_ref,
                    _ => {
                        return Err(DbError::join(format!(
                            "Column '{}' not found on either side of the join",
                            col.name
                        )));
                    }
                };
                Ok(format!("{}.{name}", alias(table_ref)))
            }
        }
    }

    fn expr(&self, expr: &Expression, scope: Scope) -> Result<String> {
        Ok(match expr {
            Expression::Column(col) => self.column(col, scope)?,
            Expression::Literal(lit) => self.dialect.literal(&lit.literal)?,
            Expression::Arith(arith) => format!(
                "({} {} {})",
                self.expr(&arith.left, scope)?,
                arith.op,
                self.expr(&arith.right, scope)?
            ),
            Expression::Comparison(cmp) => {
                let op = match cmp.op {
                    ComparisonOperator::NotEq => "<>".to_string(),
                    other => other.to_string(),
                };
                format!(
                    "({} {op} {})",
                    self.expr(&cmp.left, scope)?,
                    self.expr(&cmp.right, scope)?
                )
            }
            Expression::Conjunction(conj) => {
                let exprs = conj
                    .expressions
                    .iter()
                    .map(|expr| self.expr(expr, scope))
                    .collect::<Result<Vec<_>>>()?;
                format!("({})", exprs.join(&format!(" {} ", conj.op)))
            }
            Expression::Unary(unary) => {
                let inner = self.expr(&unary.expr, scope)?;
                match unary.op {
                    UnaryOperator::Not => format!("(NOT {inner})"),
                    UnaryOperator::Negate => format!("(-{inner})"),
                    UnaryOperator::IsNull => format!("({inner} IS NULL)"),
                    UnaryOperator::IsNotNull => format!("({inner} IS NOT NULL)"),
                }
            }
            Expression::Aggregate(agg) => self.aggregate(agg, scope)?,
            Expression::Window(window) => self.window(window, scope)?,
            Expression::Alias { expr, .. } => self.expr(expr, scope)?,
        })
    }

    fn aggregate(&self, agg: &AggregateExpr, scope: Scope) -> Result<String> {
        let input = match &agg.input {
            Some(input) => self.expr(input, scope)?,
            None => return Ok("count(*)".to_string()),
        };
        Ok(match agg.function {
            AggregateFunction::CountStar => "count(*)".to_string(),
            AggregateFunction::CountDistinct => format!("count(DISTINCT {input})"),
            func => format!("{}({input})", func.name()),
        })
    }

    fn window(&self, window: &WindowExpr, scope: Scope) -> Result<String> {
        let mut over = Vec::new();
        if !window.partition_by.is_empty() {
            let exprs = window
                .partition_by
                .iter()
                .map(|expr| self.expr(expr, scope))
                .collect::<Result<Vec<_>>>()?;
            over.push(format!("PARTITION BY {}", exprs.join(", ")));
        }
        if !window.order_by.is_empty() {
            over.push(format!("ORDER BY {}", self.order_by(&window.order_by, scope)?));
        }
        let over = over.join(" ");

        Ok(match &window.function {
            // SQL row numbers start at 1.
            WindowFunction::RowNumber => format!("(row_number() OVER ({over}) - 1)"),
            WindowFunction::Aggregate(agg) => {
                format!("{} OVER ({over})", self.aggregate(agg, scope)?)
            }
        })
    }
}

/// Ordering of a plan's output rows, if its SELECT leaves them ordered.
fn output_ordering(plan: &LogicalOperator) -> Option<&[OrderByExpr]> {
    match plan {
        LogicalOperator::Order(node) => Some(node.node.exprs.as_slice()),
        LogicalOperator::Filter(node) => node.children.first().and_then(|c| output_ordering(c)),
        LogicalOperator::Limit(node) => node.children.first().and_then(|c| output_ordering(c)),
        LogicalOperator::Project(node) => {
            let ordering = node.children.first().and_then(|c| output_ordering(c))?;
            // Keys stay valid when every column they use passes through
            // unchanged.
            let passes_through = |name: &str| {
                node.node.projections.iter().any(|expr| {
                    matches!(expr.unaliased(), Expression::Column(c) if c.name == name)
                        && expr.output_name() == name
                })
            };
            ordering
                .iter()
                .flat_map(|key| key.expr.column_refs())
                .all(|col| passes_through(&col.name))
                .then_some(ordering)
        }
        _ => None,
    }
}

fn alias(table_ref: TableRef) -> String {
    format!("t{}", table_ref.table_idx)
}

fn single_child(children: &[Arc<LogicalOperator>]) -> Result<&LogicalOperator> {
    match children {
        [child] => Ok(child.as_ref()),
        _ => Err(DbError::new("Expected exactly one child")
            .with_field("children", children.len())),
    }
}
