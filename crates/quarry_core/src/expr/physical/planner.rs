use quarry_error::{DbError, ErrorKind, Result};

use super::{PhysicalAggregateExpression, PhysicalScalarExpression, PhysicalSortExpression};
use crate::arrays::datatype::DataType;
use crate::arrays::field::Schema;
use crate::expr::Expression;
use crate::expr::aggregate_expr::AggregateExpr;
use crate::expr::column_expr::ColumnExpr;
use crate::logical::logical_order::OrderByExpr;
use crate::logical::table_ref::TableRef;

/// One input relation visible to the planner. Columns of later scopes are
/// offset by the widths of earlier scopes.
#[derive(Debug, Clone, Copy)]
struct Scope<'a> {
    table_ref: Option<TableRef>,
    schema: &'a Schema,
    offset: usize,
}

/// Plans logical expressions into physical expressions by resolving column
/// names to positions in the input row.
#[derive(Debug)]
pub struct PhysicalExpressionPlanner<'a> {
    scopes: Vec<Scope<'a>>,
}

impl<'a> PhysicalExpressionPlanner<'a> {
    /// Planner for expressions over a single input.
    pub fn new(schema: &'a Schema) -> Self {
        PhysicalExpressionPlanner {
            scopes: vec![Scope {
                table_ref: None,
                schema,
                offset: 0,
            }],
        }
    }

    /// Planner for expressions over a joined left/right row. Columns are
    /// matched to a side by table ref first, then by name.
    pub fn new_join(
        left_ref: TableRef,
        left: &'a Schema,
        right_ref: TableRef,
        right: &'a Schema,
    ) -> Self {
        PhysicalExpressionPlanner {
            scopes: vec![
                Scope {
                    table_ref: Some(left_ref),
                    schema: left,
                    offset: 0,
                },
                Scope {
                    table_ref: Some(right_ref),
                    schema: right,
                    offset: left.len(),
                },
            ],
        }
    }

    fn resolve_column(&self, col: &ColumnExpr) -> Result<(usize, DataType)> {
        let lookup = |scope: &Scope| {
            scope.schema.index_of(&col.name).and_then(|idx| {
                scope
                    .schema
                    .field_at(idx)
                    .map(|field| (scope.offset + idx, field.datatype))
            })
        };

        if col.table_ref.is_some() {
            if let Some(found) = self
                .scopes
                .iter()
                .filter(|scope| scope.table_ref == col.table_ref)
                .find_map(lookup)
            {
                return Ok(found);
            }
        }

        self.scopes.iter().find_map(lookup).ok_or_else(|| {
            DbError::expression(format!("Missing column for reference: {}", col.name))
        })
    }

    pub fn plan_scalar(&self, expr: &Expression) -> Result<PhysicalScalarExpression> {
        Ok(match expr {
            Expression::Column(col) => {
                let (idx, datatype) = self.resolve_column(col)?;
                PhysicalScalarExpression::Column { idx, datatype }
            }
            Expression::Literal(lit) => PhysicalScalarExpression::Literal {
                literal: lit.literal.clone(),
                datatype: lit.datatype(),
            },
            Expression::Arith(arith) => {
                let left = self.plan_scalar(&arith.left)?;
                let right = self.plan_scalar(&arith.right)?;
                let datatype = arith.op.return_type(left.datatype(), right.datatype())?;
                PhysicalScalarExpression::Arith {
                    op: arith.op,
                    left: Box::new(left),
                    right: Box::new(right),
                    datatype,
                }
            }
            Expression::Comparison(cmp) => {
                let left = self.plan_scalar(&cmp.left)?;
                let right = self.plan_scalar(&cmp.right)?;
                let datatype = cmp.op.return_type(left.datatype(), right.datatype())?;
                PhysicalScalarExpression::Comparison {
                    op: cmp.op,
                    left: Box::new(left),
                    right: Box::new(right),
                    datatype,
                }
            }
            Expression::Conjunction(conj) => {
                let expressions = conj
                    .expressions
                    .iter()
                    .map(|expr| self.plan_scalar(expr))
                    .collect::<Result<Vec<_>>>()?;
                let nullable = expressions.iter().any(|expr| expr.datatype().nullable);
                PhysicalScalarExpression::Conjunction {
                    op: conj.op,
                    expressions,
                    datatype: DataType::boolean().with_nullable(nullable),
                }
            }
            Expression::Unary(unary) => {
                let input = self.plan_scalar(&unary.expr)?;
                let datatype = unary.op.return_type(input.datatype())?;
                PhysicalScalarExpression::Unary {
                    op: unary.op,
                    expr: Box::new(input),
                    datatype,
                }
            }
            Expression::Alias { expr, .. } => self.plan_scalar(expr)?,
            Expression::Aggregate(_) | Expression::Window(_) => {
                return Err(DbError::with_kind(
                    ErrorKind::Internal,
                    format!("Expression should have been extracted before planning: {expr}"),
                ));
            }
        })
    }

    pub fn plan_scalars<'b>(
        &self,
        exprs: impl IntoIterator<Item = &'b Expression>,
    ) -> Result<Vec<PhysicalScalarExpression>> {
        exprs.into_iter().map(|expr| self.plan_scalar(expr)).collect()
    }

    /// Plan an aggregate, optionally wrapped in an alias.
    pub fn plan_aggregate(&self, expr: &Expression) -> Result<PhysicalAggregateExpression> {
        match expr.unaliased() {
            Expression::Aggregate(agg) => self.plan_aggregate_expr(agg),
            other => Err(DbError::expression(format!(
                "Expected an aggregate, got '{other}'"
            ))),
        }
    }

    pub fn plan_aggregate_expr(&self, agg: &AggregateExpr) -> Result<PhysicalAggregateExpression> {
        let input = agg
            .input
            .as_ref()
            .map(|input| self.plan_scalar(input))
            .transpose()?;
        let input_type = match &input {
            Some(input) => input.datatype().clone(),
            None => DataType::null(),
        };
        let datatype = agg.function.return_type(&input_type)?;

        Ok(PhysicalAggregateExpression {
            function: agg.function,
            input,
            datatype,
        })
    }

    pub fn plan_sorts<'b>(
        &self,
        exprs: impl IntoIterator<Item = &'b OrderByExpr>,
    ) -> Result<Vec<PhysicalSortExpression>> {
        exprs
            .into_iter()
            .map(|expr| {
                Ok(PhysicalSortExpression {
                    column: self.plan_scalar(&expr.expr)?,
                    desc: expr.desc,
                    nulls_first: expr.nulls_first,
                })
            })
            .collect()
    }
}
