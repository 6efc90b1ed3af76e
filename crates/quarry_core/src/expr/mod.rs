pub mod aggregate_expr;
pub mod arith_expr;
pub mod column_expr;
pub mod comparison_expr;
pub mod conjunction_expr;
pub mod literal_expr;
pub mod negate_expr;
pub mod physical;
pub mod window_expr;

use std::fmt;
use std::ops;
use std::ops::ControlFlow;

use aggregate_expr::AggregateExpr;
use arith_expr::{ArithExpr, ArithOperator};
use column_expr::ColumnExpr;
use comparison_expr::{ComparisonExpr, ComparisonOperator};
use conjunction_expr::{ConjunctionExpr, ConjunctionOperator};
use literal_expr::LiteralExpr;
use negate_expr::{UnaryExpr, UnaryOperator};
use quarry_error::{DbError, Result};
use serde::{Deserialize, Serialize};
use window_expr::{WindowExpr, WindowFunction};

use crate::arrays::datatype::DataType;
use crate::arrays::field::Schema;
use crate::arrays::scalar::ScalarValue;
use crate::functions::aggregate::AggregateFunction;
use crate::logical::logical_order::OrderByExpr;

/// A scalar expression, evaluated against the schema of some input
/// relation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expression {
    Column(ColumnExpr),
    Literal(LiteralExpr),
    Arith(ArithExpr),
    Comparison(ComparisonExpr),
    Conjunction(ConjunctionExpr),
    Unary(UnaryExpr),
    Aggregate(AggregateExpr),
    Window(WindowExpr),
    Alias { alias: String, expr: Box<Expression> },
}

/// Create a column reference.
pub fn col(name: impl Into<String>) -> Expression {
    Expression::Column(ColumnExpr::new(name))
}

/// Create a literal.
pub fn lit(value: impl Into<ScalarValue>) -> Expression {
    Expression::Literal(LiteralExpr {
        literal: value.into(),
    })
}

/// COUNT(*)
pub fn count_star() -> Expression {
    Expression::Aggregate(AggregateExpr {
        function: AggregateFunction::CountStar,
        input: None,
    })
}

/// Zero-based row number over an empty window. Use `over` to partition or
/// order it.
pub fn row_number() -> Expression {
    Expression::Window(WindowExpr {
        function: WindowFunction::RowNumber,
        partition_by: Vec::new(),
        order_by: Vec::new(),
    })
}

impl Expression {
    /// Compute the output type of this expression against an input schema.
    pub fn datatype(&self, schema: &Schema) -> Result<DataType> {
        Ok(match self {
            Self::Column(col) => col.datatype(schema)?,
            Self::Literal(lit) => lit.datatype(),
            Self::Arith(expr) => expr
                .op
                .return_type(&expr.left.datatype(schema)?, &expr.right.datatype(schema)?)?,
            Self::Comparison(expr) => expr
                .op
                .return_type(&expr.left.datatype(schema)?, &expr.right.datatype(schema)?)?,
            Self::Conjunction(expr) => {
                let mut nullable = false;
                for child in &expr.expressions {
                    let typ = child.datatype(schema)?;
                    if !(typ.is_boolean() || typ.is_null()) {
                        return Err(DbError::expression(format!(
                            "{} requires boolean inputs, got {typ} for '{child}'",
                            expr.op
                        )));
                    }
                    nullable |= typ.nullable;
                }
                DataType::boolean().with_nullable(nullable)
            }
            Self::Unary(expr) => expr.op.return_type(&expr.expr.datatype(schema)?)?,
            Self::Aggregate(agg) => Self::aggregate_datatype(agg, schema)?,
            Self::Window(window) => {
                for expr in &window.partition_by {
                    expr.datatype(schema)?;
                }
                for expr in &window.order_by {
                    expr.expr.datatype(schema)?;
                }
                match &window.function {
                    WindowFunction::RowNumber => DataType::int64().non_null(),
                    WindowFunction::Aggregate(agg) => Self::aggregate_datatype(agg, schema)?,
                }
            }
            Self::Alias { expr, .. } => expr.datatype(schema)?,
        })
    }

    fn aggregate_datatype(agg: &AggregateExpr, schema: &Schema) -> Result<DataType> {
        let input = match &agg.input {
            Some(input) => {
                if input.contains_aggregate() {
                    return Err(DbError::expression(format!(
                        "Aggregates cannot be nested: '{agg}'"
                    )));
                }
                input.datatype(schema)?
            }
            None => DataType::null(),
        };
        agg.function.return_type(&input)
    }

    /// Name of the column this expression produces when projected.
    pub fn output_name(&self) -> String {
        match self {
            Self::Column(col) => col.name.clone(),
            Self::Alias { alias, .. } => alias.clone(),
            Self::Aggregate(AggregateExpr {
                function: AggregateFunction::CountStar,
                ..
            }) => "count".to_string(),
            other => other.to_string(),
        }
    }

    /// Name this expression, the name is used as the output column name.
    pub fn alias(self, alias: impl Into<String>) -> Expression {
        let expr = match self {
            // Re-aliasing replaces the previous alias.
            Self::Alias { expr, .. } => expr,
            other => Box::new(other),
        };
        Expression::Alias {
            alias: alias.into(),
            expr,
        }
    }

    /// Strip any alias.
    pub fn unaliased(&self) -> &Expression {
        match self {
            Self::Alias { expr, .. } => expr.unaliased(),
            other => other,
        }
    }

    fn compare(self, op: ComparisonOperator, other: impl Into<Expression>) -> Expression {
        Expression::Comparison(ComparisonExpr {
            left: Box::new(self),
            right: Box::new(other.into()),
            op,
        })
    }

    pub fn equals(self, other: impl Into<Expression>) -> Expression {
        self.compare(ComparisonOperator::Eq, other)
    }

    pub fn not_equals(self, other: impl Into<Expression>) -> Expression {
        self.compare(ComparisonOperator::NotEq, other)
    }

    pub fn lt(self, other: impl Into<Expression>) -> Expression {
        self.compare(ComparisonOperator::Lt, other)
    }

    pub fn lt_eq(self, other: impl Into<Expression>) -> Expression {
        self.compare(ComparisonOperator::LtEq, other)
    }

    pub fn gt(self, other: impl Into<Expression>) -> Expression {
        self.compare(ComparisonOperator::Gt, other)
    }

    pub fn gt_eq(self, other: impl Into<Expression>) -> Expression {
        self.compare(ComparisonOperator::GtEq, other)
    }

    fn conjunction(self, op: ConjunctionOperator, other: impl Into<Expression>) -> Expression {
        let mut expressions = Vec::new();
        for expr in [self, other.into()] {
            match expr {
                // Flatten nested conjunctions of the same kind.
                Expression::Conjunction(conj) if conj.op == op => {
                    expressions.extend(conj.expressions)
                }
                other => expressions.push(other),
            }
        }
        Expression::Conjunction(ConjunctionExpr { op, expressions })
    }

    pub fn and(self, other: impl Into<Expression>) -> Expression {
        self.conjunction(ConjunctionOperator::And, other)
    }

    pub fn or(self, other: impl Into<Expression>) -> Expression {
        self.conjunction(ConjunctionOperator::Or, other)
    }

    fn unary(self, op: UnaryOperator) -> Expression {
        Expression::Unary(UnaryExpr {
            op,
            expr: Box::new(self),
        })
    }

    pub fn is_null(self) -> Expression {
        self.unary(UnaryOperator::IsNull)
    }

    pub fn is_not_null(self) -> Expression {
        self.unary(UnaryOperator::IsNotNull)
    }

    fn aggregate(self, function: AggregateFunction) -> Expression {
        Expression::Aggregate(AggregateExpr {
            function,
            input: Some(Box::new(self)),
        })
    }

    pub fn count(self) -> Expression {
        self.aggregate(AggregateFunction::Count)
    }

    pub fn count_distinct(self) -> Expression {
        self.aggregate(AggregateFunction::CountDistinct)
    }

    pub fn sum(self) -> Expression {
        self.aggregate(AggregateFunction::Sum)
    }

    pub fn mean(self) -> Expression {
        self.aggregate(AggregateFunction::Mean)
    }

    pub fn min(self) -> Expression {
        self.aggregate(AggregateFunction::Min)
    }

    pub fn max(self) -> Expression {
        self.aggregate(AggregateFunction::Max)
    }

    pub fn asc(self) -> OrderByExpr {
        OrderByExpr {
            expr: self,
            desc: false,
            nulls_first: false,
        }
    }

    pub fn desc(self) -> OrderByExpr {
        OrderByExpr {
            expr: self,
            desc: true,
            nulls_first: false,
        }
    }

    /// Turn an aggregate or `row_number()` into a window expression over the
    /// given partitioning and ordering.
    pub fn over(
        self,
        partition_by: impl IntoIterator<Item = Expression>,
        order_by: impl IntoIterator<Item = OrderByExpr>,
    ) -> Result<Expression> {
        let function = match self {
            Self::Aggregate(agg) => WindowFunction::Aggregate(agg),
            Self::Window(window) => window.function,
            Self::Alias { alias, expr } => {
                return Ok((*expr).over(partition_by, order_by)?.alias(alias));
            }
            other => {
                return Err(DbError::expression(format!(
                    "Only aggregates and row_number can be windowed, got '{other}'"
                )));
            }
        };

        Ok(Expression::Window(WindowExpr {
            function,
            partition_by: partition_by.into_iter().collect(),
            order_by: order_by.into_iter().collect(),
        }))
    }

    /// Call `func` on each direct child expression.
    pub fn for_each_child<'a, F>(&'a self, func: &mut F) -> Result<()>
    where
        F: FnMut(&'a Expression) -> Result<()>,
    {
        match self {
            Self::Column(_) | Self::Literal(_) => (),
            Self::Arith(expr) => {
                func(&expr.left)?;
                func(&expr.right)?;
            }
            Self::Comparison(expr) => {
                func(&expr.left)?;
                func(&expr.right)?;
            }
            Self::Conjunction(expr) => {
                for child in &expr.expressions {
                    func(child)?;
                }
            }
            Self::Unary(expr) => func(&expr.expr)?,
            Self::Aggregate(agg) => {
                if let Some(input) = &agg.input {
                    func(input)?;
                }
            }
            Self::Window(window) => {
                if let WindowFunction::Aggregate(agg) = &window.function {
                    if let Some(input) = &agg.input {
                        func(input)?;
                    }
                }
                for expr in &window.partition_by {
                    func(expr)?;
                }
                for expr in &window.order_by {
                    func(&expr.expr)?;
                }
            }
            Self::Alias { expr, .. } => func(expr)?,
        }
        Ok(())
    }

    /// Walk this expression and all of its descendants, depth first.
    pub fn walk<'a, F>(&'a self, func: &mut F)
    where
        F: FnMut(&'a Expression),
    {
        func(self);
        // Walking never errors.
        let _ = self.for_each_child(&mut |child| {
            child.walk(func);
            Ok(())
        });
    }

    /// Rebuild this expression, replacing every column reference with the
    /// output of `func`.
    pub fn map_columns<F>(self, func: &mut F) -> Result<Expression>
    where
        F: FnMut(ColumnExpr) -> Result<Expression>,
    {
        self.rewrite(&mut |expr| match expr {
            Expression::Column(col) => func(col).map(ControlFlow::Break),
            other => Ok(ControlFlow::Continue(other)),
        })
    }

    /// Rebuild this expression top down.
    ///
    /// `func` is called on a node before its children. Returning `Break`
    /// replaces the node without visiting its children, `Continue` keeps the
    /// (possibly modified) node and descends into its children.
    pub fn rewrite<F>(self, func: &mut F) -> Result<Expression>
    where
        F: FnMut(Expression) -> Result<ControlFlow<Expression, Expression>>,
    {
        let expr = match func(self)? {
            ControlFlow::Break(expr) => return Ok(expr),
            ControlFlow::Continue(expr) => expr,
        };

        let mut rewrite_box = |expr: Box<Expression>| -> Result<Box<Expression>> {
            Ok(Box::new(expr.rewrite(func)?))
        };

        Ok(match expr {
            Self::Column(col) => Self::Column(col),
            Self::Literal(lit) => Self::Literal(lit),
            Self::Arith(expr) => Self::Arith(ArithExpr {
                op: expr.op,
                left: rewrite_box(expr.left)?,
                right: rewrite_box(expr.right)?,
            }),
            Self::Comparison(expr) => Self::Comparison(ComparisonExpr {
                op: expr.op,
                left: rewrite_box(expr.left)?,
                right: rewrite_box(expr.right)?,
            }),
            Self::Conjunction(expr) => Self::Conjunction(ConjunctionExpr {
                op: expr.op,
                expressions: expr
                    .expressions
                    .into_iter()
                    .map(|e| rewrite_box(Box::new(e)).map(|e| *e))
                    .collect::<Result<Vec<_>>>()?,
            }),
            Self::Unary(expr) => Self::Unary(UnaryExpr {
                op: expr.op,
                expr: rewrite_box(expr.expr)?,
            }),
            Self::Aggregate(agg) => Self::Aggregate(AggregateExpr {
                function: agg.function,
                input: agg.input.map(&mut rewrite_box).transpose()?,
            }),
            Self::Window(window) => {
                let function = match window.function {
                    WindowFunction::RowNumber => WindowFunction::RowNumber,
                    WindowFunction::Aggregate(agg) => WindowFunction::Aggregate(AggregateExpr {
                        function: agg.function,
                        input: agg.input.map(&mut rewrite_box).transpose()?,
                    }),
                };
                let partition_by = window
                    .partition_by
                    .into_iter()
                    .map(|e| rewrite_box(Box::new(e)).map(|e| *e))
                    .collect::<Result<Vec<_>>>()?;
                let order_by = window
                    .order_by
                    .into_iter()
                    .map(|o| {
                        Ok(OrderByExpr {
                            expr: *rewrite_box(Box::new(o.expr))?,
                            desc: o.desc,
                            nulls_first: o.nulls_first,
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                Self::Window(WindowExpr {
                    function,
                    partition_by,
                    order_by,
                })
            }
            Self::Alias { alias, expr } => Self::Alias {
                alias,
                expr: rewrite_box(expr)?,
            },
        })
    }

    /// All column references in this expression.
    pub fn column_refs(&self) -> Vec<&ColumnExpr> {
        let mut cols = Vec::new();
        self.walk(&mut |expr| {
            if let Expression::Column(col) = expr {
                cols.push(col);
            }
        });
        cols
    }

    /// If this expression contains an aggregate outside of a window.
    pub fn contains_aggregate(&self) -> bool {
        match self {
            Self::Aggregate(_) => true,
            Self::Window(_) => false,
            other => {
                let mut found = false;
                let _ = other.for_each_child(&mut |child| {
                    found |= child.contains_aggregate();
                    Ok(())
                });
                found
            }
        }
    }

    pub fn contains_window(&self) -> bool {
        let mut found = false;
        self.walk(&mut |expr| found |= matches!(expr, Expression::Window(_)));
        found
    }

    /// Split an AND conjunction into its parts.
    pub fn split_conjunction(self) -> Vec<Expression> {
        match self {
            Expression::Conjunction(ConjunctionExpr {
                op: ConjunctionOperator::And,
                expressions,
            }) => expressions
                .into_iter()
                .flat_map(|expr| expr.split_conjunction())
                .collect(),
            other => vec![other],
        }
    }

    /// Display wrapper that parenthesizes compound expressions, used when
    /// this expression is an operand of another.
    pub fn as_operand(&self) -> Operand<'_> {
        Operand(self)
    }
}

pub struct Operand<'a>(&'a Expression);

impl fmt::Display for Operand<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Expression::Arith(_)
            | Expression::Comparison(_)
            | Expression::Conjunction(_)
            | Expression::Unary(_) => write!(f, "({})", self.0),
            other => write!(f, "{other}"),
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Column(expr) => write!(f, "{expr}"),
            Self::Literal(expr) => write!(f, "{expr}"),
            Self::Arith(expr) => write!(f, "{expr}"),
            Self::Comparison(expr) => write!(f, "{expr}"),
            Self::Conjunction(expr) => write!(f, "{expr}"),
            Self::Unary(expr) => write!(f, "{expr}"),
            Self::Aggregate(expr) => write!(f, "{expr}"),
            Self::Window(expr) => write!(f, "{expr}"),
            Self::Alias { alias, expr } => write!(f, "{expr} AS {alias}"),
        }
    }
}

impl From<ColumnExpr> for Expression {
    fn from(col: ColumnExpr) -> Self {
        Expression::Column(col)
    }
}

impl From<ScalarValue> for Expression {
    fn from(value: ScalarValue) -> Self {
        lit(value)
    }
}

macro_rules! impl_literal_from {
    ($($native:ty),*) => {
        $(
            impl From<$native> for Expression {
                fn from(value: $native) -> Self {
                    lit(value)
                }
            }
        )*
    };
}

impl_literal_from!(bool, i8, i16, i32, i64, u8, u16, u32, u64, f32, f64, String, &str);

macro_rules! impl_arith_op {
    ($trait:ident, $method:ident, $op:expr) => {
        impl<R: Into<Expression>> ops::$trait<R> for Expression {
            type Output = Expression;

            fn $method(self, rhs: R) -> Expression {
                Expression::Arith(ArithExpr {
                    op: $op,
                    left: Box::new(self),
                    right: Box::new(rhs.into()),
                })
            }
        }
    };
}

impl_arith_op!(Add, add, ArithOperator::Add);
impl_arith_op!(Sub, sub, ArithOperator::Sub);
impl_arith_op!(Mul, mul, ArithOperator::Mul);
impl_arith_op!(Div, div, ArithOperator::Div);
impl_arith_op!(Rem, rem, ArithOperator::Mod);

impl ops::Neg for Expression {
    type Output = Expression;

    fn neg(self) -> Expression {
        self.unary(UnaryOperator::Negate)
    }
}

impl ops::Not for Expression {
    type Output = Expression;

    fn not(self) -> Expression {
        self.unary(UnaryOperator::Not)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> Schema {
        Schema::parse([
            ("a", "!int32"),
            ("b", "float64"),
            ("s", "string"),
            ("flag", "!boolean"),
        ])
        .unwrap()
    }

    #[test]
    fn output_names() {
        assert_eq!("a", col("a").output_name());
        assert_eq!("x", (col("a") + 1i32).alias("x").output_name());
        assert_eq!("a * 2", (col("a") * 2i32).output_name());
        assert_eq!("sum(a)", col("a").sum().output_name());
        assert_eq!("count", count_star().output_name());
    }

    #[test]
    fn nested_display_parenthesized() {
        let expr = (col("a") + 1i32) * col("b");
        assert_eq!("(a + 1) * b", expr.to_string());
    }

    #[test]
    fn datatype_derivation() {
        let schema = schema();
        assert_eq!(
            DataType::float64(),
            (col("a") + col("b")).datatype(&schema).unwrap()
        );
        assert_eq!(
            DataType::boolean().non_null(),
            col("a").gt(5i32).datatype(&schema).unwrap()
        );
        assert_eq!(
            DataType::boolean().non_null(),
            col("flag").and(col("a").equals(1i32)).datatype(&schema).unwrap()
        );
        assert_eq!(
            DataType::int64(),
            col("a").sum().datatype(&schema).unwrap()
        );
    }

    #[test]
    fn datatype_errors() {
        let schema = schema();
        let err = col("missing").datatype(&schema).unwrap_err();
        assert_eq!(quarry_error::ErrorKind::Expression, err.kind());

        assert!((col("s") + 1i32).datatype(&schema).is_err());
        assert!(col("s").gt(1i32).datatype(&schema).is_err());
        assert!(col("a").and(col("flag")).datatype(&schema).is_err());
        assert!(col("a").sum().sum().datatype(&schema).is_err());
    }

    #[test]
    fn null_literal_compatible() {
        let schema = schema();
        let typ = col("s")
            .equals(ScalarValue::Null)
            .datatype(&schema)
            .unwrap();
        assert_eq!(DataType::boolean(), typ);
    }

    #[test]
    fn conjunction_split_and_flatten() {
        let expr = col("a")
            .equals(1i32)
            .and(col("b").equals(2.0f64))
            .and(col("flag"));
        match &expr {
            Expression::Conjunction(conj) => assert_eq!(3, conj.expressions.len()),
            other => panic!("unexpected expression: {other:?}"),
        }
        assert_eq!(3, expr.split_conjunction().len());
    }

    #[test]
    fn window_construction() {
        let expr = col("b")
            .mean()
            .over([col("s")], [col("a").asc()])
            .unwrap();
        assert!(expr.contains_window());
        assert!(!expr.contains_aggregate());
        assert_eq!(DataType::float64(), expr.datatype(&schema()).unwrap());

        let rn = row_number().over([], [col("a").asc()]).unwrap();
        assert_eq!(DataType::int64().non_null(), rn.datatype(&schema()).unwrap());

        assert!(col("a").over([], []).is_err());
    }

    #[test]
    fn column_refs_collected() {
        let expr = (col("a") + col("b")).gt(col("a"));
        let names: Vec<_> = expr.column_refs().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(vec!["a", "b", "a"], names);
    }
}
