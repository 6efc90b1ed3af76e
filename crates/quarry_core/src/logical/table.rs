use std::collections::HashSet;
use std::sync::Arc;

use quarry_error::{DbError, Result, ResultExt};

use super::logical_aggregate::LogicalAggregate;
use super::logical_filter::LogicalFilter;
use super::logical_join::JoinType;
use super::logical_limit::LogicalLimit;
use super::logical_order::{LogicalOrder, OrderByExpr};
use super::logical_project::LogicalProject;
use super::logical_scan::{LogicalScan, LogicalSqlQuery, LogicalValues};
use super::operator::{LogicalOperator, Node};
use super::planner::plan_join::{JoinPlanner, JoinPredicate, JoinSuffixes};
use super::table_ref::TableRef;
use crate::arrays::datatype::DataType;
use crate::arrays::field::Schema;
use crate::arrays::native::ColumnarSource;
use crate::engine::query::Query;
use crate::explain::explainable::ExplainConfig;
use crate::explain::node::ExplainNode;
use crate::expr::column_expr::ColumnExpr;
use crate::expr::{Expression, col, count_star};
use crate::infer::infer_schema;

/// Options carried along with a table expression.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TableOptions {
    /// Suffixes used when a join doesn't specify its own.
    pub join_suffixes: JoinSuffixes,
}

/// Handle to an immutable relational expression.
///
/// Every method returns a new table that shares this table's plan. Cloning is
/// cheap.
#[derive(Debug, Clone)]
pub struct Table {
    root: Arc<LogicalOperator>,
    options: TableOptions,
}

impl PartialEq for Table {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.root, &other.root) || self.root == other.root
    }
}

impl Table {
    /// A table backed by a named table on the adapter.
    pub fn scan(table_name: impl Into<String>, schema: Schema) -> Self {
        let node = Node::new(
            LogicalScan {
                table_name: table_name.into(),
            },
            schema,
            Vec::new(),
        );
        Self::from_operator(LogicalOperator::Scan(node))
    }

    /// A table defined by raw query text.
    pub fn sql_query(query: impl Into<String>, schema: Schema) -> Self {
        let node = Node::new(
            LogicalSqlQuery {
                query: query.into(),
            },
            schema,
            Vec::new(),
        );
        Self::from_operator(LogicalOperator::SqlQuery(node))
    }

    /// A table over in-process columnar data.
    ///
    /// The schema is inferred from the data, and the rows travel with the
    /// plan.
    pub fn memory(data: &ColumnarSource) -> Result<Self> {
        let schema = infer_schema(data)?;
        let batch = data.to_batch(&schema)?;
        let node = Node::new(LogicalValues { batch }, schema, Vec::new());
        Ok(Self::from_operator(LogicalOperator::Values(node)))
    }

    fn from_operator(op: LogicalOperator) -> Self {
        Table {
            root: Arc::new(op),
            options: TableOptions::default(),
        }
    }

    fn derive(&self, op: LogicalOperator) -> Self {
        Table {
            root: Arc::new(op),
            options: self.options.clone(),
        }
    }

    pub fn with_options(mut self, options: TableOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &TableOptions {
        &self.options
    }

    pub fn root(&self) -> &Arc<LogicalOperator> {
        &self.root
    }

    pub fn schema(&self) -> &Schema {
        self.root.schema()
    }

    pub fn table_ref(&self) -> TableRef {
        self.root.table_ref()
    }

    /// Reference a column of this table.
    pub fn col(&self, name: &str) -> Result<Expression> {
        self.schema().try_get(name)?;
        Ok(Expression::Column(ColumnExpr::with_table(
            self.table_ref(),
            name,
        )))
    }

    /// Keep rows matching a boolean predicate.
    pub fn filter(&self, predicate: Expression) -> Result<Table> {
        let typ = predicate.datatype(self.schema())?;
        if !(typ.is_boolean() || typ.is_null()) {
            return Err(DbError::expression(format!(
                "Filter predicate must be boolean, got {typ} for '{predicate}'"
            )));
        }
        if predicate.contains_aggregate() || predicate.contains_window() {
            return Err(DbError::expression(format!(
                "Filter predicate cannot contain aggregates or windows: '{predicate}'"
            )));
        }

        let node = Node::new(
            LogicalFilter { filter: predicate },
            self.schema().clone(),
            vec![self.root.clone()],
        );
        Ok(self.derive(LogicalOperator::Filter(node)))
    }

    /// Project a list of expressions.
    pub fn select(&self, projections: impl IntoIterator<Item = Expression>) -> Result<Table> {
        let projections: Vec<_> = projections.into_iter().collect();
        if projections.is_empty() {
            return Err(DbError::expression("Projection requires at least one expression"));
        }

        let mut fields = Vec::with_capacity(projections.len());
        for expr in &projections {
            if expr.contains_aggregate() {
                return Err(DbError::expression(format!(
                    "Aggregate '{expr}' must be computed with an aggregation"
                )));
            }
            fields.push((expr.output_name(), expr.datatype(self.schema())?));
        }
        let schema = unique_schema(fields)?;

        let node = Node::new(
            LogicalProject { projections },
            schema,
            vec![self.root.clone()],
        );
        Ok(self.derive(LogicalOperator::Project(node)))
    }

    /// Project columns by name.
    pub fn select_columns(&self, names: &[&str]) -> Result<Table> {
        let exprs = names
            .iter()
            .map(|name| self.col(name))
            .collect::<Result<Vec<_>>>()?;
        self.select(exprs)
    }

    /// Add or replace columns, keeping all existing columns.
    ///
    /// A new expression whose name matches an existing column replaces that
    /// column in place.
    pub fn mutate(&self, exprs: impl IntoIterator<Item = Expression>) -> Result<Table> {
        let mut exprs: Vec<_> = exprs.into_iter().collect();
        let mut projections = Vec::with_capacity(self.schema().len() + exprs.len());

        for name in self.schema().names() {
            match exprs.iter().position(|e| e.output_name() == name) {
                Some(pos) => projections.push(exprs.remove(pos)),
                None => projections.push(col(name)),
            }
        }
        projections.extend(exprs);

        self.select(projections)
    }

    /// Remove columns by name.
    pub fn drop(&self, names: &[&str]) -> Result<Table> {
        for name in names {
            self.schema().try_get(name)?;
        }
        let keep: Vec<_> = self
            .schema()
            .names()
            .filter(|n| !names.contains(n))
            .map(col)
            .collect();
        self.select(keep)
    }

    /// Join with another table using the table's default suffixes.
    pub fn join(
        &self,
        right: &Table,
        predicate: impl Into<JoinPredicate>,
        join_type: JoinType,
    ) -> Result<Table> {
        let suffixes = self.options.join_suffixes.clone();
        self.join_with_suffixes(right, predicate, join_type, &suffixes)
    }

    pub fn join_with_suffixes(
        &self,
        right: &Table,
        predicate: impl Into<JoinPredicate>,
        join_type: JoinType,
        suffixes: &JoinSuffixes,
    ) -> Result<Table> {
        // Each side of a self join needs its own ref to be addressable.
        let self_join_ref = (self.table_ref() == right.table_ref()).then_some(self.table_ref());
        let right = match self_join_ref {
            Some(_) => right.view(),
            None => right.clone(),
        };

        let planner = JoinPlanner {
            left: &self.root,
            right: &right.root,
            suffixes,
            self_join_ref,
        };
        let (join, schema) = planner.plan(predicate.into(), join_type)?;
        let node = Node::new(join, schema, vec![self.root.clone(), right.root]);
        Ok(self.derive(LogicalOperator::Join(node)))
    }

    /// A new handle to the same rows with its own table ref.
    ///
    /// Columns referenced through the view are distinct from columns of this
    /// table, which lets join predicates between a table and itself name each
    /// side.
    pub fn view(&self) -> Table {
        let projections = self.schema().names().map(col).collect();
        let node = Node::new(
            LogicalProject { projections },
            self.schema().clone(),
            vec![self.root.clone()],
        );
        self.derive(LogicalOperator::Project(node))
    }

    pub fn inner_join(&self, right: &Table, predicate: impl Into<JoinPredicate>) -> Result<Table> {
        self.join(right, predicate, JoinType::Inner)
    }

    pub fn left_join(&self, right: &Table, predicate: impl Into<JoinPredicate>) -> Result<Table> {
        self.join(right, predicate, JoinType::Left)
    }

    pub fn right_join(&self, right: &Table, predicate: impl Into<JoinPredicate>) -> Result<Table> {
        self.join(right, predicate, JoinType::Right)
    }

    pub fn outer_join(&self, right: &Table, predicate: impl Into<JoinPredicate>) -> Result<Table> {
        self.join(right, predicate, JoinType::Full)
    }

    pub fn semi_join(&self, right: &Table, predicate: impl Into<JoinPredicate>) -> Result<Table> {
        self.join(right, predicate, JoinType::LeftSemi)
    }

    pub fn anti_join(&self, right: &Table, predicate: impl Into<JoinPredicate>) -> Result<Table> {
        self.join(right, predicate, JoinType::LeftAnti)
    }

    pub fn cross_join(&self, right: &Table) -> Result<Table> {
        self.join(right, JoinPredicate::Cross, JoinType::Inner)
    }

    /// Group by keys and compute metrics. With no keys the result is a single
    /// row.
    pub fn aggregate(
        &self,
        group_by: impl IntoIterator<Item = Expression>,
        metrics: impl IntoIterator<Item = Expression>,
    ) -> Result<Table> {
        let group_by: Vec<_> = group_by.into_iter().collect();
        let aggregates: Vec<_> = metrics.into_iter().collect();

        let mut fields = Vec::with_capacity(group_by.len() + aggregates.len());
        for key in &group_by {
            if key.contains_aggregate() || key.contains_window() {
                return Err(DbError::expression(format!(
                    "Group key cannot contain aggregates or windows: '{key}'"
                )));
            }
            fields.push((key.output_name(), key.datatype(self.schema())?));
        }
        for metric in &aggregates {
            if !matches!(metric.unaliased(), Expression::Aggregate(_)) {
                return Err(DbError::expression(format!(
                    "Metric must be an aggregate, got '{metric}'"
                )));
            }
            fields.push((metric.output_name(), metric.datatype(self.schema())?));
        }
        if fields.is_empty() {
            return Err(DbError::expression(
                "Aggregation requires at least one key or metric",
            ));
        }
        let schema = unique_schema(fields)?;

        let node = Node::new(
            LogicalAggregate {
                group_by,
                aggregates,
            },
            schema,
            vec![self.root.clone()],
        );
        Ok(self.derive(LogicalOperator::Aggregate(node)))
    }

    pub fn order_by(&self, keys: impl IntoIterator<Item = OrderByExpr>) -> Result<Table> {
        let exprs: Vec<_> = keys.into_iter().collect();
        for key in &exprs {
            if key.expr.contains_aggregate() || key.expr.contains_window() {
                return Err(DbError::expression(format!(
                    "Sort key cannot contain aggregates or windows: '{}'",
                    key.expr
                )));
            }
            key.expr.datatype(self.schema())?;
        }

        let node = Node::new(
            LogicalOrder { exprs },
            self.schema().clone(),
            vec![self.root.clone()],
        );
        Ok(self.derive(LogicalOperator::Order(node)))
    }

    /// Limit the number of rows.
    pub fn limit(&self, limit: u64) -> Table {
        self.limit_offset(Some(limit), 0)
    }

    /// Limit with an offset. A `None` limit only skips `offset` rows.
    pub fn limit_offset(&self, limit: Option<u64>, offset: u64) -> Table {
        let node = Node::new(
            LogicalLimit { limit, offset },
            self.schema().clone(),
            vec![self.root.clone()],
        );
        self.derive(LogicalOperator::Limit(node))
    }

    /// The `k` most frequent values of a column, with their counts.
    pub fn topk(&self, column: &str, k: u64) -> Result<Table> {
        let key = self.col(column)?;
        Ok(self
            .aggregate([key], [count_star().alias("count")])?
            .order_by([col("count").desc()])?
            .limit(k))
    }

    /// Number of rows in this table.
    pub fn count(&self) -> Result<Query> {
        let agg = self.aggregate([], [count_star()])?;
        Ok(Query::scalar(agg))
    }

    /// A single aggregate over the whole table, e.g. `col("x").sum()`.
    pub fn reduce(&self, metric: Expression) -> Result<Query> {
        let agg = self.aggregate([], [metric])?;
        Ok(Query::scalar(agg))
    }

    /// A single column of this table.
    pub fn column(&self, name: &str) -> Result<Query> {
        let projected = self.select([self.col(name)?])?;
        Ok(Query::column(projected))
    }

    /// Type of a column, erroring if it doesn't exist.
    pub fn column_type(&self, name: &str) -> Result<&DataType> {
        self.schema().try_get(name)
    }

    /// Render the logical plan as indented text.
    pub fn explain(&self) -> String {
        ExplainNode::walk_logical(ExplainConfig::default(), &self.root).to_string()
    }

    pub fn explain_verbose(&self) -> String {
        ExplainNode::walk_logical(ExplainConfig { verbose: true }, &self.root).to_string()
    }

    /// Logical plan as JSON.
    pub fn explain_json(&self) -> Result<String> {
        let node = ExplainNode::walk_logical(ExplainConfig::default(), &self.root);
        serde_json::to_string_pretty(&node).context("Failed to serialize explain output")
    }
}

fn unique_schema(fields: Vec<(String, DataType)>) -> Result<Schema> {
    let mut seen = HashSet::new();
    for (name, _) in &fields {
        if !seen.insert(name.as_str()) {
            return Err(DbError::expression(format!(
                "Duplicate output column name '{name}'"
            )));
        }
    }
    Schema::try_new(fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::lit;
    use quarry_error::ErrorKind;

    fn functional() -> Table {
        Table::scan(
            "functional_alltypes",
            Schema::parse([
                ("id", "!int32"),
                ("bool_col", "!boolean"),
                ("int_col", "!int32"),
                ("double_col", "!float64"),
                ("string_col", "!string"),
                ("timestamp_col", "timestamp"),
            ])
            .unwrap(),
        )
    }

    #[test]
    fn filter_keeps_schema() {
        let t = functional();
        let filtered = t.filter(t.col("int_col").unwrap().gt(5i32)).unwrap();
        assert_eq!(t.schema(), filtered.schema());

        let err = t.filter(t.col("int_col").unwrap() + 1i32).unwrap_err();
        assert_eq!(ErrorKind::Expression, err.kind());
    }

    #[test]
    fn unknown_column() {
        let err = functional().col("nope").unwrap_err();
        assert_eq!(ErrorKind::Expression, err.kind());

        let err = functional().select([col("nope")]).unwrap_err();
        assert_eq!(ErrorKind::Expression, err.kind());
    }

    #[test]
    fn select_orders_and_renames() {
        let t = functional();
        let projected = t
            .select([
                col("string_col"),
                (col("double_col") * 2i64).alias("double(fun)"),
            ])
            .unwrap();
        let expected =
            Schema::parse([("string_col", "!string"), ("double(fun)", "!float64")]).unwrap();
        assert!(expected.eq_ordered(projected.schema()));
    }

    #[test]
    fn mutate_replaces_in_place() {
        let t = functional();
        let mutated = t
            .mutate([(col("int_col") + 1i32).alias("int_col"), lit(1i8).alias("one")])
            .unwrap();
        let names: Vec<_> = mutated.schema().names().collect();
        assert_eq!(
            vec!["id", "bool_col", "int_col", "double_col", "string_col", "timestamp_col", "one"],
            names
        );
    }

    #[test]
    fn aggregate_keys_then_metrics() {
        let t = functional();
        let agg = t
            .aggregate(
                [col("string_col")],
                [col("double_col").sum().alias("total"), count_star()],
            )
            .unwrap();
        let names: Vec<_> = agg.schema().names().collect();
        assert_eq!(vec!["string_col", "total", "count"], names);

        let err = t.aggregate([], [col("double_col")]).unwrap_err();
        assert_eq!(ErrorKind::Expression, err.kind());
    }

    #[test]
    fn aggregates_not_allowed_in_select() {
        let err = functional().select([col("double_col").sum()]).unwrap_err();
        assert_eq!(ErrorKind::Expression, err.kind());
    }

    #[test]
    fn structural_sharing() {
        let t = functional();
        let a = t.filter(col("bool_col")).unwrap();
        let b = t.limit(10);
        assert!(Arc::ptr_eq(&a.root().children()[0], t.root()));
        assert!(Arc::ptr_eq(&b.root().children()[0], t.root()));
    }

    #[test]
    fn topk_schema() {
        let top = functional().topk("string_col", 3).unwrap();
        let names: Vec<_> = top.schema().names().collect();
        assert_eq!(vec!["string_col", "count"], names);
    }

    #[test]
    fn explain_text() {
        let t = functional().filter(col("bool_col")).unwrap().limit(5);
        let explained = t.explain();
        let lines: Vec<_> = explained.lines().collect();
        assert_eq!("Limit (limit = 5)", lines[0]);
        assert_eq!("  Filter (predicate = bool_col)", lines[1]);
        assert_eq!("    Scan (table = functional_alltypes)", lines[2]);

        assert!(t.explain_json().unwrap().contains("\"Filter\""));
    }
}
