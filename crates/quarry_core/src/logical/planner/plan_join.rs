use std::collections::HashSet;

use quarry_error::{DbError, Result};
use tracing::debug;

use crate::arrays::datatype::DataType;
use crate::arrays::field::Schema;
use crate::expr::column_expr::ColumnExpr;
use crate::expr::comparison_expr::{ComparisonExpr, ComparisonOperator};
use crate::expr::{Expression, col};
use crate::functions::implicit::{common_supertype, is_comparable};
use crate::logical::logical_join::{
    JoinColumnSource,
    JoinCondition,
    JoinOutputColumn,
    JoinType,
    LogicalJoin,
};
use crate::logical::operator::LogicalOperator;
use crate::logical::table_ref::TableRef;

/// Predicate for a join.
#[derive(Debug, Clone, PartialEq)]
pub enum JoinPredicate {
    /// Equalities between (left, right) column names.
    Columns(Vec<(String, String)>),
    /// A boolean expression over columns of both sides.
    Expression(Expression),
    /// No predicate, every pair of rows matches.
    Cross,
}

impl From<&str> for JoinPredicate {
    fn from(name: &str) -> Self {
        JoinPredicate::Columns(vec![(name.to_string(), name.to_string())])
    }
}

impl From<(&str, &str)> for JoinPredicate {
    fn from((left, right): (&str, &str)) -> Self {
        JoinPredicate::Columns(vec![(left.to_string(), right.to_string())])
    }
}

impl<const N: usize> From<[&str; N]> for JoinPredicate {
    fn from(names: [&str; N]) -> Self {
        JoinPredicate::Columns(
            names
                .iter()
                .map(|n| (n.to_string(), n.to_string()))
                .collect(),
        )
    }
}

impl<const N: usize> From<[(&str, &str); N]> for JoinPredicate {
    fn from(pairs: [(&str, &str); N]) -> Self {
        JoinPredicate::Columns(
            pairs
                .iter()
                .map(|(l, r)| (l.to_string(), r.to_string()))
                .collect(),
        )
    }
}

impl From<Expression> for JoinPredicate {
    fn from(expr: Expression) -> Self {
        JoinPredicate::Expression(expr)
    }
}

/// Suffixes appended to colliding non-key column names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinSuffixes {
    pub left: String,
    pub right: String,
}

impl JoinSuffixes {
    pub fn new(left: impl Into<String>, right: impl Into<String>) -> Self {
        JoinSuffixes {
            left: left.into(),
            right: right.into(),
        }
    }

    /// Keep left names, suffix the right.
    pub fn right(suffix: impl Into<String>) -> Self {
        Self::new("", suffix)
    }
}

impl Default for JoinSuffixes {
    fn default() -> Self {
        Self::right("_right")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Left,
    Right,
}

/// Resolves join predicates and output columns for two inputs.
#[derive(Debug)]
pub struct JoinPlanner<'a> {
    pub left: &'a LogicalOperator,
    pub right: &'a LogicalOperator,
    pub suffixes: &'a JoinSuffixes,
    /// Ref of the table joined with itself. Columns carrying it can belong to
    /// either side.
    pub self_join_ref: Option<TableRef>,
}

impl JoinPlanner<'_> {
    /// Plan the join, returning the join node and its output schema.
    pub fn plan(
        &self,
        predicate: JoinPredicate,
        join_type: JoinType,
    ) -> Result<(LogicalJoin, Schema)> {
        let (conditions, residual) = match predicate {
            JoinPredicate::Columns(pairs) => (self.plan_column_pairs(pairs)?, None),
            JoinPredicate::Expression(expr) => self.plan_expression(expr)?,
            JoinPredicate::Cross => (Vec::new(), None),
        };

        for cond in &conditions {
            self.check_key_types(cond)?;
        }

        let (outputs, schema) = self.plan_outputs(&conditions, join_type)?;

        debug!(
            %join_type,
            conditions = conditions.len(),
            has_residual = residual.is_some(),
            outputs = outputs.len(),
            "planned join"
        );

        Ok((
            LogicalJoin {
                join_type,
                conditions,
                residual,
                outputs,
            },
            schema,
        ))
    }

    fn left_schema(&self) -> &Schema {
        self.left.schema()
    }

    fn right_schema(&self) -> &Schema {
        self.right.schema()
    }

    fn plan_column_pairs(&self, pairs: Vec<(String, String)>) -> Result<Vec<JoinCondition>> {
        pairs
            .into_iter()
            .map(|(left, right)| {
                let in_left = self.left_schema().contains(&left);
                let in_right = self.right_schema().contains(&right);
                if !in_left && !in_right {
                    return Err(DbError::join(format!(
                        "Join key '{left}' = '{right}' not found on either side"
                    )));
                }
                if !in_left {
                    return Err(DbError::join(format!(
                        "Join key '{left}' not found in left input"
                    ))
                    .with_field("columns", column_list(self.left_schema())));
                }
                if !in_right {
                    return Err(DbError::join(format!(
                        "Join key '{right}' not found in right input"
                    ))
                    .with_field("columns", column_list(self.right_schema())));
                }
                Ok(JoinCondition { left, right })
            })
            .collect()
    }

    fn is_self_join_column(&self, col: &ColumnExpr) -> bool {
        col.table_ref.is_some() && col.table_ref == self.self_join_ref
    }

    /// Determine which side a column reference belongs to.
    fn resolve_side(&self, col: &ColumnExpr) -> Result<Side> {
        let in_left = self.left_schema().contains(&col.name);
        let in_right = self.right_schema().contains(&col.name);

        if self.is_self_join_column(col) {
            return Err(DbError::join(format!(
                "Column '{}' is ambiguous in a self join, reference it through a view",
                col.name
            )));
        }

        if let Some(table_ref) = col.table_ref {
            if table_ref == self.left.table_ref() && in_left {
                return Ok(Side::Left);
            }
            if table_ref == self.right.table_ref() && in_right {
                return Ok(Side::Right);
            }
        }

        match (in_left, in_right) {
            (true, false) => Ok(Side::Left),
            (false, true) => Ok(Side::Right),
            (true, true) => Err(DbError::join(format!(
                "Column '{}' is ambiguous, it exists on both sides of the join",
                col.name
            ))),
            (false, false) => Err(DbError::join(format!(
                "Column '{}' not found on either side of the join",
                col.name
            ))),
        }
    }

    /// Split a boolean predicate into equality conditions and a residual.
    fn plan_expression(
        &self,
        expr: Expression,
    ) -> Result<(Vec<JoinCondition>, Option<Expression>)> {
        let mut conditions = Vec::new();
        let mut residual = Vec::new();

        for conjunct in expr.split_conjunction() {
            if let Expression::Comparison(ComparisonExpr {
                left,
                right,
                op: ComparisonOperator::Eq,
            }) = &conjunct
            {
                if let (Expression::Column(a), Expression::Column(b)) =
                    (left.unaliased(), right.unaliased())
                {
                    if self.is_self_join_column(a) && self.is_self_join_column(b) {
                        // Operands of a self join equality pair up positionally.
                        conditions.push(JoinCondition {
                            left: a.name.clone(),
                            right: b.name.clone(),
                        });
                        continue;
                    }
                    let side_a = self.resolve_side(a)?;
                    let side_b = self.resolve_side(b)?;
                    if side_a != side_b {
                        let mut cond = JoinCondition {
                            left: a.name.clone(),
                            right: b.name.clone(),
                        };
                        if side_a == Side::Right {
                            cond.flip_sides();
                        }
                        conditions.push(cond);
                        continue;
                    }
                }
            }
            residual.push(conjunct);
        }

        let residual = residual
            .into_iter()
            .reduce(|acc, expr| acc.and(expr))
            .map(|expr| self.qualify_residual(expr))
            .transpose()?;

        Ok((conditions, residual))
    }

    /// Pin every column in the residual to its side and check that it's a
    /// boolean predicate.
    fn qualify_residual(&self, expr: Expression) -> Result<Expression> {
        let left_ref = self.left.table_ref();
        let right_ref = self.right.table_ref();

        let qualified = expr.map_columns(&mut |col| {
            let table_ref = match self.resolve_side(&col)? {
                Side::Left => left_ref,
                Side::Right => right_ref,
            };
            Ok(Expression::Column(ColumnExpr::with_table(table_ref, col.name)))
        })?;

        // Type check against a combined schema with side-prefixed names.
        let combined = Schema::try_new(
            self.left_schema()
                .iter()
                .map(|(n, t)| (format!("left.{n}"), t.clone()))
                .chain(
                    self.right_schema()
                        .iter()
                        .map(|(n, t)| (format!("right.{n}"), t.clone())),
                ),
        )?;
        let prefixed = qualified.clone().map_columns(&mut |c| {
            let side = if c.table_ref == Some(left_ref) {
                "left"
            } else {
                "right"
            };
            Ok(col(format!("{side}.{}", c.name)))
        })?;
        let typ = prefixed.datatype(&combined)?;
        if !(typ.is_boolean() || typ.is_null()) {
            return Err(DbError::join(format!(
                "Join predicate must be boolean, got {typ}"
            )));
        }
        if qualified.contains_aggregate() || qualified.contains_window() {
            return Err(DbError::join("Join predicate cannot contain aggregates or windows"));
        }

        Ok(qualified)
    }

    fn check_key_types(&self, cond: &JoinCondition) -> Result<()> {
        let left = self.left_schema().try_get(&cond.left)?;
        let right = self.right_schema().try_get(&cond.right)?;
        if !is_comparable(left, right) {
            return Err(DbError::join(format!(
                "Join keys have incomparable types: {} ({left}) and {} ({right})",
                cond.left, cond.right
            )));
        }
        Ok(())
    }

    fn plan_outputs(
        &self,
        conditions: &[JoinCondition],
        join_type: JoinType,
    ) -> Result<(Vec<JoinOutputColumn>, Schema)> {
        let left = self.left_schema();
        let right = self.right_schema();

        if join_type.is_left_only() {
            let outputs = left
                .names()
                .map(|name| JoinOutputColumn {
                    name: name.to_string(),
                    source: JoinColumnSource::Left(name.to_string()),
                })
                .collect();
            return Ok((outputs, left.clone()));
        }

        // Keys with the same name on both sides collapse to a single column.
        let collapsed: HashSet<&str> = conditions
            .iter()
            .filter(|c| c.is_same_name())
            .map(|c| c.left.as_str())
            .collect();

        let right_names: HashSet<&str> = right
            .names()
            .filter(|name| !collapsed.contains(name))
            .collect();
        let left_names: HashSet<&str> = left.names().collect();

        let mut outputs = Vec::with_capacity(left.len() + right.len());
        let mut fields = Vec::with_capacity(left.len() + right.len());

        for (name, left_type) in left.iter() {
            if collapsed.contains(name) {
                let right_type = right.try_get(name)?;
                let (source, datatype) = collapsed_key(name, left_type, right_type, join_type);
                outputs.push(JoinOutputColumn {
                    name: name.to_string(),
                    source,
                });
                fields.push((name.to_string(), datatype));
                continue;
            }

            let out_name = if right_names.contains(name) {
                format!("{name}{}", self.suffixes.left)
            } else {
                name.to_string()
            };
            outputs.push(JoinOutputColumn {
                name: out_name.clone(),
                source: JoinColumnSource::Left(name.to_string()),
            });
            let datatype = left_type.clone();
            let datatype = if join_type.nulls_left() {
                datatype.with_nullable(true)
            } else {
                datatype
            };
            fields.push((out_name, datatype));
        }

        for (name, right_type) in right.iter() {
            if collapsed.contains(name) {
                continue;
            }

            let out_name = if left_names.contains(name) {
                format!("{name}{}", self.suffixes.right)
            } else {
                name.to_string()
            };
            outputs.push(JoinOutputColumn {
                name: out_name.clone(),
                source: JoinColumnSource::Right(name.to_string()),
            });
            let datatype = right_type.clone();
            let datatype = if join_type.nulls_right() {
                datatype.with_nullable(true)
            } else {
                datatype
            };
            fields.push((out_name, datatype));
        }

        let mut seen = HashSet::new();
        for (name, _) in &fields {
            if !seen.insert(name.as_str()) {
                return Err(DbError::join(format!(
                    "Join produces duplicate output column '{name}'"
                ))
                .with_field("left_suffix", format!("'{}'", self.suffixes.left))
                .with_field("right_suffix", format!("'{}'", self.suffixes.right)));
            }
        }

        let schema = Schema::try_new(fields)?;
        Ok((outputs, schema))
    }
}

/// Source and type for a key column present on both sides under the same
/// name.
///
/// The value comes from the driving side. Full joins coalesce, taking the left
/// value first. The coalesced key is null for an unmatched row with a null key
/// on either side.
fn collapsed_key(
    name: &str,
    left: &DataType,
    right: &DataType,
    join_type: JoinType,
) -> (JoinColumnSource, DataType) {
    match join_type {
        JoinType::Right => (JoinColumnSource::Right(name.to_string()), right.clone()),
        JoinType::Full => {
            let nullable = left.nullable || right.nullable;
            let datatype = common_supertype(left, right)
                .unwrap_or_else(|| left.clone())
                .with_nullable(nullable);
            (
                JoinColumnSource::Coalesce {
                    left: name.to_string(),
                    right: name.to_string(),
                },
                datatype,
            )
        }
        _ => (JoinColumnSource::Left(name.to_string()), left.clone()),
    }
}

fn column_list(schema: &Schema) -> String {
    schema.names().collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use quarry_error::ErrorKind;

    use super::*;
    use crate::logical::table::Table;

    fn batting() -> Table {
        Table::scan(
            "batting",
            Schema::parse([
                ("playerID", "!string"),
                ("yearID", "!int64"),
                ("teamID", "string"),
                ("G", "int64"),
            ])
            .unwrap(),
        )
    }

    fn awards() -> Table {
        Table::scan(
            "awards_players",
            Schema::parse([
                ("playerID", "!string"),
                ("awardID", "!string"),
                ("yearID", "!int64"),
                ("notes", "string"),
            ])
            .unwrap(),
        )
    }

    fn plan(
        left: &Table,
        right: &Table,
        predicate: impl Into<JoinPredicate>,
        join_type: JoinType,
    ) -> Result<(LogicalJoin, Schema)> {
        JoinPlanner {
            left: left.root(),
            right: right.root(),
            suffixes: &JoinSuffixes::default(),
            self_join_ref: None,
        }
        .plan(predicate.into(), join_type)
    }

    fn names(schema: &Schema) -> Vec<&str> {
        schema.names().collect()
    }

    #[test]
    fn same_name_keys_collapse() {
        let (join, schema) = plan(&batting(), &awards(), "playerID", JoinType::Inner).unwrap();
        assert_eq!(1, join.conditions.len());
        assert_eq!(
            vec!["playerID", "yearID", "teamID", "G", "awardID", "yearID_right", "notes"],
            names(&schema)
        );
    }

    #[test]
    fn differently_named_keys_both_kept() {
        let right = Table::scan(
            "people",
            Schema::parse([("pid", "!string"), ("name", "string")]).unwrap(),
        );
        let (_, schema) = plan(&batting(), &right, ("playerID", "pid"), JoinType::Inner).unwrap();
        assert_eq!(
            vec!["playerID", "yearID", "teamID", "G", "pid", "name"],
            names(&schema)
        );
    }

    #[test]
    fn left_join_right_side_nullable() {
        let (_, schema) =
            plan(&batting(), &awards(), ["playerID", "yearID"], JoinType::Left).unwrap();
        assert!(!schema.try_get("playerID").unwrap().nullable);
        assert!(schema.try_get("awardID").unwrap().nullable);
    }

    #[test]
    fn left_join_differently_named_right_key_nullable() {
        let right = Table::scan(
            "people",
            Schema::parse([("pid", "!string"), ("name", "!string")]).unwrap(),
        );
        let (join, schema) =
            plan(&batting(), &right, ("playerID", "pid"), JoinType::Left).unwrap();

        assert_eq!(
            JoinColumnSource::Right("pid".to_string()),
            join.outputs[4].source
        );
        assert!(!schema.try_get("playerID").unwrap().nullable);
        assert!(schema.try_get("pid").unwrap().nullable);
        assert!(schema.try_get("name").unwrap().nullable);
    }

    #[test]
    fn right_join_key_from_right_side() {
        let (join, schema) = plan(&batting(), &awards(), "playerID", JoinType::Right).unwrap();

        assert_eq!(
            JoinColumnSource::Right("playerID".to_string()),
            join.outputs[0].source
        );
        assert!(!schema.try_get("playerID").unwrap().nullable);
        // Left columns are null filled for unmatched right rows.
        assert!(schema.try_get("yearID").unwrap().nullable);
        assert!(schema.try_get("teamID").unwrap().nullable);
        assert!(!schema.try_get("awardID").unwrap().nullable);
        assert!(!schema.try_get("yearID_right").unwrap().nullable);
    }

    #[test]
    fn full_join_coalesces_keys() {
        let (join, schema) = plan(&batting(), &awards(), "playerID", JoinType::Full).unwrap();
        assert!(matches!(
            join.outputs[0].source,
            JoinColumnSource::Coalesce { .. }
        ));
        // Both keys are non-null so the coalesced key is too.
        assert!(!schema.try_get("playerID").unwrap().nullable);
        assert!(schema.try_get("teamID").unwrap().nullable);
        assert!(schema.try_get("awardID").unwrap().nullable);
    }

    #[test]
    fn full_join_coalesced_key_nullable_if_either_side_is() {
        let left = Table::scan("l", Schema::parse([("k", "int64"), ("a", "int64")]).unwrap());
        let right = Table::scan("r", Schema::parse([("k", "!int64"), ("b", "int64")]).unwrap());

        let (_, schema) = plan(&left, &right, "k", JoinType::Full).unwrap();
        assert!(schema.try_get("k").unwrap().nullable);

        let (_, schema) = plan(&right, &left, "k", JoinType::Full).unwrap();
        assert!(schema.try_get("k").unwrap().nullable);
    }

    #[test]
    fn semi_and_anti_keep_left_schema() {
        for join_type in [JoinType::LeftSemi, JoinType::LeftAnti] {
            let (_, schema) = plan(&batting(), &awards(), "playerID", join_type).unwrap();
            assert_eq!(batting().schema(), &schema);
        }
    }

    #[test]
    fn expression_predicate_split() {
        let left = batting();
        let right = awards();
        let predicate = left
            .col("playerID")
            .unwrap()
            .equals(right.col("playerID").unwrap())
            .and(left.col("yearID").unwrap().lt(right.col("yearID").unwrap()));

        let (join, _) = plan(&left, &right, predicate, JoinType::Inner).unwrap();
        assert_eq!(1, join.conditions.len());
        assert!(join.residual.is_some());
    }

    #[test]
    fn self_join_gets_distinct_sides() {
        let t = batting();
        let joined = t.inner_join(&t, "playerID").unwrap();

        let children = joined.root().children();
        assert_ne!(children[0].table_ref(), children[1].table_ref());
        assert_eq!(
            vec!["playerID", "yearID", "teamID", "G", "yearID_right", "teamID_right", "G_right"],
            names(joined.schema())
        );
    }

    #[test]
    fn self_join_expression_equality_pairs_sides() {
        let t = batting();
        let predicate = t.col("playerID").unwrap().equals(t.col("playerID").unwrap());
        let joined = t.inner_join(&t, predicate).unwrap();

        let LogicalOperator::Join(join) = joined.root().as_ref() else {
            panic!("expected a join");
        };
        assert_eq!(
            vec![JoinCondition {
                left: "playerID".to_string(),
                right: "playerID".to_string(),
            }],
            join.node.conditions
        );
        assert!(join.node.residual.is_none());
    }

    #[test]
    fn self_join_ambiguous_residual() {
        let t = batting();
        let predicate = t.col("yearID").unwrap().lt(t.col("yearID").unwrap());
        let err = t.inner_join(&t, predicate).unwrap_err();
        assert_eq!(ErrorKind::Join, err.kind());
    }

    #[test]
    fn self_join_through_view() {
        let t = batting();
        let v = t.view();
        let predicate = t
            .col("playerID")
            .unwrap()
            .equals(v.col("playerID").unwrap())
            .and(t.col("yearID").unwrap().lt(v.col("yearID").unwrap()));

        let joined = t.inner_join(&v, predicate).unwrap();
        let LogicalOperator::Join(join) = joined.root().as_ref() else {
            panic!("expected a join");
        };
        assert_eq!(1, join.node.conditions.len());
        assert!(join.node.residual.is_some());
    }

    #[test]
    fn missing_key() {
        let err = plan(&batting(), &awards(), "teamID", JoinType::Inner).unwrap_err();
        assert_eq!(ErrorKind::Join, err.kind());
    }

    #[test]
    fn incomparable_key_types() {
        let err = plan(&batting(), &awards(), ("G", "awardID"), JoinType::Inner).unwrap_err();
        assert_eq!(ErrorKind::Join, err.kind());
    }

    #[test]
    fn colliding_suffixed_name() {
        let left = Table::scan(
            "l",
            Schema::parse([("k", "int64"), ("v", "int64"), ("v_right", "int64")]).unwrap(),
        );
        let right = Table::scan("r", Schema::parse([("k", "int64"), ("v", "int64")]).unwrap());
        let err = plan(&left, &right, "k", JoinType::Inner).unwrap_err();
        assert_eq!(ErrorKind::Join, err.kind());
    }

    #[test]
    fn cross_join_no_conditions() {
        let (join, schema) =
            plan(&batting(), &awards(), JoinPredicate::Cross, JoinType::Inner).unwrap();
        assert!(join.conditions.is_empty());
        assert_eq!(8, schema.len());
    }
}
