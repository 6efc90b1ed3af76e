//! The subset of SQL the memory adapter accepts as raw query text.
//!
//! Only single-table projections are supported:
//!
//! ```text
//! SELECT * | col [AS alias], ... FROM table [LIMIT n] [OFFSET n]
//! ```
use sqlparser::ast::{
    self,
    Expr,
    GroupByExpr,
    SelectItem,
    SetExpr,
    Statement,
    TableFactor,
    Value,
};
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;

use super::errors::{MemoryError, Result};

/// A projected column, possibly renamed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawProjection {
    pub column: String,
    pub alias: Option<String>,
}

impl RawProjection {
    pub fn output_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.column)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawQuery {
    pub table_name: String,
    /// `None` for `SELECT *`.
    pub projections: Option<Vec<RawProjection>>,
    pub limit: Option<usize>,
    pub offset: usize,
}

impl RawQuery {
    pub fn parse(sql: &str) -> Result<Self> {
        let mut statements = Parser::parse_sql(&GenericDialect {}, sql)?;
        let statement = match statements.len() {
            1 => statements.remove(0),
            n => {
                return Err(MemoryError::UnsupportedQuery(format!(
                    "expected a single statement, got {n}"
                )));
            }
        };

        let query = match statement {
            Statement::Query(query) => query,
            other => return Err(unsupported(format!("statement '{other}'"))),
        };

        if query.with.is_some() {
            return Err(unsupported("WITH"));
        }
        if query.order_by.is_some() {
            return Err(unsupported("ORDER BY"));
        }

        let select = match *query.body {
            SetExpr::Select(select) => select,
            other => return Err(unsupported(format!("query body '{other}'"))),
        };

        if select.distinct.is_some() {
            return Err(unsupported("DISTINCT"));
        }
        if select.selection.is_some() {
            return Err(unsupported("WHERE"));
        }
        if select.having.is_some() {
            return Err(unsupported("HAVING"));
        }
        if !matches!(&select.group_by, GroupByExpr::Expressions(exprs, _) if exprs.is_empty()) {
            return Err(unsupported("GROUP BY"));
        }

        let table_name = match select.from.as_slice() {
            [from] if from.joins.is_empty() => match &from.relation {
                TableFactor::Table { name, .. } => object_name(name)?,
                other => return Err(unsupported(format!("FROM '{other}'"))),
            },
            [_] => return Err(unsupported("JOIN")),
            _ => return Err(unsupported("expected exactly one table in FROM")),
        };

        let projections = match select.projection.as_slice() {
            [SelectItem::Wildcard(_)] => None,
            items => Some(
                items
                    .iter()
                    .map(projection)
                    .collect::<Result<Vec<_>>>()?,
            ),
        };

        let limit = query.limit.as_ref().map(number).transpose()?;
        let offset = match &query.offset {
            Some(offset) => number(&offset.value)?,
            None => 0,
        };

        Ok(RawQuery {
            table_name,
            projections,
            limit,
            offset,
        })
    }
}

fn unsupported(what: impl Into<String>) -> MemoryError {
    MemoryError::UnsupportedQuery(what.into())
}

fn object_name(name: &ast::ObjectName) -> Result<String> {
    name.0
        .last()
        .map(|ident| ident.value.clone())
        .ok_or_else(|| unsupported("empty table name"))
}

fn projection(item: &SelectItem) -> Result<RawProjection> {
    match item {
        SelectItem::UnnamedExpr(expr) => Ok(RawProjection {
            column: column_name(expr)?,
            alias: None,
        }),
        SelectItem::ExprWithAlias { expr, alias } => Ok(RawProjection {
            column: column_name(expr)?,
            alias: Some(alias.value.clone()),
        }),
        other => Err(unsupported(format!("projection '{other}'"))),
    }
}

fn column_name(expr: &Expr) -> Result<String> {
    match expr {
        Expr::Identifier(ident) => Ok(ident.value.clone()),
        Expr::CompoundIdentifier(idents) => idents
            .last()
            .map(|ident| ident.value.clone())
            .ok_or_else(|| unsupported("empty column name")),
        other => Err(unsupported(format!("expression '{other}'"))),
    }
}

fn number(expr: &Expr) -> Result<usize> {
    match expr {
        Expr::Value(Value::Number(n, _)) => n
            .parse()
            .map_err(|_| unsupported(format!("row count '{n}'"))),
        other => Err(unsupported(format!("row count '{other}'"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard() {
        let query = RawQuery::parse("SELECT * FROM functional_alltypes").unwrap();
        assert_eq!("functional_alltypes", query.table_name);
        assert_eq!(None, query.projections);
        assert_eq!(None, query.limit);
    }

    #[test]
    fn projections_with_aliases() {
        let query =
            RawQuery::parse("SELECT int_col, \"double_col\" AS d FROM t LIMIT 5 OFFSET 2").unwrap();
        let projections = query.projections.unwrap();
        assert_eq!("int_col", projections[0].output_name());
        assert_eq!("double_col", projections[1].column);
        assert_eq!("d", projections[1].output_name());
        assert_eq!(Some(5), query.limit);
        assert_eq!(2, query.offset);
    }

    #[test]
    fn rejects_unsupported() {
        for sql in [
            "SELECT a FROM t WHERE a > 1",
            "SELECT a FROM t ORDER BY a",
            "SELECT a + 1 FROM t",
            "SELECT a FROM t JOIN u ON t.a = u.a",
            "SELECT a FROM t GROUP BY a",
            "INSERT INTO t VALUES (1)",
        ] {
            let err = RawQuery::parse(sql).unwrap_err();
            assert!(matches!(err, MemoryError::UnsupportedQuery(_)), "{sql}: {err}");
        }
    }

    #[test]
    fn parse_error() {
        let err = RawQuery::parse("SELEC a FROM").unwrap_err();
        assert!(matches!(err, MemoryError::Parse(_)));
    }
}
