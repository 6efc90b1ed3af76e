//! SQL text generation for lowered plans.

pub mod dialect;
pub mod render;

#[cfg(test)]
mod tests {
    use super::dialect::SqlDialect;
    use super::render::SqlRenderer;
    use crate::arrays::field::Schema;
    use crate::arrays::native::{ColumnarSource, NativeColumn};
    use crate::expr::lit;
    use crate::logical::table::Table;

    fn alltypes() -> Table {
        Table::scan(
            "functional_alltypes",
            Schema::parse([
                ("int_col", "!int32"),
                ("double_col", "float64"),
                ("string_col", "string"),
            ])
            .unwrap(),
        )
    }

    fn render(table: &Table) -> String {
        let dialect = SqlDialect::default();
        SqlRenderer::new(&dialect).render(table.root()).unwrap()
    }

    fn alias(table: &Table) -> String {
        format!("t{}", table.table_ref().table_idx)
    }

    #[test]
    fn quoted_projection() {
        let t = alltypes();
        let projected = t
            .select([
                t.col("int_col").unwrap(),
                (t.col("double_col").unwrap() * lit(2.0)).alias("double(fun)"),
            ])
            .unwrap();

        let sql = render(&projected);
        assert!(
            sql.starts_with(
                "SELECT int_col, (double_col * 2.0) AS \"double(fun)\" \
                 FROM functional_alltypes AS t"
            ),
            "{sql}"
        );
    }

    #[test]
    fn limit_folds_into_order() {
        let t = alltypes();
        let ordered = t
            .order_by([t.col("int_col").unwrap().desc()])
            .unwrap()
            .limit(10);

        let sql = render(&ordered);
        assert!(sql.starts_with("SELECT * FROM functional_alltypes AS t"), "{sql}");
        assert!(sql.ends_with("ORDER BY int_col DESC NULLS LAST LIMIT 10"), "{sql}");
    }

    #[test]
    fn projection_keeps_ordering_under_limit() {
        let t = alltypes();
        let projected = t
            .order_by([t.col("double_col").unwrap().desc()])
            .unwrap()
            .select([t.col("string_col").unwrap()])
            .unwrap()
            .limit(5);

        let sql = render(&projected);
        let expected = format!(
            "SELECT string_col FROM functional_alltypes AS {} \
             ORDER BY {}.double_col DESC NULLS LAST LIMIT 5",
            alias(&t),
            alias(&t)
        );
        assert_eq!(expected, sql);
    }

    #[test]
    fn ordering_repeated_above_filter() {
        let t = alltypes();
        let ordered = t.order_by([t.col("int_col").unwrap().asc()]).unwrap();
        let filtered = ordered
            .filter(t.col("double_col").unwrap().gt(lit(1.0)))
            .unwrap();
        let projected = filtered.select([t.col("int_col").unwrap()]).unwrap();

        let sql = render(&projected);
        // The filter folds the ordering in, the projection repeats it over
        // the filter's derived table.
        assert!(
            sql.contains(&format!("WHERE (double_col > 1.0) ORDER BY {}.int_col", alias(&t))),
            "{sql}"
        );
        assert!(
            sql.ends_with(&format!(
                "AS {} ORDER BY {}.int_col ASC NULLS LAST",
                alias(&filtered),
                alias(&filtered)
            )),
            "{sql}"
        );
    }

    #[test]
    fn ordering_dropped_when_keys_projected_away() {
        let t = alltypes();
        let projected = t
            .order_by([t.col("double_col").unwrap().asc()])
            .unwrap()
            .select([t.col("string_col").unwrap()])
            .unwrap();
        let outer = projected.select([projected.col("string_col").unwrap()]).unwrap();

        let sql = render(&outer);
        // The inner SELECT still orders, the outer one can't name the key.
        assert_eq!(1, sql.matches("ORDER BY").count(), "{sql}");
    }

    #[test]
    fn nested_limits_keep_ordering() {
        let t = alltypes();
        let limited = t
            .order_by([t.col("int_col").unwrap().asc()])
            .unwrap()
            .limit(10)
            .limit_offset(Some(3), 2);

        let sql = render(&limited);
        assert!(sql.ends_with("ASC NULLS LAST LIMIT 3 OFFSET 2"), "{sql}");
    }

    #[test]
    fn semi_join_uses_exists() {
        let t = alltypes();
        let awards = Table::scan("awards", Schema::parse([("int_col", "!int64")]).unwrap());
        let joined = t.semi_join(&awards, "int_col").unwrap();

        let sql = render(&joined);
        assert!(sql.contains("WHERE EXISTS (SELECT 1 FROM awards AS t"), "{sql}");
    }

    #[test]
    fn self_join_aliases_differ() {
        let t = alltypes();
        let joined = t.inner_join(&t, "int_col").unwrap();

        let sql = render(&joined);
        let left = alias(&t);
        let right = format!("t{}", joined.root().children()[1].table_ref().table_idx);
        assert_ne!(left, right);
        assert!(
            sql.contains(&format!("ON {left}.int_col = {right}.int_col")),
            "{sql}"
        );
    }

    #[test]
    fn memory_table_renders_values() {
        let data = ColumnarSource::new(vec![
            NativeColumn::from_values("yearID", vec![1954i64, 1993]),
            NativeColumn::from_values("award", vec!["a", "it's"]),
        ])
        .unwrap();
        let t = Table::memory(&data).unwrap();

        let sql = render(&t);
        assert_eq!(
            format!(
                "SELECT * FROM (VALUES (1954, 'a'), (1993, 'it''s')) AS {} (yearID, award)",
                alias(&t)
            ),
            sql
        );
    }
}
