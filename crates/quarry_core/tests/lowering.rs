mod setup;

use quarry_core::arrays::datatype::DataType;
use quarry_core::arrays::field::Schema;
use quarry_core::arrays::scalar::ScalarValue;
use quarry_core::engine::compile::LimitArg;
use quarry_core::expr::{col, lit, row_number};
use quarry_error::ErrorKind;

use crate::setup::{ALLTYPES_ROWS, int64_values, session};

#[test]
fn quoted_column_round_trips() {
    let session = session();
    let t = session.table("functional_alltypes").unwrap();

    let projected = t
        .select([
            t.col("string_col").unwrap(),
            (t.col("double_col").unwrap() * lit(2.0)).alias("double(fun)"),
        ])
        .unwrap();
    assert!(projected.schema().contains("double(fun)"));

    let compiled = session.compile(&projected, LimitArg::Default).unwrap();
    assert!(compiled.sql.contains("AS \"double(fun)\""), "{}", compiled.sql);

    let summed = projected
        .reduce(projected.col("double(fun)").unwrap().sum())
        .unwrap();
    let expected = t
        .reduce((t.col("double_col").unwrap() * lit(2.0)).sum())
        .unwrap();

    let summed = session
        .execute(summed, LimitArg::Default)
        .unwrap()
        .try_into_scalar()
        .unwrap();
    let expected = session
        .execute(expected, LimitArg::Default)
        .unwrap()
        .try_into_scalar()
        .unwrap();
    assert_eq!(expected, summed);
    assert!(matches!(summed, ScalarValue::Float64(v) if v > 0.0));
}

#[test]
fn filter_aggregate_order() {
    let session = session();
    let t = session.table("functional_alltypes").unwrap();

    let grouped = t
        .filter(t.col("int_col").unwrap().lt(lit(3)))
        .unwrap()
        .aggregate([col("int_col")], [col("id").count().alias("n")])
        .unwrap()
        .order_by([col("int_col").desc()])
        .unwrap();

    let batch = session
        .execute(&grouped, LimitArg::Unbounded)
        .unwrap()
        .try_into_batch()
        .unwrap();
    assert_eq!(3, batch.num_rows());
    assert_eq!(
        Some(vec![ScalarValue::Int32(2), ScalarValue::Int64(730)]),
        batch.row(0)
    );
    assert_eq!(vec![730, 730, 730], int64_values(&batch, 1));
}

#[test]
fn row_number_is_zero_based() {
    let session = session();
    let t = session.table("functional_alltypes").unwrap();

    let numbered = t
        .filter(t.col("id").unwrap().lt(lit(5)))
        .unwrap()
        .mutate([row_number()
            .over([], [col("id").asc()])
            .unwrap()
            .alias("rn")])
        .unwrap();

    let compiled = session.compile(&numbered, LimitArg::Unbounded).unwrap();
    assert!(compiled.sql.contains("row_number() OVER"), "{}", compiled.sql);

    let batch = session
        .execute(&numbered, LimitArg::Unbounded)
        .unwrap()
        .try_into_batch()
        .unwrap();
    let rn_idx = numbered.schema().index_of("rn").unwrap();
    assert_eq!(vec![0, 1, 2, 3, 4], int64_values(&batch, rn_idx));
}

#[test]
fn raw_sql_relation() {
    let session = session();
    let t = session
        .sql("SELECT id, double_col AS d FROM functional_alltypes")
        .unwrap();
    assert_eq!(
        &Schema::parse([("id", "!int32"), ("d", "!float64")]).unwrap(),
        t.schema()
    );

    let compiled = session.compile(&t, LimitArg::Default).unwrap();
    assert!(
        compiled
            .sql
            .contains("(SELECT id, double_col AS d FROM functional_alltypes)"),
        "{}",
        compiled.sql
    );

    let filtered = t.filter(t.col("d").unwrap().gt(lit(80.0))).unwrap();
    let result = session.execute(&filtered, LimitArg::Unbounded).unwrap();
    // int_col 8 and 9 have double_col 80.8 and 90.9.
    assert_eq!(ALLTYPES_ROWS / 5, result.num_rows());
}

#[test]
fn inferred_fixture_schema() {
    let session = session();
    let t = session.table("functional_alltypes").unwrap();

    assert_eq!(&DataType::int32().non_null(), t.column_type("id").unwrap());
    assert_eq!(&DataType::boolean().non_null(), t.column_type("bool_col").unwrap());
    assert_eq!(&DataType::float64().non_null(), t.column_type("double_col").unwrap());
    assert_eq!(&DataType::utf8().non_null(), t.column_type("string_col").unwrap());

    let batting = session.table("batting").unwrap();
    assert!(batting.column_type("teamID").unwrap().nullable);
}

#[test]
fn unknown_column_is_expression_error() {
    let session = session();
    let t = session.table("functional_alltypes").unwrap();
    let err = t.col("nope").unwrap_err();
    assert_eq!(ErrorKind::Expression, err.kind());
}

#[test]
fn unsupported_raw_query_is_adapter_error() {
    let session = session();
    let err = session
        .sql("SELECT id FROM functional_alltypes ORDER BY id")
        .unwrap_err();
    assert_eq!(ErrorKind::Adapter, err.kind());
}
