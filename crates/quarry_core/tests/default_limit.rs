mod setup;

use quarry_core::arrays::scalar::ScalarValue;
use quarry_core::engine::compile::LimitArg;
use quarry_core::engine::query_result::Output;

use crate::setup::{ALLTYPES_ROWS, session};

#[test]
fn default_limit_above_row_count() {
    let mut session = session();
    session.set_setting("sql.default_limit", 100_000i64).unwrap();

    let t = session.table("functional_alltypes").unwrap();
    let result = session.execute(&t, LimitArg::Default).unwrap();
    assert_eq!(ALLTYPES_ROWS, result.num_rows());
}

#[test]
fn default_limit_caps_rows() {
    let mut session = session();
    session.set_setting("sql.default_limit", 20i64).unwrap();

    let t = session.table("functional_alltypes").unwrap();
    assert_eq!(20, session.execute(&t, LimitArg::Default).unwrap().num_rows());
}

#[test]
fn explicit_limit_overrides_default() {
    let mut session = session();
    session.set_setting("sql.default_limit", 20i64).unwrap();

    let t = session.table("functional_alltypes").unwrap();
    assert_eq!(15, session.execute(&t, 15u64).unwrap().num_rows());

    // An explicit limit also replaces the expression's own outer limit.
    let limited = t.limit(5);
    assert_eq!(15, session.execute(&limited, 15u64).unwrap().num_rows());
    assert_eq!(5, session.execute(&limited, LimitArg::Default).unwrap().num_rows());
}

#[test]
fn unbounded_ignores_default() {
    let mut session = session();
    session.set_setting("sql.default_limit", 20i64).unwrap();

    let t = session.table("functional_alltypes").unwrap();
    let result = session.execute(&t, LimitArg::Unbounded).unwrap();
    assert_eq!(ALLTYPES_ROWS, result.num_rows());
}

#[test]
fn count_ignores_limits() {
    for default_limit in [None, Some(20i64), Some(100_000)] {
        let mut session = session();
        session
            .set_setting("sql.default_limit", default_limit)
            .unwrap();
        let t = session.table("functional_alltypes").unwrap();

        for limit in [LimitArg::Default, LimitArg::Rows(15), LimitArg::Unbounded] {
            let result = session.execute(t.count().unwrap(), limit).unwrap();
            assert_eq!(
                Output::Scalar(ScalarValue::Int64(ALLTYPES_ROWS as i64)),
                result.output,
                "default_limit: {default_limit:?}, limit: {limit:?}"
            );
        }
    }
}

#[test]
fn column_results_are_limited() {
    let mut session = session();
    session.set_setting("sql.default_limit", 20i64).unwrap();

    let t = session.table("functional_alltypes").unwrap();
    let result = session
        .execute(t.column("double_col").unwrap(), LimitArg::Default)
        .unwrap();
    assert_eq!(20, result.num_rows());
    assert_eq!(1, result.output_schema.len());
}

#[test]
fn scoped_default_limit() {
    let session = session();
    let t = session.table("functional_alltypes").unwrap();

    let scoped = session.with_setting("sql.default_limit", 20i64).unwrap();
    assert_eq!(20, scoped.execute(&t, LimitArg::Default).unwrap().num_rows());
    assert_eq!(
        ALLTYPES_ROWS,
        session.execute(&t, LimitArg::Default).unwrap().num_rows()
    );
}
