mod setup;

use std::collections::BTreeSet;

use quarry_core::adapter::memory::MemoryAdapter;
use quarry_core::adapter::{AdapterCapabilities, CreateTableOptions};
use quarry_core::arrays::datatype::DataType;
use quarry_core::arrays::native::{ColumnarSource, NativeColumn};
use quarry_core::arrays::scalar::ScalarValue;
use quarry_core::engine::compile::LimitArg;
use quarry_core::engine::session::Session;
use quarry_core::logical::table::Table;
use quarry_error::ErrorKind;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::setup::{column_values, int64_values, session, session_with, string_values};

#[test]
fn inner_join_on_player() {
    let session = session();
    let batting = session.table("batting").unwrap();
    let awards = session.table("awards_players").unwrap();

    let joined = batting.inner_join(&awards, "playerID").unwrap();
    let names: Vec<_> = joined.schema().names().collect();
    assert_eq!(
        vec!["playerID", "yearID", "teamID", "G", "awardID", "yearID_right", "notes"],
        names
    );

    // aaronha01: 3 x 3, bondsba01: 2 x 1, cobbty01: 1 x 1
    let result = session.execute(&joined, LimitArg::Unbounded).unwrap();
    assert_eq!(12, result.num_rows());
}

#[test]
fn left_join_null_fills() {
    let session = session();
    let batting = session.table("batting").unwrap();
    let awards = session.table("awards_players").unwrap();

    let joined = batting.left_join(&awards, ["playerID", "yearID"]).unwrap();
    let batch = session
        .execute(&joined, LimitArg::Unbounded)
        .unwrap()
        .try_into_batch()
        .unwrap();

    // Only bondsba01 in 1993 has an award in the same year.
    assert_eq!(9, batch.num_rows());
    let award_idx = joined.schema().index_of("awardID").unwrap();
    let awards: Vec<_> = column_values(&batch, award_idx)
        .into_iter()
        .filter(|v| !v.is_null())
        .collect();
    assert_eq!(vec![ScalarValue::from("Most Valuable Player")], awards);
}

#[test]
fn outer_join_keeps_both_sides() {
    let session = session();
    let batting = session.table("batting").unwrap();
    let awards = session.table("awards_players").unwrap();

    let joined = batting.outer_join(&awards, "playerID").unwrap();
    let batch = session
        .execute(&joined, LimitArg::Unbounded)
        .unwrap()
        .try_into_batch()
        .unwrap();

    // 12 matched, abbotji01 x2 and zimmedo01 from the left, mayswi01 from the
    // right.
    assert_eq!(16, batch.num_rows());
    let ids = column_values(&batch, 0);
    assert!(ids.contains(&ScalarValue::from("mayswi01")));
    assert!(ids.iter().all(|v| !v.is_null()));
}

#[test]
fn outer_join_key_null_from_left() {
    let session = session();
    let left = ColumnarSource::new(vec![
        NativeColumn::from_options("k", vec![Some(1i64), None]),
        NativeColumn::from_values("a", vec!["x", "y"]),
    ])
    .unwrap();
    let right = ColumnarSource::new(vec![
        NativeColumn::from_values("k", vec![1i64, 3]),
        NativeColumn::from_values("b", vec!["p", "q"]),
    ])
    .unwrap();
    let left = session
        .create_table_from("nullable_keys", &left, None, CreateTableOptions::default())
        .unwrap();
    let right = session
        .create_table_from("non_null_keys", &right, None, CreateTableOptions::default())
        .unwrap();
    assert!(!right.column_type("k").unwrap().nullable);

    let joined = left.outer_join(&right, "k").unwrap();
    assert_eq!(&DataType::int64(), joined.column_type("k").unwrap());

    let batch = session
        .execute(&joined, LimitArg::Unbounded)
        .unwrap()
        .try_into_batch()
        .unwrap();
    assert_eq!(
        vec![ScalarValue::Int64(1), ScalarValue::Null, ScalarValue::Int64(3)],
        column_values(&batch, 0)
    );
}

#[test]
fn right_join_null_fills_left() {
    let session = session();
    let batting = session.table("batting").unwrap();
    let awards = session.table("awards_players").unwrap();

    let joined = batting.right_join(&awards, "playerID").unwrap();
    let batch = session
        .execute(&joined, LimitArg::Unbounded)
        .unwrap()
        .try_into_batch()
        .unwrap();

    // 12 matched rows, then mayswi01 who never batted.
    assert_eq!(13, batch.num_rows());
    let last = batch.row(12).unwrap();
    let schema = joined.schema();
    assert_eq!(ScalarValue::from("mayswi01"), last[0]);
    assert_eq!(ScalarValue::Null, last[schema.index_of("yearID").unwrap()]);
    assert_eq!(ScalarValue::Null, last[schema.index_of("teamID").unwrap()]);
    assert_eq!(
        ScalarValue::from("Rookie of the Year"),
        last[schema.index_of("awardID").unwrap()]
    );
    assert!(string_values(&batch, 0).iter().all(|id| id != "abbotji01"));
}

#[test]
fn left_join_differently_named_keys() {
    let session = session();
    let batting = session.table("batting").unwrap();
    let awards = session
        .table("awards_players")
        .unwrap()
        .select_columns(&["playerID", "awardID"])
        .unwrap();
    let awards = awards
        .select([
            awards.col("playerID").unwrap().alias("winner"),
            awards.col("awardID").unwrap(),
        ])
        .unwrap();

    let joined = batting.left_join(&awards, ("playerID", "winner")).unwrap();
    assert!(joined.column_type("winner").unwrap().nullable);

    let batch = session
        .execute(&joined, LimitArg::Unbounded)
        .unwrap()
        .try_into_batch()
        .unwrap();
    let winner_idx = joined.schema().index_of("winner").unwrap();
    // aaronha01 3 x 3, abbotji01 2 unmatched, bondsba01 2 x 1, cobbty01 1,
    // zimmedo01 unmatched.
    assert_eq!(15, batch.num_rows());
    let unmatched = column_values(&batch, winner_idx)
        .into_iter()
        .filter(|v| v.is_null())
        .count();
    assert_eq!(3, unmatched);
}

#[test]
fn self_join_on_player() {
    let session = session();
    let batting = session.table("batting").unwrap();

    // 3 x 3 + 2 x 2 + 2 x 2 + 1 + 1
    let by_name = batting.inner_join(&batting, "playerID").unwrap();
    assert_eq!(19, session.execute(&by_name, LimitArg::Unbounded).unwrap().num_rows());

    let predicate = batting
        .col("playerID")
        .unwrap()
        .equals(batting.col("playerID").unwrap());
    let by_expr = batting.inner_join(&batting, predicate).unwrap();
    assert_eq!(19, session.execute(&by_expr, LimitArg::Unbounded).unwrap().num_rows());

    let compiled = session.compile(&by_expr, LimitArg::Unbounded).unwrap();
    let sides: Vec<_> = by_expr
        .root()
        .children()
        .iter()
        .map(|child| format!("t{}", child.table_ref().table_idx))
        .collect();
    let on = format!("ON {}.playerID = {}.playerID", sides[0], sides[1]);
    assert!(compiled.sql.contains(&on), "{}", compiled.sql);
}

#[test]
fn self_join_through_view() {
    let session = session();
    let batting = session.table("batting").unwrap();
    let later = batting.view();

    let predicate = batting
        .col("playerID")
        .unwrap()
        .equals(later.col("playerID").unwrap())
        .and(batting.col("yearID").unwrap().lt(later.col("yearID").unwrap()));
    let joined = batting.inner_join(&later, predicate).unwrap();

    // aaronha01 has 3 ordered pairs, abbotji01 and bondsba01 one each.
    assert_eq!(5, session.execute(&joined, LimitArg::Unbounded).unwrap().num_rows());

    let ambiguous = batting
        .col("yearID")
        .unwrap()
        .lt(batting.col("yearID").unwrap());
    let err = batting.inner_join(&batting, ambiguous).unwrap_err();
    assert_eq!(ErrorKind::Join, err.kind());
}

#[test]
fn join_with_memory_table() {
    let session = session();
    let batting = session.table("batting").unwrap();
    let seasons = Table::memory(
        &ColumnarSource::new(vec![
            NativeColumn::from_values("yearID", vec![1954i64, 1993]),
            NativeColumn::from_values("era", vec!["golden", "steroid"]),
        ])
        .unwrap(),
    )
    .unwrap();
    assert!(!seasons.column_type("era").unwrap().nullable);

    let joined = batting.inner_join(&seasons, "yearID").unwrap();
    let batch = session
        .execute(&joined, LimitArg::Unbounded)
        .unwrap()
        .try_into_batch()
        .unwrap();
    // aaronha01 and zimmedo01 in 1954, bondsba01 in 1993.
    assert_eq!(3, batch.num_rows());
    let era_idx = joined.schema().index_of("era").unwrap();
    assert_eq!(
        vec!["golden", "steroid", "golden"],
        string_values(&batch, era_idx)
    );

    // Non-null memory columns become nullable on the null filled side.
    let left = batting.left_join(&seasons, "yearID").unwrap();
    assert!(left.column_type("era").unwrap().nullable);
    let result = session.execute(&left, LimitArg::Unbounded).unwrap();
    assert_eq!(9, result.num_rows());
}

#[test]
fn semi_join_with_topk() {
    let session = session();
    let batting = session.table("batting").unwrap();
    let awards = session.table("awards_players").unwrap();

    let top = awards.topk("playerID", 1).unwrap();
    let filtered = batting.semi_join(&top, "playerID").unwrap();
    assert_eq!(batting.schema(), filtered.schema());

    let batch = session
        .execute(&filtered, LimitArg::Unbounded)
        .unwrap()
        .try_into_batch()
        .unwrap();
    assert_eq!(3, batch.num_rows());
    assert!(
        column_values(&batch, 0)
            .iter()
            .all(|v| v == &ScalarValue::from("aaronha01"))
    );
}

#[test]
fn anti_join_unmatched_only() {
    let session = session();
    let batting = session.table("batting").unwrap();
    let awards = session.table("awards_players").unwrap();

    let unmatched = batting.anti_join(&awards, "playerID").unwrap();
    let batch = session
        .execute(&unmatched, LimitArg::Unbounded)
        .unwrap()
        .try_into_batch()
        .unwrap();

    let players: BTreeSet<_> = string_values(&batch, 0).into_iter().collect();
    assert_eq!(
        BTreeSet::from(["abbotji01".to_string(), "zimmedo01".to_string()]),
        players
    );
}

#[test]
fn semi_and_anti_partition_left() {
    let session = session();
    let mut rng = ChaCha8Rng::seed_from_u64(84);

    for round in 0..8 {
        let left_rows: usize = rng.random_range(0..200);
        let right_rows: usize = rng.random_range(0..50);
        let key_space: i64 = rng.random_range(1..40);

        let left = ColumnarSource::new(vec![
            NativeColumn::from_values("id", (0..left_rows as i64).collect::<Vec<_>>()),
            NativeColumn::from_options(
                "k",
                (0..left_rows)
                    .map(|_| {
                        if rng.random_bool(0.1) {
                            None
                        } else {
                            Some(rng.random_range(0..key_space))
                        }
                    })
                    .collect::<Vec<_>>(),
            ),
        ])
        .unwrap();
        let right = ColumnarSource::new(vec![NativeColumn::from_values(
            "k",
            (0..right_rows)
                .map(|_| rng.random_range(0..key_space))
                .collect::<Vec<_>>(),
        )])
        .unwrap();

        let left_name = format!("left_{round}");
        let right_name = format!("right_{round}");
        let left = session
            .create_table_from(&left_name, &left, None, CreateTableOptions::default())
            .unwrap();
        let right = session
            .create_table_from(&right_name, &right, None, CreateTableOptions::default())
            .unwrap();

        let semi = left.semi_join(&right, "k").unwrap();
        let anti = left.anti_join(&right, "k").unwrap();
        assert_eq!(left.schema(), semi.schema());
        assert_eq!(left.schema(), anti.schema());

        let semi_ids = ids(&session, &semi);
        let anti_ids = ids(&session, &anti);
        assert!(semi_ids.len() <= left_rows);

        let semi_set: BTreeSet<_> = semi_ids.iter().copied().collect();
        let anti_set: BTreeSet<_> = anti_ids.iter().copied().collect();
        assert_eq!(semi_ids.len(), semi_set.len(), "semi join duplicated rows");
        assert!(semi_set.is_disjoint(&anti_set));

        let all: BTreeSet<_> = semi_set.union(&anti_set).copied().collect();
        assert_eq!((0..left_rows as i64).collect::<BTreeSet<_>>(), all);
    }
}

fn ids(session: &Session<MemoryAdapter>, table: &Table) -> Vec<i64> {
    let batch = session
        .execute(table, LimitArg::Unbounded)
        .unwrap()
        .try_into_batch()
        .unwrap();
    int64_values(&batch, 0)
}

#[test]
fn cross_join_row_count() {
    let session = session();
    let batting = session.table("batting").unwrap();
    let awards = session
        .table("awards_players")
        .unwrap()
        .select_columns(&["awardID"])
        .unwrap();

    let crossed = batting.cross_join(&awards).unwrap();
    assert_eq!(54, session.execute(&crossed, LimitArg::Unbounded).unwrap().num_rows());
}

#[test]
fn outer_join_unsupported_without_execution() {
    let capabilities = AdapterCapabilities {
        supports_full_outer_join: false,
        ..Default::default()
    };
    let session = session_with(capabilities);
    let batting = session.table("batting").unwrap();
    let awards = session.table("awards_players").unwrap();

    let joined = batting.outer_join(&awards, "playerID").unwrap();
    let err = session.execute(&joined, LimitArg::Default).unwrap_err();
    assert_eq!(ErrorKind::Unsupported, err.kind());
    assert!(session.adapter().executed_queries().is_empty());

    // Other join kinds still run.
    let joined = batting.left_join(&awards, "playerID").unwrap();
    session.execute(&joined, LimitArg::Default).unwrap();
    assert_eq!(1, session.adapter().executed_queries().len());
}
