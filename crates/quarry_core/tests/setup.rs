#![allow(dead_code)]

use quarry_core::adapter::memory::MemoryAdapter;
use quarry_core::adapter::{AdapterCapabilities, CreateTableOptions};
use quarry_core::arrays::batch::Batch;
use quarry_core::arrays::native::{ColumnarSource, NativeColumn};
use quarry_core::arrays::scalar::ScalarValue;
use quarry_core::engine::session::Session;

pub const ALLTYPES_ROWS: usize = 7300;

pub fn session() -> Session<MemoryAdapter> {
    session_with(AdapterCapabilities::default())
}

/// A session over a memory adapter holding all fixture tables.
pub fn session_with(capabilities: AdapterCapabilities) -> Session<MemoryAdapter> {
    logutil::init_test();

    let session = Session::new(MemoryAdapter::with_capabilities(capabilities));
    create(&session, "functional_alltypes", functional_alltypes());
    create(&session, "batting", batting());
    create(&session, "awards_players", awards_players());
    session
}

fn create(session: &Session<MemoryAdapter>, name: &str, data: ColumnarSource) {
    session
        .create_table_from(name, &data, None, CreateTableOptions::default())
        .unwrap();
}

pub fn functional_alltypes() -> ColumnarSource {
    let n = ALLTYPES_ROWS as i32;
    let int_col: Vec<i32> = (0..n).map(|i| i % 10).collect();
    ColumnarSource::new(vec![
        NativeColumn::from_values("id", (0..n).collect::<Vec<_>>()),
        NativeColumn::from_values("bool_col", (0..n).map(|i| i % 2 == 0).collect::<Vec<_>>()),
        NativeColumn::from_values("int_col", int_col.clone()),
        NativeColumn::from_values(
            "double_col",
            int_col.iter().map(|&v| v as f64 * 10.1).collect::<Vec<_>>(),
        ),
        NativeColumn::from_values(
            "string_col",
            int_col.iter().map(|v| v.to_string()).collect::<Vec<_>>(),
        ),
        NativeColumn::from_values("year", (0..n).map(|i| 2009 + i / 3650).collect::<Vec<_>>()),
    ])
    .unwrap()
}

pub fn batting() -> ColumnarSource {
    let rows = [
        ("aaronha01", 1954, "ML1", 122),
        ("aaronha01", 1955, "ML1", 153),
        ("aaronha01", 1956, "ML1", 153),
        ("abbotji01", 1989, "CAL", 29),
        ("abbotji01", 1990, "CAL", 33),
        ("bondsba01", 1986, "PIT", 113),
        ("bondsba01", 1993, "SFN", 159),
        ("cobbty01", 1905, "DET", 41),
        ("zimmedo01", 1954, "BRO", 13),
    ];
    ColumnarSource::new(vec![
        NativeColumn::from_values("playerID", rows.iter().map(|r| r.0).collect()),
        NativeColumn::from_values("yearID", rows.iter().map(|r| r.1 as i64).collect::<Vec<_>>()),
        NativeColumn::from_options("teamID", rows.iter().map(|r| Some(r.2)).collect()),
        NativeColumn::from_options("G", rows.iter().map(|r| Some(r.3 as i64)).collect::<Vec<_>>()),
    ])
    .unwrap()
}

pub fn awards_players() -> ColumnarSource {
    let rows = [
        ("aaronha01", "Most Valuable Player", 1957, None),
        ("aaronha01", "Gold Glove", 1958, None),
        ("aaronha01", "Gold Glove", 1959, None),
        ("bondsba01", "Most Valuable Player", 1993, Some("NL")),
        ("cobbty01", "Triple Crown", 1909, None),
        ("mayswi01", "Rookie of the Year", 1951, Some("NL")),
    ];
    ColumnarSource::new(vec![
        NativeColumn::from_values("playerID", rows.iter().map(|r| r.0).collect()),
        NativeColumn::from_values("awardID", rows.iter().map(|r| r.1).collect()),
        NativeColumn::from_values("yearID", rows.iter().map(|r| r.2 as i64).collect::<Vec<_>>()),
        NativeColumn::from_options("notes", rows.iter().map(|r| r.3).collect()),
    ])
    .unwrap()
}

/// Values of a column, in row order.
pub fn column_values(batch: &Batch, name_idx: usize) -> Vec<ScalarValue> {
    batch.array(name_idx).unwrap().values.clone()
}

pub fn int64_values(batch: &Batch, idx: usize) -> Vec<i64> {
    column_values(batch, idx)
        .into_iter()
        .map(|v| match v {
            ScalarValue::Int64(v) => v,
            other => panic!("expected int64, got {other:?}"),
        })
        .collect()
}

pub fn string_values(batch: &Batch, idx: usize) -> Vec<String> {
    column_values(batch, idx)
        .into_iter()
        .map(|v| match v {
            ScalarValue::Utf8(v) => v,
            other => panic!("expected string, got {other:?}"),
        })
        .collect()
}
