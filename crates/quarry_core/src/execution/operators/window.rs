use std::fmt;

use indexmap::IndexMap;
use quarry_error::Result;

use super::sort::{compare_sort_keys, sort_keys};
use super::{ExecuteOperator, single_input};
use crate::arrays::batch::{Array, Batch};
use crate::arrays::datatype::DataType;
use crate::arrays::hash_key::HashKey;
use crate::arrays::scalar::ScalarValue;
use crate::explain::explainable::{ExplainConfig, ExplainEntry, Explainable};
use crate::expr::physical::{
    PhysicalAggregateExpression,
    PhysicalScalarExpression,
    PhysicalSortExpression,
};

#[derive(Debug, Clone, PartialEq)]
pub enum PhysicalWindowFunction {
    RowNumber,
    Aggregate(PhysicalAggregateExpression),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PhysicalWindowExpr {
    pub function: PhysicalWindowFunction,
    pub partition_by: Vec<PhysicalScalarExpression>,
    pub order_by: Vec<PhysicalSortExpression>,
    pub datatype: DataType,
}

impl fmt::Display for PhysicalWindowExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.function {
            PhysicalWindowFunction::RowNumber => write!(f, "row_number()")?,
            PhysicalWindowFunction::Aggregate(agg) => write!(f, "{agg}")?,
        }
        write!(
            f,
            " OVER (partitions = {}, orderings = {})",
            self.partition_by.len(),
            self.order_by.len()
        )
    }
}

/// Computes window expressions, emitting the input columns followed by one
/// column per window expression. Row order is preserved.
#[derive(Debug, Clone, PartialEq)]
pub struct PhysicalWindow {
    pub windows: Vec<PhysicalWindowExpr>,
}

impl ExecuteOperator for PhysicalWindow {
    const OPERATOR_NAME: &'static str = "Window";

    fn execute(&self, inputs: Vec<Batch>, _output_types: &[DataType]) -> Result<Batch> {
        let input = single_input(Self::OPERATOR_NAME, inputs)?;

        let mut arrays = input.arrays().to_vec();
        for window in &self.windows {
            let values = compute_window(window, &input)?;
            arrays.push(Array::new(window.datatype.clone(), values));
        }

        if arrays.is_empty() {
            return Ok(Batch::empty_with_num_rows(input.num_rows()));
        }
        Batch::try_new(arrays)
    }
}

fn compute_window(window: &PhysicalWindowExpr, input: &Batch) -> Result<Vec<ScalarValue>> {
    let rows: Vec<_> = input.rows().collect();

    // Partition rows, keeping first-seen partition order.
    let mut partitions: IndexMap<Vec<HashKey>, Vec<usize>> = IndexMap::new();
    for (idx, row) in rows.iter().enumerate() {
        let key = window
            .partition_by
            .iter()
            .map(|expr| expr.eval(row).map(|v| HashKey::from(&v)))
            .collect::<Result<Vec<_>>>()?;
        partitions.entry(key).or_default().push(idx);
    }

    let keys = sort_keys(&window.order_by, input)?;
    let mut output = vec![ScalarValue::Null; rows.len()];

    for (_, mut members) in partitions {
        members.sort_by(|&a, &b| compare_sort_keys(&window.order_by, &keys[a], &keys[b]));

        match &window.function {
            PhysicalWindowFunction::RowNumber => {
                for (pos, &row_idx) in members.iter().enumerate() {
                    output[row_idx] = ScalarValue::Int64(pos as i64);
                }
            }
            PhysicalWindowFunction::Aggregate(agg) if window.order_by.is_empty() => {
                let mut state = agg.new_state();
                for &row_idx in &members {
                    agg.update(&mut state, &rows[row_idx])?;
                }
                let value = state.finalize();
                for &row_idx in &members {
                    output[row_idx] = value.clone();
                }
            }
            PhysicalWindowFunction::Aggregate(agg) => {
                // Running aggregate. Peers (rows with equal ordering keys)
                // share the value computed after the last peer.
                let mut state = agg.new_state();
                let mut start = 0;
                while start < members.len() {
                    let mut end = start + 1;
                    while end < members.len()
                        && compare_sort_keys(
                            &window.order_by,
                            &keys[members[start]],
                            &keys[members[end]],
                        )
                        .is_eq()
                    {
                        end += 1;
                    }
                    for &row_idx in &members[start..end] {
                        agg.update(&mut state, &rows[row_idx])?;
                    }
                    let value = state.finalize();
                    for &row_idx in &members[start..end] {
                        output[row_idx] = value.clone();
                    }
                    start = end;
                }
            }
        }
    }

    Ok(output)
}

impl Explainable for PhysicalWindow {
    fn explain_entry(&self, _conf: ExplainConfig) -> ExplainEntry {
        ExplainEntry::new(Self::OPERATOR_NAME).with_values("windows", &self.windows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::aggregate::AggregateFunction;

    fn input() -> Batch {
        // (group, value)
        Batch::try_from_rows(
            &[DataType::utf8(), DataType::int64()],
            vec![
                vec!["a".into(), ScalarValue::Int64(3)],
                vec!["b".into(), ScalarValue::Int64(1)],
                vec!["a".into(), ScalarValue::Int64(1)],
                vec!["a".into(), ScalarValue::Int64(2)],
            ],
        )
        .unwrap()
    }

    fn col(idx: usize, datatype: DataType) -> PhysicalScalarExpression {
        PhysicalScalarExpression::Column { idx, datatype }
    }

    #[test]
    fn row_number_is_zero_based_per_partition() {
        let window = PhysicalWindow {
            windows: vec![PhysicalWindowExpr {
                function: PhysicalWindowFunction::RowNumber,
                partition_by: vec![col(0, DataType::utf8())],
                order_by: vec![PhysicalSortExpression {
                    column: col(1, DataType::int64()),
                    desc: false,
                    nulls_first: false,
                }],
                datatype: DataType::int64().non_null(),
            }],
        };

        let out = window.execute(vec![input()], &[]).unwrap();
        assert_eq!(3, out.num_columns());
        let numbers: Vec<_> = out.array(2).unwrap().iter().cloned().collect();
        assert_eq!(
            vec![
                ScalarValue::Int64(2),
                ScalarValue::Int64(0),
                ScalarValue::Int64(0),
                ScalarValue::Int64(1),
            ],
            numbers
        );
    }

    #[test]
    fn partition_sum_and_running_sum() {
        let sum = PhysicalAggregateExpression {
            function: AggregateFunction::Sum,
            input: Some(col(1, DataType::int64())),
            datatype: DataType::int64(),
        };
        let window = PhysicalWindow {
            windows: vec![
                PhysicalWindowExpr {
                    function: PhysicalWindowFunction::Aggregate(sum.clone()),
                    partition_by: vec![col(0, DataType::utf8())],
                    order_by: Vec::new(),
                    datatype: DataType::int64(),
                },
                PhysicalWindowExpr {
                    function: PhysicalWindowFunction::Aggregate(sum),
                    partition_by: vec![col(0, DataType::utf8())],
                    order_by: vec![PhysicalSortExpression {
                        column: col(1, DataType::int64()),
                        desc: false,
                        nulls_first: false,
                    }],
                    datatype: DataType::int64(),
                },
            ],
        };

        let out = window.execute(vec![input()], &[]).unwrap();
        let totals: Vec<_> = out.array(2).unwrap().iter().cloned().collect();
        assert_eq!(
            vec![
                ScalarValue::Int64(6),
                ScalarValue::Int64(1),
                ScalarValue::Int64(6),
                ScalarValue::Int64(6),
            ],
            totals
        );
        let running: Vec<_> = out.array(3).unwrap().iter().cloned().collect();
        assert_eq!(
            vec![
                ScalarValue::Int64(6),
                ScalarValue::Int64(1),
                ScalarValue::Int64(1),
                ScalarValue::Int64(3),
            ],
            running
        );
    }
}
