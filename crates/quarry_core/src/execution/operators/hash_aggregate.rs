use indexmap::IndexMap;
use quarry_error::Result;

use super::{ExecuteOperator, single_input};
use crate::arrays::batch::Batch;
use crate::arrays::datatype::DataType;
use crate::arrays::hash_key::HashKey;
use crate::arrays::scalar::ScalarValue;
use crate::explain::explainable::{ExplainConfig, ExplainEntry, Explainable};
use crate::expr::physical::{PhysicalAggregateExpression, PhysicalScalarExpression};
use crate::functions::aggregate::AggregateState;

/// Group rows by key expressions and compute aggregates per group.
///
/// Output is the group values followed by the aggregate values, one row per
/// group in first-seen order. With no group expressions a single row is
/// always produced, even for empty input.
#[derive(Debug, Clone, PartialEq)]
pub struct PhysicalHashAggregate {
    pub group_by: Vec<PhysicalScalarExpression>,
    pub aggregates: Vec<PhysicalAggregateExpression>,
}

#[derive(Debug)]
struct GroupState {
    values: Vec<ScalarValue>,
    states: Vec<AggregateState>,
}

impl ExecuteOperator for PhysicalHashAggregate {
    const OPERATOR_NAME: &'static str = "HashAggregate";

    fn execute(&self, inputs: Vec<Batch>, output_types: &[DataType]) -> Result<Batch> {
        let input = single_input(Self::OPERATOR_NAME, inputs)?;

        let mut groups: IndexMap<Vec<HashKey>, GroupState> = IndexMap::new();
        if self.group_by.is_empty() {
            groups.insert(Vec::new(), self.new_group(Vec::new()));
        }

        for row in input.rows() {
            let values = self
                .group_by
                .iter()
                .map(|expr| expr.eval(&row))
                .collect::<Result<Vec<_>>>()?;
            // Nulls group together.
            let key: Vec<_> = values.iter().map(HashKey::from).collect();

            let group = groups
                .entry(key)
                .or_insert_with(|| self.new_group(values));
            for (agg, state) in self.aggregates.iter().zip(&mut group.states) {
                agg.update(state, &row)?;
            }
        }

        let rows = groups
            .into_values()
            .map(|group| {
                let mut row = group.values;
                row.extend(group.states.iter().map(|s| s.finalize()));
                row
            })
            .collect();

        Batch::try_from_rows(output_types, rows)
    }
}

impl PhysicalHashAggregate {
    fn new_group(&self, values: Vec<ScalarValue>) -> GroupState {
        GroupState {
            values,
            states: self.aggregates.iter().map(|a| a.new_state()).collect(),
        }
    }
}

impl Explainable for PhysicalHashAggregate {
    fn explain_entry(&self, _conf: ExplainConfig) -> ExplainEntry {
        ExplainEntry::new(Self::OPERATOR_NAME)
            .with_values("group_by", &self.group_by)
            .with_values("aggregates", &self.aggregates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::aggregate::AggregateFunction;

    fn input() -> Batch {
        Batch::try_from_rows(
            &[DataType::utf8(), DataType::float64()],
            vec![
                vec!["a".into(), ScalarValue::Float64(1.0)],
                vec![ScalarValue::Null, ScalarValue::Float64(2.0)],
                vec!["a".into(), ScalarValue::Null],
                vec![ScalarValue::Null, ScalarValue::Float64(4.0)],
            ],
        )
        .unwrap()
    }

    fn count_star() -> PhysicalAggregateExpression {
        PhysicalAggregateExpression {
            function: AggregateFunction::CountStar,
            input: None,
            datatype: DataType::int64().non_null(),
        }
    }

    #[test]
    fn groups_in_first_seen_order() {
        let agg = PhysicalHashAggregate {
            group_by: vec![PhysicalScalarExpression::Column {
                idx: 0,
                datatype: DataType::utf8(),
            }],
            aggregates: vec![
                count_star(),
                PhysicalAggregateExpression {
                    function: AggregateFunction::Sum,
                    input: Some(PhysicalScalarExpression::Column {
                        idx: 1,
                        datatype: DataType::float64(),
                    }),
                    datatype: DataType::float64(),
                },
            ],
        };

        let out = agg
            .execute(
                vec![input()],
                &[DataType::utf8(), DataType::int64(), DataType::float64()],
            )
            .unwrap();

        assert_eq!(
            Some(vec!["a".into(), ScalarValue::Int64(2), ScalarValue::Float64(1.0)]),
            out.row(0)
        );
        assert_eq!(
            Some(vec![ScalarValue::Null, ScalarValue::Int64(2), ScalarValue::Float64(6.0)]),
            out.row(1)
        );
    }

    #[test]
    fn ungrouped_empty_input_produces_one_row() {
        let agg = PhysicalHashAggregate {
            group_by: Vec::new(),
            aggregates: vec![count_star()],
        };
        let empty = Batch::try_from_rows(&[DataType::utf8()], Vec::new()).unwrap();
        let out = agg.execute(vec![empty], &[DataType::int64()]).unwrap();
        assert_eq!(Some(vec![ScalarValue::Int64(0)]), out.row(0));
    }
}
