use std::cmp::Ordering;

use quarry_error::Result;

use super::{ExecuteOperator, single_input};
use crate::arrays::batch::Batch;
use crate::arrays::datatype::DataType;
use crate::arrays::scalar::ScalarValue;
use crate::explain::explainable::{ExplainConfig, ExplainEntry, Explainable};
use crate::expr::physical::PhysicalSortExpression;

#[derive(Debug, Clone, PartialEq)]
pub struct PhysicalSort {
    pub exprs: Vec<PhysicalSortExpression>,
}

impl ExecuteOperator for PhysicalSort {
    const OPERATOR_NAME: &'static str = "Sort";

    fn execute(&self, inputs: Vec<Batch>, _output_types: &[DataType]) -> Result<Batch> {
        let input = single_input(Self::OPERATOR_NAME, inputs)?;

        let keys = sort_keys(&self.exprs, &input)?;
        let mut indices: Vec<usize> = (0..input.num_rows()).collect();
        // Stable, rows with equal keys keep their input order.
        indices.sort_by(|&a, &b| compare_sort_keys(&self.exprs, &keys[a], &keys[b]));

        input.select(&indices)
    }
}

/// Evaluate sort key expressions for every row.
pub(crate) fn sort_keys(
    exprs: &[PhysicalSortExpression],
    input: &Batch,
) -> Result<Vec<Vec<ScalarValue>>> {
    input
        .rows()
        .map(|row| {
            exprs
                .iter()
                .map(|expr| expr.column.eval(&row))
                .collect::<Result<Vec<_>>>()
        })
        .collect()
}

/// Compare two rows of evaluated sort keys.
///
/// Null placement is controlled by `nulls_first` alone, independent of the
/// sort direction.
pub(crate) fn compare_sort_keys(
    exprs: &[PhysicalSortExpression],
    a: &[ScalarValue],
    b: &[ScalarValue],
) -> Ordering {
    for ((expr, a), b) in exprs.iter().zip(a).zip(b) {
        let ord = match (a.is_null(), b.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) if expr.nulls_first => Ordering::Less,
            (true, false) => Ordering::Greater,
            (false, true) if expr.nulls_first => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => {
                let ord = a.partial_cmp_value(b).unwrap_or(Ordering::Equal);
                if expr.desc { ord.reverse() } else { ord }
            }
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

impl Explainable for PhysicalSort {
    fn explain_entry(&self, _conf: ExplainConfig) -> ExplainEntry {
        ExplainEntry::new(Self::OPERATOR_NAME).with_values("expressions", &self.exprs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arrays::batch::Array;
    use crate::expr::physical::PhysicalScalarExpression;

    fn sort_by_first(desc: bool, nulls_first: bool) -> Vec<ScalarValue> {
        let input = Batch::try_new([Array::new(
            DataType::int32(),
            vec![
                ScalarValue::Int32(2),
                ScalarValue::Null,
                ScalarValue::Int32(1),
                ScalarValue::Int32(3),
            ],
        )])
        .unwrap();
        let sort = PhysicalSort {
            exprs: vec![PhysicalSortExpression {
                column: PhysicalScalarExpression::Column {
                    idx: 0,
                    datatype: DataType::int32(),
                },
                desc,
                nulls_first,
            }],
        };
        let out = sort.execute(vec![input], &[DataType::int32()]).unwrap();
        out.array(0).unwrap().iter().cloned().collect()
    }

    #[test]
    fn asc_nulls_last() {
        assert_eq!(
            vec![
                ScalarValue::Int32(1),
                ScalarValue::Int32(2),
                ScalarValue::Int32(3),
                ScalarValue::Null
            ],
            sort_by_first(false, false)
        );
    }

    #[test]
    fn desc_nulls_first() {
        assert_eq!(
            vec![
                ScalarValue::Null,
                ScalarValue::Int32(3),
                ScalarValue::Int32(2),
                ScalarValue::Int32(1)
            ],
            sort_by_first(true, true)
        );
    }
}
