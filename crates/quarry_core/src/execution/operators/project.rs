use quarry_error::Result;

use super::{ExecuteOperator, single_input};
use crate::arrays::batch::{Array, Batch};
use crate::arrays::datatype::DataType;
use crate::explain::explainable::{ExplainConfig, ExplainEntry, Explainable};
use crate::expr::physical::PhysicalScalarExpression;

#[derive(Debug, Clone, PartialEq)]
pub struct PhysicalProject {
    pub projections: Vec<PhysicalScalarExpression>,
}

impl ExecuteOperator for PhysicalProject {
    const OPERATOR_NAME: &'static str = "Project";

    fn execute(&self, inputs: Vec<Batch>, output_types: &[DataType]) -> Result<Batch> {
        let input = single_input(Self::OPERATOR_NAME, inputs)?;

        let mut columns: Vec<Vec<_>> = (0..self.projections.len())
            .map(|_| Vec::with_capacity(input.num_rows()))
            .collect();
        for row in input.rows() {
            for (expr, column) in self.projections.iter().zip(&mut columns) {
                column.push(expr.eval(&row)?);
            }
        }

        if columns.is_empty() {
            return Ok(Batch::empty_with_num_rows(input.num_rows()));
        }

        Batch::try_new(
            output_types
                .iter()
                .zip(columns)
                .map(|(typ, values)| Array::new(typ.clone(), values)),
        )
    }
}

impl Explainable for PhysicalProject {
    fn explain_entry(&self, _conf: ExplainConfig) -> ExplainEntry {
        ExplainEntry::new(Self::OPERATOR_NAME).with_values("projections", &self.projections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arrays::scalar::ScalarValue;
    use crate::expr::arith_expr::ArithOperator;

    #[test]
    fn project_computed() {
        let input = Batch::try_new([Array::new(
            DataType::int32(),
            vec![ScalarValue::Int32(1), ScalarValue::Null],
        )])
        .unwrap();

        let project = PhysicalProject {
            projections: vec![PhysicalScalarExpression::Arith {
                op: ArithOperator::Mul,
                left: Box::new(PhysicalScalarExpression::Column {
                    idx: 0,
                    datatype: DataType::int32(),
                }),
                right: Box::new(PhysicalScalarExpression::Literal {
                    literal: ScalarValue::Int32(2),
                    datatype: DataType::int32().non_null(),
                }),
                datatype: DataType::int32(),
            }],
        };

        let out = project
            .execute(vec![input], &[DataType::int32()])
            .unwrap();
        let values: Vec<_> = out.array(0).unwrap().iter().cloned().collect();
        assert_eq!(vec![ScalarValue::Int32(2), ScalarValue::Null], values);
    }
}
