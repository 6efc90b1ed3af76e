use std::fmt;

use hashbrown::HashMap;
use quarry_error::{DbError, Result};

use super::ExecuteOperator;
use crate::arrays::batch::Batch;
use crate::arrays::datatype::DataType;
use crate::arrays::hash_key::HashKey;
use crate::arrays::scalar::ScalarValue;
use crate::explain::explainable::{ExplainConfig, ExplainEntry, Explainable};
use crate::expr::physical::PhysicalScalarExpression;
use crate::logical::logical_join::JoinType;

/// Where an output column of the join reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutput {
    Left(usize),
    Right(usize),
    /// Left value, or the right value if the left is null.
    Coalesce(usize, usize),
}

impl fmt::Display for JoinOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Left(idx) => write!(f, "left.#{idx}"),
            Self::Right(idx) => write!(f, "right.#{idx}"),
            Self::Coalesce(l, r) => write!(f, "coalesce(left.#{l}, right.#{r})"),
        }
    }
}

/// Equi-join with an optional residual predicate.
///
/// Builds a hash table over the right input and probes it with each left
/// row. Output keeps left row order, followed by unmatched right rows for
/// right and full joins.
#[derive(Debug, Clone, PartialEq)]
pub struct PhysicalHashJoin {
    pub join_type: JoinType,
    pub left_keys: Vec<usize>,
    pub right_keys: Vec<usize>,
    /// Evaluated against the left row concatenated with the right row.
    pub residual: Option<PhysicalScalarExpression>,
    pub outputs: Vec<JoinOutput>,
}

impl PhysicalHashJoin {
    fn row_key(row: &[ScalarValue], keys: &[usize]) -> Option<Vec<HashKey>> {
        let mut out = Vec::with_capacity(keys.len());
        for &idx in keys {
            let key = HashKey::from(row.get(idx).unwrap_or(&ScalarValue::Null));
            // Null never equals anything, including another null.
            if key.is_null() {
                return None;
            }
            out.push(key);
        }
        Some(out)
    }

    fn matches(&self, left: &[ScalarValue], right: &[ScalarValue]) -> Result<bool> {
        match &self.residual {
            Some(residual) => {
                let mut combined = Vec::with_capacity(left.len() + right.len());
                combined.extend_from_slice(left);
                combined.extend_from_slice(right);
                residual.eval_predicate(&combined)
            }
            None => Ok(true),
        }
    }

    fn emit(
        &self,
        left: Option<&[ScalarValue]>,
        right: Option<&[ScalarValue]>,
    ) -> Vec<ScalarValue> {
        let get = |row: Option<&[ScalarValue]>, idx: usize| {
            row.and_then(|row| row.get(idx))
                .cloned()
                .unwrap_or(ScalarValue::Null)
        };
        self.outputs
            .iter()
            .map(|output| match *output {
                JoinOutput::Left(idx) => get(left, idx),
                JoinOutput::Right(idx) => get(right, idx),
                JoinOutput::Coalesce(l, r) => {
                    let value = get(left, l);
                    if value.is_null() { get(right, r) } else { value }
                }
            })
            .collect()
    }
}

impl ExecuteOperator for PhysicalHashJoin {
    const OPERATOR_NAME: &'static str = "HashJoin";

    fn execute(&self, inputs: Vec<Batch>, output_types: &[DataType]) -> Result<Batch> {
        let [left, right]: [Batch; 2] = inputs
            .try_into()
            .map_err(|_| DbError::new("HashJoin expects exactly two inputs"))?;

        let left_rows: Vec<_> = left.rows().collect();
        let right_rows: Vec<_> = right.rows().collect();

        let mut table: HashMap<Vec<HashKey>, Vec<usize>> = HashMap::new();
        for (idx, row) in right_rows.iter().enumerate() {
            if let Some(key) = Self::row_key(row, &self.right_keys) {
                table.entry(key).or_default().push(idx);
            }
        }

        let mut right_matched = vec![false; right_rows.len()];
        let mut output = Vec::new();

        for left_row in &left_rows {
            let candidates = Self::row_key(left_row, &self.left_keys)
                .and_then(|key| table.get(&key))
                .map(|v| v.as_slice())
                .unwrap_or(&[]);

            let mut matched = false;
            for &right_idx in candidates {
                let right_row = &right_rows[right_idx];
                if !self.matches(left_row, right_row)? {
                    continue;
                }
                matched = true;
                right_matched[right_idx] = true;

                if self.join_type.is_left_only() {
                    break;
                }
                output.push(self.emit(Some(left_row), Some(right_row)));
            }

            match self.join_type {
                JoinType::LeftSemi if matched => output.push(self.emit(Some(left_row), None)),
                JoinType::LeftAnti if !matched => output.push(self.emit(Some(left_row), None)),
                JoinType::Left | JoinType::Full if !matched => {
                    output.push(self.emit(Some(left_row), None))
                }
                _ => (),
            }
        }

        if matches!(self.join_type, JoinType::Right | JoinType::Full) {
            for (right_row, matched) in right_rows.iter().zip(&right_matched) {
                if !matched {
                    output.push(self.emit(None, Some(right_row)));
                }
            }
        }

        Batch::try_from_rows(output_types, output)
    }
}

impl Explainable for PhysicalHashJoin {
    fn explain_entry(&self, conf: ExplainConfig) -> ExplainEntry {
        let mut ent = ExplainEntry::new(Self::OPERATOR_NAME)
            .with_value("join_type", self.join_type)
            .with_values("left_keys", self.left_keys.iter().map(|k| format!("#{k}")))
            .with_values("right_keys", self.right_keys.iter().map(|k| format!("#{k}")))
            .with_optional_value("residual", self.residual.as_ref());
        if conf.verbose {
            ent = ent.with_values("outputs", &self.outputs);
        }
        ent
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn left() -> Batch {
        Batch::try_from_rows(
            &[DataType::int32(), DataType::utf8()],
            vec![
                vec![ScalarValue::Int32(1), "a".into()],
                vec![ScalarValue::Int32(2), "b".into()],
                vec![ScalarValue::Null, "c".into()],
            ],
        )
        .unwrap()
    }

    fn right() -> Batch {
        Batch::try_from_rows(
            &[DataType::int64(), DataType::utf8()],
            vec![
                vec![ScalarValue::Int64(1), "x".into()],
                vec![ScalarValue::Int64(1), "y".into()],
                vec![ScalarValue::Int64(3), "z".into()],
                vec![ScalarValue::Null, "n".into()],
            ],
        )
        .unwrap()
    }

    fn join(join_type: JoinType, outputs: Vec<JoinOutput>) -> PhysicalHashJoin {
        PhysicalHashJoin {
            join_type,
            left_keys: vec![0],
            right_keys: vec![0],
            residual: None,
            outputs,
        }
    }

    fn labels(batch: &Batch, col: usize) -> Vec<ScalarValue> {
        batch.array(col).unwrap().iter().cloned().collect()
    }

    #[test]
    fn inner_matches_across_int_widths() {
        let op = join(JoinType::Inner, vec![JoinOutput::Left(1), JoinOutput::Right(1)]);
        let out = op
            .execute(vec![left(), right()], &[DataType::utf8(), DataType::utf8()])
            .unwrap();
        assert_eq!(2, out.num_rows());
        let expected: Vec<ScalarValue> = vec!["x".into(), "y".into()];
        assert_eq!(expected, labels(&out, 1));
    }

    #[test]
    fn full_join_coalesces_key() {
        let op = join(
            JoinType::Full,
            vec![JoinOutput::Coalesce(0, 0), JoinOutput::Left(1), JoinOutput::Right(1)],
        );
        let out = op
            .execute(
                vec![left(), right()],
                &[DataType::int64(), DataType::utf8(), DataType::utf8()],
            )
            .unwrap();
        // 2 matches, 2 unmatched left, 2 unmatched right.
        assert_eq!(6, out.num_rows());
        let keys = labels(&out, 0);
        assert_eq!(ScalarValue::Int64(3), keys[4]);
        assert_eq!(ScalarValue::Null, keys[5]);
    }

    #[test]
    fn semi_and_anti_partition_left() {
        let semi = join(JoinType::LeftSemi, vec![JoinOutput::Left(1)])
            .execute(vec![left(), right()], &[DataType::utf8()])
            .unwrap();
        let anti = join(JoinType::LeftAnti, vec![JoinOutput::Left(1)])
            .execute(vec![left(), right()], &[DataType::utf8()])
            .unwrap();

        assert_eq!(vec![ScalarValue::from("a")], labels(&semi, 0));
        assert_eq!(vec![ScalarValue::from("b"), ScalarValue::from("c")], labels(&anti, 0));
    }

    #[test]
    fn cross_join_without_keys() {
        let op = PhysicalHashJoin {
            join_type: JoinType::Inner,
            left_keys: Vec::new(),
            right_keys: Vec::new(),
            residual: None,
            outputs: vec![JoinOutput::Left(1), JoinOutput::Right(1)],
        };
        let out = op
            .execute(vec![left(), right()], &[DataType::utf8(), DataType::utf8()])
            .unwrap();
        assert_eq!(12, out.num_rows());
    }
}
