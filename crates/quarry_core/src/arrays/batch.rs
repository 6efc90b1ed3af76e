use quarry_error::{DbError, Result};

use super::datatype::DataType;
use super::scalar::ScalarValue;

/// A column of values with a single logical type.
#[derive(Debug, Clone, PartialEq)]
pub struct Array {
    pub datatype: DataType,
    pub values: Vec<ScalarValue>,
}

impl Array {
    pub fn new(datatype: DataType, values: Vec<ScalarValue>) -> Self {
        Array { datatype, values }
    }

    pub fn new_nulls(datatype: DataType, len: usize) -> Self {
        Array {
            datatype,
            values: vec![ScalarValue::Null; len],
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn value(&self, idx: usize) -> Option<&ScalarValue> {
        self.values.get(idx)
    }

    /// Select rows by index, producing a new array.
    ///
    /// `None` selects a null value, used when null-filling unmatched join
    /// rows.
    pub fn select(&self, selection: impl IntoIterator<Item = Option<usize>>) -> Result<Self> {
        let values = selection
            .into_iter()
            .map(|idx| match idx {
                Some(idx) => self.values.get(idx).cloned().ok_or_else(|| {
                    DbError::new(format!(
                        "Row index {idx} out of bounds for array of length {}",
                        self.values.len()
                    ))
                }),
                None => Ok(ScalarValue::Null),
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Array {
            datatype: self.datatype.clone(),
            values,
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &ScalarValue> {
        self.values.iter()
    }
}

/// A set of equal-length arrays.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Batch {
    arrays: Vec<Array>,
    num_rows: usize,
}

impl Batch {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Create a batch with no columns but a fixed number of rows.
    pub fn empty_with_num_rows(num_rows: usize) -> Self {
        Batch {
            arrays: Vec::new(),
            num_rows,
        }
    }

    pub fn try_new(arrays: impl IntoIterator<Item = Array>) -> Result<Self> {
        let arrays: Vec<_> = arrays.into_iter().collect();
        let num_rows = match arrays.first() {
            Some(arr) => arr.len(),
            None => return Ok(Self::empty()),
        };

        for arr in &arrays {
            if arr.len() != num_rows {
                return Err(DbError::new("Expected all arrays in a batch to be the same length")
                    .with_field("expected", num_rows)
                    .with_field("got", arr.len()));
            }
        }

        Ok(Batch { arrays, num_rows })
    }

    /// Create a batch from rows of values.
    pub fn try_from_rows(types: &[DataType], rows: Vec<Vec<ScalarValue>>) -> Result<Self> {
        let mut columns: Vec<Vec<ScalarValue>> = vec![Vec::with_capacity(rows.len()); types.len()];
        let num_rows = rows.len();
        for row in rows {
            if row.len() != types.len() {
                return Err(DbError::new("Row width does not match number of types")
                    .with_field("expected", types.len())
                    .with_field("got", row.len()));
            }
            for (col, value) in columns.iter_mut().zip(row) {
                col.push(value);
            }
        }

        if types.is_empty() {
            return Ok(Self::empty_with_num_rows(num_rows));
        }

        Self::try_new(
            types
                .iter()
                .zip(columns)
                .map(|(typ, values)| Array::new(typ.clone(), values)),
        )
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn num_columns(&self) -> usize {
        self.arrays.len()
    }

    pub fn arrays(&self) -> &[Array] {
        &self.arrays
    }

    pub fn into_arrays(self) -> Vec<Array> {
        self.arrays
    }

    pub fn array(&self, idx: usize) -> Option<&Array> {
        self.arrays.get(idx)
    }

    pub fn row(&self, idx: usize) -> Option<Vec<ScalarValue>> {
        if idx >= self.num_rows {
            return None;
        }
        Some(self.arrays.iter().map(|a| a.values[idx].clone()).collect())
    }

    pub fn rows(&self) -> impl Iterator<Item = Vec<ScalarValue>> + '_ {
        (0..self.num_rows).filter_map(|idx| self.row(idx))
    }

    /// Select rows from every array.
    pub fn select(&self, selection: &[usize]) -> Result<Self> {
        if self.arrays.is_empty() {
            return Ok(Self::empty_with_num_rows(selection.len()));
        }
        let arrays = self
            .arrays
            .iter()
            .map(|a| a.select(selection.iter().copied().map(Some)))
            .collect::<Result<Vec<_>>>()?;
        Self::try_new(arrays)
    }

    /// Take at most `limit` rows starting at `offset`.
    pub fn slice(&self, offset: usize, limit: Option<usize>) -> Result<Self> {
        let end = match limit {
            Some(limit) => offset.saturating_add(limit).min(self.num_rows),
            None => self.num_rows,
        };
        let start = offset.min(end);
        let selection: Vec<_> = (start..end).collect();
        self.select(&selection)
    }

    /// Append all rows from another batch with the same layout.
    pub fn append(&mut self, other: Batch) -> Result<()> {
        if self.arrays.is_empty() && self.num_rows == 0 {
            *self = other;
            return Ok(());
        }
        if other.arrays.len() != self.arrays.len() {
            return Err(DbError::new("Cannot append batches with different column counts")
                .with_field("expected", self.arrays.len())
                .with_field("got", other.arrays.len()));
        }
        for (dst, src) in self.arrays.iter_mut().zip(other.arrays) {
            dst.values.extend(src.values);
        }
        self.num_rows += other.num_rows;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch() -> Batch {
        Batch::try_new([
            Array::new(
                DataType::int32(),
                (1..=4).map(ScalarValue::Int32).collect(),
            ),
            Array::new(
                DataType::utf8(),
                vec!["a".into(), "b".into(), "c".into(), "d".into()],
            ),
        ])
        .unwrap()
    }

    #[test]
    fn mismatched_lengths() {
        let res = Batch::try_new([
            Array::new(DataType::int32(), vec![ScalarValue::Int32(1)]),
            Array::new(DataType::int32(), vec![]),
        ]);
        assert!(res.is_err());
    }

    #[test]
    fn slice_with_offset() {
        let b = batch().slice(1, Some(2)).unwrap();
        assert_eq!(2, b.num_rows());
        assert_eq!(Some(vec![ScalarValue::Int32(2), "b".into()]), b.row(0));

        let b = batch().slice(3, Some(10)).unwrap();
        assert_eq!(1, b.num_rows());

        let b = batch().slice(10, None).unwrap();
        assert_eq!(0, b.num_rows());
    }

    #[test]
    fn select_with_nulls() {
        let arr = Array::new(
            DataType::int32(),
            vec![ScalarValue::Int32(7), ScalarValue::Int32(8)],
        );
        let out = arr.select([Some(1), None, Some(0)]).unwrap();
        assert_eq!(
            vec![ScalarValue::Int32(8), ScalarValue::Null, ScalarValue::Int32(7)],
            out.values
        );
    }

    #[test]
    fn append_batches() {
        let mut b = batch();
        b.append(batch()).unwrap();
        assert_eq!(8, b.num_rows());
    }
}
