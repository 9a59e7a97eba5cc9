//! Key encoding and hash indexing for joins and grouping.
//!
//! Key tuples are encoded with Arrow's row format, which turns any
//! combination of columns into comparable, hashable byte strings. Rows from
//! different tables are only comparable when encoded by the same
//! [`KeyEncoder`]. Nulls encode to a fixed sentinel, so a null key part
//! matches another null. Floats are canonicalised first: `-0.0` encodes as
//! `0.0` and every NaN as the same NaN.

use crate::error::Result;
use crate::table::{Column, LogicalType};
use arrow::array::{ArrayRef, AsArray};
use arrow::compute::unary;
use arrow::datatypes::{Float32Type, Float64Type};
use arrow::row::{Row, RowConverter, Rows, SortField};
use std::collections::HashMap;
use std::sync::Arc;

pub(crate) struct KeyEncoder {
    converter: RowConverter,
}

impl KeyEncoder {
    pub(crate) fn new(types: &[LogicalType]) -> Result<Self> {
        let fields = types.iter().map(|t| SortField::new(t.to_arrow())).collect();
        Ok(Self {
            converter: RowConverter::new(fields)?,
        })
    }

    /// Encodes the key tuple of every row. Columns must match the encoder's types.
    pub(crate) fn encode(&self, columns: &[&Column]) -> Result<Rows> {
        let arrays: Vec<ArrayRef> = columns.iter().map(|c| canonical_floats(c.values())).collect();
        Ok(self.converter.convert_columns(&arrays)?)
    }
}

/// Rewrites float arrays so that values equal under `==` share one bit
/// pattern, with NaN collapsed to a single value. Other arrays pass through.
pub(crate) fn canonical_floats(array: &ArrayRef) -> ArrayRef {
    if let Some(floats) = array.as_primitive_opt::<Float64Type>() {
        return Arc::new(unary::<_, _, Float64Type>(floats, |v| {
            if v.is_nan() {
                f64::NAN
            } else if v == 0.0 {
                0.0
            } else {
                v
            }
        }));
    }
    if let Some(floats) = array.as_primitive_opt::<Float32Type>() {
        return Arc::new(unary::<_, _, Float32Type>(floats, |v| {
            if v.is_nan() {
                f32::NAN
            } else if v == 0.0 {
                0.0
            } else {
                v
            }
        }));
    }
    Arc::clone(array)
}

/// Hash index from encoded key to the ascending row indices holding it.
pub(crate) struct KeyIndex<'a> {
    map: HashMap<Row<'a>, Vec<u32>>,
}

impl<'a> KeyIndex<'a> {
    pub(crate) fn build(rows: &'a Rows) -> Self {
        let mut map: HashMap<Row<'a>, Vec<u32>> = HashMap::with_capacity(rows.num_rows());
        for (idx, row) in rows.iter().enumerate() {
            map.entry(row).or_default().push(idx as u32);
        }
        Self { map }
    }

    pub(crate) fn get(&self, key: &Row<'a>) -> Option<&[u32]> {
        self.map.get(key).map(Vec::as_slice)
    }

    pub(crate) fn contains(&self, key: &Row<'a>) -> bool {
        self.map.contains_key(key)
    }

    /// Number of rows holding `key`.
    pub(crate) fn occurrences(&self, key: &Row<'a>) -> usize {
        self.get(key).map_or(0, <[u32]>::len)
    }

    /// Position of `row` among the rows holding `key`, in row order.
    pub(crate) fn rank(&self, key: &Row<'a>, row: u32) -> Option<usize> {
        self.get(key)?.binary_search(&row).ok()
    }

    /// Rows beyond the first occurrence of each key.
    pub(crate) fn duplicate_rows(&self) -> usize {
        self.map.values().map(|rows| rows.len() - 1).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_composite_keys_and_nulls() {
        let a = Column::int64("a", [Some(1), Some(1), None, None]);
        let b = Column::utf8("b", [Some("x"), Some("y"), None, None]);
        let encoder =
            KeyEncoder::new(&[LogicalType::Integer64, LogicalType::Utf8Text]).unwrap();
        let rows = encoder.encode(&[&a, &b]).unwrap();
        let index = KeyIndex::build(&rows);

        assert_eq!(index.get(&rows.row(0)), Some(&[0u32][..]));
        assert_eq!(index.get(&rows.row(2)), Some(&[2u32, 3][..]));
        assert_eq!(index.duplicate_rows(), 1);
        assert_eq!(index.occurrences(&rows.row(3)), 2);
        assert_eq!(index.rank(&rows.row(3), 3), Some(1));
        assert_eq!(index.rank(&rows.row(3), 0), None);
    }

    #[test]
    fn test_signed_zero_and_nan_keys_collapse() {
        let col = Column::float64("k", [Some(0.0), Some(-0.0), Some(f64::NAN), Some(-f64::NAN)]);
        let encoder = KeyEncoder::new(&[LogicalType::Float64]).unwrap();
        let rows = encoder.encode(&[&col]).unwrap();
        let index = KeyIndex::build(&rows);

        assert_eq!(index.get(&rows.row(1)), Some(&[0u32, 1][..]));
        assert_eq!(index.get(&rows.row(3)), Some(&[2u32, 3][..]));
        assert_eq!(index.duplicate_rows(), 2);
    }

    #[test]
    fn test_rows_from_separate_tables_compare() {
        let left = Column::int64("id", [Some(1), Some(2)]);
        let right = Column::int64("id", [Some(2), Some(3)]);
        let encoder = KeyEncoder::new(&[LogicalType::Integer64]).unwrap();
        let left_rows = encoder.encode(&[&left]).unwrap();
        let right_rows = encoder.encode(&[&right]).unwrap();
        let index = KeyIndex::build(&right_rows);

        assert!(!index.contains(&left_rows.row(0)));
        assert!(index.contains(&left_rows.row(1)));
    }
}
