//! Immutable in-memory columnar tables.
//!
//! A [`Table`] is an ordered list of named [`Column`]s that all hold the same
//! number of rows. Each column carries one [`LogicalType`] and is backed by an
//! Arrow array, which provides the dense value buffer and the null bitmap.
//! Tables are never modified in place: projections, `take` and `filter` all
//! return new tables that share column buffers where possible.
//!
//! # Examples
//!
//! ```rust
//! use etl_guard::table::{Column, Table};
//!
//! let table = Table::builder()
//!     .column(Column::int64("id", [Some(1), Some(2), None]))
//!     .column(Column::utf8("email", [Some("a@x.com"), None, Some("c@x.com")]))
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(table.row_count(), 3);
//! assert_eq!(table.column("id").unwrap().null_count(), 1);
//! ```

mod cast;
mod schema;
mod types;

pub use cast::{cast_value, CastError};
pub use schema::{SchemaField, TableSchema};
pub use types::{LogicalType, Value};

use crate::error::{EtlError, Result};
use arrow::array::{
    Array, ArrayRef, AsArray, BooleanArray, BooleanBuilder, Date32Array, Date32Builder,
    Float32Array, Float32Builder, Float64Array, Float64Builder, Int32Array, Int32Builder,
    Int64Array, Int64Builder, StringArray, StringBuilder, UInt32Array,
};
use arrow::datatypes::{
    Date32Type, Field, Float32Type, Float64Type, Int32Type, Int64Type, Schema,
};
use arrow::record_batch::{RecordBatch, RecordBatchOptions};
use chrono::NaiveDate;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use std::collections::HashSet;
use std::sync::Arc;
use types::{date_to_days, days_to_date};

/// A named column with a fixed logical type.
#[derive(Debug, Clone)]
pub struct Column {
    name: String,
    logical_type: LogicalType,
    values: ArrayRef,
}

impl Column {
    /// Wraps an Arrow array, deriving the logical type from its data type.
    pub fn try_new(name: impl Into<String>, values: ArrayRef) -> Result<Self> {
        let name = name.into();
        let logical_type =
            LogicalType::from_arrow(values.data_type()).ok_or_else(|| EtlError::UnsupportedType {
                column: name.clone(),
                data_type: values.data_type().to_string(),
            })?;
        Ok(Self {
            name,
            logical_type,
            values,
        })
    }

    pub fn int32(name: impl Into<String>, values: impl IntoIterator<Item = Option<i32>>) -> Self {
        Self::from_array(name, LogicalType::Integer32, Arc::new(Int32Array::from_iter(values)))
    }

    pub fn int64(name: impl Into<String>, values: impl IntoIterator<Item = Option<i64>>) -> Self {
        Self::from_array(name, LogicalType::Integer64, Arc::new(Int64Array::from_iter(values)))
    }

    pub fn float32(name: impl Into<String>, values: impl IntoIterator<Item = Option<f32>>) -> Self {
        Self::from_array(name, LogicalType::Float32, Arc::new(Float32Array::from_iter(values)))
    }

    pub fn float64(name: impl Into<String>, values: impl IntoIterator<Item = Option<f64>>) -> Self {
        Self::from_array(name, LogicalType::Float64, Arc::new(Float64Array::from_iter(values)))
    }

    pub fn utf8<S: AsRef<str>>(
        name: impl Into<String>,
        values: impl IntoIterator<Item = Option<S>>,
    ) -> Self {
        Self::from_array(name, LogicalType::Utf8Text, Arc::new(StringArray::from_iter(values)))
    }

    pub fn boolean(name: impl Into<String>, values: impl IntoIterator<Item = Option<bool>>) -> Self {
        Self::from_array(name, LogicalType::Boolean, Arc::new(BooleanArray::from_iter(values)))
    }

    pub fn date(
        name: impl Into<String>,
        values: impl IntoIterator<Item = Option<NaiveDate>>,
    ) -> Self {
        let days = values.into_iter().map(|d| d.map(date_to_days));
        Self::from_array(name, LogicalType::Date, Arc::new(Date32Array::from_iter(days)))
    }

    /// Builds a column of `logical_type` from cell values.
    ///
    /// Every non-null value must already be in the representation of
    /// `logical_type` (`Int` for integer types, `Float` for float types, ...);
    /// use [`cast_value`] first when converting between types.
    pub fn from_values(
        name: impl Into<String>,
        logical_type: LogicalType,
        values: &[Value],
    ) -> Result<Self> {
        let name = name.into();
        let mismatch = |row: usize, value: &Value| {
            EtlError::InvalidTable(format!(
                "value '{value}' at row {row} of column '{name}' is not a {logical_type}"
            ))
        };
        let array: ArrayRef = match logical_type {
            LogicalType::Integer32 => {
                let mut builder = Int32Builder::with_capacity(values.len());
                for (row, value) in values.iter().enumerate() {
                    match value {
                        Value::Null => builder.append_null(),
                        Value::Int(v) => {
                            let v = i32::try_from(*v).map_err(|_| mismatch(row, value))?;
                            builder.append_value(v);
                        }
                        other => return Err(mismatch(row, other)),
                    }
                }
                Arc::new(builder.finish())
            }
            LogicalType::Integer64 => {
                let mut builder = Int64Builder::with_capacity(values.len());
                for (row, value) in values.iter().enumerate() {
                    match value {
                        Value::Null => builder.append_null(),
                        Value::Int(v) => builder.append_value(*v),
                        other => return Err(mismatch(row, other)),
                    }
                }
                Arc::new(builder.finish())
            }
            LogicalType::Float32 => {
                let mut builder = Float32Builder::with_capacity(values.len());
                for (row, value) in values.iter().enumerate() {
                    match value {
                        Value::Null => builder.append_null(),
                        Value::Float(v) => builder.append_value(*v as f32),
                        other => return Err(mismatch(row, other)),
                    }
                }
                Arc::new(builder.finish())
            }
            LogicalType::Float64 => {
                let mut builder = Float64Builder::with_capacity(values.len());
                for (row, value) in values.iter().enumerate() {
                    match value {
                        Value::Null => builder.append_null(),
                        Value::Float(v) => builder.append_value(*v),
                        other => return Err(mismatch(row, other)),
                    }
                }
                Arc::new(builder.finish())
            }
            LogicalType::Utf8Text => {
                let mut builder = StringBuilder::new();
                for (row, value) in values.iter().enumerate() {
                    match value {
                        Value::Null => builder.append_null(),
                        Value::Text(v) => builder.append_value(v),
                        other => return Err(mismatch(row, other)),
                    }
                }
                Arc::new(builder.finish())
            }
            LogicalType::Boolean => {
                let mut builder = BooleanBuilder::with_capacity(values.len());
                for (row, value) in values.iter().enumerate() {
                    match value {
                        Value::Null => builder.append_null(),
                        Value::Boolean(v) => builder.append_value(*v),
                        other => return Err(mismatch(row, other)),
                    }
                }
                Arc::new(builder.finish())
            }
            LogicalType::Date => {
                let mut builder = Date32Builder::with_capacity(values.len());
                for (row, value) in values.iter().enumerate() {
                    match value {
                        Value::Null => builder.append_null(),
                        Value::Date(v) => builder.append_value(date_to_days(*v)),
                        other => return Err(mismatch(row, other)),
                    }
                }
                Arc::new(builder.finish())
            }
        };
        Ok(Self::from_array(name, logical_type, array))
    }

    fn from_array(name: impl Into<String>, logical_type: LogicalType, values: ArrayRef) -> Self {
        debug_assert_eq!(values.data_type(), &logical_type.to_arrow());
        Self {
            name: name.into(),
            logical_type,
            values,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn logical_type(&self) -> LogicalType {
        self.logical_type
    }

    /// The backing Arrow array.
    pub fn values(&self) -> &ArrayRef {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn null_count(&self) -> usize {
        self.values.null_count()
    }

    pub fn is_null(&self, row: usize) -> bool {
        self.values.is_null(row)
    }

    /// Returns the cell at `row`. Panics if `row` is out of bounds.
    pub fn value(&self, row: usize) -> Value {
        if self.values.is_null(row) {
            return Value::Null;
        }
        let array = &self.values;
        match self.logical_type {
            LogicalType::Integer32 => Value::Int(array.as_primitive::<Int32Type>().value(row) as i64),
            LogicalType::Integer64 => Value::Int(array.as_primitive::<Int64Type>().value(row)),
            LogicalType::Float32 => {
                Value::Float(array.as_primitive::<Float32Type>().value(row) as f64)
            }
            LogicalType::Float64 => Value::Float(array.as_primitive::<Float64Type>().value(row)),
            LogicalType::Utf8Text => Value::Text(array.as_string::<i32>().value(row).to_string()),
            LogicalType::Boolean => Value::Boolean(array.as_boolean().value(row)),
            LogicalType::Date => days_to_date(array.as_primitive::<Date32Type>().value(row))
                .map_or(Value::Null, Value::Date),
        }
    }

    /// The same values under a different name.
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            logical_type: self.logical_type,
            values: Arc::clone(&self.values),
        }
    }

    pub(crate) fn take(&self, indices: &UInt32Array) -> Result<Self> {
        let values = arrow::compute::take(self.values.as_ref(), indices, None)?;
        Ok(Self::from_array(self.name.clone(), self.logical_type, values))
    }

    pub(crate) fn filter(&self, mask: &BooleanArray) -> Result<Self> {
        let values = arrow::compute::filter(self.values.as_ref(), mask)?;
        Ok(Self::from_array(self.name.clone(), self.logical_type, values))
    }
}

/// An immutable columnar dataset.
#[derive(Debug, Clone, Default)]
pub struct Table {
    columns: Vec<Column>,
    row_count: usize,
}

impl Table {
    /// Creates a table, checking that all columns have the same length and
    /// that column names are unique.
    pub fn try_new(columns: Vec<Column>) -> Result<Self> {
        let row_count = columns.first().map_or(0, Column::len);
        Self::with_row_count(columns, row_count)
    }

    fn with_row_count(columns: Vec<Column>, row_count: usize) -> Result<Self> {
        let mut seen = HashSet::new();
        for column in &columns {
            if column.len() != row_count {
                return Err(EtlError::InvalidTable(format!(
                    "column '{}' has {} rows, expected {row_count}",
                    column.name(),
                    column.len()
                )));
            }
            if !seen.insert(column.name()) {
                return Err(EtlError::InvalidTable(format!(
                    "duplicate column name '{}'",
                    column.name()
                )));
            }
        }
        Ok(Self { columns, row_count })
    }

    pub fn builder() -> TableBuilder {
        TableBuilder::default()
    }

    /// Builds a table from row-oriented values laid out per `schema`.
    pub fn from_rows(schema: &TableSchema, rows: &[Vec<Value>]) -> Result<Self> {
        let mut columns = Vec::with_capacity(schema.len());
        for (idx, field) in schema.fields().iter().enumerate() {
            let mut values = Vec::with_capacity(rows.len());
            for (row_idx, row) in rows.iter().enumerate() {
                let value = row.get(idx).ok_or_else(|| {
                    EtlError::InvalidTable(format!(
                        "row {row_idx} has {} values, expected {}",
                        row.len(),
                        schema.len()
                    ))
                })?;
                values.push(value.clone());
            }
            columns.push(Column::from_values(
                field.name.clone(),
                field.logical_type,
                &values,
            )?);
        }
        Self::with_row_count(columns, rows.len())
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name() == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(Column::name).collect()
    }

    pub fn schema(&self) -> TableSchema {
        self.columns
            .iter()
            .map(|c| (c.name().to_string(), c.logical_type()))
            .collect()
    }

    /// Projects the named columns, in the order given.
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Result<Self> {
        let columns = names
            .iter()
            .map(|name| {
                self.column(name.as_ref())
                    .cloned()
                    .ok_or_else(|| EtlError::column_not_found(name.as_ref()))
            })
            .collect::<Result<Vec<_>>>()?;
        Self::with_row_count(columns, self.row_count)
    }

    /// Gathers the rows at `indices`, in order.
    pub fn take(&self, indices: &[usize]) -> Result<Self> {
        if let Some(bad) = indices.iter().find(|&&i| i >= self.row_count) {
            return Err(EtlError::InvalidTable(format!(
                "row index {bad} out of bounds for table with {} rows",
                self.row_count
            )));
        }
        let indices = UInt32Array::from_iter_values(indices.iter().map(|&i| i as u32));
        self.take_indices(&indices)
    }

    pub(crate) fn take_indices(&self, indices: &UInt32Array) -> Result<Self> {
        let columns = self
            .columns
            .iter()
            .map(|c| c.take(indices))
            .collect::<Result<Vec<_>>>()?;
        Self::with_row_count(columns, indices.len())
    }

    /// Keeps the rows where `mask` is true; null mask slots drop the row.
    pub fn filter(&self, mask: &BooleanArray) -> Result<Self> {
        if mask.len() != self.row_count {
            return Err(EtlError::InvalidTable(format!(
                "filter mask has {} entries, table has {} rows",
                mask.len(),
                self.row_count
            )));
        }
        let columns = self
            .columns
            .iter()
            .map(|c| c.filter(mask))
            .collect::<Result<Vec<_>>>()?;
        Self::with_row_count(columns, mask.true_count())
    }

    /// Returns row `row` as values in column order. Panics if out of bounds.
    pub fn row(&self, row: usize) -> Vec<Value> {
        self.columns.iter().map(|c| c.value(row)).collect()
    }

    pub fn rows(&self) -> impl Iterator<Item = Vec<Value>> + '_ {
        (0..self.row_count).map(move |row| self.row(row))
    }

    /// Converts the table into an Arrow record batch.
    pub fn to_record_batch(&self) -> Result<RecordBatch> {
        let fields: Vec<Field> = self
            .columns
            .iter()
            .map(|c| Field::new(c.name(), c.logical_type().to_arrow(), true))
            .collect();
        let arrays: Vec<ArrayRef> = self.columns.iter().map(|c| Arc::clone(c.values())).collect();
        let options = RecordBatchOptions::new().with_row_count(Some(self.row_count));
        Ok(RecordBatch::try_new_with_options(
            Arc::new(Schema::new(fields)),
            arrays,
            &options,
        )?)
    }
}

impl TryFrom<&RecordBatch> for Table {
    type Error = EtlError;

    fn try_from(batch: &RecordBatch) -> Result<Self> {
        let columns = batch
            .schema_ref()
            .fields()
            .iter()
            .zip(batch.columns())
            .map(|(field, array)| Column::try_new(field.name().clone(), Arc::clone(array)))
            .collect::<Result<Vec<_>>>()?;
        Self::with_row_count(columns, batch.num_rows())
    }
}

impl TryFrom<RecordBatch> for Table {
    type Error = EtlError;

    fn try_from(batch: RecordBatch) -> Result<Self> {
        Table::try_from(&batch)
    }
}

/// Serializes as a list of row objects keyed by column name.
impl Serialize for Table {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.row_count))?;
        for row in 0..self.row_count {
            seq.serialize_element(&RowRef { table: self, row })?;
        }
        seq.end()
    }
}

struct RowRef<'a> {
    table: &'a Table,
    row: usize,
}

impl Serialize for RowRef<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.table.num_columns()))?;
        for column in self.table.columns() {
            map.serialize_entry(column.name(), &column.value(self.row))?;
        }
        map.end()
    }
}

/// Incremental builder for [`Table`].
#[derive(Debug, Default)]
pub struct TableBuilder {
    columns: Vec<Column>,
}

impl TableBuilder {
    pub fn column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    pub fn build(self) -> Result<Table> {
        Table::try_new(self.columns)
    }
}
