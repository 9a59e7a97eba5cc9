//! Ordered column-name to logical-type mapping.

use super::types::LogicalType;
use serde::{Deserialize, Serialize};

/// A named, typed column slot in a [`TableSchema`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaField {
    pub name: String,
    #[serde(rename = "type")]
    pub logical_type: LogicalType,
}

/// The ordered schema of a table.
///
/// Serializes as a JSON list of `{"name": ..., "type": ...}` objects so
/// expected schemas can live in pipeline configuration.
///
/// # Examples
///
/// ```rust
/// use etl_guard::table::{LogicalType, TableSchema};
///
/// let schema = TableSchema::new()
///     .with_field("id", LogicalType::Integer64)
///     .with_field("email", LogicalType::Utf8Text);
/// assert_eq!(schema.get("email"), Some(LogicalType::Utf8Text));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TableSchema {
    fields: Vec<SchemaField>,
}

impl TableSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a field, replacing the type of an existing field with the same name.
    pub fn with_field(mut self, name: impl Into<String>, logical_type: LogicalType) -> Self {
        let name = name.into();
        match self.fields.iter_mut().find(|f| f.name == name) {
            Some(field) => field.logical_type = logical_type,
            None => self.fields.push(SchemaField { name, logical_type }),
        }
        self
    }

    pub fn fields(&self) -> &[SchemaField] {
        &self.fields
    }

    pub fn get(&self, name: &str) -> Option<LogicalType> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.logical_type)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, LogicalType)> for TableSchema {
    fn from_iter<I: IntoIterator<Item = (S, LogicalType)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(TableSchema::new(), |schema, (name, ty)| {
                schema.with_field(name, ty)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_is_preserved() {
        let schema: TableSchema = [
            ("b", LogicalType::Integer64),
            ("a", LogicalType::Utf8Text),
            ("b", LogicalType::Float64),
        ]
        .into_iter()
        .collect();
        assert_eq!(schema.names().collect::<Vec<_>>(), vec!["b", "a"]);
        assert_eq!(schema.get("b"), Some(LogicalType::Float64));
    }

    #[test]
    fn test_json_shape() {
        let schema: TableSchema =
            serde_json::from_str(r#"[{"name": "id", "type": "Integer64"}]"#).unwrap();
        assert_eq!(schema.get("id"), Some(LogicalType::Integer64));
        assert_eq!(
            serde_json::to_string(&schema).unwrap(),
            r#"[{"name":"id","type":"Integer64"}]"#
        );
    }
}
