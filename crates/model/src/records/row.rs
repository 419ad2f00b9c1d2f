use crate::core::{
    data_type::{Column, DataType},
    value::{FieldValue, Value},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum SchemaError {
    #[error("{entity}: expected {expected} columns, got {actual}")]
    ColumnCount {
        entity: String,
        expected: usize,
        actual: usize,
    },

    #[error("{entity}: column {position} should be {expected}, found {found}")]
    UnexpectedColumn {
        entity: String,
        position: usize,
        expected: String,
        found: String,
    },

    #[error("{entity}.{column}: expected {expected}, found {found}")]
    TypeMismatch {
        entity: String,
        column: String,
        expected: DataType,
        found: DataType,
    },
}

/// One projected row: ordered `(column, value)` pairs for a single table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RowData {
    pub entity: String,
    pub field_values: Vec<FieldValue>,
}

impl RowData {
    pub fn new(entity: &str, field_values: Vec<FieldValue>) -> Self {
        RowData {
            entity: entity.to_string(),
            field_values,
        }
    }

    /// Zips a fixed column list with the same number of values. The array
    /// lengths make a missing or extra column a compile error.
    pub fn from_columns<const N: usize>(
        entity: &str,
        columns: &[Column; N],
        values: [Value; N],
    ) -> Self {
        let field_values = columns
            .iter()
            .zip(values)
            .map(|(col, value)| FieldValue::new(col.name, value))
            .collect();
        RowData::new(entity, field_values)
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.field_values
            .iter()
            .find(|f| f.name.eq_ignore_ascii_case(field))
    }

    pub fn get_value(&self, field: &str) -> Value {
        self.get(field)
            .map(|f| f.value.clone())
            .unwrap_or(Value::Null)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.field_values.iter().map(|f| f.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.field_values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.field_values.is_empty()
    }

    /// Checks the row carries exactly `columns`, in order, with compatible types.
    pub fn conforms_to(&self, columns: &[Column]) -> Result<(), SchemaError> {
        if self.field_values.len() != columns.len() {
            return Err(SchemaError::ColumnCount {
                entity: self.entity.clone(),
                expected: columns.len(),
                actual: self.field_values.len(),
            });
        }

        for (position, (field, column)) in self.field_values.iter().zip(columns).enumerate() {
            if field.name != column.name {
                return Err(SchemaError::UnexpectedColumn {
                    entity: self.entity.clone(),
                    position,
                    expected: column.name.to_string(),
                    found: field.name.clone(),
                });
            }

            if !column.data_type.accepts(field.data_type()) {
                return Err(SchemaError::TypeMismatch {
                    entity: self.entity.clone(),
                    column: column.name.to_string(),
                    expected: column.data_type,
                    found: field.data_type(),
                });
            }
        }

        Ok(())
    }

    /// JSON object keyed by column name, as sent over the wire.
    pub fn to_json(&self) -> serde_json::Value {
        let map = self
            .field_values
            .iter()
            .map(|f| (f.name.clone(), f.value.to_json()))
            .collect::<serde_json::Map<_, _>>();
        serde_json::Value::Object(map)
    }

    pub fn size_bytes(&self) -> usize {
        self.field_values
            .iter()
            .map(|f| f.name.len() + f.value.size_bytes())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COLUMNS: [Column; 2] = [
        Column::new("ID", DataType::VarChar),
        Column::new("QTY", DataType::Int),
    ];

    #[test]
    fn from_columns_keeps_declared_order() {
        let row = RowData::from_columns("T", &COLUMNS, [Value::from("a"), Value::from(3)]);
        assert_eq!(row.column_names(), vec!["ID", "QTY"]);
        assert_eq!(row.get_value("qty"), Value::Int32(3));
        assert_eq!(row.get_value("missing"), Value::Null);
        assert!(row.conforms_to(&COLUMNS).is_ok());
    }

    #[test]
    fn conforms_to_rejects_wrong_type() {
        let row = RowData::from_columns("T", &COLUMNS, [Value::from("a"), Value::from("3")]);
        let err = row.conforms_to(&COLUMNS).unwrap_err();
        assert!(matches!(err, SchemaError::TypeMismatch { ref column, .. } if column == "QTY"));
    }

    #[test]
    fn conforms_to_rejects_missing_column() {
        let row = RowData::new("T", vec![FieldValue::new("ID", Value::from("a"))]);
        assert_eq!(
            row.conforms_to(&COLUMNS),
            Err(SchemaError::ColumnCount {
                entity: "T".into(),
                expected: 2,
                actual: 1,
            })
        );
    }

    #[test]
    fn null_is_accepted_for_any_column() {
        let row = RowData::from_columns("T", &COLUMNS, [Value::from("a"), Value::Null]);
        assert!(row.conforms_to(&COLUMNS).is_ok());
    }
}
