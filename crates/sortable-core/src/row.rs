//! Result rows.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{Error, TypeError};
use crate::value::{FromValue, Value};

/// Column names of a result set, shared by every row of that set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnInfo {
    names: Vec<String>,
    index: HashMap<String, usize>,
}

impl ColumnInfo {
    /// Build column info from names in select order.
    pub fn new(names: Vec<String>) -> Self {
        let index = names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();
        Self { names, index }
    }

    /// Column names in select order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Position of a column by name.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// A single result row.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<ColumnInfo>,
    values: Vec<Value>,
}

impl Row {
    /// Create a row. `values` must be in the same order as `columns`.
    pub fn new(columns: Arc<ColumnInfo>, values: Vec<Value>) -> Self {
        debug_assert_eq!(columns.len(), values.len());
        Self { columns, values }
    }

    /// Raw value by position.
    pub fn get(&self, idx: usize) -> Option<&Value> {
        self.values.get(idx)
    }

    /// Raw value by column name.
    pub fn get_by_name(&self, name: &str) -> Option<&Value> {
        self.columns.index_of(name).and_then(|i| self.values.get(i))
    }

    /// Typed value by position.
    pub fn get_as<T: FromValue>(&self, idx: usize) -> Result<T, Error> {
        let Some(value) = self.values.get(idx) else {
            return Err(Error::Type(TypeError {
                expected: std::any::type_name::<T>(),
                actual: format!("no column at index {idx}"),
                column: None,
            }));
        };
        T::from_value(value).map_err(|e| with_column(e, self.columns.names().get(idx)))
    }

    /// Typed value by column name.
    pub fn get_named<T: FromValue>(&self, name: &str) -> Result<T, Error> {
        let Some(value) = self.get_by_name(name) else {
            return Err(Error::Type(TypeError {
                expected: std::any::type_name::<T>(),
                actual: "missing column".to_string(),
                column: Some(name.to_string()),
            }));
        };
        T::from_value(value).map_err(|e| with_column(e, Some(&name.to_string())))
    }

    /// Column metadata.
    pub fn columns(&self) -> &ColumnInfo {
        &self.columns
    }

    /// All values in column order.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

fn with_column(err: Error, column: Option<&String>) -> Error {
    match err {
        Error::Type(mut e) => {
            e.column = column.cloned();
            Error::Type(e)
        }
        other => other,
    }
}
