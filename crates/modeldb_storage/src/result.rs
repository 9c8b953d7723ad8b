//! Query result maps.

use crate::value::SqlValue;

/// The result of a query: each column name mapped to its values in row order.
///
/// Columns keep the order of the `SELECT` list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    columns: Vec<(String, Vec<SqlValue>)>,
    rows: usize,
}

impl QueryResult {
    pub(crate) fn with_columns(names: Vec<String>) -> Self {
        Self {
            columns: names.into_iter().map(|n| (n, Vec::new())).collect(),
            rows: 0,
        }
    }

    pub(crate) fn push_row(&mut self, row: Vec<SqlValue>) {
        for ((_, values), value) in self.columns.iter_mut().zip(row) {
            values.push(value);
        }
        self.rows += 1;
    }

    /// Column names, in select order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    /// Values of the named column.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&[SqlValue]> {
        self.columns
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, values)| values.as_slice())
    }

    /// Takes ownership of the named column's values.
    #[must_use]
    pub fn into_column(self, name: &str) -> Option<Vec<SqlValue>> {
        self.columns
            .into_iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, values)| values)
    }

    /// Iterates `(name, values)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[SqlValue])> {
        self.columns
            .iter()
            .map(|(name, values)| (name.as_str(), values.as_slice()))
    }

    /// Number of rows returned.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows
    }

    /// Returns true if no rows were returned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }
}
