//! Ordered, named-column table of per-source parameters.
//!
//! A [`SourceTable`] holds one row per source and one numeric column per
//! parameter. Columns keep their insertion order, which is what makes seeded
//! table generation reproducible column-by-column. The row count is fixed at
//! creation; columns may be added or overwritten but never resized.

use indexmap::IndexMap;
use thiserror::Error;

/// Errors from source-table operations.
#[derive(Error, Debug)]
pub enum TableError {
    /// A column's length does not match the table's row count.
    #[error("column '{column}' has {actual} values, but the table has {expected} rows")]
    LengthMismatch {
        /// Name of the offending column.
        column: String,
        /// The table's fixed row count.
        expected: usize,
        /// Number of values supplied.
        actual: usize,
    },
}

/// An ordered collection of named numeric columns, one row per source.
///
/// Cloning a table deep-copies all columns, so derived columns (e.g. an
/// `amplitude` computed from `flux`) can be added to a copy without mutating
/// the caller's original.
#[derive(Debug, Clone, Default)]
pub struct SourceTable {
    n_rows: usize,
    columns: IndexMap<String, Vec<f64>>,
}

impl SourceTable {
    /// Create an empty table with a fixed number of rows and no columns.
    pub fn new(n_rows: usize) -> Self {
        Self {
            n_rows,
            columns: IndexMap::new(),
        }
    }

    /// Number of rows (sources). Fixed at creation.
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    /// Number of columns.
    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    /// Add or overwrite a column.
    ///
    /// The value vector must have exactly [`n_rows`](Self::n_rows) entries.
    /// Overwriting keeps the column's original position in iteration order;
    /// a new column is appended at the end.
    pub fn set_column(&mut self, name: &str, values: Vec<f64>) -> Result<(), TableError> {
        if values.len() != self.n_rows {
            return Err(TableError::LengthMismatch {
                column: name.to_string(),
                expected: self.n_rows,
                actual: values.len(),
            });
        }
        self.columns.insert(name.to_string(), values);
        Ok(())
    }

    /// Look up a column by name.
    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns.get(name).map(Vec::as_slice)
    }

    /// Whether a column with this name exists.
    pub fn contains_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// Column names in insertion order.
    pub fn colnames(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    /// Scalar value at `(column, row)`, if the column exists and the row is
    /// in range.
    pub fn value(&self, name: &str, row: usize) -> Option<f64> {
        self.columns.get(name).and_then(|col| col.get(row)).copied()
    }

    /// Iterate over rows, yielding per-row scalar access by column name.
    pub fn rows(&self) -> Rows<'_> {
        Rows {
            table: self,
            index: 0,
        }
    }
}

/// A borrowed view of a single table row.
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    table: &'a SourceTable,
    index: usize,
}

impl<'a> Row<'a> {
    /// Value of the named column in this row, if the column exists.
    pub fn get(&self, name: &str) -> Option<f64> {
        self.table.value(name, self.index)
    }

    /// Zero-based row index.
    pub fn index(&self) -> usize {
        self.index
    }
}

/// Iterator over the rows of a [`SourceTable`].
#[derive(Debug)]
pub struct Rows<'a> {
    table: &'a SourceTable,
    index: usize,
}

impl<'a> Iterator for Rows<'a> {
    type Item = Row<'a>;

    fn next(&mut self) -> Option<Row<'a>> {
        if self.index >= self.table.n_rows {
            return None;
        }
        let row = Row {
            table: self.table,
            index: self.index,
        };
        self.index += 1;
        Some(row)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.table.n_rows - self.index;
        (remaining, Some(remaining))
    }
}
