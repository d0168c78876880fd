use std::collections::HashMap;
use std::sync::Arc;

use crate::types::Value;

/// A single record (row) returned by a statement
///
/// Column names and the name-to-index cache are shared by every record of the
/// same [`StatementResult`](super::StatementResult).
#[derive(Debug, Clone)]
pub struct Record {
    /// The column names for this record (shared across the result)
    pub columns: Arc<Vec<String>>,
    /// The values for this record
    pub values: Vec<Value>,
    // Shared name -> index map so lookups avoid repeated string comparisons
    #[doc(hidden)]
    pub(crate) column_index_cache: Arc<HashMap<String, usize>>,
}

impl Record {
    /// Create a record, building its own column cache
    ///
    /// # Arguments
    ///
    /// * `columns` - The column names
    /// * `values` - The values for this record
    #[must_use]
    pub fn new(columns: Arc<Vec<String>>, values: Vec<Value>) -> Self {
        let cache = Arc::new(build_column_cache(&columns));
        Self {
            columns,
            values,
            column_index_cache: cache,
        }
    }

    /// Get the index of a column by name
    #[must_use]
    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.column_index_cache.get(column).copied()
    }

    /// Get a value by column name, or None if the column wasn't returned
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.column_index(column).and_then(|idx| self.values.get(idx))
    }

    /// Get a value by column index
    #[must_use]
    pub fn get_by_index(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

pub(crate) fn build_column_cache(columns: &[String]) -> HashMap<String, usize> {
    columns
        .iter()
        .enumerate()
        .map(|(i, name)| (name.clone(), i))
        .collect()
}
