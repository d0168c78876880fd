use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;

use super::record::{Record, build_column_cache};
use crate::statement::Statement;
use crate::types::Value;

/// Update counters reported for a statement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct UpdateStatistics {
    pub contains_updates: bool,
    pub nodes_created: u64,
    pub nodes_deleted: u64,
    pub relationships_created: u64,
    pub relationships_deleted: u64,
    pub properties_set: u64,
    pub labels_added: u64,
    pub labels_removed: u64,
    pub indexes_added: u64,
    pub indexes_removed: u64,
    pub constraints_added: u64,
    pub constraints_removed: u64,
}

/// The cursor produced by one statement: its columns, records and counters.
///
/// Statements that return nothing still produce a `StatementResult` (with no
/// records), so batch results line up one-to-one with the statements sent.
#[derive(Debug, Clone)]
pub struct StatementResult {
    statement: Statement,
    columns: Arc<Vec<String>>,
    column_index_cache: Arc<HashMap<String, usize>>,
    records: Vec<Record>,
    stats: UpdateStatistics,
}

impl StatementResult {
    /// Create an empty result for `statement` with the given columns
    #[must_use]
    pub fn new(statement: Statement, columns: Vec<String>) -> Self {
        let cache = Arc::new(build_column_cache(&columns));
        Self {
            statement,
            columns: Arc::new(columns),
            column_index_cache: cache,
            records: Vec::new(),
            stats: UpdateStatistics::default(),
        }
    }

    /// A result with no columns and no records
    #[must_use]
    pub fn empty(statement: Statement) -> Self {
        Self::new(statement, Vec::new())
    }

    /// Add a record; all records share this result's column list
    pub fn push_record(&mut self, values: Vec<Value>) {
        self.records.push(Record {
            columns: Arc::clone(&self.columns),
            values,
            column_index_cache: Arc::clone(&self.column_index_cache),
        });
    }

    pub fn set_stats(&mut self, stats: UpdateStatistics) {
        self.stats = stats;
    }

    #[must_use]
    pub fn statement(&self) -> &Statement {
        &self.statement
    }

    /// Tag of the statement that produced this result
    #[must_use]
    pub fn tag(&self) -> Option<&str> {
        self.statement.tag()
    }

    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    #[must_use]
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    #[must_use]
    pub fn first_record(&self) -> Option<&Record> {
        self.records.first()
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn stats(&self) -> UpdateStatistics {
        self.stats
    }
}
