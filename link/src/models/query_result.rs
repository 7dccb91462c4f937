use serde_json::{Map, Value as JsonValue};

use super::meta::Meta;
use super::query::Query;
use super::query_statistic::QueryStatistic;

/// One result row, column name to value, in column order.
pub type Row = Map<String, JsonValue>;

/// Typed outcome of one read query: rows, column metadata and statistics.
///
/// Read-only: rows can be indexed and iterated but never modified.
#[derive(Debug, Clone)]
pub struct QueryResult {
    query: Query,
    rows: Vec<Row>,
    meta: Meta,
    statistic: QueryStatistic,
}

impl QueryResult {
    pub(crate) fn new(query: Query, rows: Vec<Row>, meta: Meta, statistic: QueryStatistic) -> Self {
        Self {
            query,
            rows,
            meta,
            statistic,
        }
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn meta(&self) -> &Meta {
        &self.meta
    }

    pub fn statistic(&self) -> &QueryStatistic {
        &self.statistic
    }

    pub fn get(&self, index: usize) -> Option<&Row> {
        self.rows.get(index)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Row> {
        self.rows.iter()
    }

    /// Take ownership of the rows, dropping the rest.
    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }
}

impl std::ops::Index<usize> for QueryResult {
    type Output = Row;

    fn index(&self, index: usize) -> &Row {
        &self.rows[index]
    }
}

impl<'a> IntoIterator for &'a QueryResult {
    type Item = &'a Row;
    type IntoIter = std::slice::Iter<'a, Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}
