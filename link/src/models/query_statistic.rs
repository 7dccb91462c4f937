use serde::{Deserialize, Serialize};

/// Execution statistics reported by the server for one query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryStatistic {
    rows: u64,
    bytes: u64,
    time: f64,
    rows_before_limit_at_least: Option<u64>,
}

impl QueryStatistic {
    pub fn new(rows: u64, bytes: u64, time: f64, rows_before_limit_at_least: Option<u64>) -> Self {
        Self {
            rows,
            bytes,
            time,
            rows_before_limit_at_least,
        }
    }

    /// Rows read by the server.
    pub fn rows(&self) -> u64 {
        self.rows
    }

    /// Bytes read by the server.
    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    /// Elapsed seconds; zero when the format does not report it.
    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn rows_before_limit_at_least(&self) -> Option<u64> {
        self.rows_before_limit_at_least
    }
}
