//! Data models for clickhouse-link.
//!
//! Defines the query, server and result structures shared by the transport
//! and the client facade.

pub mod format;
pub mod meta;
pub mod query;
pub mod query_result;
pub mod query_statistic;
pub mod server;
pub mod temp_table;

#[cfg(test)]
mod tests;

pub use format::Format;
pub use meta::{ColumnMeta, Meta};
pub use query::{Attachment, Query, QueryBuilder};
pub use query_result::{QueryResult, Row};
pub use query_statistic::QueryStatistic;
pub use server::{Protocol, Server, ServerOptions};
pub use temp_table::{TableStructure, TempTable};
