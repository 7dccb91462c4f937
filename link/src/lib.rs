//! # clickhouse-link
//!
//! Async client for ClickHouse's HTTP interface.
//!
//! Batches of queries are dispatched under a concurrency ceiling, results come
//! back in input order, and inline temporary tables can be attached to reads.
//! Response bodies are decoded from JSON, JSONCompact, CSV or TSV into a
//! uniform [`QueryResult`] with execution statistics.
//!
//! ## Example
//!
//! ```rust,no_run
//! use clickhouse_link::{Client, Format, Server, ServerProvider, TableStructure, TempTable};
//! use std::sync::Arc;
//!
//! # async fn example() -> clickhouse_link::Result<()> {
//! let mut provider = ServerProvider::new();
//! provider.add_server(Server::new("127.0.0.1").with_credentials("default", ""))?;
//! let client = Client::builder().server_provider(provider).build()?;
//!
//! // Batch of reads, at most two in flight
//! let queries = vec![
//!     client.query("SELECT number FROM system.numbers LIMIT 10")?.build(),
//!     client.query("SELECT 1")?.format(Format::Tsv).build(),
//! ];
//! let results = client.read(&queries, Some(2)).await?;
//! println!("rows read: {}", results[0].statistic().rows());
//!
//! // Read with an inline lookup table
//! let ids = TempTable::new(
//!     "ids",
//!     Arc::new(clickhouse_link::StringSource::new("1\n2\n3\n")),
//!     TableStructure::positional(["UInt64"]),
//! );
//! let result = client
//!     .read_one("SELECT * FROM events WHERE id IN ids", vec![ids], Vec::<(String, String)>::new())
//!     .await?;
//! for row in &result {
//!     println!("{:?}", row);
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod cluster;
pub mod compression;
pub mod config;
pub mod error;
pub mod mapper;
pub mod models;
pub mod server_provider;
pub mod source;
pub mod streams;
pub mod timeouts;
pub mod transport;

pub use client::{Client, ClientBuilder, DEFAULT_CONCURRENCY};
pub use cluster::Cluster;
pub use config::LinkConfiguration;
pub use error::{LinkError, Result};
pub use mapper::{Bindings, NamedMapper, QueryMapper, UnnamedMapper};
pub use models::{
    Attachment, ColumnMeta, Format, Meta, Protocol, Query, QueryBuilder, QueryResult,
    QueryStatistic, Row, Server, ServerOptions, TableStructure, TempTable,
};
pub use server_provider::ServerProvider;
pub use source::{AttachedSource, CsvRowsSource, FileSource, MergedFiles, SourceReader, StringSource};
pub use streams::StreamRegistry;
pub use timeouts::{TransportOptions, TransportTimeouts};
pub use transport::{HttpSender, HttpTransport, ReqwestSender, Transport};
