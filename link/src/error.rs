//! Error types for clickhouse-link.
//!
//! Transport failures are sorted into a small closed set of kinds
//! ([`LinkError::Connection`], [`LinkError::ServerReturned`],
//! [`LinkError::MalformedResponse`], [`LinkError::UnsupportedFormat`]).
//! Anything else raised by the underlying I/O layer passes through unchanged
//! as [`LinkError::Http`] or [`LinkError::Io`].

use thiserror::Error;

/// Errors that can occur while building, dispatching or decoding queries.
#[derive(Error, Debug)]
pub enum LinkError {
    /// No response was received at all (DNS failure, refused, timed out).
    #[error("Can't connect to the server [{host}:{port}] with error: [{message}]")]
    Connection {
        host: String,
        port: u16,
        message: String,
    },

    /// A response was received but the server reported a failure.
    #[error("Host [{host}] returned error: {body}. Query: {sql}")]
    ServerReturned {
        host: String,
        status: u16,
        body: String,
        sql: String,
    },

    /// A successful-looking response could not be decoded under its format.
    #[error("Malformed response from server: {body}")]
    MalformedResponse { body: String, reason: String },

    /// The requested output format is not one the assembler can decode.
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// The query cannot be turned into a wire request.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Query mapper error: {0}")]
    QueryMapper(String),

    #[error("Server provider error: {0}")]
    ServerProvider(String),

    #[error("Cluster error: {0}")]
    Cluster(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Failed to parse configuration: {0}")]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl LinkError {
    pub(crate) fn malformed(body: impl Into<String>, reason: impl ToString) -> Self {
        Self::MalformedResponse {
            body: body.into(),
            reason: reason.to_string(),
        }
    }
}

/// Result type for clickhouse-link operations
pub type Result<T> = std::result::Result<T, LinkError>;
