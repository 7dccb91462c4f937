use std::collections::BTreeMap;
use std::sync::Arc;

use super::format::Format;
use super::server::Server;
use super::temp_table::TempTable;
use crate::error::Result;
use crate::source::AttachedSource;

/// Data attached to a query.
#[derive(Debug, Clone)]
pub enum Attachment {
    /// Raw payload uploaded as the body of a write.
    Source(Arc<dyn AttachedSource>),
    /// Inline lookup table for a read.
    TempTable(TempTable),
}

impl Attachment {
    pub fn source(&self) -> &Arc<dyn AttachedSource> {
        match self {
            Attachment::Source(source) => source,
            Attachment::TempTable(table) => table.source(),
        }
    }

    pub fn as_temp_table(&self) -> Option<&TempTable> {
        match self {
            Attachment::TempTable(table) => Some(table),
            Attachment::Source(_) => None,
        }
    }
}

impl From<TempTable> for Attachment {
    fn from(table: TempTable) -> Self {
        Attachment::TempTable(table)
    }
}

impl From<Arc<dyn AttachedSource>> for Attachment {
    fn from(source: Arc<dyn AttachedSource>) -> Self {
        Attachment::Source(source)
    }
}

/// A logical unit of work: target server, SQL text, attached data, settings
/// and output format. Immutable once built.
///
/// # Example
///
/// ```rust
/// use clickhouse_link::{Format, Query, Server};
///
/// let query = Query::builder(Server::new("127.0.0.1"), "SELECT 1")
///     .setting("max_threads", "4")
///     .format(Format::JsonCompact)
///     .build();
/// assert_eq!(query.format(), Format::JsonCompact);
/// ```
#[derive(Debug, Clone)]
pub struct Query {
    server: Server,
    sql: String,
    attachments: Vec<Attachment>,
    settings: BTreeMap<String, String>,
    format: Format,
}

impl Query {
    /// Query without attachments or settings, read as JSON.
    pub fn new(server: Server, sql: impl Into<String>) -> Self {
        Self::builder(server, sql).build()
    }

    pub fn builder(server: Server, sql: impl Into<String>) -> QueryBuilder {
        QueryBuilder {
            query: Query {
                server,
                sql: sql.into(),
                attachments: Vec::new(),
                settings: BTreeMap::new(),
                format: Format::default(),
            },
        }
    }

    pub fn server(&self) -> &Server {
        &self.server
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    pub fn settings(&self) -> &BTreeMap<String, String> {
        &self.settings
    }

    pub fn format(&self) -> Format {
        self.format
    }
}

/// Builder for [`Query`].
pub struct QueryBuilder {
    query: Query,
}

impl QueryBuilder {
    /// Attach a raw data source (used as a write payload).
    pub fn attach(mut self, source: Arc<dyn AttachedSource>) -> Self {
        self.query.attachments.push(Attachment::Source(source));
        self
    }

    pub fn temp_table(mut self, table: TempTable) -> Self {
        self.query.attachments.push(Attachment::TempTable(table));
        self
    }

    pub fn attachments<I>(mut self, attachments: I) -> Self
    where
        I: IntoIterator<Item = Attachment>,
    {
        self.query.attachments.extend(attachments);
        self
    }

    pub fn setting(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.settings.insert(key.into(), value.into());
        self
    }

    pub fn settings<I, K, V>(mut self, settings: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.query
            .settings
            .extend(settings.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn format(mut self, format: Format) -> Self {
        self.query.format = format;
        self
    }

    /// Set the output format by name, rejecting formats the assembler cannot decode.
    pub fn format_name(self, name: &str) -> Result<Self> {
        let format = name.parse::<Format>()?;
        Ok(self.format(format))
    }

    pub fn build(self) -> Query {
        self.query
    }
}
