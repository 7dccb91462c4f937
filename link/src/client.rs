//! ClickHouse client with builder pattern.
//!
//! Resolves the target server through a [`ServerProvider`], wraps SQL text
//! into [`Query`] values and hands batches to a [`Transport`].

use log::debug;
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;

use crate::{
    error::{LinkError, Result},
    models::{Query, QueryBuilder, QueryResult, Server, TempTable},
    server_provider::ServerProvider,
    source::{AttachedSource, FileSource},
    timeouts::TransportOptions,
    transport::{HttpTransport, Transport},
};

/// Concurrency used when a batch call does not specify one.
pub const DEFAULT_CONCURRENCY: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Selection {
    /// Pick a random server on first use, then keep it.
    Pinned(Option<String>),
    /// Pick a random server for every query.
    Random,
    /// Pick a random server carrying the tag for every query.
    Tag(String),
}

#[derive(Debug)]
struct SelectionState {
    selection: Selection,
    cluster: Option<String>,
}

/// Main ClickHouse client.
///
/// Use [`ClientBuilder`] to construct instances with custom configuration.
///
/// # Examples
///
/// ```rust,no_run
/// use clickhouse_link::{Client, Server, ServerProvider};
///
/// # async fn example() -> clickhouse_link::Result<()> {
/// let mut provider = ServerProvider::new();
/// provider.add_server(Server::new("127.0.0.1"))?;
///
/// let client = Client::builder().server_provider(provider).build()?;
/// let result = client.read_one("SELECT 1", Vec::new(), Vec::<(String, String)>::new()).await?;
/// println!("rows: {}", result.len());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    provider: Arc<ServerProvider>,
    transport: Arc<dyn Transport>,
    state: Arc<Mutex<SelectionState>>,
    default_concurrency: usize,
}

impl Client {
    /// Create a new builder for configuring the client
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    pub fn server_provider(&self) -> &ServerProvider {
        &self.provider
    }

    pub fn default_concurrency(&self) -> usize {
        self.default_concurrency
    }

    /// Route following queries to the server with this host name.
    pub fn using(&self, hostname: impl Into<String>) -> &Self {
        self.state.lock().selection = Selection::Pinned(Some(hostname.into()));
        self
    }

    /// Pick a random server for every query.
    pub fn using_random_server(&self) -> &Self {
        self.state.lock().selection = Selection::Random;
        self
    }

    /// Pick a random server with `tag` for every query.
    pub fn using_server_with_tag(&self, tag: impl Into<String>) -> &Self {
        self.state.lock().selection = Selection::Tag(tag.into());
        self
    }

    /// Restrict server selection to a cluster, or lift the restriction with
    /// `None`. Resets any previously chosen server.
    pub fn on_cluster(&self, cluster: Option<&str>) -> &Self {
        let mut state = self.state.lock();
        state.cluster = cluster.map(str::to_string);
        state.selection = Selection::Pinned(None);
        self
    }

    /// Resolve the server the next query goes to.
    pub fn server(&self) -> Result<Server> {
        let mut state = self.state.lock();
        let cluster = state.cluster.clone();
        let provider = &self.provider;

        let server = match (&state.selection, cluster.as_deref()) {
            (Selection::Pinned(Some(host)), Some(cluster)) => provider.server_from_cluster(cluster, host)?,
            (Selection::Pinned(Some(host)), None) => provider.server(host)?,
            (Selection::Pinned(None) | Selection::Random, Some(cluster)) => {
                provider.random_server_from_cluster(cluster)?
            }
            (Selection::Pinned(None) | Selection::Random, None) => provider.random_server()?,
            (Selection::Tag(tag), Some(cluster)) => {
                provider.random_server_from_cluster_with_tag(cluster, tag)?
            }
            (Selection::Tag(tag), None) => provider.random_server_with_tag(tag)?,
        };

        if state.selection == Selection::Pinned(None) {
            debug!("[CH_CLIENT] Pinned server {}", server.host);
            state.selection = Selection::Pinned(Some(server.host.clone()));
        }
        Ok(server.clone())
    }

    /// Query builder targeting the currently selected server.
    pub fn query(&self, sql: impl Into<String>) -> Result<QueryBuilder> {
        Ok(Query::builder(self.server()?, sql))
    }

    /// Run one read query, optionally with temp tables.
    pub async fn read_one<I, K, V>(
        &self,
        sql: &str,
        temp_tables: Vec<TempTable>,
        settings: I,
    ) -> Result<QueryResult>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let query = temp_tables
            .into_iter()
            .fold(self.query(sql)?, QueryBuilder::temp_table)
            .settings(settings)
            .build();

        let mut results = self.transport.read(std::slice::from_ref(&query), 1).await?;
        results
            .pop()
            .ok_or_else(|| LinkError::InvalidQuery(format!("No result returned for query: {}", sql)))
    }

    /// Run read queries in parallel; results follow the order of `queries`.
    pub async fn read(&self, queries: &[Query], concurrency: Option<usize>) -> Result<Vec<QueryResult>> {
        let concurrency = concurrency.unwrap_or(self.default_concurrency);
        debug!(
            "[CH_CLIENT] Reading {} queries with concurrency {}",
            queries.len(),
            concurrency
        );
        self.transport.read(queries, concurrency).await
    }

    /// Run one write query, uploading each attached source in its own request.
    pub async fn write_one<I, K, V>(
        &self,
        sql: &str,
        sources: Vec<Arc<dyn AttachedSource>>,
        settings: I,
    ) -> Result<bool>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let query = sources
            .into_iter()
            .fold(self.query(sql)?, QueryBuilder::attach)
            .settings(settings)
            .build();

        let written = self.transport.write(std::slice::from_ref(&query), 1).await?;
        Ok(written.iter().flatten().all(|ok| *ok))
    }

    /// Run write queries one after another; see [`Transport::write`].
    pub async fn write(&self, queries: &[Query], concurrency: Option<usize>) -> Result<Vec<Vec<bool>>> {
        let concurrency = concurrency.unwrap_or(self.default_concurrency);
        debug!(
            "[CH_CLIENT] Writing {} queries with concurrency {}",
            queries.len(),
            concurrency
        );
        self.transport.write(queries, concurrency).await
    }

    /// Insert local files into `table`, one request per file.
    ///
    /// Builds `INSERT INTO <table> (<columns>) FORMAT <format>`; the column
    /// list is omitted when `columns` is empty.
    pub async fn write_files<I, P, S, K, V>(
        &self,
        table: &str,
        columns: &[&str],
        files: I,
        format: &str,
        settings: S,
        concurrency: Option<usize>,
    ) -> Result<Vec<bool>>
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
        S: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let sql = insert_sql(table, columns, format);
        let query = files
            .into_iter()
            .map(|path| Arc::new(FileSource::new(path)) as Arc<dyn AttachedSource>)
            .fold(self.query(sql)?, QueryBuilder::attach)
            .settings(settings)
            .build();

        let mut written = self
            .write(std::slice::from_ref(&query), concurrency)
            .await?;
        Ok(written.pop().unwrap_or_default())
    }
}

fn insert_sql(table: &str, columns: &[&str], format: &str) -> String {
    if columns.is_empty() {
        format!("INSERT INTO {} FORMAT {}", table, format)
    } else {
        format!("INSERT INTO {} ({}) FORMAT {}", table, columns.join(", "), format)
    }
}

/// Builder for configuring [`Client`] instances.
pub struct ClientBuilder {
    provider: Option<ServerProvider>,
    transport: Option<Arc<dyn Transport>>,
    options: TransportOptions,
    default_concurrency: usize,
}

impl ClientBuilder {
    fn new() -> Self {
        Self {
            provider: None,
            transport: None,
            options: TransportOptions::default(),
            default_concurrency: DEFAULT_CONCURRENCY,
        }
    }

    /// Set the registry servers are resolved from
    pub fn server_provider(mut self, provider: ServerProvider) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Use a custom transport instead of HTTP
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Options for the default HTTP transport; ignored with a custom transport
    pub fn transport_options(mut self, options: TransportOptions) -> Self {
        self.options = options;
        self
    }

    /// Concurrency for batch calls that do not pass one
    pub fn default_concurrency(mut self, concurrency: usize) -> Self {
        self.default_concurrency = concurrency.max(1);
        self
    }

    /// Build the client
    pub fn build(self) -> Result<Client> {
        let provider = self
            .provider
            .ok_or_else(|| LinkError::Configuration("server provider is required".into()))?;

        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(HttpTransport::new(self.options)?),
        };

        Ok(Client {
            provider: Arc::new(provider),
            transport,
            state: Arc::new(Mutex::new(SelectionState {
                selection: Selection::Pinned(None),
                cluster: None,
            })),
            default_concurrency: self.default_concurrency,
        })
    }
}
