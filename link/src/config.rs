//! Configuration file management
//!
//! # Configuration Format
//!
//! ```toml
//! [transport]
//! deflate = true              # gzip request bodies
//! connect_timeout_ms = 10000
//! read_timeout_ms = 50000     # 0 = no timeout
//! write_timeout_ms = 100000
//! concurrency = 5             # default for batch calls
//!
//! [[servers]]
//! host = "127.0.0.1"
//! port = 8123
//! database = "default"
//! username = "default"
//! password = ""
//! protocol = "http"           # http, https
//! timeout = 5.0
//! tags = ["ssd"]
//!
//! [[clusters]]
//! name = "main"
//!
//! [[clusters.servers]]
//! host = "node-1"
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use std::time::Duration;

use crate::client::{Client, DEFAULT_CONCURRENCY};
use crate::cluster::Cluster;
use crate::error::{LinkError, Result};
use crate::models::{Protocol, Server, ServerOptions};
use crate::server_provider::ServerProvider;
use crate::timeouts::{TransportOptions, TransportTimeouts};

/// Client configuration loaded from a TOML file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinkConfiguration {
    /// Transport-wide settings
    #[serde(default)]
    pub transport: Option<TransportConfig>,

    /// Standalone servers
    #[serde(default)]
    pub servers: Vec<ServerConfig>,

    /// Named clusters
    #[serde(default)]
    pub clusters: Vec<ClusterConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Gzip request bodies (default: true)
    #[serde(default = "default_deflate")]
    pub deflate: bool,

    /// Connection timeout in milliseconds (default: 10000)
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Per read request timeout in milliseconds (default: 50000)
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,

    /// Per write request timeout in milliseconds (default: 100000)
    #[serde(default = "default_write_timeout_ms")]
    pub write_timeout_ms: u64,

    /// Concurrency for batch calls that do not pass one (default: 5)
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub database: Option<String>,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    /// "http" or "https" (default: "http")
    #[serde(default = "default_protocol")]
    pub protocol: String,

    /// Connection timeout in seconds (default: 5.0)
    #[serde(default = "default_server_timeout")]
    pub timeout: f64,

    #[serde(default)]
    pub tags: BTreeSet<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterConfig {
    pub name: String,

    #[serde(default)]
    pub servers: Vec<ServerConfig>,
}

fn default_deflate() -> bool {
    true
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

fn default_read_timeout_ms() -> u64 {
    50_000
}

fn default_write_timeout_ms() -> u64 {
    100_000
}

fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

fn default_port() -> u16 {
    8123
}

fn default_protocol() -> String {
    "http".to_string()
}

fn default_server_timeout() -> f64 {
    5.0
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            deflate: default_deflate(),
            connect_timeout_ms: default_connect_timeout_ms(),
            read_timeout_ms: default_read_timeout_ms(),
            write_timeout_ms: default_write_timeout_ms(),
            concurrency: default_concurrency(),
        }
    }
}

impl ServerConfig {
    /// Build the server value; a missing database falls back to `default`.
    pub fn to_server(&self) -> Result<Server> {
        let protocol: Protocol = self.protocol.parse()?;
        let mut server = Server::new(self.host.clone())
            .with_port(self.port)
            .with_username(self.username.clone())
            .with_password(self.password.clone())
            .with_options(
                ServerOptions::new()
                    .with_protocol(protocol)
                    .with_timeout(self.timeout)
                    .with_tags(self.tags.iter().cloned()),
            );
        if self.database.is_some() {
            server = server.with_database(self.database.clone());
        }
        Ok(server)
    }
}

impl LinkConfiguration {
    /// Load configuration from file
    ///
    /// Returns default configuration if file doesn't exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path).map_err(|e| {
            LinkError::Configuration(format!("Failed to read config file: {}", e))
        })?;

        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| LinkError::Configuration(format!("Failed to serialize: {}", e)))?;

        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn resolved_transport(&self) -> TransportConfig {
        self.transport.clone().unwrap_or_default()
    }

    /// Build TransportOptions from the `[transport]` table
    pub fn to_transport_options(&self) -> TransportOptions {
        let transport = self.resolved_transport();
        let timeouts = TransportTimeouts::builder()
            .connect_timeout(Duration::from_millis(transport.connect_timeout_ms))
            .read_timeout(Duration::from_millis(transport.read_timeout_ms))
            .write_timeout(Duration::from_millis(transport.write_timeout_ms))
            .build();

        TransportOptions::new()
            .with_deflate(transport.deflate)
            .with_timeouts(timeouts)
    }

    /// Register every configured server and cluster
    pub fn to_server_provider(&self) -> Result<ServerProvider> {
        let mut provider = ServerProvider::new();
        for server in &self.servers {
            provider.add_server(server.to_server()?)?;
        }
        for cluster in &self.clusters {
            let servers = cluster
                .servers
                .iter()
                .map(ServerConfig::to_server)
                .collect::<Result<Vec<_>>>()?;
            provider.add_cluster(Cluster::new(cluster.name.clone(), servers)?)?;
        }
        Ok(provider)
    }

    /// Client over HTTP configured from this file
    pub fn build_client(&self) -> Result<Client> {
        Client::builder()
            .server_provider(self.to_server_provider()?)
            .transport_options(self.to_transport_options())
            .default_concurrency(self.resolved_transport().concurrency)
            .build()
    }
}
