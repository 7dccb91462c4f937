use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::str::FromStr;

use crate::error::LinkError;

/// Scheme used to reach a server.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    #[default]
    Http,
    Https,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Http => "http",
            Protocol::Https => "https",
        }
    }
}

impl FromStr for Protocol {
    type Err = LinkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "http" => Ok(Protocol::Http),
            "https" => Ok(Protocol::Https),
            other => Err(LinkError::Configuration(format!("Unknown protocol: {}", other))),
        }
    }
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-server connection options.
///
/// # Example
///
/// ```rust
/// use clickhouse_link::{Protocol, ServerOptions};
///
/// let options = ServerOptions::new()
///     .with_protocol(Protocol::Https)
///     .with_timeout(2.5)
///     .with_tag("ssd");
/// assert!(options.tags.contains("ssd"));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerOptions {
    /// Default: http
    #[serde(default)]
    pub protocol: Protocol,

    /// Connection timeout in seconds. Default: 5.0
    #[serde(default = "default_timeout")]
    pub timeout: f64,

    /// Tags used by tag-based server selection.
    #[serde(default)]
    pub tags: BTreeSet<String>,
}

fn default_timeout() -> f64 {
    5.0
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            protocol: Protocol::default(),
            timeout: default_timeout(),
            tags: BTreeSet::new(),
        }
    }
}

impl ServerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_protocol(mut self, protocol: Protocol) -> Self {
        self.protocol = protocol;
        self
    }

    pub fn with_timeout(mut self, timeout: f64) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }
}

/// A resolved ClickHouse server.
///
/// Value-like: the transport reads it, never mutates it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Server {
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_database")]
    pub database: Option<String>,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    #[serde(default)]
    pub options: ServerOptions,
}

fn default_port() -> u16 {
    8123
}

fn default_database() -> Option<String> {
    Some("default".to_string())
}

impl Server {
    /// Server on the default HTTP port with the `default` database.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: default_port(),
            database: default_database(),
            username: None,
            password: None,
            options: ServerOptions::default(),
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_database(mut self, database: Option<String>) -> Self {
        self.database = database;
        self
    }

    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    pub fn with_username(mut self, username: Option<String>) -> Self {
        self.username = username;
        self
    }

    pub fn with_password(mut self, password: Option<String>) -> Self {
        self.password = password;
        self
    }

    pub fn with_options(mut self, options: ServerOptions) -> Self {
        self.options = options;
        self
    }

    pub fn protocol(&self) -> Protocol {
        self.options.protocol
    }

    pub fn tags(&self) -> &BTreeSet<String> {
        &self.options.tags
    }

    /// `protocol://host:port/`
    pub fn base_url(&self) -> String {
        format!("{}://{}:{}/", self.protocol(), self.host, self.port)
    }
}
