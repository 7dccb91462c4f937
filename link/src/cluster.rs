//! Named groups of servers.

use rand::seq::IteratorRandom;
use std::collections::{BTreeMap, BTreeSet};

use crate::error::{LinkError, Result};
use crate::models::Server;

/// A named set of servers, unique by hostname and indexed by tag.
///
/// # Example
///
/// ```rust
/// use clickhouse_link::{Cluster, Server, ServerOptions};
///
/// let cluster = Cluster::new(
///     "analytics",
///     [
///         Server::new("node-1"),
///         Server::new("node-2").with_options(ServerOptions::new().with_tag("ssd")),
///     ],
/// )
/// .unwrap();
/// assert_eq!(cluster.random_server_with_tag("ssd").unwrap().host, "node-2");
/// ```
#[derive(Debug, Clone)]
pub struct Cluster {
    name: String,
    servers: BTreeMap<String, Server>,
    servers_by_tag: BTreeMap<String, BTreeSet<String>>,
}

impl Cluster {
    pub fn new<I>(name: impl Into<String>, servers: I) -> Result<Self>
    where
        I: IntoIterator<Item = Server>,
    {
        let mut cluster = Self {
            name: name.into(),
            servers: BTreeMap::new(),
            servers_by_tag: BTreeMap::new(),
        };
        for server in servers {
            cluster.add_server(server)?;
        }
        Ok(cluster)
    }

    /// Register `server` under its own host name.
    pub fn add_server(&mut self, server: Server) -> Result<()> {
        let hostname = server.host.clone();
        self.add_server_as(hostname, server)
    }

    /// Register `server` under an explicit host name.
    pub fn add_server_as(&mut self, hostname: impl Into<String>, server: Server) -> Result<()> {
        let hostname = hostname.into();
        if self.servers.contains_key(&hostname) {
            return Err(LinkError::Cluster(format!(
                "Hostname [{}] already provided",
                hostname
            )));
        }
        for tag in server.tags() {
            self.servers_by_tag
                .entry(tag.clone())
                .or_default()
                .insert(hostname.clone());
        }
        self.servers.insert(hostname, server);
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn servers(&self) -> impl Iterator<Item = &Server> {
        self.servers.values()
    }

    pub fn len(&self) -> usize {
        self.servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }

    pub fn server(&self, hostname: &str) -> Result<&Server> {
        self.servers.get(hostname).ok_or_else(|| {
            LinkError::Cluster(format!(
                "Server with hostname [{}] is not found in cluster",
                hostname
            ))
        })
    }

    /// Host names of the servers carrying `tag`.
    pub fn hostnames_with_tag(&self, tag: &str) -> Result<&BTreeSet<String>> {
        self.servers_by_tag.get(tag).ok_or_else(|| {
            LinkError::Cluster(format!("There are no servers with tag [{}] in cluster", tag))
        })
    }

    pub fn random_server(&self) -> Result<&Server> {
        self.servers
            .values()
            .choose(&mut rand::rng())
            .ok_or_else(|| LinkError::Cluster(format!("Cluster [{}] has no servers", self.name)))
    }

    pub fn random_server_with_tag(&self, tag: &str) -> Result<&Server> {
        let hostnames = self.hostnames_with_tag(tag)?;
        match hostnames.iter().choose(&mut rand::rng()) {
            Some(hostname) => self.server(hostname),
            None => Err(LinkError::Cluster(format!(
                "There are no servers with tag [{}] in cluster",
                tag
            ))),
        }
    }
}
