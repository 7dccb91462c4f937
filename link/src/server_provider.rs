//! Registry of known servers and clusters.
//!
//! Resolves a logical target (a host name, "any server", "any server with
//! tag X", "any server in cluster Y") into a concrete [`Server`]. The
//! transport never performs this resolution; it receives resolved servers.

use rand::seq::IteratorRandom;
use std::collections::{BTreeMap, BTreeSet};

use crate::cluster::Cluster;
use crate::error::{LinkError, Result};
use crate::models::Server;

#[derive(Debug, Clone, Default)]
pub struct ServerProvider {
    servers: BTreeMap<String, Server>,
    servers_by_tag: BTreeMap<String, BTreeSet<String>>,
    clusters: BTreeMap<String, Cluster>,
}

impl ServerProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_server(&mut self, server: Server) -> Result<&mut Self> {
        if self.servers.contains_key(&server.host) {
            return Err(LinkError::ServerProvider(format!(
                "Server with hostname [{}] already provided",
                server.host
            )));
        }
        for tag in server.tags() {
            self.servers_by_tag
                .entry(tag.clone())
                .or_default()
                .insert(server.host.clone());
        }
        self.servers.insert(server.host.clone(), server);
        Ok(self)
    }

    pub fn add_cluster(&mut self, cluster: Cluster) -> Result<&mut Self> {
        if self.clusters.contains_key(cluster.name()) {
            return Err(LinkError::ServerProvider(format!(
                "Can not add cluster with name [{}], because it already added",
                cluster.name()
            )));
        }
        self.clusters.insert(cluster.name().to_string(), cluster);
        Ok(self)
    }

    pub fn servers(&self) -> impl Iterator<Item = &Server> {
        self.servers.values()
    }

    pub fn clusters(&self) -> impl Iterator<Item = &Cluster> {
        self.clusters.values()
    }

    pub fn server(&self, hostname: &str) -> Result<&Server> {
        self.servers.get(hostname).ok_or_else(|| {
            LinkError::ServerProvider(format!(
                "Can not find server with hostname [{}]",
                hostname
            ))
        })
    }

    pub fn cluster(&self, name: &str) -> Result<&Cluster> {
        self.clusters.get(name).ok_or_else(|| {
            LinkError::ServerProvider(format!("Can not find cluster with name [{}]", name))
        })
    }

    pub fn random_server(&self) -> Result<&Server> {
        self.servers
            .values()
            .choose(&mut rand::rng())
            .ok_or_else(|| LinkError::ServerProvider("No servers provided".to_string()))
    }

    pub fn random_server_with_tag(&self, tag: &str) -> Result<&Server> {
        let hostname = self
            .servers_by_tag
            .get(tag)
            .and_then(|hostnames| hostnames.iter().choose(&mut rand::rng()))
            .ok_or_else(|| {
                LinkError::ServerProvider(format!("There are no servers with tag [{}]", tag))
            })?;
        self.server(hostname)
    }

    pub fn random_server_from_cluster(&self, cluster: &str) -> Result<&Server> {
        self.cluster(cluster)?.random_server()
    }

    pub fn random_server_from_cluster_with_tag(&self, cluster: &str, tag: &str) -> Result<&Server> {
        self.cluster(cluster)?.random_server_with_tag(tag)
    }

    pub fn server_from_cluster(&self, cluster: &str, hostname: &str) -> Result<&Server> {
        self.cluster(cluster)?.server(hostname)
    }
}
