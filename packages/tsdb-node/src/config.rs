//! CLI surface for the `tsdb-node` binary.
//!
//! Every flag also reads from an environment variable of the same name
//! (`TSDB_NODE_*`), so a container deployment can configure a node without
//! a command line at all.

use std::time::Duration;

use clap::{Parser, ValueEnum};

use crate::cluster::ClusterConfig;
use crate::network::NetworkConfig;

/// Log verbosity. `panic` and `fatal` both map to `tracing::Level::ERROR`;
/// `tracing` has no level below `error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Panic,
    Fatal,
}

impl LogLevel {
    #[must_use]
    pub fn as_filter(&self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Panic | Self::Fatal => "error",
        }
    }
}

/// Parsed command-line configuration for a single cluster node.
#[derive(Debug, Parser)]
#[command(name = "tsdb-node", version, about = "Clustered time-series ingestion/query node")]
pub struct NodeConfig {
    /// Directory the local storage engine persists blocks to.
    #[arg(long, env = "TSDB_NODE_DATA_DIRECTORY", default_value = "./data")]
    pub data_directory: String,

    /// Address the HTTP listener binds to.
    #[arg(long, env = "TSDB_NODE_HTTP_BIND_ADDR", default_value = "0.0.0.0:8080")]
    pub http_bind_addr: String,

    /// Address advertised to peers for `/write` and `/read` fan-out.
    #[arg(long, env = "TSDB_NODE_HTTP_ADVERTISE_ADDR")]
    pub http_advertise_addr: Option<String>,

    /// Address the gossip layer binds to.
    #[arg(long, env = "TSDB_NODE_GOSSIP_BIND_ADDR", default_value = "0.0.0.0:7946")]
    pub gossip_bind_addr: String,

    /// Address advertised to peers for gossip.
    #[arg(long, env = "TSDB_NODE_GOSSIP_ADVERTISE_ADDR")]
    pub gossip_advertise_addr: Option<String>,

    /// Comma-separated seed peers to join at startup (`host:http_port`).
    #[arg(long, env = "TSDB_NODE_PEERS", value_delimiter = ',')]
    pub peers: Vec<String>,

    /// Number of replicas each sample is written to.
    #[arg(long, env = "TSDB_NODE_REPLICATION_FACTOR", default_value_t = 3)]
    pub replication_factor: usize,

    #[arg(long, env = "TSDB_NODE_LOG_LEVEL", value_enum, default_value = "info")]
    pub log_level: LogLevel,
}

impl NodeConfig {
    /// This node's own advertised HTTP address, falling back to the bind
    /// address when no separate advertise address was given.
    #[must_use]
    pub fn advertised_http_addr(&self) -> String {
        self.http_advertise_addr.clone().unwrap_or_else(|| self.http_bind_addr.clone())
    }

    #[must_use]
    pub fn advertised_gossip_addr(&self) -> String {
        self.gossip_advertise_addr.clone().unwrap_or_else(|| self.gossip_bind_addr.clone())
    }

    #[must_use]
    pub fn network_config(&self) -> NetworkConfig {
        let (host, port) = split_bind_addr(&self.http_bind_addr);
        NetworkConfig {
            host,
            port,
            advertise_addr: self.advertised_http_addr(),
            ..NetworkConfig::default()
        }
    }

    #[must_use]
    pub fn cluster_config(&self) -> ClusterConfig {
        ClusterConfig { replication_factor: self.replication_factor, ..ClusterConfig::default() }
    }
}

fn split_bind_addr(addr: &str) -> (String, u16) {
    match addr.rsplit_once(':') {
        Some((host, port)) => (host.to_string(), port.parse().unwrap_or(0)),
        None => (addr.to_string(), 0),
    }
}

/// Polling interval for the membership liveness sweep, independent of the
/// heartbeat interval advertised in `ClusterConfig`.
#[must_use]
pub fn tick_interval() -> Duration {
    Duration::from_secs(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn defaults_parse_with_no_args() {
        let config = NodeConfig::parse_from(["tsdb-node"]);
        assert_eq!(config.http_bind_addr, "0.0.0.0:8080");
        assert_eq!(config.gossip_bind_addr, "0.0.0.0:7946");
        assert!(config.peers.is_empty());
        assert_eq!(config.replication_factor, 3);
        assert_eq!(config.log_level, LogLevel::Info);
    }

    #[test]
    fn peers_split_on_comma() {
        let config = NodeConfig::parse_from(["tsdb-node", "--peers", "a:8080,b:8080"]);
        assert_eq!(config.peers, vec!["a:8080".to_string(), "b:8080".to_string()]);
    }

    #[test]
    fn advertise_falls_back_to_bind_addr() {
        let config = NodeConfig::parse_from(["tsdb-node", "--http-bind-addr", "10.0.0.1:9090"]);
        assert_eq!(config.advertised_http_addr(), "10.0.0.1:9090");
    }

    #[test]
    fn explicit_advertise_addr_wins() {
        let config = NodeConfig::parse_from([
            "tsdb-node",
            "--http-bind-addr",
            "0.0.0.0:9090",
            "--http-advertise-addr",
            "10.0.0.1:9090",
        ]);
        assert_eq!(config.advertised_http_addr(), "10.0.0.1:9090");
    }

    #[test]
    fn log_level_filters() {
        assert_eq!(LogLevel::Debug.as_filter(), "debug");
        assert_eq!(LogLevel::Panic.as_filter(), "error");
        assert_eq!(LogLevel::Fatal.as_filter(), "error");
    }

    #[test]
    fn split_bind_addr_parses_host_and_port() {
        let (host, port) = split_bind_addr("0.0.0.0:8080");
        assert_eq!(host, "0.0.0.0");
        assert_eq!(port, 8080);
    }
}
