//! Cluster-level configuration.
//!
//! Node identity and membership snapshots live in `tsdb_core` ([`tsdb_core::Node`],
//! [`tsdb_core::NodeState`], [`tsdb_core::MembersSnapshot`]) since the replica
//! selector in the core crate operates on them directly. This module holds
//! only the tunables for the gossip/failure-detection layer built on top.

use std::time::Duration;

/// Tunables for gossip membership and phi-accrual failure detection.
#[derive(Debug, Clone)]
pub struct ClusterConfig {
    /// Interval between outbound heartbeats to each peer.
    pub heartbeat_interval: Duration,
    /// Phi value at which a node is considered dead.
    pub phi_threshold: f64,
    /// Maximum number of heartbeat intervals retained per peer.
    pub max_sample_size: usize,
    /// Floor for standard deviation in the phi calculation (ms).
    pub min_std_dev_ms: u64,
    /// Maximum time without a heartbeat before a node is declared dead (ms).
    pub max_no_heartbeat_ms: u64,
    /// Replication factor: number of nodes each sample is written to.
    pub replication_factor: usize,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: Duration::from_millis(1000),
            phi_threshold: 8.0,
            max_sample_size: 200,
            min_std_dev_ms: 100,
            max_no_heartbeat_ms: 5000,
            replication_factor: 3,
        }
    }
}
