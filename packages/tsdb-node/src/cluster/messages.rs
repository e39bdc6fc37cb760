//! Gossip wire messages exchanged between peers.
//!
//! Node meta is the JSON payload `{"http_addr": "host:port"}` spec §6
//! describes; everything else here is this crate's own envelope around it,
//! carried over the same internal HTTP transport the writer and reader use
//! for fan-out rather than a separate UDP gossip port.

use serde::{Deserialize, Serialize};
use tsdb_core::{MembersSnapshot, Node};

/// JSON node-meta payload advertised during join.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeMeta {
    pub http_addr: String,
}

/// One gossip protocol message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GossipMessage {
    /// Sent by a joining node to any known peer (or a configured seed).
    Join { node: Node },
    /// Reply to `Join`: the full membership view as the receiver sees it.
    JoinAck { view: MembersSnapshot },
    /// Sent by a node announcing it is leaving voluntarily.
    Leave { node_name: String },
    /// Periodic liveness probe between peers.
    Heartbeat { sender: String, timestamp_ms: i64, view_version: u64 },
    /// Pushes a newer membership view to a peer observed to be behind.
    MembersUpdate { view: MembersSnapshot, version: u64 },
}
