//! Cluster membership module.
//!
//! Provides gossip tunables, wire messages, shared lock-free state, failure
//! detection, and the membership service that drives join/heartbeat/leave
//! over the cluster's internal HTTP transport.

pub mod failure_detector;
pub mod membership;
pub mod messages;
pub mod state;
pub mod traits;
pub mod types;

// ---------------------------------------------------------------------------
// Re-exports — flat public API
// ---------------------------------------------------------------------------

pub use types::ClusterConfig;

pub use traits::FailureDetector;

pub use messages::{GossipMessage, NodeMeta};

pub use state::ClusterState;

pub use failure_detector::{DeadlineFailureDetector, PhiAccrualConfig, PhiAccrualFailureDetector};

pub use membership::Membership;

// ---------------------------------------------------------------------------
// Integration tests
// ---------------------------------------------------------------------------
