//! Shared, lock-free membership state.
//!
//! `ClusterState` is the single mutable node list in the process. Every
//! other component -- the writer, the reader, the gossip loop -- reads an
//! immutable [`MembersSnapshot`] out of it; none of them ever see a
//! half-updated view.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use tokio::sync::watch;
use tsdb_core::{MembersSnapshot, Node, NodeState};

use super::types::ClusterConfig;

/// Lock-free membership state shared across the process.
pub struct ClusterState {
    local_node_name: String,
    config: Arc<ClusterConfig>,
    view: ArcSwap<MembersSnapshot>,
    version: AtomicU64,
    change_tx: watch::Sender<u64>,
}

impl ClusterState {
    /// Creates cluster state with an empty view; the local node has not
    /// joined yet (`MembershipUninitialized` until the first join completes).
    #[must_use]
    pub fn new(config: Arc<ClusterConfig>, local_node_name: String) -> (Arc<Self>, watch::Receiver<u64>) {
        let (change_tx, change_rx) = watch::channel(0);
        let state = Arc::new(Self {
            local_node_name,
            config,
            view: ArcSwap::from_pointee(MembersSnapshot::default()),
            version: AtomicU64::new(0),
            change_tx,
        });
        (state, change_rx)
    }

    #[must_use]
    pub fn config(&self) -> &ClusterConfig {
        &self.config
    }

    #[must_use]
    pub fn local_node_name(&self) -> &str {
        &self.local_node_name
    }

    /// An immutable copy of the live node set, safe to hold for the duration
    /// of one request.
    #[must_use]
    pub fn current_view(&self) -> Arc<MembersSnapshot> {
        self.view.load_full()
    }

    #[must_use]
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    /// A request may proceed only once the local node has joined the
    /// cluster (has an entry in the view, in any state). Until then every
    /// handler must report `MembershipUninitialized`.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.current_view().get(&self.local_node_name).is_some()
    }

    #[must_use]
    pub fn local_node(&self) -> Option<Node> {
        self.current_view().get(&self.local_node_name).cloned()
    }

    /// Replaces the view wholesale and bumps the version, notifying anyone
    /// subscribed via `subscribe_changes`.
    pub fn replace_view(&self, view: MembersSnapshot) {
        self.view.store(Arc::new(view));
        let new_version = self.version.fetch_add(1, Ordering::AcqRel) + 1;
        let _ = self.change_tx.send(new_version);
    }

    /// Applies a `(name -> state)` transition in place, preserving every
    /// other member. Used by the gossip loop when a heartbeat or timeout
    /// changes one peer's liveness without a full view exchange.
    pub fn set_node_state(&self, name: &str, state: NodeState) {
        let mut nodes: Vec<Node> = self.current_view().all().to_vec();
        if let Some(node) = nodes.iter_mut().find(|n| n.name == name) {
            node.state = state;
            self.replace_view(MembersSnapshot::new(nodes));
        }
    }

    /// Merges a newly observed node into the view if it is not already
    /// present, or replaces it if present (e.g. rejoin with a fresh address).
    pub fn upsert_node(&self, node: Node) {
        let mut nodes: Vec<Node> = self.current_view().all().to_vec();
        if let Some(existing) = nodes.iter_mut().find(|n| n.name == node.name) {
            *existing = node;
        } else {
            nodes.push(node);
        }
        self.replace_view(MembersSnapshot::new(nodes));
    }

    /// Removes a node entirely -- the `Dead` terminal transition.
    pub fn remove_node(&self, name: &str) {
        let nodes: Vec<Node> = self
            .current_view()
            .all()
            .iter()
            .filter(|n| n.name != name)
            .cloned()
            .collect();
        self.replace_view(MembersSnapshot::new(nodes));
    }

    pub fn subscribe_changes(&self) -> watch::Receiver<u64> {
        self.change_tx.subscribe()
    }
}
