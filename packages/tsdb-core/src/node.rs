//! Cluster node identity and membership snapshots.
//!
//! A [`Node`]'s name is opaque to the ring: replica selection only cares
//! about the sorted order of names in a [`MembersSnapshot`], never their
//! content. Identity is never reused -- once a name leaves, a rejoin under
//! the same name is treated as a brand new node by the ring.

use serde::{Deserialize, Serialize};

/// Per-peer liveness state.
///
/// `Unknown` -> `Alive` on gossip announce; `Alive` <-> `Suspect` on missed
/// heartbeats; `Suspect` -> `Dead` on timeout. Only `Alive` nodes
/// participate in replica selection; `Suspect` nodes still appear in the
/// member list to preserve ring stability during a transient partition.
/// `Dead` nodes are removed from the list entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeState {
    Unknown,
    Alive,
    Suspect,
    Dead,
}

/// One cluster member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Stable, process-lifetime-unique name. Opaque to the ring.
    pub name: String,
    /// Address the gossip/failure-detection layer dials for this node.
    pub gossip_addr: String,
    /// Address clients and peers use for `/write` and `/read`.
    pub http_addr: String,
    pub state: NodeState,
}

impl Node {
    #[must_use]
    pub fn new(name: impl Into<String>, gossip_addr: impl Into<String>, http_addr: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            gossip_addr: gossip_addr.into(),
            http_addr: http_addr.into(),
            state: NodeState::Unknown,
        }
    }
}

/// An immutable, deterministically ordered snapshot of the live node set.
///
/// Ordering is by `name` so that every caller observing the same member set
/// derives the identical replica selection. Callers take a snapshot once per
/// request; the membership service owns the only mutable copy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MembersSnapshot {
    nodes: Vec<Node>,
}

impl MembersSnapshot {
    /// Builds a snapshot from an arbitrary, possibly-unsorted node list.
    #[must_use]
    pub fn new(mut nodes: Vec<Node>) -> Self {
        nodes.sort_by(|a, b| a.name.cmp(&b.name));
        Self { nodes }
    }

    /// All members regardless of liveness state.
    #[must_use]
    pub fn all(&self) -> &[Node] {
        &self.nodes
    }

    /// The subset eligible for replica selection: `Alive` only.
    #[must_use]
    pub fn alive(&self) -> Vec<&Node> {
        self.nodes.iter().filter(|n| n.state == NodeState::Alive).collect()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(name: &str, state: NodeState) -> Node {
        let mut n = Node::new(name, format!("{name}:7946"), format!("{name}:8080"));
        n.state = state;
        n
    }

    #[test]
    fn snapshot_sorts_by_name() {
        let snap = MembersSnapshot::new(vec![
            node("c", NodeState::Alive),
            node("a", NodeState::Alive),
            node("b", NodeState::Alive),
        ]);
        let names: Vec<&str> = snap.all().iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn alive_excludes_non_alive() {
        let snap = MembersSnapshot::new(vec![
            node("a", NodeState::Alive),
            node("b", NodeState::Suspect),
            node("c", NodeState::Dead),
        ]);
        let alive_names: Vec<&str> = snap.alive().iter().map(|n| n.name.as_str()).collect();
        assert_eq!(alive_names, vec!["a"]);
    }

    #[test]
    fn get_finds_by_name() {
        let snap = MembersSnapshot::new(vec![node("a", NodeState::Alive)]);
        assert!(snap.get("a").is_some());
        assert!(snap.get("z").is_none());
    }
}
