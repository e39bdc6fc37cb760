//! Trait seams for the cluster membership layer.

/// Tracks per-node heartbeats and reports liveness.
///
/// Implementations are shared behind an `Arc` and called concurrently from
/// the gossip loop and the HTTP handlers that answer heartbeat messages.
pub trait FailureDetector: Send + Sync {
    /// Records a heartbeat observed from `node_id` at `timestamp_ms`.
    fn heartbeat(&self, node_id: &str, timestamp_ms: u64);

    /// Whether `node_id` is currently considered alive.
    fn is_alive(&self, node_id: &str, timestamp_ms: u64) -> bool;

    /// The last recorded heartbeat timestamp for `node_id`, if any.
    fn last_heartbeat(&self, node_id: &str) -> Option<u64>;

    /// Current suspicion level (phi) for `node_id`. Zero if no history.
    fn suspicion_level(&self, node_id: &str, timestamp_ms: u64) -> f64;

    /// Forgets all history for `node_id` (on removal from the cluster).
    fn remove(&self, node_id: &str);

    /// Forgets all history for every node.
    fn reset(&self);
}
