//! The write fan-out pipeline: decode, branch on `X-Internal-Write-Version`,
//! replica-select, local append, and parallel remote sub-writes.

pub mod wire;

use std::collections::HashMap;
use std::sync::Arc;

use tsdb_core::{partition_key_from_millis, replica_select, Labels, Sample};

use crate::cluster::ClusterState;
use crate::error::{first_error, NodeError};
use crate::storage::LocalStore;
use wire::{LabelPair, SamplePoint, WireTimeSeries, WriteRequest};

pub const X_INTERNAL_WRITE_VERSION: &str = "X-Internal-Write-Version";
pub const X_REMOTE_WRITE_VERSION: &str = "X-Remote-Write-Version";
const REMOTE_WRITE_VERSION: &str = "0.1.0";
const INTERNAL_WRITE_VERSION: &str = "0.0.1";

/// Owns the per-request `node -> series -> samples` map; nothing here is
/// shared across requests.
pub struct Writer {
    cluster: Arc<ClusterState>,
    store: Arc<LocalStore>,
    http: reqwest::Client,
}

impl Writer {
    #[must_use]
    pub fn new(cluster: Arc<ClusterState>, store: Arc<LocalStore>, http: reqwest::Client) -> Self {
        Self { cluster, store, http }
    }

    /// Handles a decoded `WriteRequest`. `internal` reflects whether
    /// `X-Internal-Write-Version` was present on the inbound request.
    pub async fn handle(&self, req: WriteRequest, internal: bool, salt: &[u8]) -> Result<(), NodeError> {
        if req.timeseries.is_empty() {
            return Err(NodeError::MalformedRequest("empty batch".to_string()));
        }
        if internal {
            self.apply_internal(&req)
        } else {
            self.apply_external(&req, salt).await
        }
    }

    /// Hot path: rebuild labels, append, commit. Issues zero outgoing HTTP
    /// requests and never computes a replica set.
    fn apply_internal(&self, req: &WriteRequest) -> Result<(), NodeError> {
        let batch: Vec<(Labels, Vec<Sample>)> =
            req.timeseries.iter().map(|ts| (ts.labels(), ts.samples())).collect();
        self.store.append_batch(&batch)?;
        Ok(())
    }

    async fn apply_external(&self, req: &WriteRequest, salt: &[u8]) -> Result<(), NodeError> {
        if !self.cluster.is_initialized() {
            return Err(NodeError::MembershipUninitialized);
        }
        let view = self.cluster.current_view();
        let r = self.cluster.config().replication_factor;
        let local_name = self.cluster.local_node_name().to_string();

        let mut node_batches: HashMap<String, HashMap<u64, (Labels, Vec<Sample>)>> = HashMap::new();
        for ts in &req.timeseries {
            let labels = ts.labels();
            let series_hash = labels.hash();
            for sample in ts.samples() {
                let key = partition_key_from_millis(salt, sample.timestamp_ms, series_hash);
                for node in replica_select(&view, r, key) {
                    let series_map = node_batches.entry(node.name.clone()).or_default();
                    let entry = series_map.entry(series_hash).or_insert_with(|| (labels.clone(), Vec::new()));
                    entry.1.push(sample);
                }
            }
        }

        // Apply the local shard first and release it from the map: the
        // lock is held only for this append, not across the fan-out below.
        if let Some(local_series) = node_batches.remove(&local_name) {
            let local_batch: Vec<(Labels, Vec<Sample>)> = local_series.into_values().collect();
            self.store.append_batch(&local_batch)?;
        }

        let mut tasks = Vec::with_capacity(node_batches.len());
        for (node_name, series_map) in node_batches {
            let Some(node) = view.get(&node_name) else { continue };
            let addr = node.http_addr.clone();
            let http = self.http.clone();
            let wire_req = WriteRequest {
                timeseries: series_map
                    .into_values()
                    .map(|(labels, samples)| WireTimeSeries {
                        labels: labels
                            .as_slice()
                            .iter()
                            .map(|l| LabelPair { name: l.name.clone(), value: l.value.clone() })
                            .collect(),
                        samples: samples
                            .iter()
                            .map(|s| SamplePoint { timestamp_ms: s.timestamp_ms, value: s.value })
                            .collect(),
                    })
                    .collect(),
            };
            tasks.push(tokio::spawn(async move { send_internal_write(&http, &addr, &wire_req).await }));
        }

        // Join the fan-out barrier; in-flight peers are not cancelled when
        // one fails, but only the first error is surfaced.
        let mut errors = Vec::new();
        for task in tasks {
            let result = match task.await {
                Ok(result) => result,
                Err(_join_err) => Err(NodeError::Timeout { addr: "unknown".to_string() }),
            };
            if let Err(e) = result {
                errors.push(e);
            }
        }
        first_error(errors).map_or(Ok(()), Err)
    }
}

async fn send_internal_write(http: &reqwest::Client, addr: &str, req: &WriteRequest) -> Result<(), NodeError> {
    let body = wire::encode(req)?;
    let url = format!("http://{addr}/write");
    let result = http
        .post(&url)
        .header(X_REMOTE_WRITE_VERSION, REMOTE_WRITE_VERSION)
        .header(X_INTERNAL_WRITE_VERSION, INTERNAL_WRITE_VERSION)
        .header("Content-Encoding", "snappy")
        .header("Content-Type", "application/x-protobuf")
        .body(body)
        .send()
        .await;

    match result {
        Ok(resp) => {
            let status = resp.status();
            // Drain the body fully even on non-2xx.
            let _ = resp.bytes().await;
            if status.is_success() {
                Ok(())
            } else {
                Err(NodeError::PeerRejected { addr: addr.to_string(), status: status.as_u16() })
            }
        }
        Err(source) => Err(NodeError::PeerUnreachable { addr: addr.to_string(), source }),
    }
}
