//! The read fan-out pipeline: local querier plus one `RemoteQuerier` per
//! live peer, merged with `MergeSeriesSet` semantics.

pub mod merge;
pub mod wire;

use std::sync::Arc;
use std::time::Duration;

use tsdb_core::Series;

use crate::cluster::ClusterState;
use crate::error::{first_error, NodeError};
use crate::storage::{LocalStore, MatchOp as StorageMatchOp, Matcher as StorageMatcher};
use wire::{MatchOpProto, MatcherProto, Query, QueryResult, ReadRequest, ReadResponse};

pub const X_INTERNAL_READ_VERSION: &str = "X-Internal-Read-Version";
const INTERNAL_READ_VERSION: &str = "0.0.1";

pub struct Reader {
    cluster: Arc<ClusterState>,
    store: Arc<LocalStore>,
    http: reqwest::Client,
    read_call_timeout: Duration,
}

impl Reader {
    /// `read_call_timeout` bounds each individual peer's `/read` sub-call
    /// (spec default 30s); it is applied per request, not on the shared client.
    #[must_use]
    pub fn new(cluster: Arc<ClusterState>, store: Arc<LocalStore>, http: reqwest::Client, read_call_timeout: Duration) -> Self {
        Self { cluster, store, http, read_call_timeout }
    }

    pub async fn handle(&self, req: ReadRequest, internal: bool) -> Result<ReadResponse, NodeError> {
        if internal {
            return Ok(ReadResponse { results: self.handle_internal(&req) });
        }
        self.handle_external(&req).await
    }

    fn handle_internal(&self, req: &ReadRequest) -> Vec<QueryResult> {
        req.queries
            .iter()
            .map(|query| {
                let matchers = to_storage_matchers(&query.matchers);
                let querier = self.store.querier(query.start_ms, query.end_ms);
                let series: Vec<Series> = querier.select(&matchers).collect();
                QueryResult { series: series.iter().map(Into::into).collect() }
            })
            .collect()
    }

    async fn handle_external(&self, req: &ReadRequest) -> Result<ReadResponse, NodeError> {
        if !self.cluster.is_initialized() {
            return Err(NodeError::MembershipUninitialized);
        }
        let view = self.cluster.current_view();
        let local_name = self.cluster.local_node_name().to_string();
        let peers: Vec<String> =
            view.alive().iter().filter(|n| n.name != local_name).map(|n| n.http_addr.clone()).collect();

        let mut results = Vec::with_capacity(req.queries.len());
        for query in &req.queries {
            let matchers = to_storage_matchers(&query.matchers);
            let local_series: Vec<Series> =
                self.store.querier(query.start_ms, query.end_ms).select(&matchers).collect();

            let mut tasks = Vec::with_capacity(peers.len());
            for addr in &peers {
                let http = self.http.clone();
                let addr = addr.clone();
                let query = query.clone();
                let timeout = self.read_call_timeout;
                tasks.push(tokio::spawn(async move { fetch_remote(&http, &addr, query, timeout).await }));
            }

            let mut sets = vec![local_series];
            let mut errors = Vec::new();
            for task in tasks {
                let outcome = match task.await {
                    Ok(outcome) => outcome,
                    Err(_join_err) => Err(NodeError::Timeout { addr: "unknown".to_string() }),
                };
                match outcome {
                    Ok(series) => sets.push(series),
                    Err(e) => errors.push(e),
                }
            }
            if let Some(e) = first_error(errors) {
                return Err(e);
            }

            let merged = merge::merge_series_sets(sets);
            results.push(QueryResult { series: merged.iter().map(Into::into).collect() });
        }
        Ok(ReadResponse { results })
    }
}

async fn fetch_remote(http: &reqwest::Client, addr: &str, query: Query, read_call_timeout: Duration) -> Result<Vec<Series>, NodeError> {
    let req = ReadRequest { queries: vec![query] };
    let body = wire::encode_request(&req)?;
    let url = format!("http://{addr}/read");

    let result = http
        .post(&url)
        .header(X_INTERNAL_READ_VERSION, INTERNAL_READ_VERSION)
        .header("Content-Encoding", "snappy")
        .header("Content-Type", "application/x-protobuf")
        .timeout(read_call_timeout)
        .body(body)
        .send()
        .await;

    let resp = match result {
        Ok(resp) => resp,
        Err(source) => return Err(NodeError::PeerUnreachable { addr: addr.to_string(), source }),
    };

    let status = resp.status();
    let bytes = resp.bytes().await.map_err(|source| NodeError::PeerUnreachable { addr: addr.to_string(), source })?;
    if !status.is_success() {
        return Err(NodeError::PeerRejected { addr: addr.to_string(), status: status.as_u16() });
    }

    let decoded = wire::decode_response(&bytes)?;
    let result = decoded.results.into_iter().next().unwrap_or(QueryResult { series: vec![] });
    Ok(result.series.iter().map(|ts| Series { labels: ts.labels(), samples: ts.samples() }).collect())
}

fn to_storage_matchers(matchers: &[MatcherProto]) -> Vec<StorageMatcher> {
    matchers
        .iter()
        .map(|m| StorageMatcher {
            name: m.name.clone(),
            value: m.value.clone(),
            op: if m.op == MatchOpProto::NotEqual as i32 { StorageMatchOp::NotEqual } else { StorageMatchOp::Equal },
        })
        .collect()
}
