//! Network module with deferred startup lifecycle.
//!
//! Implements the deferred startup pattern: `new()` creates resources,
//! `start()` binds the TCP listener, and `serve()` starts accepting
//! connections. This separation allows the rest of the application to
//! configure shared state (cluster, storage) between `start()` and `serve()`.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{any, get, post};
use axum::Router;
use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::net::TcpListener;
use tracing::info;

use super::config::NetworkConfig;
use super::middleware::build_http_layers;
use crate::cluster::{ClusterState, Membership};
use crate::error::NodeError;
use crate::read::{self, Reader};
use crate::storage::LocalStore;
use crate::write::{self, Writer};

/// Shared, request-visible state for every HTTP handler.
#[derive(Clone)]
pub struct AppState {
    pub cluster: Arc<ClusterState>,
    pub membership: Arc<Membership>,
    pub writer: Arc<Writer>,
    pub reader: Arc<Reader>,
    pub metrics: PrometheusHandle,
    pub start_time: Instant,
}

/// Manages the full HTTP server lifecycle.
///
/// 1. `new()` -- allocates shared state (`AppState`, metrics recorder)
/// 2. `start()` -- binds TCP listener to the configured address
/// 3. `serve()` -- begins accepting connections until shutdown is signalled
pub struct NetworkModule {
    config: NetworkConfig,
    listener: Option<TcpListener>,
    state: AppState,
}

impl NetworkModule {
    /// Creates a new network module without binding any port.
    ///
    /// `metrics` is the handle the `/metrics` route renders from. The
    /// caller installs the global recorder once at process startup (see
    /// `bin/tsdb-node.rs`); this constructor only wires the handle through.
    #[must_use]
    pub fn new(
        config: NetworkConfig,
        cluster: Arc<ClusterState>,
        membership: Arc<Membership>,
        store: Arc<LocalStore>,
        http: reqwest::Client,
        metrics: PrometheusHandle,
    ) -> Self {
        let writer = Arc::new(Writer::new(Arc::clone(&cluster), Arc::clone(&store), http.clone()));
        let reader = Arc::new(Reader::new(Arc::clone(&cluster), store, http, config.client.read_call_timeout));

        Self {
            config,
            listener: None,
            state: AppState { cluster, membership, writer, reader, metrics, start_time: Instant::now() },
        }
    }

    #[must_use]
    pub fn state(&self) -> AppState {
        self.state.clone()
    }

    /// Assembles the axum router with all routes and middleware.
    ///
    /// Routes:
    /// - `POST /write` -- remote-write ingestion, external or internal
    /// - `POST /read` -- query fan-out, external or internal
    /// - `POST /cluster/gossip` -- inbound gossip control messages
    /// - `GET /metrics` -- Prometheus text exposition
    /// - `ANY /api/v1/{*path}` -- `PromQL` surface (external collaborator, not implemented here)
    /// - `ANY /debug/pprof/{*path}` -- profiling surface (external collaborator, not implemented here)
    ///
    /// `attach_oversize_body` wraps the whole stack so `RequestBodyLimitLayer`'s
    /// bare 413 gets `NodeError::OversizeRequest`'s textual body, matching the
    /// 4xx/5xx text-body contract every other error path goes through.
    #[must_use]
    pub fn build_router(&self) -> Router {
        let layers = build_http_layers(&self.config);

        Router::new()
            .route("/write", post(write_handler))
            .route("/read", post(read_handler))
            .route("/cluster/gossip", post(gossip_handler))
            .route("/metrics", get(metrics_handler))
            .route("/api/v1/{*path}", any(not_implemented))
            .route("/debug/pprof/{*path}", any(not_implemented))
            .layer(layers)
            .layer(axum::middleware::from_fn(attach_oversize_body))
            .with_state(self.state.clone())
    }

    /// Binds the TCP listener to the configured host and port.
    ///
    /// Returns the actual bound port, which may differ from the configured
    /// port when port 0 is used (OS-assigned ephemeral port).
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound (e.g., port in use).
    pub async fn start(&mut self) -> anyhow::Result<u16> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&addr).await?;
        let port = listener.local_addr()?.port();

        info!("TCP listener bound to {}:{}", self.config.host, port);

        self.listener = Some(listener);
        Ok(port)
    }

    /// Starts serving connections until the shutdown signal fires.
    ///
    /// # Errors
    ///
    /// Returns an error if the server encounters a fatal I/O error.
    ///
    /// # Panics
    ///
    /// Panics if `start()` was not called before `serve()`.
    pub async fn serve(self, shutdown: impl Future<Output = ()> + Send + 'static) -> anyhow::Result<()> {
        let listener = self.listener.expect("start() must be called before serve()");
        let router = self.build_router();

        info!("serving HTTP connections on {:?}", listener.local_addr());

        axum::serve(listener, router).with_graceful_shutdown(shutdown).await?;
        Ok(())
    }
}

async fn write_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, NodeError> {
    let start = Instant::now();
    let internal = headers.contains_key(write::X_INTERNAL_WRITE_VERSION);
    let kind = if internal { "internal" } else { "external" };

    let result = async {
        let salt = headers.get("x-partition-key-salt").map(|v| v.as_bytes()).unwrap_or(b"");
        let req = write::wire::decode(&body)?;
        state.writer.handle(req, internal, salt).await?;
        Ok(StatusCode::NO_CONTENT)
    }
    .await;

    record_request_metrics("write", kind, &result, start.elapsed());
    result
}

async fn read_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Vec<u8>, NodeError> {
    let start = Instant::now();
    let internal = headers.contains_key(read::X_INTERNAL_READ_VERSION);
    let kind = if internal { "internal" } else { "external" };

    let result = async {
        let req = read::wire::decode_request(&body)?;
        let resp = state.reader.handle(req, internal).await?;
        read::wire::encode_response(&resp)
    }
    .await;

    record_request_metrics("read", kind, &result, start.elapsed());
    result
}

fn record_request_metrics<T>(route: &'static str, kind: &'static str, result: &Result<T, NodeError>, elapsed: std::time::Duration) {
    let outcome = if result.is_ok() { "ok" } else { "error" };
    counter!("tsdb_node_requests_total", "route" => route, "kind" => kind, "outcome" => outcome).increment(1);
    histogram!("tsdb_node_request_duration_seconds", "route" => route, "kind" => kind).record(elapsed.as_secs_f64());
}

async fn gossip_handler(
    State(state): State<AppState>,
    axum::Json(msg): axum::Json<crate::cluster::GossipMessage>,
) -> axum::Json<Option<crate::cluster::GossipMessage>> {
    axum::Json(state.membership.handle_message(msg))
}

async fn metrics_handler(State(state): State<AppState>) -> String {
    state.metrics.render()
}

async fn not_implemented() -> StatusCode {
    StatusCode::NOT_IMPLEMENTED
}

/// Rewrites `RequestBodyLimitLayer`'s bare 413 into `NodeError::OversizeRequest`'s
/// response, so an oversize body gets the same textual error body as every
/// other rejected request.
async fn attach_oversize_body(request: axum::extract::Request, next: axum::middleware::Next) -> axum::response::Response {
    let response = next.run(request).await;
    if response.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return NodeError::OversizeRequest.into_response();
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::types::ClusterConfig;
    use crate::storage::InMemoryEngine;
    use tsdb_core::Node;

    fn module() -> NetworkModule {
        let (state, _rx) = ClusterState::new(Arc::new(ClusterConfig::default()), "n1".to_string());
        let detector: Arc<dyn crate::cluster::FailureDetector> =
            Arc::new(crate::cluster::DeadlineFailureDetector::new(5000));
        let http = reqwest::Client::new();
        let membership = Arc::new(Membership::new(Arc::clone(&state), detector, http.clone()));
        membership.bootstrap(Node::new("n1", "n1:7946", "n1:8080"));
        let store = Arc::new(LocalStore::new(Arc::new(InMemoryEngine::new())));
        let metrics = metrics_exporter_prometheus::PrometheusBuilder::new().build_recorder().handle();
        NetworkModule::new(NetworkConfig::default(), state, membership, store, http, metrics)
    }

    #[test]
    fn new_creates_module_without_binding() {
        let m = module();
        assert!(m.listener.is_none());
    }

    #[test]
    fn build_router_creates_router() {
        let m = module();
        let _router = m.build_router();
    }

    #[tokio::test]
    async fn start_binds_to_os_assigned_port() {
        let mut m = module();
        let port = m.start().await.expect("start should succeed");
        assert!(port > 0, "OS-assigned port should be > 0");
        assert!(m.listener.is_some());
    }

    #[tokio::test]
    #[should_panic(expected = "start() must be called before serve()")]
    async fn serve_panics_without_start() {
        let m = module();
        let _ = m.serve(std::future::pending::<()>()).await;
    }

    #[tokio::test]
    async fn oversize_write_body_gets_413_with_text_body() {
        use axum::body::Body;
        use axum::http::Request;
        use tower::ServiceExt;

        let config = NetworkConfig { max_request_bytes: 8, ..NetworkConfig::default() };
        let (state, _rx) = ClusterState::new(Arc::new(ClusterConfig::default()), "n1".to_string());
        let detector: Arc<dyn crate::cluster::FailureDetector> =
            Arc::new(crate::cluster::DeadlineFailureDetector::new(5000));
        let http = reqwest::Client::new();
        let membership = Arc::new(Membership::new(Arc::clone(&state), detector, http.clone()));
        membership.bootstrap(Node::new("n1", "n1:7946", "n1:8080"));
        let store = Arc::new(LocalStore::new(Arc::new(InMemoryEngine::new())));
        let metrics = metrics_exporter_prometheus::PrometheusBuilder::new().build_recorder().handle();
        let m = NetworkModule::new(config, state, membership, store, http, metrics);

        let request = Request::builder()
            .method("POST")
            .uri("/write")
            .body(Body::from(vec![0u8; 64]))
            .unwrap();
        let response = m.build_router().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(body, NodeError::OversizeRequest.to_string().as_bytes());
    }
}
