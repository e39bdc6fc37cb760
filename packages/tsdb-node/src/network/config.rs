//! Network and HTTP transport configuration.
//!
//! Values default to the transport contract: connection keep-alive 10 min,
//! dial timeout 2 s, response-header timeout 5 s, idle-conn timeout 10 min
//! on the client side; 1 min read/write timeout, 5 s read-header timeout,
//! 2 min idle timeout, and a 10 MiB request body cap on the server side.

use std::time::Duration;

/// Default cap on a decoded `/write` or `/read` request body.
pub const DEFAULT_MAX_REQUEST_BYTES: usize = 10 * 1024 * 1024;

/// Top-level network configuration for the server.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Bind address for the HTTP listener.
    pub host: String,
    /// Port to listen on. 0 means OS-assigned.
    pub port: u16,
    /// Address advertised to peers for `/write` and `/read` fan-out.
    pub advertise_addr: String,
    /// Allowed CORS origins.
    pub cors_origins: Vec<String>,
    /// Maximum time to wait for a request to complete (server-side read/write timeout).
    pub request_timeout: Duration,
    /// Maximum time to wait for request headers.
    pub read_header_timeout: Duration,
    /// Maximum time a connection may sit idle before the server closes it.
    pub idle_timeout: Duration,
    /// Cap on a decoded `/write` or `/read` request body, in bytes.
    pub max_request_bytes: usize,
    /// Per-call outbound HTTP client settings used for fan-out.
    pub client: ClientConfig,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 0,
            advertise_addr: "127.0.0.1:0".to_string(),
            cors_origins: vec!["*".to_string()],
            request_timeout: Duration::from_secs(60),
            read_header_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(120),
            max_request_bytes: DEFAULT_MAX_REQUEST_BYTES,
            client: ClientConfig::default(),
        }
    }
}

/// Settings for the shared outbound HTTP client used for internal fan-out
/// write/read sub-calls.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// TCP connect timeout.
    pub dial_timeout: Duration,
    /// Time to wait for response headers after the request is sent.
    pub response_header_timeout: Duration,
    /// Expect-100-continue timeout.
    pub expect_continue_timeout: Duration,
    /// How long an idle pooled connection is kept alive.
    pub idle_conn_timeout: Duration,
    /// Per-call read timeout for fan-out read sub-queries (spec default 30s).
    pub read_call_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            dial_timeout: Duration::from_secs(2),
            response_header_timeout: Duration::from_secs(5),
            expect_continue_timeout: Duration::from_secs(5),
            idle_conn_timeout: Duration::from_secs(600),
            read_call_timeout: Duration::from_secs(30),
        }
    }
}
