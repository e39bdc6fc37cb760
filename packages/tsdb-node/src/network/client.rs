//! Shared outbound `reqwest` client used for internal fan-out write/read
//! sub-calls, built from [`ClientConfig`].

use super::config::ClientConfig;

/// Builds the process-wide fan-out client. Connection pooling (`idle_conn_timeout`)
/// is shared across every peer this node talks to.
///
/// Carries no blanket per-request timeout: the read fan-out applies
/// `read_call_timeout` per call at the request-builder level (see
/// `read::fetch_remote`), while the write fan-out is left unbound and
/// inherits the handler's own timeout, per the transport contract.
pub fn build_client(config: &ClientConfig) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .connect_timeout(config.dial_timeout)
        .pool_idle_timeout(config.idle_conn_timeout)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_with_default_config() {
        let client = build_client(&ClientConfig::default());
        assert!(client.is_ok());
    }
}
