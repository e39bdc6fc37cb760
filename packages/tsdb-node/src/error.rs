//! Error kinds shared by the write and read HTTP handlers.
//!
//! Mirrors spec §7's propagation policy: decode errors are reported
//! directly to the client; fan-out errors are collected and the first one
//! becomes the response.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::storage::StorageError;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("malformed request: {0}")]
    MalformedRequest(String),

    #[error("request body exceeds the configured size cap")]
    OversizeRequest,

    #[error("local storage rejected a sample: {0}")]
    LocalAppendFailure(#[from] StorageError),

    #[error("peer {addr} unreachable: {source}")]
    PeerUnreachable { addr: String, source: reqwest::Error },

    #[error("peer {addr} rejected the request with status {status}")]
    PeerRejected { addr: String, status: u16 },

    #[error("node has not joined the cluster yet")]
    MembershipUninitialized,

    #[error("call to {addr} timed out")]
    Timeout { addr: String },
}

impl NodeError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MalformedRequest(_) => StatusCode::BAD_REQUEST,
            Self::OversizeRequest => StatusCode::PAYLOAD_TOO_LARGE,
            Self::LocalAppendFailure(_)
            | Self::PeerUnreachable { .. }
            | Self::PeerRejected { .. }
            | Self::Timeout { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::MembershipUninitialized => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for NodeError {
    fn into_response(self) -> Response {
        let status = self.status();
        match status {
            StatusCode::INTERNAL_SERVER_ERROR => {
                tracing::error!(error = %self, "request failed");
            }
            _ => tracing::warn!(error = %self, "request rejected"),
        }
        (status, self.to_string()).into_response()
    }
}

/// Collects the first fan-out error observed across a bounded channel of
/// length `|live nodes|`, per spec §7's propagation policy.
pub fn first_error(errors: Vec<NodeError>) -> Option<NodeError> {
    errors.into_iter().next()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_request_maps_to_400() {
        assert_eq!(NodeError::MalformedRequest("bad snappy frame".into()).status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn oversize_maps_to_413() {
        assert_eq!(NodeError::OversizeRequest.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[test]
    fn membership_uninitialized_maps_to_503() {
        assert_eq!(NodeError::MembershipUninitialized.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn peer_rejected_maps_to_500() {
        assert_eq!(
            NodeError::PeerRejected { addr: "n2:8080".into(), status: 503 }.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn first_error_picks_earliest() {
        let errors = vec![
            NodeError::Timeout { addr: "n2:8080".into() },
            NodeError::PeerRejected { addr: "n3:8080".into(), status: 500 },
        ];
        let first = first_error(errors).unwrap();
        assert!(matches!(first, NodeError::Timeout { .. }));
    }
}
