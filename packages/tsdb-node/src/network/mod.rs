//! HTTP transport: configuration, middleware, the outbound fan-out client,
//! and the server lifecycle module.

pub mod client;
pub mod config;
pub mod middleware;
pub mod module;

pub use client::build_client;
pub use config::{ClientConfig, NetworkConfig, DEFAULT_MAX_REQUEST_BYTES};
pub use module::{AppState, NetworkModule};
