//! Clustered time-series ingestion/query front-end: gossip membership,
//! partitioning, and write/read fan-out.

pub mod cluster;
pub mod config;
pub mod error;
pub mod logging;
pub mod network;
pub mod read;
pub mod storage;
pub mod write;

pub use config::NodeConfig;
pub use error::NodeError;
