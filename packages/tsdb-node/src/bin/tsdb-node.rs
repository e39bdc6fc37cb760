//! Binary entry point: parse the CLI, wire cluster membership and storage,
//! and serve HTTP until a shutdown signal arrives.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::{info, warn};
use tsdb_core::Node;

use tsdb_node::cluster::{
    ClusterState, DeadlineFailureDetector, FailureDetector, Membership, PhiAccrualConfig,
    PhiAccrualFailureDetector,
};
use tsdb_node::config::{tick_interval, NodeConfig};
use tsdb_node::logging;
use tsdb_node::network::{build_client, NetworkModule};
use tsdb_node::storage::{InMemoryEngine, LocalStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = NodeConfig::parse();
    logging::init(config.log_level);

    let local_name = config.advertised_http_addr();
    let cluster_config = Arc::new(config.cluster_config());
    let (cluster, _change_rx) = ClusterState::new(Arc::clone(&cluster_config), local_name.clone());

    let http = build_client(&config.network_config().client)?;

    let detector: Arc<dyn FailureDetector> = build_failure_detector(&cluster_config);
    let membership = Arc::new(Membership::new(Arc::clone(&cluster), detector, http.clone()));

    let local_node = Node::new(
        local_name.clone(),
        config.advertised_gossip_addr(),
        config.advertised_http_addr(),
    );

    if let Some(seed) = config.peers.first() {
        if let Err(err) = membership.join(local_node.clone(), seed).await {
            warn!(%err, seed, "failed to join seed, bootstrapping as a single-node cluster instead");
            membership.bootstrap(local_node);
        }
    } else {
        membership.bootstrap(local_node);
    }

    // TODO(tsdb-node): swap InMemoryEngine for a persistent engine rooted at
    // config.data_directory once one exists.
    info!(data_directory = %config.data_directory, "using in-memory storage engine");
    let store = Arc::new(LocalStore::new(Arc::new(InMemoryEngine::new())));

    spawn_gossip_loop(Arc::clone(&membership));

    let metrics = PrometheusBuilder::new()
        .install_recorder()
        .expect("installing the global Prometheus recorder should only fail once per process");
    let mut module = NetworkModule::new(config.network_config(), cluster, membership, store, http, metrics);
    let port = module.start().await?;
    info!(port, "tsdb-node listening");

    module.serve(shutdown_signal()).await
}

fn build_failure_detector(config: &tsdb_node::cluster::ClusterConfig) -> Arc<dyn FailureDetector> {
    if config.max_no_heartbeat_ms == 0 {
        return Arc::new(DeadlineFailureDetector::new(5000));
    }
    Arc::new(PhiAccrualFailureDetector::new(PhiAccrualConfig {
        phi_threshold: config.phi_threshold,
        max_sample_size: config.max_sample_size,
        min_std_dev_ms: config.min_std_dev_ms,
        max_no_heartbeat_ms: config.max_no_heartbeat_ms,
        heartbeat_interval_ms: config.heartbeat_interval.as_millis() as u64,
    }))
}

fn spawn_gossip_loop(membership: Arc<Membership>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(tick_interval());
        loop {
            interval.tick().await;
            membership.tick().await;
        }
    });
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
    info!("shutdown signal received, draining connections");
    tokio::time::sleep(Duration::from_millis(100)).await;
}
