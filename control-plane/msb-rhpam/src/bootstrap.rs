use anyhow::Result;
use envconfig::Envconfig;
use std::sync::Arc;
use tracing::{info, warn};

use crate::{
    cluster::{
        ClusterClient, KubeClusterClient, MemoryClusterClient,
        RetryingClusterClient,
    },
    config::{BrokerConfig, ClusterBackend},
    deployer::RhpamDeployer,
    server::ApiServer,
};

/// Cluster client for the configured backend, wrapped with retries.
pub async fn build_cluster_client(
    config: &BrokerConfig,
) -> Result<Arc<dyn ClusterClient>> {
    let retry = config.retry_config();
    let client: Arc<dyn ClusterClient> = match config.cluster_backend {
        ClusterBackend::Kube => {
            let kube = KubeClusterClient::try_default().await?;
            Arc::new(RetryingClusterClient::new(kube, retry))
        }
        ClusterBackend::Memory => {
            warn!("Using in-memory cluster backend; nothing reaches a real cluster");
            Arc::new(RetryingClusterClient::new(MemoryClusterClient::new(), retry))
        }
    };
    Ok(client)
}

pub fn build_api_server(
    config: &BrokerConfig,
    client: Arc<dyn ClusterClient>,
) -> ApiServer {
    let deployer = Arc::new(RhpamDeployer::from_config(client, config));
    ApiServer::new(deployer, config.http_port)
}

/// Build a fully-wired ApiServer from environment variables.
pub async fn build_api_server_from_env() -> Result<ApiServer> {
    let config = BrokerConfig::init_from_env()?;
    info!(
        backend = ?config.cluster_backend,
        plan = config.plan.as_str(),
        prefix = %config.service_prefix,
        "Loaded broker configuration"
    );
    let client = build_cluster_client(&config).await?;
    Ok(build_api_server(&config, client))
}
