use crate::{
    api::{handlers, with_middleware},
    deployer::Deployer,
};
use axum::{
    Router,
    routing::{get, put},
};
use std::{net::SocketAddr, sync::Arc};
use tracing::info;

#[derive(Clone)]
pub struct AppState {
    pub deployer: Arc<dyn Deployer>,
}

pub struct ApiServer {
    app: Router,
    port: u16,
}

impl ApiServer {
    pub fn new(deployer: Arc<dyn Deployer>, port: u16) -> Self {
        let state = AppState { deployer };

        let routes = Router::new()
            .route("/v2/catalog", get(handlers::get_catalog))
            .route(
                "/v2/service_instances/{instance_id}",
                put(handlers::provision_instance)
                    .delete(handlers::deprovision_instance),
            )
            .route(
                "/v2/service_instances/{instance_id}/last_operation",
                get(handlers::get_last_operation),
            )
            .route("/health", get(handlers::health_check));
        let app = with_middleware(routes).with_state(state);

        Self { app, port }
    }

    pub async fn serve(self) -> Result<(), Box<dyn std::error::Error>> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        let listener = tokio::net::TcpListener::bind(addr).await?;

        info!("Service broker listening on {}", addr);
        info!("Catalog available at: http://{}/v2/catalog", addr);

        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        Ok(())
    }

    /// The router without a listener, for tests and embedding.
    pub fn into_router(self) -> Router {
        self.app
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
