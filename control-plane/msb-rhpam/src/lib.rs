pub mod api;
pub mod bootstrap;
pub mod cluster;
pub mod config;
pub mod crd;
pub mod deployer;
pub mod errors;
pub mod pipeline;
pub mod server;
pub mod templates;

pub use bootstrap::{
    build_api_server, build_api_server_from_env, build_cluster_client,
};
pub use deployer::{Deployer, RhpamDeployer};
pub use server::{ApiServer, AppState};
