use anyhow::Result;
use clap::Command;
use msb_observability::{TracingConfig, setup_tracing};
use msb_rhpam::build_api_server_from_env;
use tracing::{error, info};

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<()> {
    setup_tracing(TracingConfig::from_env("msb-rhpam"))?;

    let _matches = Command::new("msb-rhpam")
        .about("RHPAM managed service broker")
        .version(env!("CARGO_PKG_VERSION"))
        .get_matches();

    info!("Loading configuration from environment variables...");
    let server = build_api_server_from_env().await?;

    info!("Starting service broker API server...");
    if let Err(e) = server.serve().await {
        error!("Server error: {}", e);
        std::process::exit(1);
    }

    Ok(())
}
