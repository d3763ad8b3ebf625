use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use gatling_shim_core::prelude::start_shutdown_listener;
use gatling_shim_instruments::PrometheusSink;
use gatling_shim_runner::prelude::RunManager;
use gatling_shim_service::{router, AppState, ServiceCli, ENDPOINTS};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = ServiceCli::parse();
    let runner_config = cli.runner_config();
    log::info!(
        "Running simulations in '{}', reports from '{}'",
        runner_config.project_dir().display(),
        runner_config.reports_dir().display()
    );

    let metrics = Arc::new(PrometheusSink::new().context("Failed to register metrics")?);
    let manager = RunManager::new(runner_config, metrics.clone());
    let app = router(AppState::new(manager, metrics));

    let addr = cli.listen_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to listen on {addr}"))?;

    log::info!("Gatling shim listening on {}", listener.local_addr()?);
    log::info!("Endpoints:");
    for (method, path, description) in ENDPOINTS {
        log::info!("  {method:<4} {path} - {description}");
    }

    let mut shutdown_listener = start_shutdown_listener().new_listener();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown_listener.wait_for_shutdown().await })
        .await
        .context("HTTP server failed")?;

    Ok(())
}
