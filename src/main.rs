mod api;
mod config;
mod controller;
mod error;
mod health;
mod provider;
mod repository;

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;
use warp::Filter;

use config::Config;
use controller::RoomsController;
use health::HealthReconciler;

#[tokio::main]
async fn main() {
    let config = Config::from_env();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let repository = match repository::from_config(&config.store).await {
        Ok(repository) => repository,
        Err(e) => {
            tracing::error!(error = %e, "Failed to open room store");
            std::process::exit(1);
        }
    };

    let provider = match provider::from_config(&config, repository.clone()) {
        Ok(provider) => provider,
        Err(e) => {
            tracing::error!(error = %e, "Failed to select provider backend");
            std::process::exit(1);
        }
    };
    tracing::info!(backend = %config.provider.backend, "Room provider selected");

    let controller = Arc::new(RoomsController::new(
        provider,
        repository.clone(),
        &config.provider,
    ));
    let _cleanup_task = controller
        .start_cleanup_scheduler(Duration::from_secs(config.provider.cleanup_interval_secs));

    let reconciler = match HealthReconciler::new(repository, &config.health) {
        Ok(reconciler) => Arc::new(reconciler),
        Err(e) => {
            tracing::error!(error = %e, "Failed to build health reconciler");
            std::process::exit(1);
        }
    };
    let _reconcile_task = reconciler.spawn(Duration::from_secs(config.health.interval_secs));

    let routes = api::room_routes::room_routes(controller).or(api::room_routes::service_health());

    tracing::info!(
        host = %config.server.host,
        port = config.server.port,
        "Room provisioning service listening"
    );
    warp::serve(routes).run(config.bind_address()).await;
}
