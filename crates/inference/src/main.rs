use common::{TelemetryGuard, shutdown_signal};
use inference::{ModelService, ServiceConfig, serve};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServiceConfig::from_env()?;

    let _telemetry = TelemetryGuard::init_optional(
        "model-service",
        config.otel_endpoint.as_deref(),
        config.environment,
    )?;

    tracing::info!(
        config = ?config,
        "Loaded configuration"
    );

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    let service = Arc::new(ModelService::new(config));

    // Serve health while the startup model loads
    let loading = service.clone();
    tokio::spawn(async move { loading.load_startup_model().await });

    serve(listener, service, shutdown_signal()).await?;

    tracing::info!("Model service stopped");
    Ok(())
}
