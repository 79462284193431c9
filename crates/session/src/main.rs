use capture::{CaptureFeed, open_source};
use client::{HttpProvider, ProviderChain};
use common::{TelemetryGuard, shutdown_signal, wait_for_resource_async};
use session::{BroadcastSink, LogSink, Session, SessionConfig, ws};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

const HEALTH_POLL_INTERVAL: Duration = Duration::from_secs(1);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = SessionConfig::from_env()?;

    let _telemetry = TelemetryGuard::init_optional(
        "session",
        config.otel_endpoint.as_deref(),
        config.environment,
    )?;

    tracing::info!(
        config = ?config,
        "Loaded configuration"
    );

    let primary = HttpProvider::new(&config.endpoints.endpoints()[0])?;
    if let Some(health) = wait_for_resource_async(
        || primary.health(),
        HEALTH_POLL_INTERVAL,
        config.health_attempts,
        "Primary model service",
    )
    .await
    {
        tracing::info!(
            model_state = %health.model_state,
            model_path = health.model_path.as_deref().unwrap_or("-"),
            "Primary model service reachable"
        );
    }

    let (stop_tx, stop_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = stop_tx.send(true);
    });

    let feed = CaptureFeed::spawn(open_source(&config.capture)?)?;
    let chain = ProviderChain::from_config(&config.endpoints)?;

    let mut session = Session::new(
        chain,
        feed.frames(),
        config.tick_interval,
        config.jpeg_quality,
    )
    .with_capture(feed)
    .with_sink(Arc::new(LogSink));

    let ws_server = match &config.ws_addr {
        Some(addr) => {
            let sink = BroadcastSink::new(config.channel_capacity);
            session = session.with_sink(Arc::new(sink.clone()));

            let addr = addr.clone();
            let mut stop = stop_rx.clone();
            Some(tokio::spawn(async move {
                let shutdown = async move {
                    let _ = stop.wait_for(|stopped| *stopped).await;
                };
                if let Err(e) = ws::run_server(&addr, sink, shutdown).await {
                    tracing::error!(error = %e, "WebSocket server failed");
                }
            }))
        }
        None => None,
    };

    let stats = session.run(stop_rx).await?;

    if let Some(server) = ws_server {
        let _ = server.await;
    }

    tracing::info!(
        ticks = stats.ticks,
        results = stats.results,
        failures = stats.failures,
        skipped = stats.skipped,
        "Session finished"
    );
    Ok(())
}
