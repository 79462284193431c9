use crate::sink::BroadcastSink;
use axum::{
    Router,
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::IntoResponse,
    routing::get,
};
use std::future::Future;
use tokio::sync::broadcast::error::RecvError;
use tower_http::cors::CorsLayer;

pub fn router(sink: BroadcastSink) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .layer(CorsLayer::permissive())
        .with_state(sink)
}

pub async fn run_server(
    addr: &str,
    sink: BroadcastSink,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("WebSocket server listening on {}", listener.local_addr()?);

    axum::serve(listener, router(sink))
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}

async fn ws_handler(ws: WebSocketUpgrade, State(sink): State<BroadcastSink>) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, sink))
}

/// Each outcome goes out as one JSON text message.
async fn handle_socket(mut socket: WebSocket, sink: BroadcastSink) {
    tracing::info!("New WebSocket connection established");

    let mut rx = sink.subscribe();

    loop {
        let outcome = match rx.recv().await {
            Ok(outcome) => outcome,
            Err(RecvError::Lagged(missed)) => {
                tracing::debug!(missed, "WebSocket client lagging");
                continue;
            }
            Err(RecvError::Closed) => break,
        };

        let json = match serde_json::to_string(&outcome) {
            Ok(j) => j,
            Err(e) => {
                tracing::error!("JSON serialization error: {}", e);
                continue;
            }
        };

        if socket.send(Message::Text(json)).await.is_err() {
            tracing::info!("WebSocket client disconnected");
            break;
        }
    }
}
