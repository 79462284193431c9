use crate::error::ServiceError;
use crate::service::ModelService;
use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    routing::{get, post},
};
use schema::{
    DETECT_PATH, DetectRequest, DetectResponse, HEALTH_PATH, HealthResponse, LOAD_MODEL_PATH,
    LoadModelRequest, MODELS_PATH, ModelsResponse,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

pub type AppState = Arc<ModelService>;

pub fn router(service: AppState) -> Router {
    Router::new()
        .route(DETECT_PATH, post(detect))
        .route(HEALTH_PATH, get(health))
        .route(MODELS_PATH, get(models))
        .route(LOAD_MODEL_PATH, post(load_model))
        .layer(CorsLayer::permissive())
        .with_state(service)
}

pub async fn serve(
    listener: tokio::net::TcpListener,
    service: AppState,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    tracing::info!(addr = %listener.local_addr()?, "Model service listening");
    axum::serve(listener, router(service))
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

async fn detect(
    State(service): State<AppState>,
    body: Result<Json<DetectRequest>, JsonRejection>,
) -> Result<Json<DetectResponse>, ServiceError> {
    let Json(request) = body.map_err(|e| ServiceError::BadPayload(e.body_text()))?;
    let response = service.detect(request).await.inspect_err(|e| {
        tracing::warn!(error = %e, "Detection rejected");
    })?;
    Ok(Json(response))
}

async fn health(State(service): State<AppState>) -> Json<HealthResponse> {
    Json(service.health().await)
}

async fn models(State(service): State<AppState>) -> Json<ModelsResponse> {
    Json(service.models().await)
}

async fn load_model(
    State(service): State<AppState>,
    body: Result<Json<LoadModelRequest>, JsonRejection>,
) -> Result<Json<HealthResponse>, ServiceError> {
    let Json(request) = body.map_err(|e| ServiceError::BadPayload(e.body_text()))?;
    Ok(Json(service.load_model(&request.path).await?))
}
