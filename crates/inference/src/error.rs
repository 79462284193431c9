use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use schema::ErrorBody;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("model not ready (state: {0})")]
    ModelNotReady(&'static str),

    #[error("a model load is already in progress: {0}")]
    LoadInProgress(String),

    #[error("bad payload: {0}")]
    BadPayload(String),

    #[error("model load failed: {0}")]
    LoadFailed(String),

    #[error("inference failed: {0}")]
    Inference(String),
}

impl ServiceError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServiceError::ModelNotReady(_) => StatusCode::SERVICE_UNAVAILABLE,
            ServiceError::LoadInProgress(_) => StatusCode::CONFLICT,
            ServiceError::BadPayload(_) => StatusCode::BAD_REQUEST,
            ServiceError::LoadFailed(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ServiceError::Inference(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::ModelNotReady(_) => "model_not_ready",
            ServiceError::LoadInProgress(_) => "load_in_progress",
            ServiceError::BadPayload(_) => "bad_payload",
            ServiceError::LoadFailed(_) => "load_failed",
            ServiceError::Inference(_) => "inference",
        }
    }
}

impl From<preprocess::PreprocessError> for ServiceError {
    fn from(e: preprocess::PreprocessError) -> Self {
        ServiceError::BadPayload(e.to_string())
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}
