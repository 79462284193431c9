use crate::error::ProviderError;
use async_trait::async_trait;
use schema::{DetectRequest, DetectResponse};
use std::time::Duration;

/// One backend able to answer a detection request.
#[async_trait]
pub trait InferenceProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Upper bound the chain enforces around [`InferenceProvider::detect`].
    fn timeout(&self) -> Duration;

    /// A successful return means a 2xx answer whose body parsed.
    async fn detect(&self, request: &DetectRequest) -> Result<DetectResponse, ProviderError>;
}
