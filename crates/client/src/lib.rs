//! Inference client: sends an encoded frame through a prioritized list of
//! detection backends and returns the first normalized answer.

pub mod chain;
pub mod endpoint;
pub mod error;
pub mod http;
pub mod normalize;
pub mod provider;

pub use chain::ProviderChain;
pub use endpoint::{Endpoint, EndpointConfig};
pub use error::{InferenceError, ProviderError, ProviderFailure};
pub use http::HttpProvider;
pub use normalize::normalize;
pub use provider::InferenceProvider;

use capture::EncodedPayload;
use schema::InferenceResult;

/// One-shot convenience over [`ProviderChain`]. Sessions keep a chain around
/// instead so HTTP connections are reused.
pub async fn infer(
    payload: &EncodedPayload,
    endpoints: &EndpointConfig,
) -> Result<InferenceResult, InferenceError> {
    ProviderChain::from_config(endpoints)?.infer(payload).await
}
