use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Why a single provider attempt failed. Every variant advances the chain.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("model not ready: {0}")]
    ModelNotReady(String),
}

impl ProviderError {
    pub fn kind(&self) -> &'static str {
        match self {
            ProviderError::Transport(_) => "transport",
            ProviderError::Timeout(_) => "timeout",
            ProviderError::Status { .. } => "status",
            ProviderError::MalformedResponse(_) => "malformed_response",
            ProviderError::ModelNotReady(_) => "model_not_ready",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProviderFailure {
    pub provider: String,
    pub error: ProviderError,
}

impl fmt::Display for ProviderFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.provider, self.error)
    }
}

#[derive(Error, Debug)]
pub enum InferenceError {
    /// Every provider failed; `failures` is in call order.
    #[error("all inference providers failed: [{}]", join(.failures))]
    Unavailable { failures: Vec<ProviderFailure> },

    #[error("at least one inference endpoint is required")]
    NoEndpoints,

    #[error("invalid endpoint {name}: {reason}")]
    InvalidEndpoint { name: String, reason: String },
}

fn join(failures: &[ProviderFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
