use crate::endpoint::Endpoint;
use crate::error::{InferenceError, ProviderError};
use crate::provider::InferenceProvider;
use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use schema::{DetectRequest, DetectResponse, HEALTH_PATH, HealthResponse};
use std::time::Duration;

/// Longest error body kept in a `Status` failure.
const MAX_ERROR_BODY: usize = 256;

/// Provider speaking the `POST /detect-drowsiness` JSON contract.
pub struct HttpProvider {
    name: String,
    url: Url,
    timeout: Duration,
    client: reqwest::Client,
}

impl HttpProvider {
    pub fn new(endpoint: &Endpoint) -> Result<Self, InferenceError> {
        let invalid = |reason: String| InferenceError::InvalidEndpoint {
            name: endpoint.name.clone(),
            reason,
        };

        let url = Url::parse(&endpoint.url).map_err(|e| invalid(e.to_string()))?;
        let client = reqwest::Client::builder()
            .timeout(endpoint.timeout)
            .build()
            .map_err(|e| invalid(e.to_string()))?;

        Ok(Self {
            name: endpoint.name.clone(),
            url,
            timeout: endpoint.timeout,
            client,
        })
    }

    /// `GET /health` on the same host. Not used on the inference path.
    pub async fn health(&self) -> Result<HealthResponse, ProviderError> {
        let url = self
            .url
            .join(HEALTH_PATH)
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.map_transport(e))?;
        let body = read_success(response).await?;
        serde_json::from_slice(&body).map_err(|e| ProviderError::MalformedResponse(e.to_string()))
    }

    fn map_transport(&self, e: reqwest::Error) -> ProviderError {
        if e.is_timeout() {
            ProviderError::Timeout(self.timeout)
        } else {
            ProviderError::Transport(e.to_string())
        }
    }
}

#[async_trait]
impl InferenceProvider for HttpProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn detect(&self, request: &DetectRequest) -> Result<DetectResponse, ProviderError> {
        let response = self
            .client
            .post(self.url.clone())
            .json(request)
            .send()
            .await
            .map_err(|e| self.map_transport(e))?;

        let body = read_success(response).await?;
        serde_json::from_slice(&body).map_err(|e| ProviderError::MalformedResponse(e.to_string()))
    }
}

/// Body of a 2xx response; anything else becomes a `ProviderError`.
async fn read_success(response: reqwest::Response) -> Result<Vec<u8>, ProviderError> {
    let status = response.status();
    let body = response
        .bytes()
        .await
        .map_err(|e| ProviderError::Transport(e.to_string()))?;

    if status.is_success() {
        return Ok(body.to_vec());
    }

    let text = error_text(&body);
    if status == StatusCode::SERVICE_UNAVAILABLE {
        return Err(ProviderError::ModelNotReady(text));
    }
    Err(ProviderError::Status {
        status: status.as_u16(),
        body: text,
    })
}

/// Prefer the `error` field of a JSON error body, else the raw text.
fn error_text(body: &[u8]) -> String {
    let text = serde_json::from_slice::<schema::ErrorBody>(body)
        .map(|b| b.error)
        .unwrap_or_else(|_| String::from_utf8_lossy(body).into_owned());
    text.chars().take(MAX_ERROR_BODY).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_text_prefers_json_field() {
        assert_eq!(error_text(br#"{"error":"model not ready"}"#), "model not ready");
        assert_eq!(error_text(b"plain failure"), "plain failure");
    }

    #[test]
    fn error_text_is_truncated() {
        let long = vec![b'x'; 1000];
        assert_eq!(error_text(&long).len(), MAX_ERROR_BODY);
    }

    #[test]
    fn invalid_url_is_rejected() {
        let endpoint = Endpoint::new("primary", "not a url", Duration::from_secs(1));
        assert!(matches!(
            HttpProvider::new(&endpoint),
            Err(InferenceError::InvalidEndpoint { .. })
        ));
    }
}
