use crate::endpoint::EndpointConfig;
use crate::error::{InferenceError, ProviderError, ProviderFailure};
use crate::http::HttpProvider;
use crate::normalize::normalize;
use crate::provider::InferenceProvider;
use capture::EncodedPayload;
use opentelemetry::{
    KeyValue, global,
    metrics::{Counter, Histogram},
};
use schema::{DetectRequest, InferenceResult};
use std::time::Instant;

struct ChainMetrics {
    requests: Counter<u64>,
    failures: Counter<u64>,
    latency: Histogram<f64>,
}

fn init_metrics(meter_name: &'static str) -> ChainMetrics {
    let meter = global::meter(meter_name);
    ChainMetrics {
        requests: meter
            .u64_counter("client_requests_total")
            .with_description("Detection attempts per provider")
            .build(),
        failures: meter
            .u64_counter("client_failures_total")
            .with_description("Failed detection attempts per provider and reason")
            .build(),
        latency: meter
            .f64_histogram("client_request_duration_seconds")
            .with_description("Latency of successful detection attempts")
            .with_unit("s")
            .with_boundaries(vec![0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.0, 3.0, 5.0])
            .build(),
    }
}

/// Providers tried in priority order, one pass, no retries.
pub struct ProviderChain {
    providers: Vec<Box<dyn InferenceProvider>>,
    metrics: ChainMetrics,
}

impl ProviderChain {
    pub fn new(providers: Vec<Box<dyn InferenceProvider>>) -> Result<Self, InferenceError> {
        if providers.is_empty() {
            return Err(InferenceError::NoEndpoints);
        }
        Ok(Self {
            providers,
            metrics: init_metrics("inference-client"),
        })
    }

    /// One [`HttpProvider`] per endpoint, in configuration order.
    pub fn from_config(config: &EndpointConfig) -> Result<Self, InferenceError> {
        let providers = config
            .endpoints()
            .iter()
            .map(|endpoint| {
                HttpProvider::new(endpoint).map(|p| Box::new(p) as Box<dyn InferenceProvider>)
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(providers)
    }

    pub fn provider_names(&self) -> impl Iterator<Item = &str> {
        self.providers.iter().map(|p| p.name())
    }

    pub async fn infer(&self, payload: &EncodedPayload) -> Result<InferenceResult, InferenceError> {
        let request = DetectRequest {
            image: payload.to_data_url(),
            timestamp: payload.timestamp_ms,
        };
        self.infer_request(&request).await
    }

    pub async fn infer_request(
        &self,
        request: &DetectRequest,
    ) -> Result<InferenceResult, InferenceError> {
        let mut failures = Vec::new();

        for provider in &self.providers {
            let attrs = [KeyValue::new("provider", provider.name().to_string())];
            self.metrics.requests.add(1, &attrs);
            let start = Instant::now();

            let outcome = match tokio::time::timeout(provider.timeout(), provider.detect(request))
                .await
            {
                Ok(result) => result,
                Err(_) => Err(ProviderError::Timeout(provider.timeout())),
            };

            match outcome {
                Ok(response) => {
                    self.metrics
                        .latency
                        .record(start.elapsed().as_secs_f64(), &attrs);
                    let result = normalize(response);
                    tracing::debug!(
                        provider = provider.name(),
                        confidence = result.confidence,
                        alertness = %result.alertness,
                        "Detection succeeded"
                    );
                    return Ok(result);
                }
                Err(error) => {
                    tracing::warn!(
                        provider = provider.name(),
                        error = %error,
                        "Provider failed, trying next"
                    );
                    self.metrics.failures.add(
                        1,
                        &[
                            KeyValue::new("provider", provider.name().to_string()),
                            KeyValue::new("reason", error.kind()),
                        ],
                    );
                    failures.push(ProviderFailure {
                        provider: provider.name().to_string(),
                        error,
                    });
                }
            }
        }

        Err(InferenceError::Unavailable { failures })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use schema::{AlertnessLevel, DetectResponse};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct Scripted {
        name: &'static str,
        delay: Duration,
        answer: Result<f32, ProviderError>,
        calls: Arc<AtomicUsize>,
    }

    impl Scripted {
        fn boxed(
            name: &'static str,
            delay_ms: u64,
            answer: Result<f32, ProviderError>,
            calls: &Arc<AtomicUsize>,
        ) -> Box<dyn InferenceProvider> {
            Box::new(Self {
                name,
                delay: Duration::from_millis(delay_ms),
                answer,
                calls: calls.clone(),
            })
        }
    }

    #[async_trait]
    impl InferenceProvider for Scripted {
        fn name(&self) -> &str {
            self.name
        }

        fn timeout(&self) -> Duration {
            Duration::from_millis(50)
        }

        async fn detect(&self, _request: &DetectRequest) -> Result<DetectResponse, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.answer.clone().map(|confidence| DetectResponse {
                confidence,
                alertness: None,
                metrics: None,
                model_used: None,
            })
        }
    }

    fn request() -> DetectRequest {
        DetectRequest {
            image: "aGk=".into(),
            timestamp: 0,
        }
    }

    #[test]
    fn empty_chain_is_rejected() {
        assert!(matches!(
            ProviderChain::new(Vec::new()),
            Err(InferenceError::NoEndpoints)
        ));
    }

    #[tokio::test]
    async fn first_success_short_circuits() {
        let calls = Arc::new(AtomicUsize::new(0));
        let chain = ProviderChain::new(vec![
            Scripted::boxed("primary", 0, Ok(72.0), &calls),
            Scripted::boxed("fallback", 0, Ok(10.0), &calls),
        ])
        .unwrap();

        let result = chain.infer_request(&request()).await.unwrap();
        assert_eq!(result.confidence, 72.0);
        assert_eq!(result.alertness, AlertnessLevel::Alert);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn slow_primary_times_out_and_fallback_answers() {
        let calls = Arc::new(AtomicUsize::new(0));
        let chain = ProviderChain::new(vec![
            Scripted::boxed("primary", 500, Ok(90.0), &calls),
            Scripted::boxed("fallback", 0, Ok(30.0), &calls),
        ])
        .unwrap();

        let result = chain.infer_request(&request()).await.unwrap();
        assert_eq!(result.confidence, 30.0);
        assert_eq!(result.alertness, AlertnessLevel::Drowsy);
        assert!(result.model_used.is_none());
    }

    #[tokio::test]
    async fn exhaustion_reports_every_failure_in_order() {
        let calls = Arc::new(AtomicUsize::new(0));
        let chain = ProviderChain::new(vec![
            Scripted::boxed("primary", 500, Ok(90.0), &calls),
            Scripted::boxed(
                "fallback",
                0,
                Err(ProviderError::ModelNotReady("unloaded".into())),
                &calls,
            ),
        ])
        .unwrap();

        match chain.infer_request(&request()).await {
            Err(InferenceError::Unavailable { failures }) => {
                assert_eq!(failures.len(), 2);
                assert_eq!(failures[0].provider, "primary");
                assert!(matches!(failures[0].error, ProviderError::Timeout(_)));
                assert_eq!(failures[1].provider, "fallback");
                assert!(matches!(failures[1].error, ProviderError::ModelNotReady(_)));
            }
            other => panic!("expected Unavailable, got {:?}", other),
        }
    }
}
