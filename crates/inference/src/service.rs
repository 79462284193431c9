use crate::backend::{BackendKind, BackendLoader, confidence_from_scores};
use crate::config::ServiceConfig;
use crate::error::ServiceError;
use crate::state::{ModelRegistry, ModelState};
use opentelemetry::{
    KeyValue, global,
    metrics::{Counter, Histogram},
};
use preprocess::CpuPreProcessor;
use schema::{
    DetectRequest, DetectResponse, HealthResponse, InferenceResult, ModelEntry, ModelsResponse,
    ShapeBody,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

/// Path reported for the built-in heuristic, which has no model file.
pub const BUILTIN_HEURISTIC: &str = "builtin:heuristic";

const MODEL_EXTENSION: &str = "onnx";

struct ServiceMetrics {
    duration: Histogram<f64>,
    requests: Counter<u64>,
    rejected: Counter<u64>,
}

fn init_metrics(meter_name: &'static str) -> ServiceMetrics {
    let meter = global::meter(meter_name);
    let latency_buckets = [
        0.001, 0.002, 0.005, 0.01, 0.02, 0.05, 0.1, 0.2, 0.5, 1.0, 2.0, 5.0,
    ];
    ServiceMetrics {
        duration: meter
            .f64_histogram("model_inference_duration_seconds")
            .with_description("Time to serve one detection (decode + preprocess + infer)")
            .with_unit("s")
            .with_boundaries(latency_buckets.to_vec())
            .build(),
        requests: meter
            .u64_counter("model_requests_total")
            .with_description("Detection requests that produced a result")
            .build(),
        rejected: meter
            .u64_counter("model_requests_rejected_total")
            .with_description("Detection requests answered with an error")
            .build(),
    }
}

pub struct ModelService {
    config: ServiceConfig,
    registry: Arc<ModelRegistry>,
    loader: BackendLoader,
    metrics: ServiceMetrics,
}

impl ModelService {
    pub fn new(config: ServiceConfig) -> Self {
        let loader = config.backend.loader();
        Self::with_loader(config, loader)
    }

    pub fn with_loader(config: ServiceConfig, loader: BackendLoader) -> Self {
        Self {
            config,
            registry: Arc::new(ModelRegistry::new()),
            loader,
            metrics: init_metrics("model-service"),
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub async fn state(&self) -> ModelState {
        self.registry.state().await
    }

    /// Load whatever the configuration asks for at boot. A failure leaves the
    /// service up in the `failed` state.
    pub async fn load_startup_model(&self) {
        let path = match (&self.config.model_path, self.config.backend) {
            (Some(path), _) => self.resolve(path),
            (None, BackendKind::Heuristic) => PathBuf::from(BUILTIN_HEURISTIC),
            (None, BackendKind::Onnx) => {
                tracing::warn!("MODEL_PATH not set, waiting for POST /load-model");
                return;
            }
        };

        if let Err(e) = self.load_resolved(path).await {
            tracing::error!(error = %e, "Startup model load failed");
        }
    }

    #[tracing::instrument(skip_all, fields(timestamp = request.timestamp))]
    pub async fn detect(&self, request: DetectRequest) -> Result<DetectResponse, ServiceError> {
        let result = self.run_detect(request).await;
        match &result {
            Ok(_) => self.metrics.requests.add(1, &[]),
            Err(e) => self
                .metrics
                .rejected
                .add(1, &[KeyValue::new("reason", e.kind())]),
        }
        result
    }

    async fn run_detect(&self, request: DetectRequest) -> Result<DetectResponse, ServiceError> {
        if request.image.trim().is_empty() {
            return Err(ServiceError::BadPayload("image is empty".into()));
        }

        let model = self.registry.loaded().await?;
        let start = Instant::now();

        let result = tokio::task::spawn_blocking(move || -> Result<_, ServiceError> {
            let mut preprocessor = CpuPreProcessor::new(model.input_shape)?;
            let tensor = preprocessor.preprocess_payload(&request.image)?;

            let mut backend = model
                .backend
                .lock()
                .map_err(|_| ServiceError::Inference("backend lock poisoned".into()))?;
            let output = backend
                .infer(&tensor)
                .map_err(|e| ServiceError::Inference(format!("{:#}", e)))?;
            let confidence = confidence_from_scores(&output.scores)
                .map_err(|e| ServiceError::Inference(e.to_string()))?;

            Ok(InferenceResult::from_confidence(confidence)
                .with_metrics(output.metrics)
                .with_model(backend.name()))
        })
        .await
        .map_err(|e| ServiceError::Inference(format!("inference task failed: {}", e)))??;

        self.metrics
            .duration
            .record(start.elapsed().as_secs_f64(), &[]);

        tracing::debug!(
            confidence = result.confidence,
            alertness = %result.alertness,
            "Detection served"
        );

        Ok(result.into())
    }

    pub async fn health(&self) -> HealthResponse {
        let state = self.registry.state().await;
        HealthResponse {
            status: "ok".to_string(),
            model_loaded: state.is_loaded(),
            model_state: state.as_str().to_string(),
            model_path: state.path().map(|p| p.display().to_string()),
            input_shape: state.input_shape().map(|shape| ShapeBody {
                width: shape.width,
                height: shape.height,
                channels: shape.channels,
            }),
        }
    }

    /// `*.onnx` files in the models directory, sorted by name.
    pub async fn models(&self) -> ModelsResponse {
        let state = self.registry.state().await;
        let current = state
            .is_loaded()
            .then(|| state.path().map(|p| p.display().to_string()))
            .flatten();

        let mut models = Vec::new();
        match tokio::fs::read_dir(&self.config.models_dir).await {
            Ok(mut entries) => {
                while let Ok(Some(entry)) = entries.next_entry().await {
                    let path = entry.path();
                    if path.extension().and_then(|e| e.to_str()) != Some(MODEL_EXTENSION) {
                        continue;
                    }
                    let name = path
                        .file_stem()
                        .map(|s| s.to_string_lossy().into_owned())
                        .unwrap_or_default();
                    let path = path.display().to_string();
                    models.push(ModelEntry {
                        loaded: current.as_deref() == Some(path.as_str()),
                        name,
                        path,
                    });
                }
            }
            Err(e) => {
                tracing::debug!(
                    dir = %self.config.models_dir.display(),
                    error = %e,
                    "Models directory not readable"
                );
            }
        }
        models.sort_by(|a, b| a.name.cmp(&b.name));

        ModelsResponse { models, current }
    }

    pub async fn load_model(&self, path: &str) -> Result<HealthResponse, ServiceError> {
        let path = path.trim();
        if path.is_empty() {
            return Err(ServiceError::BadPayload("path is empty".into()));
        }
        self.load_resolved(self.resolve(Path::new(path))).await?;
        Ok(self.health().await)
    }

    /// Bare file names are looked up in the models directory.
    fn resolve(&self, path: &Path) -> PathBuf {
        if path.components().count() == 1 && !path.has_root() {
            self.config.models_dir.join(path)
        } else {
            path.to_path_buf()
        }
    }

    /// The load runs on its own task so that `loading` is always left, even
    /// when the caller stops waiting.
    async fn load_resolved(&self, path: PathBuf) -> Result<(), ServiceError> {
        self.registry.begin_load(path.clone()).await?;

        let registry = Arc::clone(&self.registry);
        let loader = self.loader.clone();
        let shape = self.config.input_shape;
        let task = tokio::spawn(async move {
            let load_path = path.clone();
            let outcome = tokio::task::spawn_blocking(move || {
                loader(&load_path, shape).map(|backend| (backend, shape))
            })
            .await
            .unwrap_or_else(|e| Err(anyhow::anyhow!("load task failed: {}", e)));
            registry.finish_load(path, outcome).await
        });

        match task.await {
            Ok(ModelState::Failed { reason, .. }) => Err(ServiceError::LoadFailed(reason)),
            Ok(_) => Ok(()),
            Err(e) => Err(ServiceError::LoadFailed(format!("load task failed: {}", e))),
        }
    }
}
