use super::{InferenceBackend, InferenceOutput};
use ndarray::{Array, IxDyn};
use ort::{
    session::{Session, builder::GraphOptimizationLevel},
    value::TensorRef,
};
use schema::Metrics;
use std::path::Path;

#[derive(Debug, Clone, Copy)]
pub enum ExecutionProvider {
    Cpu,
    #[cfg(feature = "cuda")]
    Cuda,
}

impl Default for ExecutionProvider {
    fn default() -> Self {
        #[cfg(feature = "cuda")]
        return ExecutionProvider::Cuda;
        #[cfg(not(feature = "cuda"))]
        ExecutionProvider::Cpu
    }
}

pub struct OrtBackend {
    session: Session,
    name: String,
}

impl OrtBackend {
    pub fn load_model(path: &Path) -> anyhow::Result<Self> {
        Self::load_model_with_provider(path, ExecutionProvider::default())
    }

    pub fn load_model_with_provider(
        path: &Path,
        provider: ExecutionProvider,
    ) -> anyhow::Result<Self> {
        // Idempotent
        let _ = ort::init().commit();

        #[allow(unused_mut)]
        let mut builder = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(4)?;

        match provider {
            #[cfg(feature = "cuda")]
            ExecutionProvider::Cuda => {
                tracing::info!("Initializing ONNX Runtime with CUDA execution provider");
                builder = builder.with_execution_providers([
                    ort::execution_providers::CUDAExecutionProvider::default()
                        .with_device_id(0)
                        .build(),
                ])?;
            }
            ExecutionProvider::Cpu => {
                tracing::info!("Initializing ONNX Runtime with CPU execution provider");
            }
        }

        let session = builder.commit_from_file(path)?;
        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "onnx".to_string());

        tracing::info!(path = %path.display(), model = %name, "Model loaded");
        Ok(Self { session, name })
    }
}

impl InferenceBackend for OrtBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn infer(&mut self, input: &Array<f32, IxDyn>) -> anyhow::Result<InferenceOutput> {
        let outputs = self
            .session
            .run(ort::inputs![TensorRef::from_array_view(input.view())?])?;

        let scores = outputs[0].try_extract_array::<f32>()?.into_owned();

        Ok(InferenceOutput {
            scores,
            metrics: Metrics::new(),
        })
    }
}
