use ndarray::{Array, IxDyn};
use preprocess::InputShape;
use schema::{Metrics, clamp_confidence};
use std::path::Path;
use std::sync::Arc;

pub mod heuristic;
#[cfg(feature = "ort-backend")]
pub mod ort;

pub use heuristic::HeuristicBackend;

pub trait InferenceBackend: Send {
    /// Short identifier reported as `modelUsed`.
    fn name(&self) -> &str;

    /// One forward pass over a `[1, H, W, C]` tensor scaled to `[0, 1]`.
    fn infer(&mut self, input: &Array<f32, IxDyn>) -> anyhow::Result<InferenceOutput>;
}

pub struct InferenceOutput {
    /// Either a single probability (binary head) or a class distribution.
    pub scores: ndarray::ArrayD<f32>,
    /// Auxiliary measurements computed alongside the forward pass.
    pub metrics: Metrics,
}

/// Builds a backend for a model path; runs on a blocking thread.
pub type BackendLoader =
    Arc<dyn Fn(&Path, InputShape) -> anyhow::Result<Box<dyn InferenceBackend>> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Onnx,
    Heuristic,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Onnx => "onnx",
            BackendKind::Heuristic => "heuristic",
        }
    }

    pub fn loader(self) -> BackendLoader {
        match self {
            BackendKind::Heuristic => Arc::new(load_heuristic),
            BackendKind::Onnx => Arc::new(load_onnx),
        }
    }
}

fn load_heuristic(_path: &Path, _shape: InputShape) -> anyhow::Result<Box<dyn InferenceBackend>> {
    Ok(Box::new(HeuristicBackend))
}

#[cfg(feature = "ort-backend")]
fn load_onnx(path: &Path, _shape: InputShape) -> anyhow::Result<Box<dyn InferenceBackend>> {
    Ok(Box::new(ort::OrtBackend::load_model(path)?))
}

#[cfg(not(feature = "ort-backend"))]
fn load_onnx(path: &Path, _shape: InputShape) -> anyhow::Result<Box<dyn InferenceBackend>> {
    anyhow::bail!(
        "cannot load {}: built without the `ort-backend` feature",
        path.display()
    )
}

/// Reduce model scores to a confidence in `[0, 100]`.
///
/// A single element is the probability of the binary head; a longer vector
/// is a class distribution and its maximum is used.
pub fn confidence_from_scores(scores: &ndarray::ArrayD<f32>) -> anyhow::Result<f32> {
    let mut values = scores.iter().copied();
    let first = values
        .next()
        .ok_or_else(|| anyhow::anyhow!("model produced an empty output"))?;
    let best = values.fold(first, f32::max);
    Ok(clamp_confidence(best * 100.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr1;

    #[test]
    fn binary_head_scales_probability() {
        let scores = arr1(&[0.73f32]).into_dyn();
        assert!((confidence_from_scores(&scores).unwrap() - 73.0).abs() < 1e-4);
    }

    #[test]
    fn multi_class_uses_max_probability() {
        let scores = ndarray::Array2::from_shape_vec((1, 3), vec![0.1f32, 0.6, 0.3])
            .unwrap()
            .into_dyn();
        assert!((confidence_from_scores(&scores).unwrap() - 60.0).abs() < 1e-4);
    }

    #[test]
    fn out_of_contract_scores_are_clamped() {
        assert_eq!(confidence_from_scores(&arr1(&[1.5f32]).into_dyn()).unwrap(), 100.0);
        assert_eq!(confidence_from_scores(&arr1(&[-0.2f32]).into_dyn()).unwrap(), 0.0);
    }

    #[test]
    fn empty_output_is_an_error() {
        let scores = ndarray::ArrayD::<f32>::zeros(IxDyn(&[1, 0]));
        assert!(confidence_from_scores(&scores).is_err());
    }

    #[cfg(not(feature = "ort-backend"))]
    #[test]
    fn onnx_loader_without_feature_fails() {
        let loader = BackendKind::Onnx.loader();
        assert!(loader(Path::new("model.onnx"), InputShape::default()).is_err());
    }
}
