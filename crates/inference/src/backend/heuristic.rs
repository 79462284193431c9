use super::{InferenceBackend, InferenceOutput};
use ndarray::{Array, IxDyn, arr1};
use schema::Metrics;

/// Contrast (population std-dev of luma) that counts as a fully engaged face.
const FULL_CONTRAST: f64 = 0.25;

/// Lower-fidelity estimate used by the fallback service when no trained
/// model is available: well-exposed, high-contrast frames score as alert,
/// dark or flat frames as drowsy.
#[derive(Debug, Default)]
pub struct HeuristicBackend;

impl InferenceBackend for HeuristicBackend {
    fn name(&self) -> &str {
        "heuristic"
    }

    fn infer(&mut self, input: &Array<f32, IxDyn>) -> anyhow::Result<InferenceOutput> {
        let shape = input.shape();
        if shape.len() != 4 || shape[0] != 1 {
            anyhow::bail!("expected [1, H, W, C] input, got {:?}", shape);
        }
        let channels = shape[3];
        if channels == 0 || input.is_empty() {
            anyhow::bail!("input has no pixels");
        }

        let lumas: Vec<f64> = input
            .as_slice()
            .map(|s| s.to_vec())
            .unwrap_or_else(|| input.iter().copied().collect())
            .chunks_exact(channels)
            .map(|px| match px {
                [r, g, b, ..] => 0.299 * *r as f64 + 0.587 * *g as f64 + 0.114 * *b as f64,
                [l, ..] => *l as f64,
                [] => 0.0,
            })
            .collect();

        let count = lumas.len() as f64;
        let brightness = lumas.iter().sum::<f64>() / count;
        let variance = lumas.iter().map(|l| (l - brightness).powi(2)).sum::<f64>() / count;
        let contrast = variance.sqrt();

        let exposure_score = 1.0 - ((brightness - 0.5).abs() * 2.0).min(1.0);
        let contrast_score = (contrast / FULL_CONTRAST).min(1.0);
        let probability = 0.5 * exposure_score + 0.5 * contrast_score;

        let mut metrics = Metrics::new();
        metrics.insert("brightness".into(), brightness);
        metrics.insert("contrast".into(), contrast);

        Ok(InferenceOutput {
            scores: arr1(&[probability as f32]).into_dyn(),
            metrics,
        })
    }
}
