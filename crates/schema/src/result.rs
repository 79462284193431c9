use crate::alertness::{AlertnessLevel, classify};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Auxiliary numeric measurements reported alongside a confidence.
pub type Metrics = BTreeMap<String, f64>;

pub const CONFIDENCE_MIN: f32 = 0.0;
pub const CONFIDENCE_MAX: f32 = 100.0;

/// Clamp a raw confidence into `[0, 100]`. NaN becomes 0.
pub fn clamp_confidence(raw: f32) -> f32 {
    if raw.is_nan() {
        CONFIDENCE_MIN
    } else {
        raw.clamp(CONFIDENCE_MIN, CONFIDENCE_MAX)
    }
}

/// Normalized outcome of one detection, whichever backend produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InferenceResult {
    pub confidence: f32,
    pub alertness: AlertnessLevel,
    #[serde(default)]
    pub metrics: Metrics,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_used: Option<String>,
}

impl InferenceResult {
    /// Build a result from a raw confidence, classifying it with the
    /// threshold table.
    pub fn from_confidence(raw: f32) -> Self {
        let confidence = clamp_confidence(raw);
        Self {
            confidence,
            alertness: classify(confidence),
            metrics: Metrics::new(),
            model_used: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model_used = Some(model.into());
        self
    }
}
