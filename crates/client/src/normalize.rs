use schema::{AlertnessLevel, DetectResponse, InferenceResult, Metrics, classify, clamp_confidence};

/// Turn a backend response into an [`InferenceResult`].
///
/// The confidence is clamped. A recognizable self-reported label is kept,
/// otherwise the label comes from [`classify`]. Non-numeric metric values are
/// dropped.
pub fn normalize(response: DetectResponse) -> InferenceResult {
    let confidence = clamp_confidence(response.confidence);

    let alertness = response
        .alertness
        .as_deref()
        .and_then(|label| label.parse::<AlertnessLevel>().ok())
        .unwrap_or_else(|| classify(confidence));

    let metrics: Metrics = response
        .metrics
        .unwrap_or_default()
        .into_iter()
        .filter_map(|(key, value)| value.as_f64().map(|v| (key, v)))
        .collect();

    InferenceResult {
        confidence,
        alertness,
        metrics,
        model_used: response.model_used,
    }
}
