use crate::result::InferenceResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Body of `POST /detect-drowsiness`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectRequest {
    /// Base64 image, optionally prefixed with `data:image/...;base64,`.
    pub image: String,
    /// Capture time in epoch milliseconds.
    pub timestamp: i64,
}

/// Response of `POST /detect-drowsiness` as a backend sends it.
///
/// `alertness` is a free-form label and `metrics` may carry non-numeric
/// values; the client normalizes both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectResponse {
    pub confidence: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alertness: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<BTreeMap<String, serde_json::Value>>,
    #[serde(default, alias = "model_used", skip_serializing_if = "Option::is_none")]
    pub model_used: Option<String>,
}

impl From<InferenceResult> for DetectResponse {
    fn from(result: InferenceResult) -> Self {
        let metrics = result
            .metrics
            .into_iter()
            .map(|(k, v)| (k, serde_json::Value::from(v)))
            .collect::<BTreeMap<_, _>>();

        Self {
            confidence: result.confidence,
            alertness: Some(result.alertness.to_string()),
            metrics: (!metrics.is_empty()).then_some(metrics),
            model_used: result.model_used,
        }
    }
}

/// Body of `GET /health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub model_loaded: bool,
    pub model_state: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_path: Option<String>,
    /// Present once a model is loaded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_shape: Option<ShapeBody>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShapeBody {
    pub width: u32,
    pub height: u32,
    pub channels: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelEntry {
    pub name: String,
    pub path: String,
    pub loaded: bool,
}

/// Body of `GET /models`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelsResponse {
    pub models: Vec<ModelEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current: Option<String>,
}

/// Body of `POST /load-model`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadModelRequest {
    pub path: String,
}

/// Error body returned with every non-2xx status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AlertnessLevel;

    #[test]
    fn detect_response_accepts_minimal_body() {
        let resp: DetectResponse = serde_json::from_str(r#"{"confidence": 71.5}"#).unwrap();
        assert_eq!(resp.confidence, 71.5);
        assert!(resp.alertness.is_none());
        assert!(resp.metrics.is_none());
        assert!(resp.model_used.is_none());
    }

    #[test]
    fn detect_response_accepts_snake_case_model_field() {
        let resp: DetectResponse =
            serde_json::from_str(r#"{"confidence": 10, "model_used": "fallback"}"#).unwrap();
        assert_eq!(resp.model_used.as_deref(), Some("fallback"));
    }

    #[test]
    fn detect_response_rejects_missing_confidence() {
        assert!(serde_json::from_str::<DetectResponse>(r#"{"alertness": "Alert"}"#).is_err());
    }

    #[test]
    fn result_converts_to_wire_with_label() {
        let mut result = InferenceResult::from_confidence(85.0);
        result.metrics.insert("brightness".into(), 0.4);
        let wire = DetectResponse::from(result);
        assert_eq!(wire.alertness.as_deref(), Some(AlertnessLevel::VeryAlert.as_str()));
        assert_eq!(wire.metrics.unwrap()["brightness"], serde_json::json!(0.4));
    }
}
