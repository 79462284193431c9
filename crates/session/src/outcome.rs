use schema::InferenceResult;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TickStage {
    Encode,
    Inference,
}

impl fmt::Display for TickStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TickStage::Encode => "encode",
            TickStage::Inference => "inference",
        })
    }
}

/// What one tick publishes. Ticks without a frame publish nothing.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TickOutcome {
    Result {
        /// Capture time of the frame the result belongs to (epoch ms).
        timestamp: i64,
        #[serde(flatten)]
        result: InferenceResult,
    },
    Failed {
        timestamp: i64,
        stage: TickStage,
        reason: String,
    },
}

impl TickOutcome {
    pub fn result(&self) -> Option<&InferenceResult> {
        match self {
            TickOutcome::Result { result, .. } => Some(result),
            TickOutcome::Failed { .. } => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, TickOutcome::Failed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn result_serializes_flat_with_status_tag() {
        let outcome = TickOutcome::Result {
            timestamp: 5,
            result: InferenceResult::from_confidence(65.0).with_model("heuristic"),
        };
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["status"], "result");
        assert_eq!(value["confidence"], json!(65.0));
        assert_eq!(value["alertness"], "Alert");
        assert_eq!(value["modelUsed"], "heuristic");
    }

    #[test]
    fn failure_names_its_stage() {
        let outcome = TickOutcome::Failed {
            timestamp: 5,
            stage: TickStage::Inference,
            reason: "all inference providers failed".into(),
        };
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["status"], "failed");
        assert_eq!(value["stage"], "inference");
    }
}
