//! Wire contract shared by the model service, the inference client and the
//! session loop: request/response bodies, the normalized result type and the
//! confidence → alertness policy.

pub mod alertness;
pub mod result;
pub mod wire;

pub use alertness::{AlertnessLevel, ParseAlertnessError, classify};
pub use result::{InferenceResult, Metrics, clamp_confidence};
pub use wire::{
    DetectRequest, DetectResponse, ErrorBody, HealthResponse, LoadModelRequest, ModelEntry,
    ModelsResponse, ShapeBody,
};

/// Route of the detection call on both primary and fallback services.
pub const DETECT_PATH: &str = "/detect-drowsiness";
pub const HEALTH_PATH: &str = "/health";
pub const MODELS_PATH: &str = "/models";
pub const LOAD_MODEL_PATH: &str = "/load-model";
