use common::{env_or, env_parse};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Deterministic test pattern, no hardware needed.
    Synthetic,
    /// V4L2 webcam (requires the `camera` feature).
    Camera,
}

#[derive(Debug, Clone)]
pub struct CaptureConfig {
    pub source: SourceKind,
    pub device_id: u32,
    pub width: u32,
    pub height: u32,
    pub fps: f64,
}

impl CaptureConfig {
    pub fn from_env() -> Self {
        let source = match env_or("FRAME_SOURCE", "synthetic").to_lowercase().as_str() {
            "camera" | "v4l" | "webcam" => SourceKind::Camera,
            _ => SourceKind::Synthetic,
        };

        Self {
            source,
            device_id: env_parse("CAMERA_DEVICE_ID", 0),
            width: env_parse("FRAME_WIDTH", 640),
            height: env_parse("FRAME_HEIGHT", 480),
            fps: env_parse("CAPTURE_FPS", 15.0),
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            source: SourceKind::Synthetic,
            device_id: 0,
            width: 640,
            height: 480,
            fps: 15.0,
        }
    }
}
