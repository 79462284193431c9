pub mod cpu;
pub mod payload;

use thiserror::Error;

pub use cpu::CpuPreProcessor;
pub use payload::{decode_payload, strip_data_url};

/// Model input geometry: width, height and channels (1 = luma, 3 = RGB).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputShape {
    pub width: u32,
    pub height: u32,
    pub channels: u32,
}

impl InputShape {
    pub const fn new(width: u32, height: u32, channels: u32) -> Self {
        Self {
            width,
            height,
            channels,
        }
    }

    /// `[1, height, width, channels]`
    pub fn batch_dims(&self) -> [usize; 4] {
        [
            1,
            self.height as usize,
            self.width as usize,
            self.channels as usize,
        ]
    }
}

pub const DEFAULT_INPUT_SHAPE: InputShape = InputShape::new(224, 224, 3);

impl Default for InputShape {
    fn default() -> Self {
        DEFAULT_INPUT_SHAPE
    }
}

#[derive(Error, Debug)]
pub enum PreprocessError {
    #[error("Invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Failed to decode image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("Failed to resize image: {0}")]
    Resize(#[from] fast_image_resize::ResizeError),

    #[error("Invalid image buffer: {0}")]
    Buffer(#[from] fast_image_resize::ImageBufferError),

    #[error("Tensor shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    #[error("Unsupported channel count {0} (expected 1 or 3)")]
    UnsupportedChannels(u32),

    #[error("Input shape must be non-zero, got {0}x{1}")]
    EmptyShape(u32, u32),
}
