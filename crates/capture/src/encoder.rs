use crate::frame::{Frame, PixelFormat};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use common::span_debug;
use image::codecs::{jpeg::JpegEncoder, png::PngEncoder};
use image::{ExtendedColorType, ImageEncoder};
use std::borrow::Cow;
use std::time::Instant;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("Frame buffer is empty")]
    EmptyBuffer,

    #[error("Frame has a zero dimension ({width}x{height})")]
    ZeroDimension { width: u32, height: u32 },

    #[error("Pixel buffer size mismatch: expected {expected} bytes, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Quality must be in (0, 1], got {0}")]
    InvalidQuality(f32),

    #[error("Image encoding failed: {0}")]
    Image(#[from] image::ImageError),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ImageFormat {
    #[default]
    Jpeg,
    Png,
}

impl ImageFormat {
    pub fn mime(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Png => "image/png",
        }
    }
}

/// Encoded image handed to exactly one in-flight request.
#[derive(Debug, Clone)]
pub struct EncodedPayload {
    pub bytes: Vec<u8>,
    pub format: ImageFormat,
    pub quality: f32,
    pub captured_at: Instant,
    pub timestamp_ms: i64,
}

impl EncodedPayload {
    /// `data:<mime>;base64,<payload>` as accepted by the detection endpoint.
    pub fn to_data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.format.mime(),
            STANDARD.encode(&self.bytes)
        )
    }
}

/// Encode a frame as JPEG. `quality` is a factor in `(0, 1]`.
pub fn encode(frame: &Frame, quality: f32) -> Result<EncodedPayload, EncodeError> {
    encode_as(frame, quality, ImageFormat::Jpeg)
}

pub fn encode_as(
    frame: &Frame,
    quality: f32,
    format: ImageFormat,
) -> Result<EncodedPayload, EncodeError> {
    let _s = span_debug!("encode_frame");

    validate(frame)?;
    if !(quality > 0.0 && quality <= 1.0) {
        return Err(EncodeError::InvalidQuality(quality));
    }

    let (pixels, color) = encoder_input(frame);
    let mut bytes = Vec::with_capacity(frame.pixels.len() / 8);

    match format {
        ImageFormat::Jpeg => {
            JpegEncoder::new_with_quality(&mut bytes, jpeg_quality(quality)).write_image(
                &pixels,
                frame.width,
                frame.height,
                color,
            )?;
        }
        ImageFormat::Png => {
            PngEncoder::new(&mut bytes).write_image(&pixels, frame.width, frame.height, color)?;
        }
    }

    tracing::trace!(
        width = frame.width,
        height = frame.height,
        encoded_bytes = bytes.len(),
        "Frame encoded"
    );

    Ok(EncodedPayload {
        bytes,
        format,
        quality,
        captured_at: frame.captured_at,
        timestamp_ms: frame.timestamp_ms,
    })
}

fn validate(frame: &Frame) -> Result<(), EncodeError> {
    if frame.width == 0 || frame.height == 0 {
        return Err(EncodeError::ZeroDimension {
            width: frame.width,
            height: frame.height,
        });
    }
    if frame.pixels.is_empty() {
        return Err(EncodeError::EmptyBuffer);
    }
    let expected = frame.expected_len();
    if frame.pixels.len() != expected {
        return Err(EncodeError::DimensionMismatch {
            expected,
            actual: frame.pixels.len(),
        });
    }
    Ok(())
}

/// Map the `(0, 1]` factor onto libjpeg's `1..=100` scale.
fn jpeg_quality(quality: f32) -> u8 {
    (quality * 100.0).round().clamp(1.0, 100.0) as u8
}

fn encoder_input(frame: &Frame) -> (Cow<'_, [u8]>, ExtendedColorType) {
    match frame.format {
        PixelFormat::Rgb8 => (Cow::Borrowed(&frame.pixels), ExtendedColorType::Rgb8),
        PixelFormat::Gray8 => (Cow::Borrowed(&frame.pixels), ExtendedColorType::L8),
        PixelFormat::Bgr8 => {
            let mut rgb = Vec::with_capacity(frame.pixels.len());
            for chunk in frame.pixels.chunks_exact(3) {
                rgb.extend_from_slice(&[chunk[2], chunk[1], chunk[0]]);
            }
            (Cow::Owned(rgb), ExtendedColorType::Rgb8)
        }
    }
}
