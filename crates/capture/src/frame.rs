use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    Rgb8,
    Bgr8,
    Gray8,
}

impl PixelFormat {
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            PixelFormat::Rgb8 | PixelFormat::Bgr8 => 3,
            PixelFormat::Gray8 => 1,
        }
    }
}

/// One captured video frame. Produced per capture, consumed by the encoder.
#[derive(Debug, Clone)]
pub struct Frame {
    pub pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    /// Monotonic capture instant, used for ordering and staleness.
    pub captured_at: Instant,
    /// Wall-clock capture time in epoch milliseconds, sent on the wire.
    pub timestamp_ms: i64,
}

impl Frame {
    /// Wrap a pixel buffer, stamping it with the current time.
    pub fn new(pixels: Vec<u8>, width: u32, height: u32, format: PixelFormat) -> Self {
        Self {
            pixels,
            width,
            height,
            format,
            captured_at: Instant::now(),
            timestamp_ms: chrono::Utc::now().timestamp_millis(),
        }
    }

    pub fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize * self.format.bytes_per_pixel()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expected_len_follows_format() {
        let rgb = Frame::new(vec![0; 12], 2, 2, PixelFormat::Rgb8);
        assert_eq!(rgb.expected_len(), 12);

        let gray = Frame::new(vec![0; 4], 2, 2, PixelFormat::Gray8);
        assert_eq!(gray.expected_len(), 4);
    }

    #[test]
    fn new_stamps_wall_clock() {
        let frame = Frame::new(vec![0; 3], 1, 1, PixelFormat::Rgb8);
        assert!(frame.timestamp_ms > 0);
    }
}
