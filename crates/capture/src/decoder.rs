use crate::frame::{Frame, PixelFormat};
use anyhow::{Result, bail};
use common::span_debug;

/// Converts one raw camera buffer into an RGB [`Frame`].
pub trait FrameDecoder: Send {
    fn decode(&mut self, raw: &[u8], width: u32, height: u32) -> Result<Frame>;
}

/// YUYV (YUV 4:2:2) decoder.
///
/// YUYV packs 2 pixels in 4 bytes: [Y0, U, Y1, V]
#[derive(Default)]
pub struct YuyvDecoder;

impl FrameDecoder for YuyvDecoder {
    fn decode(&mut self, raw: &[u8], width: u32, height: u32) -> Result<Frame> {
        let _s = span_debug!("decode_yuyv");

        if width == 0 || height == 0 || width % 2 != 0 {
            bail!("YUYV frame needs a non-zero, even width ({}x{})", width, height);
        }

        let bytes_per_row = width as usize * 2;
        let stride = raw.len() / height as usize;
        if stride < bytes_per_row {
            bail!(
                "YUYV buffer too small: {} bytes for {}x{}",
                raw.len(),
                width,
                height
            );
        }

        let mut rgb = Vec::with_capacity(width as usize * height as usize * 3);
        for row in raw.chunks(stride).take(height as usize) {
            for chunk in row[..bytes_per_row].chunks_exact(4) {
                let y0 = chunk[0] as i32;
                let u = chunk[1] as i32 - 128;
                let y1 = chunk[2] as i32;
                let v = chunk[3] as i32 - 128;

                // BT.601 fixed-point coefficients (8-bit fraction)
                let rv = (359 * v) >> 8;
                let gu = (88 * u + 183 * v) >> 8;
                let bu = (454 * u) >> 8;

                for y in [y0, y1] {
                    rgb.push((y + rv).clamp(0, 255) as u8);
                    rgb.push((y - gu).clamp(0, 255) as u8);
                    rgb.push((y + bu).clamp(0, 255) as u8);
                }
            }
        }

        Ok(Frame::new(rgb, width, height, PixelFormat::Rgb8))
    }
}

/// MJPEG decoder using turbojpeg (libjpeg-turbo)
#[cfg(feature = "camera")]
pub struct MjpegDecoder {
    decompressor: turbojpeg::Decompressor,
}

#[cfg(feature = "camera")]
impl MjpegDecoder {
    pub fn new() -> Result<Self> {
        Ok(Self {
            decompressor: turbojpeg::Decompressor::new()?,
        })
    }
}

#[cfg(feature = "camera")]
impl FrameDecoder for MjpegDecoder {
    fn decode(&mut self, raw: &[u8], _width: u32, _height: u32) -> Result<Frame> {
        let _s = span_debug!("decode_mjpeg");

        let header = self.decompressor.read_header(raw)?;
        let mut rgb = vec![0u8; header.width * header.height * 3];

        let output = turbojpeg::Image {
            pixels: rgb.as_mut_slice(),
            width: header.width,
            pitch: header.width * 3,
            height: header.height,
            format: turbojpeg::PixelFormat::RGB,
        };
        self.decompressor.decompress(raw, output)?;

        Ok(Frame::new(
            rgb,
            header.width as u32,
            header.height as u32,
            PixelFormat::Rgb8,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neutral_chroma_decodes_to_gray() {
        let mut decoder = YuyvDecoder;
        let yuyv = vec![128, 128, 128, 128];
        let frame = decoder.decode(&yuyv, 2, 1).unwrap();
        assert_eq!(frame.pixels, vec![128; 6]);
        assert_eq!(frame.format, PixelFormat::Rgb8);
    }

    #[test]
    fn handles_padded_rows() {
        let mut decoder = YuyvDecoder;
        // 2x2 image, 4 bytes of payload plus 4 bytes row padding
        let yuyv = vec![
            16, 128, 16, 128, 0, 0, 0, 0, //
            235, 128, 235, 128, 0, 0, 0, 0,
        ];
        let frame = decoder.decode(&yuyv, 2, 2).unwrap();
        assert_eq!(frame.pixels.len(), 12);
        assert_eq!(frame.pixels[0], 16);
        assert_eq!(frame.pixels[6], 235);
    }

    #[test]
    fn rejects_short_buffer() {
        let mut decoder = YuyvDecoder;
        assert!(decoder.decode(&[0, 0], 4, 2).is_err());
        assert!(decoder.decode(&[0; 8], 3, 1).is_err());
    }

    #[cfg(feature = "camera")]
    #[test]
    fn mjpeg_rejects_invalid_data() {
        let mut decoder = MjpegDecoder::new().unwrap();
        assert!(decoder.decode(&[0, 1, 2, 3], 640, 480).is_err());
    }
}
