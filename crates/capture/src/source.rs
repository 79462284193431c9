use crate::config::{CaptureConfig, SourceKind};
use crate::frame::{Frame, PixelFormat};
use crate::pacing::FramePacer;
use anyhow::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

/// A capture collaborator running at its own cadence.
pub trait FrameSource: Send {
    /// Capture until `shutdown` is set, handing every frame to `publish`.
    fn run(&mut self, publish: &mut dyn FnMut(Frame), shutdown: &AtomicBool) -> Result<()>;
}

/// Moving gradient test pattern. Frame `n` is a pure function of `n`.
pub struct SyntheticSource {
    width: u32,
    height: u32,
    pacer: FramePacer,
    frame_count: u64,
}

impl SyntheticSource {
    pub fn new(width: u32, height: u32, fps: f64) -> Self {
        Self {
            width,
            height,
            pacer: FramePacer::new(fps),
            frame_count: 0,
        }
    }

    pub fn frame(&self, n: u64) -> Frame {
        let shift = (n % 256) as u32;
        let mut pixels = Vec::with_capacity(self.width as usize * self.height as usize * 3);
        for y in 0..self.height {
            for x in 0..self.width {
                let r = ((x * 255) / self.width.max(1) + shift) as u8;
                let g = ((y * 255) / self.height.max(1)) as u8;
                let b = (((x + y) * 127) / (self.width + self.height).max(1)) as u8;
                pixels.extend_from_slice(&[r, g, b]);
            }
        }
        Frame::new(pixels, self.width, self.height, PixelFormat::Rgb8)
    }
}

impl FrameSource for SyntheticSource {
    fn run(&mut self, publish: &mut dyn FnMut(Frame), shutdown: &AtomicBool) -> Result<()> {
        tracing::info!(
            width = self.width,
            height = self.height,
            "Synthetic frame source started"
        );

        while !shutdown.load(Ordering::Relaxed) {
            let start = Instant::now();
            publish(self.frame(self.frame_count));
            self.frame_count += 1;
            self.pacer.wait(start);
        }

        tracing::info!(frames = self.frame_count, "Synthetic frame source stopped");
        Ok(())
    }
}

/// Build the configured frame source.
pub fn open_source(config: &CaptureConfig) -> Result<Box<dyn FrameSource>> {
    match config.source {
        SourceKind::Synthetic => Ok(Box::new(SyntheticSource::new(
            config.width,
            config.height,
            config.fps,
        ))),
        #[cfg(feature = "camera")]
        SourceKind::Camera => Ok(Box::new(crate::camera::CameraSource::open(config)?)),
        #[cfg(not(feature = "camera"))]
        SourceKind::Camera => {
            anyhow::bail!("Camera source requested but the `camera` feature is disabled")
        }
    }
}
