use crate::config::CaptureConfig;
use crate::decoder::{FrameDecoder, MjpegDecoder, YuyvDecoder};
use crate::frame::Frame;
use crate::pacing::FramePacer;
use crate::source::FrameSource;
use anyhow::{Context, Result, anyhow};
use common::{RetryPolicy, retry_with_backoff};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use v4l::{
    Device, FourCC,
    buffer::Type,
    io::{mmap::Stream, traits::CaptureStream},
    video::Capture,
};

const BUFFER_COUNT: u32 = 4;

const FOURCC_YUYV: FourCC = FourCC { repr: *b"YUYV" };
const FOURCC_MJPG: FourCC = FourCC { repr: *b"MJPG" };

const OPEN_RETRY: RetryPolicy = RetryPolicy::new(10, Duration::from_millis(200));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WireFormat {
    Yuyv,
    Mjpeg,
}

fn find_usable_camera() -> Option<u32> {
    v4l::context::enum_devices()
        .into_iter()
        .find(|dev| {
            Device::with_path(dev.path())
                .and_then(|d| d.query_caps())
                .map(|caps| {
                    caps.capabilities
                        .contains(v4l::capability::Flags::VIDEO_CAPTURE)
                })
                .unwrap_or(false)
        })
        .map(|dev| dev.index() as u32)
}

fn open_device(index: u32) -> Result<Device> {
    if let Ok(dev) = Device::new(index as usize)
        && dev.query_caps().is_ok()
    {
        return Ok(dev);
    }

    tracing::debug!(
        "Camera index {} busy or missing, scanning alternatives...",
        index
    );

    let best_idx = find_usable_camera().ok_or_else(|| anyhow!("No usable video devices found"))?;
    Device::new(best_idx as usize).context("Failed to open fallback camera device")
}

/// Prefer YUYV (cheaper decode), fall back to MJPEG.
fn select_format(device: &Device) -> Result<WireFormat> {
    let formats = device.enum_formats()?;

    for fmt in &formats {
        tracing::debug!("Available format {:?}: {}", fmt.fourcc, fmt.description);
    }

    if formats.iter().any(|f| f.fourcc == FOURCC_YUYV) {
        return Ok(WireFormat::Yuyv);
    }
    if formats.iter().any(|f| f.fourcc == FOURCC_MJPG) {
        return Ok(WireFormat::Mjpeg);
    }

    Err(anyhow!(
        "Camera supports neither YUYV nor MJPEG - available: {:?}",
        formats.iter().map(|f| f.fourcc).collect::<Vec<_>>()
    ))
}

/// V4L2 webcam source. Frames are decoded to RGB and paced to the
/// configured rate (never faster than the device delivers).
pub struct CameraSource {
    device: Device,
    width: u32,
    height: u32,
    decoder: Box<dyn FrameDecoder>,
    pacer: FramePacer,
}

impl CameraSource {
    pub fn open(config: &CaptureConfig) -> Result<Self> {
        let device = retry_with_backoff(|| open_device(config.device_id), OPEN_RETRY, "Camera init")?;

        let caps = device.query_caps()?;
        tracing::info!("Camera opened: {} ({})", caps.card, caps.driver);

        let wire_format = select_format(&device)?;
        let mut format = device.format()?;
        format.fourcc = match wire_format {
            WireFormat::Yuyv => FOURCC_YUYV,
            WireFormat::Mjpeg => FOURCC_MJPG,
        };
        format.width = config.width;
        format.height = config.height;
        let format = device.set_format(&format)?;

        tracing::info!(
            "Capture format: {}x{} {:?} ({:?})",
            format.width,
            format.height,
            format.fourcc,
            wire_format
        );

        let decoder: Box<dyn FrameDecoder> = match wire_format {
            WireFormat::Yuyv => Box::new(YuyvDecoder),
            WireFormat::Mjpeg => Box::new(MjpegDecoder::new()?),
        };

        Ok(Self {
            device,
            width: format.width,
            height: format.height,
            decoder,
            pacer: FramePacer::new(config.fps),
        })
    }
}

impl FrameSource for CameraSource {
    fn run(&mut self, publish: &mut dyn FnMut(Frame), shutdown: &AtomicBool) -> Result<()> {
        let mut stream = Stream::with_buffers(&self.device, Type::VideoCapture, BUFFER_COUNT)
            .context("Failed to create capture stream")?;

        tracing::info!("Camera stream started at {}x{}", self.width, self.height);

        let mut frame_count = 0u64;
        let mut dropped_frames = 0u64;

        while !shutdown.load(Ordering::Relaxed) {
            let start = Instant::now();

            match stream.next() {
                Ok((buf, _meta)) => match self.decoder.decode(buf, self.width, self.height) {
                    Ok(frame) => {
                        publish(frame);
                        frame_count += 1;
                    }
                    Err(e) => {
                        dropped_frames += 1;
                        tracing::warn!("Frame #{} decode error: {}", frame_count, e);
                    }
                },
                Err(e) => {
                    dropped_frames += 1;
                    tracing::warn!("Frame #{} capture error: {}", frame_count, e);
                }
            }

            if frame_count > 0 && frame_count.is_multiple_of(100) {
                tracing::debug!(frame_count, dropped_frames, "Camera status");
            }

            self.pacer.wait(start);
        }

        tracing::info!(
            "Shutdown: {} frames captured, {} dropped.",
            frame_count,
            dropped_frames
        );
        Ok(())
    }
}
