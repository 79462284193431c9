use std::time::{Duration, Instant};

/// Holds a capture loop to a target frame rate.
pub struct FramePacer {
    frame_duration: Duration,
}

impl FramePacer {
    pub fn new(fps: f64) -> Self {
        let fps = if fps.is_finite() && fps > 0.0 { fps } else { 30.0 };
        Self {
            frame_duration: Duration::from_secs_f64(1.0 / fps),
        }
    }

    pub fn frame_duration(&self) -> Duration {
        self.frame_duration
    }

    /// Time left in the current frame budget, if any.
    pub fn remaining(&self, frame_start: Instant) -> Option<Duration> {
        self.frame_duration.checked_sub(frame_start.elapsed())
    }

    /// Sleep out the rest of the frame budget that began at `frame_start`.
    pub fn wait(&self, frame_start: Instant) {
        match self.remaining(frame_start) {
            Some(left) if !left.is_zero() => std::thread::sleep(left),
            _ => tracing::trace!("Capture took longer than frame budget"),
        }
    }
}
