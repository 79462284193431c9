use crate::frame::Frame;
use crate::source::FrameSource;
use anyhow::{Result, anyhow};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use tokio::sync::watch;

/// Receiver side of the capture feed: always holds the most recent frame.
pub type LatestFrame = watch::Receiver<Option<Arc<Frame>>>;

/// Runs a [`FrameSource`] on a dedicated thread and keeps only its latest
/// frame. Stopping (or dropping) the feed stops the thread.
pub struct CaptureFeed {
    frames: LatestFrame,
    shutdown: Arc<AtomicBool>,
    handle: Option<JoinHandle<Result<()>>>,
}

impl CaptureFeed {
    pub fn spawn(mut source: Box<dyn FrameSource>) -> Result<Self> {
        let (tx, frames) = watch::channel(None);
        let shutdown = Arc::new(AtomicBool::new(false));
        let thread_shutdown = Arc::clone(&shutdown);

        let handle = std::thread::Builder::new()
            .name("capture".into())
            .spawn(move || {
                let mut publish = |frame: Frame| {
                    tx.send_replace(Some(Arc::new(frame)));
                };
                source.run(&mut publish, &thread_shutdown)
            })?;

        Ok(Self {
            frames,
            shutdown,
            handle: Some(handle),
        })
    }

    pub fn frames(&self) -> LatestFrame {
        self.frames.clone()
    }

    /// Signal the capture thread and wait for it to exit.
    pub fn stop(mut self) -> Result<()> {
        self.shutdown.store(true, Ordering::Relaxed);
        match self.handle.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| anyhow!("Capture thread panicked"))?,
            None => Ok(()),
        }
    }
}

impl Drop for CaptureFeed {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }
}
