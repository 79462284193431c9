use crate::outcome::{TickOutcome, TickStage};
use crate::sink::ResultSink;
use capture::{CaptureFeed, LatestFrame, encode};
use client::ProviderChain;
use opentelemetry::{KeyValue, global, metrics::Counter};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::time::{self, MissedTickBehavior};

/// Counts kept by one [`Session::run`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub ticks: u64,
    /// Ticks that would have started while the previous one was running.
    pub skipped: u64,
    /// Ticks with no frame available yet.
    pub idle: u64,
    pub results: u64,
    pub failures: u64,
}

struct SessionMetrics {
    ticks: Counter<u64>,
    skipped: Counter<u64>,
    outcomes: Counter<u64>,
}

fn init_metrics(meter_name: &'static str) -> SessionMetrics {
    let meter = global::meter(meter_name);
    SessionMetrics {
        ticks: meter
            .u64_counter("session_ticks_total")
            .with_description("Ticks started")
            .build(),
        skipped: meter
            .u64_counter("session_ticks_skipped_total")
            .with_description("Ticks dropped because the previous tick was still running")
            .build(),
        outcomes: meter
            .u64_counter("session_outcomes_total")
            .with_description("Published tick outcomes by status")
            .build(),
    }
}

/// Drives encode → infer → publish once per tick until stopped.
///
/// At most one inference request is outstanding: a tick that comes due while
/// the previous one is still running is dropped, never queued.
pub struct Session {
    chain: ProviderChain,
    frames: LatestFrame,
    sinks: Vec<Arc<dyn ResultSink>>,
    tick_interval: Duration,
    jpeg_quality: f32,
    capture: Option<CaptureFeed>,
    metrics: SessionMetrics,
}

impl Session {
    pub fn new(
        chain: ProviderChain,
        frames: LatestFrame,
        tick_interval: Duration,
        jpeg_quality: f32,
    ) -> Self {
        Self {
            chain,
            frames,
            sinks: Vec::new(),
            tick_interval,
            jpeg_quality,
            capture: None,
            metrics: init_metrics("session"),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn ResultSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Own the capture feed so it is stopped and joined when `run` returns.
    pub fn with_capture(mut self, feed: CaptureFeed) -> Self {
        self.capture = Some(feed);
        self
    }

    /// Tick until `shutdown` turns true (or its sender is dropped). A stop
    /// that arrives mid-tick cancels the in-flight request.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> anyhow::Result<SessionStats> {
        let mut stats = SessionStats::default();
        let mut interval = time::interval(self.tick_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!(
            interval_ms = self.tick_interval.as_millis() as u64,
            providers = ?self.chain.provider_names().collect::<Vec<_>>(),
            "Session started"
        );

        while !*shutdown.borrow() {
            tokio::select! {
                biased;
                _ = shutdown.wait_for(|stopped| *stopped) => break,
                _ = interval.tick() => {}
            }

            stats.ticks += 1;
            self.metrics.ticks.add(1, &[]);
            let started = Instant::now();

            let outcome = tokio::select! {
                biased;
                _ = shutdown.wait_for(|stopped| *stopped) => {
                    tracing::info!("Stop requested, cancelling in-flight tick");
                    break;
                }
                outcome = self.tick() => outcome,
            };

            match outcome {
                Some(outcome) => self.publish(&outcome, &mut stats),
                None => {
                    stats.idle += 1;
                    tracing::debug!("No frame available yet");
                }
            }

            let elapsed = started.elapsed();
            if elapsed >= self.tick_interval {
                let missed = (elapsed.as_nanos() / self.tick_interval.as_nanos()) as u64;
                stats.skipped += missed;
                self.metrics.skipped.add(missed, &[]);
                tracing::debug!(
                    missed,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Tick overran, dropping missed ticks"
                );
                interval.reset();
            }
        }

        self.shutdown_capture().await?;
        tracing::info!(?stats, "Session stopped");
        Ok(stats)
    }

    /// `None` when no frame has been captured yet.
    async fn tick(&self) -> Option<TickOutcome> {
        let frame = self.frames.borrow().clone()?;
        let timestamp = frame.timestamp_ms;

        let payload = match encode(&frame, self.jpeg_quality) {
            Ok(payload) => payload,
            Err(e) => {
                return Some(TickOutcome::Failed {
                    timestamp,
                    stage: TickStage::Encode,
                    reason: e.to_string(),
                });
            }
        };

        Some(match self.chain.infer(&payload).await {
            Ok(result) => TickOutcome::Result { timestamp, result },
            Err(e) => TickOutcome::Failed {
                timestamp,
                stage: TickStage::Inference,
                reason: e.to_string(),
            },
        })
    }

    fn publish(&self, outcome: &TickOutcome, stats: &mut SessionStats) {
        let status = if outcome.is_failed() {
            stats.failures += 1;
            "failed"
        } else {
            stats.results += 1;
            "result"
        };
        self.metrics
            .outcomes
            .add(1, &[KeyValue::new("status", status)]);

        for sink in &self.sinks {
            sink.publish(outcome);
        }
    }

    async fn shutdown_capture(&mut self) -> anyhow::Result<()> {
        if let Some(feed) = self.capture.take() {
            tokio::task::spawn_blocking(move || feed.stop()).await??;
            tracing::info!("Capture stopped");
        }
        Ok(())
    }
}
