use crate::outcome::TickOutcome;
use tokio::sync::broadcast;

/// Receives every published tick outcome, in tick order.
pub trait ResultSink: Send + Sync {
    fn publish(&self, outcome: &TickOutcome);
}

/// Writes outcomes to the log.
#[derive(Debug, Default)]
pub struct LogSink;

impl ResultSink for LogSink {
    fn publish(&self, outcome: &TickOutcome) {
        match outcome {
            TickOutcome::Result { timestamp, result } => tracing::info!(
                timestamp,
                confidence = result.confidence,
                alertness = %result.alertness,
                model = result.model_used.as_deref().unwrap_or("-"),
                "Alertness update"
            ),
            TickOutcome::Failed {
                timestamp,
                stage,
                reason,
            } => tracing::error!(timestamp, stage = %stage, reason = %reason, "Tick failed"),
        }
    }
}

/// Fans outcomes out to any number of subscribers (WebSocket clients).
/// Slow subscribers lag and miss updates; the session never waits on them.
#[derive(Debug, Clone)]
pub struct BroadcastSink {
    tx: broadcast::Sender<TickOutcome>,
}

impl BroadcastSink {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TickOutcome> {
        self.tx.subscribe()
    }
}

impl ResultSink for BroadcastSink {
    fn publish(&self, outcome: &TickOutcome) {
        let _ = self.tx.send(outcome.clone());
    }
}
