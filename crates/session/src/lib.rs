pub mod config;
pub mod outcome;
pub mod session;
pub mod sink;
pub mod ws;

pub use config::SessionConfig;
pub use outcome::{TickOutcome, TickStage};
pub use session::{Session, SessionStats};
pub use sink::{BroadcastSink, LogSink, ResultSink};
