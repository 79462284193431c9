pub mod config;
pub mod logging;
pub mod retry;
#[cfg(feature = "async")]
pub mod shutdown;
pub mod telemetry;
#[cfg(feature = "async")]
pub mod wait;

pub use config::{Environment, env_or, env_parse};
pub use logging::setup_logging;
pub use retry::{RetryPolicy, retry_with_backoff};
pub use telemetry::TelemetryGuard;
#[cfg(feature = "async")]
pub use shutdown::shutdown_signal;
#[cfg(feature = "async")]
pub use wait::wait_for_resource_async;
