use std::future::Future;
use std::time::Duration;

/// Poll an async probe until it succeeds or `max_attempts` is spent.
///
/// Returns `None` when the resource never came up; callers decide whether
/// that is fatal.
pub async fn wait_for_resource_async<F, Fut, T, E>(
    mut probe: F,
    poll_interval: Duration,
    max_attempts: u32,
    resource_name: &str,
) -> Option<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    for attempt in 1..=max_attempts.max(1) {
        match probe().await {
            Ok(resource) => {
                tracing::info!("{} ready", resource_name);
                return Some(resource);
            }
            Err(e) => {
                tracing::debug!(attempt, "Waiting for {} ({})", resource_name, e);
                if attempt < max_attempts {
                    tokio::time::sleep(poll_interval).await;
                }
            }
        }
    }

    tracing::warn!(
        "{} not ready after {} attempts, continuing without it",
        resource_name,
        max_attempts
    );
    None
}
