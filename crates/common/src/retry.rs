use std::time::Duration;

/// Attempt budget and starting delay for [`retry_with_backoff`].
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub const fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            max_delay: Duration::from_secs(5),
        }
    }

    /// Delay before attempt `attempt + 1` (doubles each time, capped).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt.min(16)))
            .min(self.max_delay)
    }
}

/// Retry a blocking operation with exponential backoff.
///
/// Used for hardware initialization at startup only; the inference path
/// never retries.
pub fn retry_with_backoff<F, T, E>(
    mut f: F,
    policy: RetryPolicy,
    operation_name: &str,
) -> Result<T, E>
where
    F: FnMut() -> Result<T, E>,
    E: std::fmt::Display,
{
    let attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        match f() {
            Ok(result) => return Ok(result),
            Err(e) if attempt + 1 < attempts => {
                let delay = policy.delay_for(attempt);
                tracing::warn!(
                    "{} failed (attempt {}/{}): {}. Retrying in {}ms...",
                    operation_name,
                    attempt + 1,
                    attempts,
                    e,
                    delay.as_millis()
                );
                std::thread::sleep(delay);
                attempt += 1;
            }
            Err(e) => {
                tracing::error!("{} failed after {} attempts: {}", operation_name, attempts, e);
                return Err(e);
            }
        }
    }
}
