use capture::CaptureConfig;
use client::EndpointConfig;
use common::env_parse;
use std::env;
use std::time::Duration;

pub use common::Environment;

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub environment: Environment,
    pub endpoints: EndpointConfig,
    pub tick_interval: Duration,
    /// JPEG quality factor in `(0, 1]`.
    pub jpeg_quality: f32,
    pub capture: CaptureConfig,
    /// WebSocket publish address; no server when unset.
    pub ws_addr: Option<String>,
    pub channel_capacity: usize,
    /// Attempts at the primary `/health` before starting anyway.
    pub health_attempts: u32,
    pub otel_endpoint: Option<String>,
}

impl SessionConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let environment = Environment::from_env();

        let jpeg_quality = env_parse("JPEG_QUALITY", 0.8f32);
        if !(jpeg_quality > 0.0 && jpeg_quality <= 1.0) {
            anyhow::bail!("JPEG_QUALITY must be in (0, 1], got {}", jpeg_quality);
        }

        let tick_interval_ms = env_parse("TICK_INTERVAL_MS", 1000u64);
        if tick_interval_ms == 0 {
            anyhow::bail!("TICK_INTERVAL_MS must be positive");
        }

        Ok(Self {
            environment,
            endpoints: EndpointConfig::from_env()?,
            tick_interval: Duration::from_millis(tick_interval_ms),
            jpeg_quality,
            capture: CaptureConfig::from_env(),
            ws_addr: env::var("WS_ADDR").ok().filter(|a| !a.trim().is_empty()),
            channel_capacity: env_parse("SESSION_CHANNEL_CAPACITY", 16),
            health_attempts: env_parse("HEALTH_ATTEMPTS", 5),
            otel_endpoint: env::var("OTEL_EXPORTER_OTLP_ENDPOINT").ok(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear() {
        for var in ["JPEG_QUALITY", "TICK_INTERVAL_MS", "WS_ADDR", "FALLBACK_URL"] {
            unsafe { env::remove_var(var) };
        }
    }

    #[test]
    #[serial]
    fn defaults() {
        clear();
        let config = SessionConfig::from_env().unwrap();
        assert_eq!(config.tick_interval, Duration::from_secs(1));
        assert_eq!(config.jpeg_quality, 0.8);
        assert_eq!(config.endpoints.len(), 1);
        assert!(config.ws_addr.is_none());
    }

    #[test]
    #[serial]
    fn rejects_out_of_range_quality() {
        clear();
        unsafe { env::set_var("JPEG_QUALITY", "1.5") };
        assert!(SessionConfig::from_env().is_err());
        clear();
    }

    #[test]
    #[serial]
    fn rejects_zero_interval() {
        clear();
        unsafe { env::set_var("TICK_INTERVAL_MS", "0") };
        assert!(SessionConfig::from_env().is_err());
        clear();
    }
}
