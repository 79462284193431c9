use crate::error::InferenceError;
use common::{env_or, env_parse};
use schema::DETECT_PATH;
use std::env;
use std::time::Duration;

pub const DEFAULT_PRIMARY_URL: &str = "http://localhost:5000/detect-drowsiness";
pub const DEFAULT_PRIMARY_TIMEOUT_MS: u64 = 3000;
pub const DEFAULT_FALLBACK_TIMEOUT_MS: u64 = 2000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub name: String,
    /// Full detection URL, e.g. `http://host:5000/detect-drowsiness`.
    pub url: String,
    pub timeout: Duration,
}

impl Endpoint {
    pub fn new(name: impl Into<String>, url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            timeout,
        }
    }
}

/// Ordered, non-empty list of endpoints tried first to last.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointConfig {
    endpoints: Vec<Endpoint>,
}

impl EndpointConfig {
    pub fn new(endpoints: Vec<Endpoint>) -> Result<Self, InferenceError> {
        if endpoints.is_empty() {
            return Err(InferenceError::NoEndpoints);
        }
        Ok(Self { endpoints })
    }

    /// `PRIMARY_URL` / `PRIMARY_TIMEOUT_MS`, then the optional `FALLBACK_URL` /
    /// `FALLBACK_TIMEOUT_MS`.
    pub fn from_env() -> Result<Self, InferenceError> {
        let mut endpoints = vec![Endpoint::new(
            "primary",
            with_detect_path(&env_or("PRIMARY_URL", DEFAULT_PRIMARY_URL)),
            Duration::from_millis(env_parse("PRIMARY_TIMEOUT_MS", DEFAULT_PRIMARY_TIMEOUT_MS)),
        )];

        if let Some(url) = env::var("FALLBACK_URL").ok().filter(|u| !u.trim().is_empty()) {
            endpoints.push(Endpoint::new(
                "fallback",
                with_detect_path(&url),
                Duration::from_millis(env_parse(
                    "FALLBACK_TIMEOUT_MS",
                    DEFAULT_FALLBACK_TIMEOUT_MS,
                )),
            ));
        }

        Self::new(endpoints)
    }

    pub fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}

/// Accept either a base URL or the full detection URL.
fn with_detect_path(url: &str) -> String {
    let trimmed = url.trim_end_matches('/');
    if trimmed.ends_with(DETECT_PATH) {
        trimmed.to_string()
    } else {
        format!("{}{}", trimmed, DETECT_PATH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear() {
        for var in [
            "PRIMARY_URL",
            "PRIMARY_TIMEOUT_MS",
            "FALLBACK_URL",
            "FALLBACK_TIMEOUT_MS",
        ] {
            unsafe { env::remove_var(var) };
        }
    }

    #[test]
    fn empty_list_is_rejected() {
        assert!(matches!(
            EndpointConfig::new(Vec::new()),
            Err(InferenceError::NoEndpoints)
        ));
    }

    #[test]
    #[serial]
    fn primary_only_by_default() {
        clear();
        let config = EndpointConfig::from_env().unwrap();
        assert_eq!(config.len(), 1);
        assert_eq!(config.endpoints()[0].url, DEFAULT_PRIMARY_URL);
        assert_eq!(config.endpoints()[0].timeout, Duration::from_millis(3000));
    }

    #[test]
    #[serial]
    fn fallback_is_appended_after_primary() {
        clear();
        unsafe {
            env::set_var("FALLBACK_URL", "http://backup:5001/");
            env::set_var("FALLBACK_TIMEOUT_MS", "750");
        }
        let config = EndpointConfig::from_env().unwrap();
        let names: Vec<_> = config.endpoints().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["primary", "fallback"]);
        assert_eq!(
            config.endpoints()[1].url,
            "http://backup:5001/detect-drowsiness"
        );
        assert_eq!(config.endpoints()[1].timeout, Duration::from_millis(750));
        clear();
    }

    #[test]
    #[serial]
    fn primary_base_url_gets_detect_path() {
        clear();
        unsafe { env::set_var("PRIMARY_URL", "http://host:5000") };
        let config = EndpointConfig::from_env().unwrap();
        assert_eq!(
            config.endpoints()[0].url,
            "http://host:5000/detect-drowsiness"
        );

        unsafe { env::set_var("PRIMARY_URL", "http://host:5000/detect-drowsiness/") };
        let config = EndpointConfig::from_env().unwrap();
        assert_eq!(
            config.endpoints()[0].url,
            "http://host:5000/detect-drowsiness"
        );
        clear();
    }
}
