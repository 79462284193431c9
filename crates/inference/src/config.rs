use crate::backend::BackendKind;
use common::{env_or, env_parse};
use preprocess::InputShape;
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

pub use common::Environment;

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub environment: Environment,
    pub addr: SocketAddr,
    pub backend: BackendKind,
    /// Loaded at startup when set; otherwise the service starts `unloaded`.
    pub model_path: Option<PathBuf>,
    pub models_dir: PathBuf,
    pub input_shape: InputShape,
    pub otel_endpoint: Option<String>,
}

impl ServiceConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let environment = Environment::from_env();

        let addr = env_or("SERVICE_ADDR", "0.0.0.0:5000")
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid SERVICE_ADDR: {}", e))?;

        let backend = match env::var("MODEL_BACKEND") {
            Ok(value) => match value.to_lowercase().as_str() {
                "onnx" | "ort" => BackendKind::Onnx,
                "heuristic" => BackendKind::Heuristic,
                other => anyhow::bail!("unknown MODEL_BACKEND `{}`", other),
            },
            Err(_) => default_backend(),
        };

        let model_path = env::var("MODEL_PATH")
            .ok()
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);

        let input_shape = InputShape::new(
            env_parse("INPUT_WIDTH", 224),
            env_parse("INPUT_HEIGHT", 224),
            env_parse("INPUT_CHANNELS", 3),
        );

        Ok(Self {
            environment,
            addr,
            backend,
            model_path,
            models_dir: PathBuf::from(env_or("MODELS_DIR", "./models")),
            input_shape,
            otel_endpoint: env::var("OTEL_EXPORTER_OTLP_ENDPOINT").ok(),
        })
    }

    /// Heuristic backend with no model path, bound to an ephemeral port.
    pub fn test_default() -> Self {
        Self {
            environment: Environment::Development,
            addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            backend: BackendKind::Heuristic,
            model_path: None,
            models_dir: PathBuf::from("./models"),
            input_shape: InputShape::new(32, 32, 3),
            otel_endpoint: None,
        }
    }
}

fn default_backend() -> BackendKind {
    if cfg!(feature = "ort-backend") {
        BackendKind::Onnx
    } else {
        BackendKind::Heuristic
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: [&str; 6] = [
        "SERVICE_ADDR",
        "MODEL_BACKEND",
        "MODEL_PATH",
        "INPUT_WIDTH",
        "INPUT_HEIGHT",
        "INPUT_CHANNELS",
    ];

    fn clear() {
        for var in VARS {
            unsafe { env::remove_var(var) };
        }
    }

    #[test]
    #[serial]
    fn defaults() {
        clear();
        let config = ServiceConfig::from_env().unwrap();
        assert_eq!(config.addr.port(), 5000);
        assert_eq!(config.input_shape, InputShape::new(224, 224, 3));
        assert!(config.model_path.is_none());
    }

    #[test]
    #[serial]
    fn explicit_backend_and_shape() {
        clear();
        unsafe {
            env::set_var("MODEL_BACKEND", "Heuristic");
            env::set_var("INPUT_CHANNELS", "1");
            env::set_var("MODEL_PATH", "drowsiness.onnx");
        }
        let config = ServiceConfig::from_env().unwrap();
        assert_eq!(config.backend, BackendKind::Heuristic);
        assert_eq!(config.input_shape.channels, 1);
        assert_eq!(config.model_path, Some(PathBuf::from("drowsiness.onnx")));
        clear();
    }

    #[test]
    #[serial]
    fn rejects_unknown_backend_and_bad_address() {
        clear();
        unsafe { env::set_var("MODEL_BACKEND", "tensorrt") };
        assert!(ServiceConfig::from_env().is_err());

        clear();
        unsafe { env::set_var("SERVICE_ADDR", "not-an-addr") };
        assert!(ServiceConfig::from_env().is_err());
        clear();
    }
}
