pub mod backend;
pub mod config;
pub mod error;
pub mod routes;
pub mod service;
pub mod state;

pub use backend::{BackendKind, BackendLoader, InferenceBackend, InferenceOutput};
pub use config::ServiceConfig;
pub use error::ServiceError;
pub use routes::{router, serve};
pub use service::ModelService;
pub use state::{ModelRegistry, ModelState};
