//! Model lifecycle: `unloaded → loading → loaded | failed`.
//!
//! Inference is only admitted while a model is `loaded`. A new load may start
//! from any state except `loading`; while it runs, inference is rejected.

use crate::backend::InferenceBackend;
use crate::error::ServiceError;
use preprocess::InputShape;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::sync::RwLock;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelState {
    Unloaded,
    Loading { path: PathBuf },
    Loaded {
        path: PathBuf,
        input_shape: InputShape,
    },
    Failed { path: PathBuf, reason: String },
}

impl ModelState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelState::Unloaded => "unloaded",
            ModelState::Loading { .. } => "loading",
            ModelState::Loaded { .. } => "loaded",
            ModelState::Failed { .. } => "failed",
        }
    }

    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            ModelState::Unloaded => None,
            ModelState::Loading { path }
            | ModelState::Loaded { path, .. }
            | ModelState::Failed { path, .. } => Some(path),
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, ModelState::Loaded { .. })
    }

    pub fn input_shape(&self) -> Option<InputShape> {
        match self {
            ModelState::Loaded { input_shape, .. } => Some(*input_shape),
            _ => None,
        }
    }
}

pub type SharedBackend = Arc<Mutex<Box<dyn InferenceBackend>>>;

/// A model ready to serve.
#[derive(Clone)]
pub struct LoadedModel {
    pub path: PathBuf,
    pub input_shape: InputShape,
    pub backend: SharedBackend,
}

enum Slot {
    Unloaded,
    Loading(PathBuf),
    Loaded(LoadedModel),
    Failed { path: PathBuf, reason: String },
}

impl Slot {
    fn state(&self) -> ModelState {
        match self {
            Slot::Unloaded => ModelState::Unloaded,
            Slot::Loading(path) => ModelState::Loading { path: path.clone() },
            Slot::Loaded(model) => ModelState::Loaded {
                path: model.path.clone(),
                input_shape: model.input_shape,
            },
            Slot::Failed { path, reason } => ModelState::Failed {
                path: path.clone(),
                reason: reason.clone(),
            },
        }
    }
}

pub struct ModelRegistry {
    slot: RwLock<Slot>,
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self {
            slot: RwLock::new(Slot::Unloaded),
        }
    }

    pub async fn state(&self) -> ModelState {
        self.slot.read().await.state()
    }

    /// Handle to the loaded model, or `ModelNotReady` in any other state.
    pub async fn loaded(&self) -> Result<LoadedModel, ServiceError> {
        match &*self.slot.read().await {
            Slot::Loaded(model) => Ok(model.clone()),
            other => Err(ServiceError::ModelNotReady(other.state().as_str())),
        }
    }

    /// Enter `loading`. Fails with `LoadInProgress` if a load is already running.
    pub async fn begin_load(&self, path: PathBuf) -> Result<(), ServiceError> {
        let mut slot = self.slot.write().await;
        if let Slot::Loading(current) = &*slot {
            return Err(ServiceError::LoadInProgress(current.display().to_string()));
        }
        tracing::info!(path = %path.display(), "Model load started");
        *slot = Slot::Loading(path);
        Ok(())
    }

    /// Leave `loading` with the outcome of the load started by `begin_load`.
    pub async fn finish_load(
        &self,
        path: PathBuf,
        outcome: anyhow::Result<(Box<dyn InferenceBackend>, InputShape)>,
    ) -> ModelState {
        let mut slot = self.slot.write().await;
        *slot = match outcome {
            Ok((backend, input_shape)) => {
                tracing::info!(path = %path.display(), backend = backend.name(), "Model loaded");
                Slot::Loaded(LoadedModel {
                    path,
                    input_shape,
                    backend: Arc::new(Mutex::new(backend)),
                })
            }
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "Model load failed");
                Slot::Failed {
                    path,
                    reason: format!("{:#}", e),
                }
            }
        };
        slot.state()
    }
}
