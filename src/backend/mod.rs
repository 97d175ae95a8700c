//! Layout backends: the opaque numeric solvers that turn an adjacency
//! encoding into raw node coordinates.
//!
//! The pipeline talks to a backend only through [`LayoutBackend::compute`].
//! Backends are acquired once through a [`BackendLoader`] and shared as an
//! explicit [`BackendHandle`].

mod cpu;
mod external;

pub use cpu::CpuBackend;
pub use external::ExternalBackend;

use crate::layout::{AdjacencyEncoding, LayoutParameters, RawCoordinates};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BackendError {
    /// The backend could not be located or initialized.
    #[error("layout backend `{backend}` is unavailable: {reason}")]
    Unavailable { backend: String, reason: String },
    /// The backend ran but the call failed or produced unusable output.
    #[error("layout backend `{backend}` failed: {reason}")]
    Failure { backend: String, reason: String },
}

impl BackendError {
    pub fn unavailable(backend: &str, reason: impl Into<String>) -> Self {
        BackendError::Unavailable {
            backend: backend.to_string(),
            reason: reason.into(),
        }
    }

    pub fn failure(backend: &str, reason: impl Into<String>) -> Self {
        BackendError::Failure {
            backend: backend.to_string(),
            reason: reason.into(),
        }
    }
}

pub trait LayoutBackend: Send + Sync {
    fn name(&self) -> &str;

    /// Whether concurrent `compute` calls are safe. Only reentrant backends
    /// are driven from several partitions at once.
    fn is_reentrant(&self) -> bool {
        false
    }

    /// Compute one coordinate per node, in the order of `adjacency.index`.
    fn compute(
        &self,
        adjacency: &AdjacencyEncoding,
        params: &LayoutParameters,
    ) -> Result<RawCoordinates, BackendError>;
}

pub type BackendHandle = Arc<dyn LayoutBackend>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Cpu,
    External,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendConfig {
    pub kind: BackendKind,
    /// Program name or path for the external backend.
    pub program: String,
    pub args: Vec<String>,
    /// Directories searched for `program` before `PATH`.
    pub search_paths: Vec<PathBuf>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            kind: BackendKind::Cpu,
            program: "fdlayout-backend".to_string(),
            args: Vec::new(),
            search_paths: vec![PathBuf::from("./plugins")],
        }
    }
}

type LoadFn = dyn Fn() -> Result<BackendHandle, BackendError> + Send + Sync;

/// Acquires a backend at most once and hands out the shared handle.
///
/// A failed acquisition is remembered: later calls report the same
/// `Unavailable` error without trying to load again.
pub struct BackendLoader {
    load: Box<LoadFn>,
    handle: OnceCell<Result<BackendHandle, BackendError>>,
}

impl BackendLoader {
    pub fn new(config: BackendConfig) -> Self {
        Self::with_loader(move || load_backend(&config))
    }

    pub fn with_loader<F>(load: F) -> Self
    where
        F: Fn() -> Result<BackendHandle, BackendError> + Send + Sync + 'static,
    {
        Self {
            load: Box::new(load),
            handle: OnceCell::new(),
        }
    }

    /// Wrap an already constructed backend.
    pub fn preloaded(backend: BackendHandle) -> Self {
        let loader = Self::with_loader(|| {
            Err(BackendError::unavailable("preloaded", "backend already consumed"))
        });
        let _ = loader.handle.set(Ok(backend));
        loader
    }

    pub fn acquire(&self) -> Result<BackendHandle, BackendError> {
        self.handle
            .get_or_init(|| {
                let loaded = (self.load)();
                match &loaded {
                    Ok(backend) => tracing::debug!(backend = backend.name(), "layout backend ready"),
                    Err(err) => tracing::warn!(%err, "layout backend could not be loaded"),
                }
                loaded
            })
            .clone()
    }
}

fn load_backend(config: &BackendConfig) -> Result<BackendHandle, BackendError> {
    match config.kind {
        BackendKind::Cpu => Ok(Arc::new(CpuBackend::new())),
        BackendKind::External => {
            let backend =
                ExternalBackend::locate(&config.program, &config.search_paths, &config.args)?;
            Ok(Arc::new(backend))
        }
    }
}

/// Reject backend output that cannot be placed: wrong row count or
/// non-finite values.
pub fn validate_output(
    backend: &str,
    coords: &RawCoordinates,
    expected: usize,
) -> Result<(), BackendError> {
    if coords.len() != expected {
        return Err(BackendError::failure(
            backend,
            format!("returned {} coordinates for {} nodes", coords.len(), expected),
        ));
    }
    if let Some(idx) = coords.points.iter().position(|p| !p.is_finite()) {
        return Err(BackendError::failure(
            backend,
            format!("coordinate {idx} is not finite"),
        ));
    }
    Ok(())
}
