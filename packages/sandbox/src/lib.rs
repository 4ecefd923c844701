// ABOUTME: Code execution backends for Genly
// ABOUTME: Selects the local subprocess or hosted E2B executor from configuration

pub mod providers;
pub mod types;

use std::sync::Arc;

use genly_config::{ExecutionMode, SandboxSettings};
use tracing::info;

pub use providers::{
    CodeExecutor, E2BBackend, ExecutorError, LocalExecutor, LocalWorkspace, RemoteExecutor,
    Result, SandboxBackend,
};
pub use types::{Artifact, ArtifactKind, ExecutionOutput, ParsedProgram, RuntimeError};

/// Build the executor for the configured execution mode
pub fn build_executor(settings: &SandboxSettings) -> Result<Arc<dyn CodeExecutor>> {
    match settings.mode {
        ExecutionMode::Local => {
            info!(
                "Using local executor in {}",
                settings.local.work_dir.display()
            );
            Ok(Arc::new(LocalExecutor::new(settings.local.clone())))
        }
        ExecutionMode::Remote => {
            let remote = settings.remote.as_ref().ok_or_else(|| {
                ExecutorError::Config("remote execution requires E2B settings".to_string())
            })?;
            info!("Using E2B executor with template {}", remote.template);
            Ok(Arc::new(RemoteExecutor::new(E2BBackend::new(remote)?)))
        }
    }
}
