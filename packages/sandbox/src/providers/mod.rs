// ABOUTME: Executor trait and implementations for code execution backends
// ABOUTME: Defines the strategy-agnostic interface the repair loop runs programs through

use async_trait::async_trait;
use thiserror::Error;

use crate::types::{ExecutionOutput, ParsedProgram};

pub mod e2b;
pub mod local;
pub mod remote;

pub use e2b::{E2BBackend, E2BSession};
pub use local::{LocalExecutor, LocalWorkspace};
pub use remote::{RemoteArtifact, RemoteExecutor, RemoteRun, SandboxBackend};

#[derive(Error, Debug)]
pub enum ExecutorError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Sandbox error: {0}")]
    Sandbox(String),

    #[error("Package installation failed: {0}")]
    Install(String),

    #[error("Execution failed: {0}")]
    Execution(String),

    #[error("Artifact download failed: {0}")]
    Artifact(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, ExecutorError>;

/// A backend capable of running a parsed program
#[async_trait]
pub trait CodeExecutor: Send + Sync {
    /// Short backend name for logs
    fn name(&self) -> &'static str;

    /// Run the program, installing its packages first when it lists any
    async fn execute(&self, program: &ParsedProgram) -> Result<ExecutionOutput>;
}
