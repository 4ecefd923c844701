// ABOUTME: Remote sandbox executor with scoped session lifecycle
// ABOUTME: Opens a session per call, runs the program, downloads artifacts and always closes the session

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::{CodeExecutor, Result};
use crate::types::{Artifact, ExecutionOutput, ParsedProgram, RuntimeError};

/// Reference to an artifact still held by the sandbox
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteArtifact {
    /// Format reported by the sandbox, e.g. `png`
    pub format: String,
    /// Backend-specific payload used to fetch the bytes
    pub payload: String,
}

/// Raw result of running code in a sandbox session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteRun {
    pub stdout: String,
    pub stderr: String,
    pub artifacts: Vec<RemoteArtifact>,
    pub error: Option<RuntimeError>,
}

/// Lifecycle operations of a hosted sandbox service
#[async_trait]
pub trait SandboxBackend: Send + Sync {
    type Session: Send + Sync;

    async fn open(&self) -> Result<Self::Session>;

    /// Install packages and return the installer's output
    async fn install_packages(&self, session: &Self::Session, packages: &str) -> Result<String>;

    async fn run(&self, session: &Self::Session, code: &str) -> Result<RemoteRun>;

    async fn download(&self, session: &Self::Session, artifact: &RemoteArtifact) -> Result<Vec<u8>>;

    async fn close(&self, session: Self::Session) -> Result<()>;
}

/// Executor that runs every program in a fresh sandbox session
pub struct RemoteExecutor<B: SandboxBackend> {
    backend: B,
}

impl<B: SandboxBackend> RemoteExecutor<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    async fn run_in_session(
        &self,
        session: &B::Session,
        program: &ParsedProgram,
    ) -> Result<ExecutionOutput> {
        let install_log = match program.packages.as_deref() {
            Some(packages) => {
                info!("Installing packages in sandbox: {}", packages);
                self.backend.install_packages(session, packages).await?
            }
            None => String::new(),
        };

        let run = self.backend.run(session, &program.code).await?;

        let mut artifacts = Vec::with_capacity(run.artifacts.len());
        for artifact in &run.artifacts {
            let bytes = self.backend.download(session, artifact).await?;
            debug!("Downloaded {} artifact ({} bytes)", artifact.format, bytes.len());
            artifacts.push(Artifact::from_bytes(bytes));
        }

        Ok(ExecutionOutput {
            stdout: run.stdout,
            stderr: run.stderr,
            artifacts,
            error: run.error,
            install_log,
        })
    }
}

#[async_trait]
impl<B: SandboxBackend> CodeExecutor for RemoteExecutor<B> {
    fn name(&self) -> &'static str {
        "remote"
    }

    async fn execute(&self, program: &ParsedProgram) -> Result<ExecutionOutput> {
        let session = self.backend.open().await?;

        let outcome = self.run_in_session(&session, program).await;

        // The session is released on every path once it was opened
        if let Err(e) = self.backend.close(session).await {
            warn!("Failed to close sandbox session: {}", e);
        }

        outcome
    }
}
