// ABOUTME: Local subprocess executor writing the program to a scratch file in the working directory
// ABOUTME: Combined output is captured through a log file; scratch files are removed by a drop guard

use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use genly_config::LocalSettings;
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::{CodeExecutor, Result};
use crate::types::{ExecutionOutput, ParsedProgram, RuntimeError};

pub const SCRIPT_FILE: &str = "temp.py";
pub const OUTPUT_FILE: &str = "temp.txt";
pub const INSTALL_LOG_FILE: &str = "temp_install_log.txt";
pub const REQUIREMENTS_FILE: &str = "requirements.txt";

/// Files removed after every run. `requirements.txt` is intentionally kept.
const SCRATCH_FILES: &[&str] = &[SCRIPT_FILE, OUTPUT_FILE, INSTALL_LOG_FILE, "token.json"];

/// Scratch-file set for one local run, cleaned up when dropped
pub struct LocalWorkspace {
    dir: PathBuf,
}

impl LocalWorkspace {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self, file: &str) -> PathBuf {
        self.dir.join(file)
    }

    /// Remove every scratch file that exists in `dir`
    pub fn cleanup(dir: &Path) {
        for file in SCRATCH_FILES {
            let path = dir.join(file);
            if path.exists() {
                if let Err(e) = std::fs::remove_file(&path) {
                    warn!("Failed to remove {}: {}", path.display(), e);
                }
            }
        }
    }
}

impl Drop for LocalWorkspace {
    fn drop(&mut self) {
        Self::cleanup(&self.dir);
    }
}

/// Runs programs with the local Python interpreter
pub struct LocalExecutor {
    settings: LocalSettings,
}

impl LocalExecutor {
    pub fn new(settings: LocalSettings) -> Self {
        Self { settings }
    }

    /// Install packages and snapshot the environment. Failures are logged, not raised;
    /// a missing package surfaces as an import error in the program output instead.
    async fn install_packages(&self, workspace: &LocalWorkspace, packages: &str) -> Result<()> {
        info!("Installing packages locally: {}", packages);

        let log = File::create(workspace.path(INSTALL_LOG_FILE))?;
        let status = Command::new(&self.settings.pip)
            .arg("install")
            .args(packages.split_whitespace())
            .current_dir(&self.settings.work_dir)
            .stdout(Stdio::from(log.try_clone()?))
            .stderr(Stdio::from(log))
            .status()
            .await;

        match status {
            Ok(status) if status.success() => debug!("Package install finished"),
            Ok(status) => warn!("Package install exited with {}", status),
            Err(e) => warn!("Failed to run {}: {}", self.settings.pip, e),
        }

        let requirements = File::create(workspace.path(REQUIREMENTS_FILE))?;
        if let Err(e) = Command::new(&self.settings.pip)
            .arg("freeze")
            .current_dir(&self.settings.work_dir)
            .stdout(Stdio::from(requirements))
            .stderr(Stdio::null())
            .status()
            .await
        {
            warn!("Failed to write {}: {}", REQUIREMENTS_FILE, e);
        }

        Ok(())
    }
}

#[async_trait]
impl CodeExecutor for LocalExecutor {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn execute(&self, program: &ParsedProgram) -> Result<ExecutionOutput> {
        tokio::fs::create_dir_all(&self.settings.work_dir).await?;
        let workspace = LocalWorkspace::new(&self.settings.work_dir);

        let install_log = match program.packages.as_deref() {
            Some(packages) => {
                self.install_packages(&workspace, packages).await?;
                let raw = tokio::fs::read(workspace.path(INSTALL_LOG_FILE)).await?;
                String::from_utf8_lossy(&raw).into_owned()
            }
            None => String::new(),
        };

        tokio::fs::write(workspace.path(SCRIPT_FILE), &program.code).await?;

        let log = File::create(workspace.path(OUTPUT_FILE))?;
        let status = Command::new(&self.settings.python)
            .arg(SCRIPT_FILE)
            .current_dir(&self.settings.work_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::from(log.try_clone()?))
            .stderr(Stdio::from(log))
            .status()
            .await?;

        let raw = tokio::fs::read(workspace.path(OUTPUT_FILE)).await?;
        let stdout = String::from_utf8_lossy(&raw).into_owned();

        info!(
            "Local execution finished with {} ({} bytes of output)",
            status,
            stdout.len()
        );

        let error = (!status.success()).then(|| RuntimeError {
            name: "ExitStatus".to_string(),
            value: match status.code() {
                Some(code) => format!("process exited with code {}", code),
                None => "process terminated by signal".to_string(),
            },
            traceback: String::new(),
        });

        // Combined output goes to stdout; this backend never reports stderr or artifacts
        Ok(ExecutionOutput {
            stdout,
            stderr: String::new(),
            artifacts: Vec::new(),
            error,
            install_log,
        })
    }
}
