// ABOUTME: E2B sandbox backend for hosted Python code execution
// ABOUTME: Creates and kills sandboxes over the E2B REST API and runs code through the code interpreter

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use genly_config::RemoteSettings;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use super::remote::{RemoteArtifact, RemoteRun, SandboxBackend};
use super::{ExecutorError, Result};
use crate::types::RuntimeError;

/// Port the code interpreter kernel gateway listens on inside the sandbox
const CODE_INTERPRETER_PORT: u16 = 49999;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateSandboxRequest<'a> {
    #[serde(rename = "templateID")]
    template_id: &'a str,
    timeout: u64,
}

#[derive(Debug, Deserialize)]
struct CreateSandboxResponse {
    #[serde(rename = "sandboxID")]
    sandbox_id: String,
    #[serde(rename = "envdAccessToken", default)]
    access_token: Option<String>,
}

#[derive(Debug, Serialize)]
struct ExecuteRequest<'a> {
    code: &'a str,
}

/// One line of the code interpreter's NDJSON execution stream
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ExecutionEvent {
    Stdout {
        text: String,
    },
    Stderr {
        text: String,
    },
    Result {
        #[serde(default)]
        png: Option<String>,
        #[serde(default)]
        jpeg: Option<String>,
        #[serde(default)]
        svg: Option<String>,
    },
    Error {
        name: String,
        #[serde(default)]
        value: String,
        #[serde(default)]
        traceback: String,
    },
    #[serde(other)]
    Other,
}

/// Handle to an open E2B sandbox
#[derive(Debug, Clone)]
pub struct E2BSession {
    pub sandbox_id: String,
    execution_url: String,
    access_token: Option<String>,
}

/// E2B backend
pub struct E2BBackend {
    client: Client,
    api_key: String,
    api_url: String,
    domain: String,
    template: String,
    timeout_secs: u64,
    execution_url_override: Option<String>,
}

impl E2BBackend {
    /// Create a new E2B backend from sandbox settings
    pub fn new(settings: &RemoteSettings) -> Result<Self> {
        if settings.api_key.is_empty() {
            return Err(ExecutorError::Config("E2B API key is required".to_string()));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs.saturating_add(30)))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            api_key: settings.api_key.clone(),
            api_url: settings.api_url.trim_end_matches('/').to_string(),
            domain: settings.domain.clone(),
            template: settings.template.clone(),
            timeout_secs: settings.timeout_secs,
            execution_url_override: None,
        })
    }

    /// Send code execution requests to a fixed URL instead of the per-sandbox host
    pub fn with_execution_url(mut self, url: impl Into<String>) -> Self {
        self.execution_url_override = Some(url.into().trim_end_matches('/').to_string());
        self
    }

    fn execution_url_for(&self, sandbox_id: &str) -> String {
        match &self.execution_url_override {
            Some(url) => url.clone(),
            None => format!(
                "https://{}-{}.{}",
                CODE_INTERPRETER_PORT, sandbox_id, self.domain
            ),
        }
    }

    /// Kill a sandbox whose create response could not be decoded, if its id is recoverable
    async fn kill_orphan(&self, body: &str) {
        let Some(sandbox_id) = orphan_sandbox_id(body) else {
            warn!("No sandbox id in create response, nothing to clean up");
            return;
        };

        let session = E2BSession {
            execution_url: self.execution_url_for(&sandbox_id),
            sandbox_id,
            access_token: None,
        };
        let sandbox_id = session.sandbox_id.clone();
        if let Err(e) = self.close(session).await {
            warn!("Failed to kill orphaned sandbox {}: {}", sandbox_id, e);
        }
    }
}

fn orphan_sandbox_id(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("sandboxID")
        .and_then(|id| id.as_str())
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

#[async_trait]
impl SandboxBackend for E2BBackend {
    type Session = E2BSession;

    async fn open(&self) -> Result<E2BSession> {
        let response = self
            .client
            .post(format!("{}/sandboxes", self.api_url))
            .header("X-API-Key", &self.api_key)
            .json(&CreateSandboxRequest {
                template_id: &self.template,
                timeout: self.timeout_secs,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ExecutorError::Sandbox(format!(
                "Failed to create sandbox ({}): {}",
                status, body
            )));
        }

        let body = response.text().await?;
        let created: CreateSandboxResponse = match serde_json::from_str(&body) {
            Ok(created) => created,
            Err(e) => {
                error!("Unreadable create sandbox response: {}", body);
                self.kill_orphan(&body).await;
                return Err(ExecutorError::Sandbox(format!(
                    "Invalid create response: {}",
                    e
                )));
            }
        };

        info!("Opened E2B sandbox {}", created.sandbox_id);

        Ok(E2BSession {
            execution_url: self.execution_url_for(&created.sandbox_id),
            sandbox_id: created.sandbox_id,
            access_token: created.access_token,
        })
    }

    async fn install_packages(&self, session: &E2BSession, packages: &str) -> Result<String> {
        let run = self
            .run(session, &format!("%pip install -q {}", packages))
            .await?;

        match run.error {
            Some(err) => Err(ExecutorError::Install(err.summary())),
            None => {
                let mut log = run.stdout;
                log.push_str(&run.stderr);
                debug!("Install output: {}", log.trim());
                Ok(log)
            }
        }
    }

    async fn run(&self, session: &E2BSession, code: &str) -> Result<RemoteRun> {
        let mut request = self
            .client
            .post(format!("{}/execute", session.execution_url))
            .json(&ExecuteRequest { code });
        if let Some(token) = &session.access_token {
            request = request.header("X-Access-Token", token);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ExecutorError::Execution(format!(
                "Code interpreter returned {}: {}",
                status, body
            )));
        }

        let body = response.text().await?;
        parse_execution_stream(&body)
    }

    async fn download(&self, _session: &E2BSession, artifact: &RemoteArtifact) -> Result<Vec<u8>> {
        if artifact.format == "svg" {
            return Ok(artifact.payload.clone().into_bytes());
        }

        base64::engine::general_purpose::STANDARD
            .decode(artifact.payload.trim())
            .map_err(|e| ExecutorError::Artifact(format!("{} artifact: {}", artifact.format, e)))
    }

    async fn close(&self, session: E2BSession) -> Result<()> {
        let response = self
            .client
            .delete(format!("{}/sandboxes/{}", self.api_url, session.sandbox_id))
            .header("X-API-Key", &self.api_key)
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => {
                info!("Closed E2B sandbox {}", session.sandbox_id);
                Ok(())
            }
            StatusCode::NOT_FOUND => {
                warn!("E2B sandbox {} was already gone", session.sandbox_id);
                Ok(())
            }
            status => Err(ExecutorError::Sandbox(format!(
                "Failed to kill sandbox {} ({})",
                session.sandbox_id, status
            ))),
        }
    }
}

/// Fold the NDJSON event stream into stdout, stderr, artifacts and an optional error
pub fn parse_execution_stream(body: &str) -> Result<RemoteRun> {
    let mut run = RemoteRun::default();

    for line in body.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let event: ExecutionEvent = serde_json::from_str(line).map_err(|e| {
            ExecutorError::Execution(format!("Malformed execution event: {} ({})", e, line))
        })?;

        match event {
            ExecutionEvent::Stdout { text } => run.stdout.push_str(&text),
            ExecutionEvent::Stderr { text } => run.stderr.push_str(&text),
            ExecutionEvent::Result { png, jpeg, svg } => {
                let candidates = [("png", png), ("jpeg", jpeg), ("svg", svg)];
                if let Some((format, payload)) = candidates
                    .into_iter()
                    .find_map(|(format, payload)| payload.map(|p| (format, p)))
                {
                    run.artifacts.push(RemoteArtifact {
                        format: format.to_string(),
                        payload,
                    });
                }
            }
            ExecutionEvent::Error {
                name,
                value,
                traceback,
            } => {
                debug!("Execution raised {}: {}", name, value);
                if !run.stderr.is_empty() && !run.stderr.ends_with('\n') {
                    run.stderr.push('\n');
                }
                if traceback.is_empty() {
                    run.stderr.push_str(&format!("{}: {}", name, value));
                } else {
                    run.stderr.push_str(&traceback);
                }
                run.error = Some(RuntimeError {
                    name,
                    value,
                    traceback,
                });
            }
            ExecutionEvent::Other => {}
        }
    }

    Ok(run)
}
