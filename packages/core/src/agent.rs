// ABOUTME: Request handling facade over context lookup, the repair loop and summarization
// ABOUTME: Owns the session for the lifetime of the process

use std::sync::Arc;

use genly_ai::{AIServiceError, AnthropicClient, LanguageModel};
use genly_config::Config;
use genly_sandbox::{build_executor, CodeExecutor, ExecutorError};
use thiserror::Error;
use tracing::{info, warn};

use crate::generation::CodeGenerationClient;
use crate::preferences::{PreferenceClient, PreferenceError};
use crate::repair::{LoopObserver, LoopState, RepairError, RepairLoop, RepairOutcome};
use crate::session::Session;
use crate::summarizer::ResultSummarizer;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Model(#[from] AIServiceError),

    #[error(transparent)]
    Executor(#[from] ExecutorError),

    #[error(transparent)]
    Preferences(#[from] PreferenceError),
}

/// A human command, optionally tagged with a task category
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRequest {
    pub command: String,
    pub category: Option<String>,
}

impl UserRequest {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            category: None,
        }
    }

    pub fn with_category(mut self, category: Option<String>) -> Self {
        self.category = category.filter(|c| !c.trim().is_empty());
        self
    }
}

#[derive(Debug, Clone)]
pub struct Response {
    pub outcome: RepairOutcome,
    /// Request context obtained from the preference service
    pub context: Option<String>,
    pub summary: Option<String>,
    /// Set when summarization failed; the outcome is still valid
    pub summary_error: Option<String>,
}

pub struct Agent {
    repair_loop: RepairLoop,
    summarizer: ResultSummarizer,
    preferences: Option<PreferenceClient>,
    session: Session,
}

impl Agent {
    pub fn new(
        model: Arc<dyn LanguageModel>,
        executor: Arc<dyn CodeExecutor>,
        session: Session,
        max_repairs: u32,
    ) -> Self {
        Self {
            repair_loop: RepairLoop::new(
                CodeGenerationClient::new(model.clone()),
                executor,
                max_repairs,
            ),
            summarizer: ResultSummarizer::new(model),
            preferences: None,
            session,
        }
    }

    pub fn with_preferences(mut self, preferences: PreferenceClient) -> Self {
        self.preferences = Some(preferences);
        self
    }

    /// Wire the production collaborators from configuration
    pub fn from_config(config: &Config) -> Result<Self, AgentError> {
        let client = AnthropicClient::new(&config.model)?;
        info!("Generating code with {}", client.model());
        let model: Arc<dyn LanguageModel> = Arc::new(client);
        let executor = build_executor(&config.sandbox)?;
        let session = Session::new(config.additional_context.clone());

        let mut agent = Self::new(model, executor, session, config.max_repairs);
        if let Some(settings) = &config.preferences {
            let preferences = PreferenceClient::new(settings)?;
            info!(
                "Preference service enabled at {} (providers: {})",
                settings.url,
                preferences.providers().join(", ")
            );
            agent = agent.with_preferences(preferences);
        }
        Ok(agent)
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn max_repairs(&self) -> u32 {
        self.repair_loop.max_repairs()
    }

    /// Run one request through the loop and summarize the result
    pub async fn handle(
        &mut self,
        request: &UserRequest,
        observer: &dyn LoopObserver,
    ) -> Result<Response, RepairError> {
        let context = self.request_context(request).await;

        let outcome = self
            .repair_loop
            .run(
                &mut self.session,
                &request.command,
                context.as_deref(),
                observer,
            )
            .await?;

        let summary_input = match outcome.state {
            LoopState::Done => outcome.output.stdout.clone(),
            _ => outcome.output.combined_output(),
        };

        let (summary, summary_error) = match self
            .summarizer
            .summarize(&summary_input, &request.command)
            .await
        {
            Ok(summary) => (Some(summary), None),
            Err(e) => {
                warn!("Summarization failed: {}", e);
                (None, Some(e.to_string()))
            }
        };

        Ok(Response {
            outcome,
            context,
            summary,
            summary_error,
        })
    }

    /// Preference context for categorized requests; lookup failures are not fatal
    async fn request_context(&self, request: &UserRequest) -> Option<String> {
        let (client, category) = match (&self.preferences, &request.category) {
            (Some(client), Some(category)) => (client, category),
            _ => return None,
        };

        let command = client.command(&request.command, category);
        match client.preferred_task_summary(&[command]).await {
            Ok(summary) => Some(summary),
            Err(e) => {
                warn!("Continuing without preference context: {}", e);
                None
            }
        }
    }
}
