// ABOUTME: Client for the preference-summary service
// ABOUTME: Turns a command and task category into request context for generation

use std::time::Duration;

use genly_config::PreferenceSettings;
use reqwest::Client;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info};

const REQUEST_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Error)]
pub enum PreferenceError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Preference service returned {status}: {body}")]
    Status { status: u16, body: String },
}

pub type PreferenceResult<T> = Result<T, PreferenceError>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferenceCommand {
    pub command: String,
    pub capability_category: String,
    pub providers_to_use: Vec<String>,
}

impl PreferenceCommand {
    pub fn new(
        command: impl Into<String>,
        capability_category: impl Into<String>,
        providers_to_use: Vec<String>,
    ) -> Self {
        Self {
            command: command.into(),
            capability_category: capability_category.into(),
            providers_to_use,
        }
    }
}

#[derive(Debug, Serialize)]
struct TaskSummaryRequest<'a> {
    #[serde(rename = "channelID")]
    channel_id: Option<&'a str>,
    preferences: &'a [PreferenceCommand],
}

#[derive(Debug, Serialize)]
struct RecommendationRequest<'a> {
    commands: &'a [String],
}

pub struct PreferenceClient {
    client: Client,
    url: String,
    channel_id: Option<String>,
    providers: Vec<String>,
}

impl PreferenceClient {
    pub fn new(settings: &PreferenceSettings) -> PreferenceResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            url: settings.url.trim_end_matches('/').to_string(),
            channel_id: settings.channel_id.clone(),
            providers: settings.providers.clone(),
        })
    }

    /// Providers attached to commands built by [`PreferenceClient::command`]
    pub fn providers(&self) -> &[String] {
        &self.providers
    }

    /// Build a preference command using the configured providers
    pub fn command(&self, command: &str, category: &str) -> PreferenceCommand {
        PreferenceCommand::new(command, category, self.providers.clone())
    }

    /// Summary of the user's preferred way to carry out the given commands
    pub async fn preferred_task_summary(
        &self,
        preferences: &[PreferenceCommand],
    ) -> PreferenceResult<String> {
        info!(
            "Requesting preferred task summary for {} command(s)",
            preferences.len()
        );

        let body = TaskSummaryRequest {
            channel_id: self.channel_id.as_deref(),
            preferences,
        };
        let response = self
            .client
            .post(format!("{}/process-preferred-task-summary", self.url))
            .header("accept", "application/json")
            .json(&body)
            .send()
            .await?;

        Self::check_status(response).await?.text().await.map_err(Into::into)
    }

    pub async fn provider_recommendations(
        &self,
        commands: &[String],
    ) -> PreferenceResult<serde_json::Value> {
        info!("Requesting provider recommendations for {} command(s)", commands.len());

        let response = self
            .client
            .post(format!("{}/generate-provider-recommendations", self.url))
            .header("accept", "application/json")
            .json(&RecommendationRequest { commands })
            .send()
            .await?;

        Self::check_status(response).await?.json().await.map_err(Into::into)
    }

    async fn check_status(response: reqwest::Response) -> PreferenceResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        error!("Preference service error: {} - {}", status, body);
        Err(PreferenceError::Status {
            status: status.as_u16(),
            body,
        })
    }
}
