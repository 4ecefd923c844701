// ABOUTME: Typed configuration loaded from environment variables and .env files
// ABOUTME: Settings for the model client, execution backends, repair loop and preference service

pub mod constants;

use std::env;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info};

use constants::*;

pub const DEFAULT_MODEL: &str = "claude-3-opus-20240229";
pub const DEFAULT_MAX_TOKENS: u32 = 2000;
pub const DEFAULT_TEMPERATURE: f32 = 0.2;
pub const DEFAULT_ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";

pub const DEFAULT_E2B_API_URL: &str = "https://api.e2b.dev";
pub const DEFAULT_E2B_DOMAIN: &str = "e2b.app";
pub const DEFAULT_E2B_TEMPLATE: &str = "code-interpreter-v1";
pub const DEFAULT_E2B_TIMEOUT_SECS: u64 = 300;
/// E2B caps sandbox lifetime at one day
pub const MAX_E2B_TIMEOUT_SECS: u64 = 86_400;

pub const DEFAULT_MAX_REPAIRS: u32 = 5;
pub const DEFAULT_PREFERRED_PROVIDERS: &[&str] = &["google music", "spotify", "apple music"];

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid number for {var}: {value}")]
    InvalidNumber { var: &'static str, value: String },

    #[error("{var} must be between {min} and {max}, got {value}")]
    OutOfRange {
        var: &'static str,
        value: String,
        min: String,
        max: String,
    },
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Settings for the generation collaborator
#[derive(Debug, Clone)]
pub struct ModelSettings {
    pub api_key: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub api_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// Run code as a subprocess in the working directory
    Local,
    /// Run code in a hosted E2B sandbox
    Remote,
}

impl ExecutionMode {
    /// Interpret the `EXECUTE_LOCALLY` flag. Anything other than a truthy value means remote.
    pub fn from_flag(flag: Option<&str>) -> Self {
        match flag.map(|f| f.trim().to_lowercase()) {
            Some(f) if f == "true" || f == "1" || f == "yes" => ExecutionMode::Local,
            _ => ExecutionMode::Remote,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LocalSettings {
    pub work_dir: PathBuf,
    pub python: String,
    pub pip: String,
}

impl Default for LocalSettings {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("."),
            python: "python".to_string(),
            pip: "pip".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RemoteSettings {
    pub api_key: String,
    pub api_url: String,
    pub domain: String,
    pub template: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct SandboxSettings {
    pub mode: ExecutionMode,
    pub local: LocalSettings,
    /// Present whenever `E2B_API_KEY` is set; required in remote mode
    pub remote: Option<RemoteSettings>,
}

#[derive(Debug, Clone)]
pub struct PreferenceSettings {
    pub url: String,
    pub channel_id: Option<String>,
    pub providers: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub model: ModelSettings,
    pub sandbox: SandboxSettings,
    pub additional_context: Option<String>,
    pub max_repairs: u32,
    pub preferences: Option<PreferenceSettings>,
}

impl Config {
    /// Load configuration from the process environment, reading `.env` first if present
    pub fn from_env() -> Result<Self> {
        Self::from_env_with_overrides(&[])
    }

    /// Like [`Config::from_env`], with `overrides` taking precedence over the environment
    pub fn from_env_with_overrides(overrides: &[(&str, &str)]) -> Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            debug!("Loaded environment from {}", path.display());
        }
        Self::from_lookup(with_overrides(overrides, |key| env::var(key).ok()))
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let model = ModelSettings {
            api_key: get(ANTHROPIC_API_KEY).ok_or(ConfigError::MissingVar(ANTHROPIC_API_KEY))?,
            model: get(ANTHROPIC_MODEL).unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            max_tokens: parse_or(get(MODEL_MAX_TOKENS), MODEL_MAX_TOKENS, DEFAULT_MAX_TOKENS)?,
            temperature: parse_or(get(MODEL_TEMPERATURE), MODEL_TEMPERATURE, DEFAULT_TEMPERATURE)?,
            api_url: get(ANTHROPIC_API_URL).unwrap_or_else(|| DEFAULT_ANTHROPIC_API_URL.to_string()),
        };

        if !(0.0..=1.0).contains(&model.temperature) {
            return Err(ConfigError::OutOfRange {
                var: MODEL_TEMPERATURE,
                value: model.temperature.to_string(),
                min: "0.0".to_string(),
                max: "1.0".to_string(),
            });
        }
        if model.max_tokens == 0 {
            return Err(ConfigError::OutOfRange {
                var: MODEL_MAX_TOKENS,
                value: "0".to_string(),
                min: "1".to_string(),
                max: u32::MAX.to_string(),
            });
        }

        let mode = ExecutionMode::from_flag(get(EXECUTE_LOCALLY).as_deref());

        let local = LocalSettings {
            work_dir: get(GENLY_WORK_DIR).map(PathBuf::from).unwrap_or_else(|| PathBuf::from(".")),
            python: get(GENLY_PYTHON).unwrap_or_else(|| "python".to_string()),
            pip: get(GENLY_PIP).unwrap_or_else(|| "pip".to_string()),
        };

        let remote = match get(E2B_API_KEY) {
            Some(api_key) => Some(RemoteSettings {
                api_key,
                api_url: get(E2B_API_URL).unwrap_or_else(|| DEFAULT_E2B_API_URL.to_string()),
                domain: get(E2B_DOMAIN).unwrap_or_else(|| DEFAULT_E2B_DOMAIN.to_string()),
                template: get(E2B_TEMPLATE).unwrap_or_else(|| DEFAULT_E2B_TEMPLATE.to_string()),
                timeout_secs: parse_or(get(E2B_TIMEOUT_SECS), E2B_TIMEOUT_SECS, DEFAULT_E2B_TIMEOUT_SECS)?,
            }),
            None => None,
        };

        if let Some(remote) = &remote {
            if !(1..=MAX_E2B_TIMEOUT_SECS).contains(&remote.timeout_secs) {
                return Err(ConfigError::OutOfRange {
                    var: E2B_TIMEOUT_SECS,
                    value: remote.timeout_secs.to_string(),
                    min: "1".to_string(),
                    max: MAX_E2B_TIMEOUT_SECS.to_string(),
                });
            }
        }

        if mode == ExecutionMode::Remote && remote.is_none() {
            return Err(ConfigError::MissingVar(E2B_API_KEY));
        }

        let max_repairs = parse_or(get(GENLY_MAX_REPAIRS), GENLY_MAX_REPAIRS, DEFAULT_MAX_REPAIRS)?;

        let preferences = get(GENLY_API_URL).map(|url| PreferenceSettings {
            url: url.trim_end_matches('/').to_string(),
            channel_id: get(GENLY_API_STREAMLIT_CHANNELID),
            providers: get(GENLY_PREFERRED_PROVIDERS)
                .map(|raw| {
                    raw.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_else(|| {
                    DEFAULT_PREFERRED_PROVIDERS
                        .iter()
                        .map(|s| s.to_string())
                        .collect()
                }),
        });

        info!(
            "Configuration loaded: model={}, mode={:?}, max_repairs={}",
            model.model, mode, max_repairs
        );

        Ok(Config {
            model,
            sandbox: SandboxSettings {
                mode,
                local,
                remote,
            },
            additional_context: get(ADDITIONAL_CONTEXT),
            max_repairs,
            preferences,
        })
    }
}

/// Layer fixed key/value pairs over a lookup
pub fn with_overrides<'a, F>(
    overrides: &'a [(&'a str, &'a str)],
    fallback: F,
) -> impl Fn(&str) -> Option<String> + 'a
where
    F: Fn(&str) -> Option<String> + 'a,
{
    move |key| {
        overrides
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.to_string())
            .or_else(|| fallback(key))
    }
}

fn parse_or<T: std::str::FromStr>(raw: Option<String>, var: &'static str, default: T) -> Result<T> {
    match raw {
        Some(value) => value
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidNumber { var, value }),
        None => Ok(default),
    }
}

/// Mask a credential for display, keeping only the last four characters
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 4 {
        return "****".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("****{}", tail)
}
