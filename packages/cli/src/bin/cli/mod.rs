pub mod chat;
pub mod config;
pub mod run;

use anyhow::{Context, Result};
use genly_config::constants::EXECUTE_LOCALLY;
use genly_config::Config;

/// Load configuration from `.env` and the environment, forcing local mode when asked
pub fn load_config(force_local: bool) -> Result<Config> {
    let overrides: &[(&str, &str)] = if force_local {
        &[(EXECUTE_LOCALLY, "true")]
    } else {
        &[]
    };

    Config::from_env_with_overrides(overrides).context("Failed to load configuration")
}
