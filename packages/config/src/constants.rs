// ABOUTME: Environment variable name constants
// ABOUTME: Centralized definitions of all environment variable names used across Genly

// Generation collaborator (Anthropic)
pub const ANTHROPIC_API_KEY: &str = "ANTHROPIC_API_KEY";
pub const ANTHROPIC_MODEL: &str = "ANTHROPIC_MODEL";
pub const ANTHROPIC_API_URL: &str = "ANTHROPIC_API_URL";
pub const MODEL_MAX_TOKENS: &str = "MODEL_MAX_TOKENS";
pub const MODEL_TEMPERATURE: &str = "MODEL_TEMPERATURE";

// Sandbox collaborator (E2B)
pub const E2B_API_KEY: &str = "E2B_API_KEY";
pub const E2B_API_URL: &str = "E2B_API_URL";
pub const E2B_DOMAIN: &str = "E2B_DOMAIN";
pub const E2B_TEMPLATE: &str = "E2B_TEMPLATE";
pub const E2B_TIMEOUT_SECS: &str = "E2B_TIMEOUT_SECS";

// Local execution
pub const EXECUTE_LOCALLY: &str = "EXECUTE_LOCALLY";
pub const GENLY_WORK_DIR: &str = "GENLY_WORK_DIR";
pub const GENLY_PYTHON: &str = "GENLY_PYTHON";
pub const GENLY_PIP: &str = "GENLY_PIP";

// Session & repair loop
pub const ADDITIONAL_CONTEXT: &str = "ADDITIONAL_CONTEXT";
pub const GENLY_MAX_REPAIRS: &str = "GENLY_MAX_REPAIRS";

// Preference-summary service
pub const GENLY_API_URL: &str = "GENLY_API_URL";
pub const GENLY_API_STREAMLIT_CHANNELID: &str = "GENLY_API_STREAMLIT_CHANNELID";
pub const GENLY_PREFERRED_PROVIDERS: &str = "GENLY_PREFERRED_PROVIDERS";
