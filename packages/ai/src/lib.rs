// ABOUTME: Language model integration for code generation
// ABOUTME: LanguageModel trait and the Anthropic Messages API client

pub mod service;

// Re-export service types
pub use service::{
    AIServiceError, AIServiceResult, AnthropicClient, Completion, CompletionRequest,
    LanguageModel, Usage,
};
