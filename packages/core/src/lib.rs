// ABOUTME: Generate, execute, diagnose and repair pipeline for Genly
// ABOUTME: Parser, diagnosis, prompts, repair loop, summarizer and the request facade

pub mod agent;
pub mod diagnosis;
pub mod generation;
pub mod parser;
pub mod preferences;
pub mod prompts;
pub mod repair;
pub mod session;
pub mod summarizer;

pub use agent::{Agent, AgentError, Response, UserRequest};
pub use diagnosis::{classify, FailureSignal, Verdict};
pub use generation::{CodeGenerationClient, Generation};
pub use parser::{parse_response, ParseError};
pub use preferences::{PreferenceClient, PreferenceCommand, PreferenceError};
pub use repair::{
    LoopEvent, LoopObserver, LoopState, NoopObserver, RepairError, RepairLoop, RepairOutcome,
};
pub use session::Session;
pub use summarizer::ResultSummarizer;
