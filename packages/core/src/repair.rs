// ABOUTME: Bounded generate, execute, diagnose and repair state machine
// ABOUTME: Reports every transition to an observer and ends in Done or Failed

use std::fmt;
use std::sync::Arc;

use genly_ai::AIServiceError;
use genly_sandbox::{CodeExecutor, ExecutionOutput, ParsedProgram, RuntimeError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::diagnosis::{classify, FailureSignal, Verdict};
use crate::generation::CodeGenerationClient;
use crate::parser::{parse_response, ParseError};
use crate::prompts;
use crate::session::Session;

/// Name given to the runtime error synthesized from an executor failure
pub const EXECUTOR_ERROR_NAME: &str = "ExecutorError";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoopState {
    Generating,
    Executing,
    Done,
    Failed,
}

impl fmt::Display for LoopState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LoopState::Generating => "generating",
            LoopState::Executing => "executing",
            LoopState::Done => "done",
            LoopState::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoopEvent {
    StateChanged(LoopState),
    /// Response to the original command
    Generated { response: String },
    Executed { output: ExecutionOutput },
    ExecutionFailed { errors: String, signal: FailureSignal },
    /// Response to a repair prompt
    Corrected { repair: u32, response: String },
    /// Sent before the corrected program runs
    Rerunning { repair: u32 },
}

/// Receives loop events as they happen
pub trait LoopObserver: Send + Sync {
    fn on_event(&self, event: &LoopEvent);
}

pub struct NoopObserver;

impl LoopObserver for NoopObserver {
    fn on_event(&self, _event: &LoopEvent) {}
}

#[derive(Debug, Clone, PartialEq)]
pub struct RepairOutcome {
    /// Either `Done` or `Failed`
    pub state: LoopState,
    /// Last program that ran
    pub program: ParsedProgram,
    pub output: ExecutionOutput,
    pub repairs: u32,
    /// Why the last execution was rejected, `None` when done
    pub failure: Option<FailureSignal>,
}

impl RepairOutcome {
    pub fn succeeded(&self) -> bool {
        self.state == LoopState::Done
    }
}

#[derive(Debug, Error)]
pub enum RepairError {
    #[error("Code generation failed: {0}")]
    Generation(#[from] AIServiceError),

    #[error("Could not parse model response: {0}")]
    Parse(#[from] ParseError),
}

pub struct RepairLoop {
    generator: CodeGenerationClient,
    executor: Arc<dyn CodeExecutor>,
    max_repairs: u32,
}

impl RepairLoop {
    pub fn new(
        generator: CodeGenerationClient,
        executor: Arc<dyn CodeExecutor>,
        max_repairs: u32,
    ) -> Self {
        Self {
            generator,
            executor,
            max_repairs,
        }
    }

    pub fn max_repairs(&self) -> u32 {
        self.max_repairs
    }

    /// Run the loop for one human command
    pub async fn run(
        &self,
        session: &mut Session,
        command: &str,
        context: Option<&str>,
        observer: &dyn LoopObserver,
    ) -> Result<RepairOutcome, RepairError> {
        observer.on_event(&LoopEvent::StateChanged(LoopState::Generating));
        let generation = self.generator.generate(session, command, context).await?;
        observer.on_event(&LoopEvent::Generated {
            response: generation.text.clone(),
        });

        let mut program = parse_response(&generation.text)?;
        let mut repairs = 0;

        loop {
            observer.on_event(&LoopEvent::StateChanged(LoopState::Executing));
            let output = self.execute(&program).await;
            observer.on_event(&LoopEvent::Executed {
                output: output.clone(),
            });

            let signal = match classify(&output) {
                Verdict::Success => {
                    info!("Execution succeeded after {} repair(s)", repairs);
                    observer.on_event(&LoopEvent::StateChanged(LoopState::Done));
                    return Ok(RepairOutcome {
                        state: LoopState::Done,
                        program,
                        output,
                        repairs,
                        failure: None,
                    });
                }
                Verdict::Failure(signal) => signal,
            };

            let errors = failure_text(&output, &signal);
            warn!("Execution failed: {}", signal.describe());
            observer.on_event(&LoopEvent::ExecutionFailed {
                errors: errors.clone(),
                signal: signal.clone(),
            });

            if repairs >= self.max_repairs {
                warn!("Giving up after {} repair(s)", repairs);
                observer.on_event(&LoopEvent::StateChanged(LoopState::Failed));
                return Ok(RepairOutcome {
                    state: LoopState::Failed,
                    program,
                    output,
                    repairs,
                    failure: Some(signal),
                });
            }

            repairs += 1;
            info!("Repair {} of {}", repairs, self.max_repairs);
            observer.on_event(&LoopEvent::StateChanged(LoopState::Generating));

            let prompt =
                prompts::repair_prompt(&program.code, &errors, command, session.additional_context());
            let generation = self.generator.repair(session, prompt).await?;
            observer.on_event(&LoopEvent::Corrected {
                repair: repairs,
                response: generation.text.clone(),
            });

            program = parse_response(&generation.text)?;
            observer.on_event(&LoopEvent::Rerunning { repair: repairs });
        }
    }

    /// Executor failures come back as failed output so they enter the repair edge
    async fn execute(&self, program: &ParsedProgram) -> ExecutionOutput {
        match self.executor.execute(program).await {
            Ok(output) => output,
            Err(e) => {
                error!("{} executor failed: {}", self.executor.name(), e);
                let message = e.to_string();
                ExecutionOutput {
                    stderr: message.clone(),
                    error: Some(RuntimeError {
                        name: EXECUTOR_ERROR_NAME.to_string(),
                        value: message,
                        traceback: String::new(),
                    }),
                    ..Default::default()
                }
            }
        }
    }
}

/// Text fed back to the model for a failed execution
fn failure_text(output: &ExecutionOutput, signal: &FailureSignal) -> String {
    let combined = output.combined_output();
    if combined.trim().is_empty() {
        signal.describe()
    } else {
        combined
    }
}
