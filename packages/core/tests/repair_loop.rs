// ABOUTME: Repair loop and agent behavior against mocked model and executor
// ABOUTME: Covers bounded termination, repair triggers, parse aborts and summarization

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use genly_ai::{AIServiceError, AIServiceResult, Completion, CompletionRequest, LanguageModel, Usage};
use genly_config::PreferenceSettings;
use genly_core::diagnosis::FailureSignal;
use genly_core::summarizer::SUMMARY_TEMPERATURE;
use genly_core::{
    Agent, CodeGenerationClient, LoopEvent, LoopObserver, LoopState, NoopObserver, ParseError,
    PreferenceClient, RepairError, RepairLoop, Session, UserRequest,
};
use genly_sandbox::{CodeExecutor, ExecutionOutput, ExecutorError, ParsedProgram, Result};
use mockall::mock;
use pretty_assertions::assert_eq;

mock! {
    pub Model {}

    #[async_trait]
    impl LanguageModel for Model {
        async fn complete(&self, request: CompletionRequest) -> AIServiceResult<Completion>;
    }
}

mock! {
    pub Executor {}

    #[async_trait]
    impl CodeExecutor for Executor {
        fn name(&self) -> &'static str;
        async fn execute(&self, program: &ParsedProgram) -> Result<ExecutionOutput>;
    }
}

type Requests = Arc<Mutex<Vec<CompletionRequest>>>;

const FIBONACCI_RESPONSE: &str =
    "```python\na, b = 0, 1\nout = []\nfor _ in range(5):\n    out.append(str(a))\n    a, b = b, a + b\nprint(' '.join(out))\n```";

fn python(code: &str) -> String {
    format!("```python\n{}\n```", code)
}

/// Model that answers generations from a script and summaries with a fixed text
fn scripted_model(generations: Vec<String>, summary: &'static str, requests: Requests) -> MockModel {
    let mut model = MockModel::new();
    let mut generations = generations.into_iter();
    model.expect_complete().returning(move |request| {
        let mut seen = requests.lock().unwrap();
        seen.push(request.clone());
        let text = if request.temperature == Some(SUMMARY_TEMPERATURE) {
            summary.to_string()
        } else {
            generations.next().expect("unexpected generation request")
        };
        Ok(Completion {
            text,
            conversation_id: format!("msg_{}", seen.len()),
            usage: Usage::default(),
        })
    });
    model
}

/// Executor that replays outputs in order
fn scripted_executor(outputs: Vec<Result<ExecutionOutput>>) -> MockExecutor {
    let mut executor = MockExecutor::new();
    let count = outputs.len();
    let mut outputs = outputs.into_iter();
    executor.expect_name().return_const("mock");
    executor
        .expect_execute()
        .times(count)
        .returning(move |_| outputs.next().expect("unexpected execution"));
    executor
}

fn repair_loop(model: MockModel, executor: MockExecutor, max_repairs: u32) -> RepairLoop {
    RepairLoop::new(
        CodeGenerationClient::new(Arc::new(model)),
        Arc::new(executor),
        max_repairs,
    )
}

#[derive(Default)]
struct RecordingObserver {
    events: Mutex<Vec<LoopEvent>>,
}

impl LoopObserver for RecordingObserver {
    fn on_event(&self, event: &LoopEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

#[tokio::test]
async fn test_plain_output_needs_no_repair() {
    let requests = Requests::default();
    let model = scripted_model(vec![python("print(42)")], "", requests.clone());
    let executor = scripted_executor(vec![Ok(ExecutionOutput::from_stdout("42"))]);

    let mut session = Session::new(None);
    let outcome = repair_loop(model, executor, 5)
        .run(&mut session, "print 42", None, &NoopObserver)
        .await
        .unwrap();

    assert_eq!(outcome.state, LoopState::Done);
    assert_eq!(outcome.repairs, 0);
    assert_eq!(outcome.output.stdout, "42");
    assert_eq!(outcome.failure, None);
    assert_eq!(requests.lock().unwrap().len(), 1);
    assert_eq!(session.conversation_id.as_deref(), Some("msg_1"));
}

#[tokio::test]
async fn test_status_code_output_triggers_repair() {
    let requests = Requests::default();
    let model = scripted_model(
        vec![
            python("print('Status code: 404')"),
            python("print(42)"),
        ],
        "",
        requests.clone(),
    );
    let executor = scripted_executor(vec![
        Ok(ExecutionOutput::from_stdout("Status code: 404")),
        Ok(ExecutionOutput::from_stdout("42")),
    ]);

    let mut session = Session::new(Some("use the public API".to_string()));
    let outcome = repair_loop(model, executor, 5)
        .run(&mut session, "fetch the weather", None, &NoopObserver)
        .await
        .unwrap();

    assert_eq!(outcome.state, LoopState::Done);
    assert_eq!(outcome.repairs, 1);
    assert_eq!(outcome.program.code, "print(42)");

    let requests = requests.lock().unwrap();
    assert_eq!(requests.len(), 2);
    let repair = &requests[1];
    assert_eq!(repair.system, None);
    assert_eq!(repair.conversation_id.as_deref(), Some("msg_1"));
    assert!(repair.prompt.contains("print('Status code: 404')"));
    assert!(repair.prompt.contains("Errors:\nStatus code: 404"));
    assert!(repair.prompt.contains("Human Request: fetch the weather"));
    assert!(repair.prompt.contains("Additional Context: use the public API"));
    assert_eq!(session.conversation_id.as_deref(), Some("msg_2"));
}

#[tokio::test]
async fn test_loop_stops_after_max_repairs() {
    let generations = (0..10).map(|i| python(&format!("attempt({})", i))).collect();
    let model = scripted_model(generations, "", Requests::default());
    let failing = || {
        Ok(ExecutionOutput::from_stdout(
            "Traceback (most recent call last):\nNameError: name 'attempt' is not defined",
        ))
    };
    let executor = scripted_executor((0..4).map(|_| failing()).collect());

    let mut session = Session::new(None);
    let outcome = repair_loop(model, executor, 3)
        .run(&mut session, "never works", None, &NoopObserver)
        .await
        .unwrap();

    assert_eq!(outcome.state, LoopState::Failed);
    assert_eq!(outcome.repairs, 3);
    assert_eq!(outcome.program.code, "attempt(3)");
    assert_eq!(outcome.failure, Some(FailureSignal::Traceback));
    assert!(outcome.output.stdout.contains("NameError"));
}

#[tokio::test]
async fn test_zero_repairs_runs_once() {
    let model = scripted_model(vec![python("import sys; sys.exit(1)")], "", Requests::default());
    let executor = scripted_executor(vec![Ok(ExecutionOutput {
        stderr: "SystemExit".to_string(),
        ..Default::default()
    })]);

    let outcome = repair_loop(model, executor, 0)
        .run(&mut Session::new(None), "exit", None, &NoopObserver)
        .await
        .unwrap();

    assert_eq!(outcome.state, LoopState::Failed);
    assert_eq!(outcome.repairs, 0);
    assert_eq!(outcome.failure, Some(FailureSignal::Stderr));
}

#[tokio::test]
async fn test_unparseable_response_aborts_before_execution() {
    let model = scripted_model(
        vec!["I can't write code for that.".to_string()],
        "",
        Requests::default(),
    );
    let mut executor = MockExecutor::new();
    executor.expect_execute().never();

    let err = repair_loop(model, executor, 5)
        .run(&mut Session::new(None), "do something", None, &NoopObserver)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        RepairError::Parse(ParseError::MissingCodeFence)
    ));
}

#[tokio::test]
async fn test_unparseable_repair_aborts() {
    let model = scripted_model(
        vec![python("print(x)"), "```python\nprint(1)".to_string()],
        "",
        Requests::default(),
    );
    let executor = scripted_executor(vec![Ok(ExecutionOutput::from_stdout(
        "Traceback (most recent call last):",
    ))]);

    let err = repair_loop(model, executor, 5)
        .run(&mut Session::new(None), "print x", None, &NoopObserver)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        RepairError::Parse(ParseError::UnterminatedCodeBlock)
    ));
}

#[tokio::test]
async fn test_generation_error_propagates() {
    let mut model = MockModel::new();
    model
        .expect_complete()
        .times(1)
        .returning(|_| Err(AIServiceError::NoApiKey));
    let mut executor = MockExecutor::new();
    executor.expect_execute().never();

    let err = repair_loop(model, executor, 5)
        .run(&mut Session::new(None), "anything", None, &NoopObserver)
        .await
        .unwrap_err();

    assert!(matches!(err, RepairError::Generation(AIServiceError::NoApiKey)));
}

#[tokio::test]
async fn test_executor_error_is_repaired() {
    let requests = Requests::default();
    let model = scripted_model(
        vec![python("print('a')"), python("print('b')")],
        "",
        requests.clone(),
    );
    let executor = scripted_executor(vec![
        Err(ExecutorError::Sandbox("sandbox quota exceeded".to_string())),
        Ok(ExecutionOutput::from_stdout("b")),
    ]);

    let outcome = repair_loop(model, executor, 5)
        .run(&mut Session::new(None), "print b", None, &NoopObserver)
        .await
        .unwrap();

    assert_eq!(outcome.state, LoopState::Done);
    assert_eq!(outcome.repairs, 1);
    assert!(requests.lock().unwrap()[1]
        .prompt
        .contains("Sandbox error: sandbox quota exceeded"));
}

#[tokio::test]
async fn test_observer_sees_every_transition() {
    let model = scripted_model(
        vec![python("print('Failed to retrieve')"), python("print('ok')")],
        "",
        Requests::default(),
    );
    let executor = scripted_executor(vec![
        Ok(ExecutionOutput::from_stdout("Failed to retrieve")),
        Ok(ExecutionOutput::from_stdout("ok")),
    ]);
    let observer = RecordingObserver::default();

    repair_loop(model, executor, 5)
        .run(&mut Session::new(None), "fetch", None, &observer)
        .await
        .unwrap();

    let events = observer.events.lock().unwrap();
    assert_eq!(
        *events,
        vec![
            LoopEvent::StateChanged(LoopState::Generating),
            LoopEvent::Generated {
                response: python("print('Failed to retrieve')")
            },
            LoopEvent::StateChanged(LoopState::Executing),
            LoopEvent::Executed {
                output: ExecutionOutput::from_stdout("Failed to retrieve")
            },
            LoopEvent::ExecutionFailed {
                errors: "Failed to retrieve".to_string(),
                signal: FailureSignal::FailedRetrieval,
            },
            LoopEvent::StateChanged(LoopState::Generating),
            LoopEvent::Corrected {
                repair: 1,
                response: python("print('ok')")
            },
            LoopEvent::Rerunning { repair: 1 },
            LoopEvent::StateChanged(LoopState::Executing),
            LoopEvent::Executed {
                output: ExecutionOutput::from_stdout("ok")
            },
            LoopEvent::StateChanged(LoopState::Done),
        ]
    );
}

#[tokio::test]
async fn test_fibonacci_end_to_end() {
    let requests = Requests::default();
    let model = scripted_model(
        vec![FIBONACCI_RESPONSE.to_string()],
        "The program printed the first five Fibonacci numbers.",
        requests.clone(),
    );
    let executor = scripted_executor(vec![Ok(ExecutionOutput::from_stdout("0 1 1 2 3"))]);

    let mut agent = Agent::new(Arc::new(model), Arc::new(executor), Session::new(None), 5);
    let response = agent
        .handle(
            &UserRequest::new("print the first 5 Fibonacci numbers"),
            &NoopObserver,
        )
        .await
        .unwrap();

    assert!(response.outcome.succeeded());
    assert_eq!(response.outcome.repairs, 0);
    assert_eq!(response.outcome.output.stdout, "0 1 1 2 3");
    assert_eq!(
        response.summary.as_deref(),
        Some("The program printed the first five Fibonacci numbers.")
    );
    assert_eq!(response.summary_error, None);

    let requests = requests.lock().unwrap();
    assert_eq!(requests.len(), 2);
    let summary = &requests[1];
    assert_eq!(summary.temperature, Some(SUMMARY_TEMPERATURE));
    assert!(summary.prompt.contains("Code Output: 0 1 1 2 3"));
    assert!(summary
        .prompt
        .contains("Human Request: print the first 5 Fibonacci numbers"));
}

#[tokio::test]
async fn test_summary_failure_keeps_outcome() {
    let mut model = MockModel::new();
    model.expect_complete().returning(|request| {
        if request.temperature == Some(SUMMARY_TEMPERATURE) {
            Err(AIServiceError::ApiError("API returned 529: overloaded".to_string()))
        } else {
            Ok(Completion {
                text: python("print(42)"),
                conversation_id: "msg_1".to_string(),
                usage: Usage::default(),
            })
        }
    });
    let executor = scripted_executor(vec![Ok(ExecutionOutput::from_stdout("42"))]);

    let mut agent = Agent::new(Arc::new(model), Arc::new(executor), Session::new(None), 5);
    let response = agent
        .handle(&UserRequest::new("print 42"), &NoopObserver)
        .await
        .unwrap();

    assert!(response.outcome.succeeded());
    assert_eq!(response.summary, None);
    assert!(response.summary_error.unwrap().contains("529"));
}

#[tokio::test]
async fn test_failed_outcome_is_summarized_with_errors() {
    let requests = Requests::default();
    let model = scripted_model(vec![python("boom()")], "It failed.", requests.clone());
    let executor = scripted_executor(vec![Ok(ExecutionOutput {
        stdout: "partial".to_string(),
        stderr: "NameError: name 'boom' is not defined".to_string(),
        ..Default::default()
    })]);

    let mut agent = Agent::new(Arc::new(model), Arc::new(executor), Session::new(None), 0);
    let response = agent
        .handle(&UserRequest::new("boom"), &NoopObserver)
        .await
        .unwrap();

    assert_eq!(response.outcome.state, LoopState::Failed);
    assert_eq!(response.summary.as_deref(), Some("It failed."));
    assert!(requests.lock().unwrap()[1]
        .prompt
        .contains("Code Output: partial\nNameError: name 'boom' is not defined"));
}

mod preferences {
    use super::*;
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn preference_client(url: String) -> PreferenceClient {
        PreferenceClient::new(&PreferenceSettings {
            url,
            channel_id: Some("chan".to_string()),
            providers: vec!["spotify".to_string()],
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_category_adds_preference_context() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/process-preferred-task-summary"))
            .respond_with(ResponseTemplate::new(200).set_body_string("Prefer Spotify."))
            .expect(1)
            .mount(&server)
            .await;

        let requests = Requests::default();
        let model = scripted_model(vec![python("print('added')")], "Done.", requests.clone());
        let executor = scripted_executor(vec![Ok(ExecutionOutput::from_stdout("added"))]);

        let mut agent = Agent::new(Arc::new(model), Arc::new(executor), Session::new(None), 5)
            .with_preferences(preference_client(server.uri()));
        let request = UserRequest::new("add a song to my playlist")
            .with_category(Some("Entertainment".to_string()));
        let response = agent.handle(&request, &NoopObserver).await.unwrap();

        assert_eq!(response.context.as_deref(), Some("Prefer Spotify."));
        assert!(requests.lock().unwrap()[0]
            .prompt
            .contains("Context: Prefer Spotify."));
    }

    #[tokio::test]
    async fn test_preference_failure_is_not_fatal() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let requests = Requests::default();
        let model = scripted_model(vec![python("print('added')")], "Done.", requests.clone());
        let executor = scripted_executor(vec![Ok(ExecutionOutput::from_stdout("added"))]);

        let mut agent = Agent::new(Arc::new(model), Arc::new(executor), Session::new(None), 5)
            .with_preferences(preference_client(server.uri()));
        let request =
            UserRequest::new("add a song").with_category(Some("Entertainment".to_string()));
        let response = agent.handle(&request, &NoopObserver).await.unwrap();

        assert!(response.outcome.succeeded());
        assert_eq!(response.context, None);
        assert!(requests.lock().unwrap()[0].prompt.contains("Context: None"));
    }

    #[tokio::test]
    async fn test_uncategorized_request_skips_service() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let model = scripted_model(vec![python("print(1)")], "Done.", Requests::default());
        let executor = scripted_executor(vec![Ok(ExecutionOutput::from_stdout("1"))]);

        let mut agent = Agent::new(Arc::new(model), Arc::new(executor), Session::new(None), 5)
            .with_preferences(preference_client(server.uri()));
        let response = agent
            .handle(&UserRequest::new("print 1"), &NoopObserver)
            .await
            .unwrap();

        assert_eq!(response.context, None);
    }
}
