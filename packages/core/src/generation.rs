// ABOUTME: Code generation client over the language model seam
// ABOUTME: Builds generation requests and keeps the session's conversation handle current

use std::sync::Arc;

use genly_ai::{AIServiceResult, Completion, CompletionRequest, LanguageModel};
use tracing::{debug, info};

use crate::prompts;
use crate::session::Session;

pub type Generation = Completion;

#[derive(Clone)]
pub struct CodeGenerationClient {
    model: Arc<dyn LanguageModel>,
}

impl CodeGenerationClient {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    /// First generation for a human command
    pub async fn generate(
        &self,
        session: &mut Session,
        command: &str,
        context: Option<&str>,
    ) -> AIServiceResult<Generation> {
        info!("Generating code for command: {}", command);

        let request = CompletionRequest::new(prompts::user_prompt(command, context))
            .with_system(prompts::system_prompt(session.additional_context()))
            .with_conversation(session.conversation_id.clone());

        self.send(session, request).await
    }

    /// Send an already-built repair prompt
    pub async fn repair(&self, session: &mut Session, prompt: String) -> AIServiceResult<Generation> {
        info!("Requesting corrected code");

        let request =
            CompletionRequest::new(prompt).with_conversation(session.conversation_id.clone());

        self.send(session, request).await
    }

    async fn send(
        &self,
        session: &mut Session,
        request: CompletionRequest,
    ) -> AIServiceResult<Generation> {
        let generation = self.model.complete(request).await?;
        debug!(
            "Session {} now at conversation {}",
            session.id, generation.conversation_id
        );
        session.record_turn(generation.conversation_id.clone());
        Ok(generation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use genly_ai::{AIServiceError, Usage};
    use std::sync::Mutex;

    /// Records requests and answers with numbered handles
    struct RecordingModel {
        requests: Mutex<Vec<CompletionRequest>>,
    }

    #[async_trait]
    impl LanguageModel for RecordingModel {
        async fn complete(&self, request: CompletionRequest) -> AIServiceResult<Completion> {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request);
            Ok(Completion {
                text: "```python\nprint(1)\n```".to_string(),
                conversation_id: format!("msg_{}", requests.len()),
                usage: Usage::default(),
            })
        }
    }

    struct FailingModel;

    #[async_trait]
    impl LanguageModel for FailingModel {
        async fn complete(&self, _request: CompletionRequest) -> AIServiceResult<Completion> {
            Err(AIServiceError::ApiError("API returned 529: overloaded".to_string()))
        }
    }

    #[tokio::test]
    async fn test_generate_then_repair_threads_handle() {
        let model = Arc::new(RecordingModel {
            requests: Mutex::new(Vec::new()),
        });
        let client = CodeGenerationClient::new(model.clone());
        let mut session = Session::new(Some("knows things".to_string()));

        client
            .generate(&mut session, "do it", Some("ctx"))
            .await
            .unwrap();
        assert_eq!(session.conversation_id.as_deref(), Some("msg_1"));

        client
            .repair(&mut session, "fix it".to_string())
            .await
            .unwrap();
        assert_eq!(session.conversation_id.as_deref(), Some("msg_2"));

        let requests = model.requests.lock().unwrap();
        assert_eq!(requests[0].conversation_id, None);
        assert!(requests[0]
            .system
            .as_deref()
            .unwrap()
            .contains("Initial Knowledge: knows things"));
        assert!(requests[0].prompt.contains("Human Command: do it"));

        assert_eq!(requests[1].prompt, "fix it");
        assert_eq!(requests[1].system, None);
        assert_eq!(requests[1].conversation_id.as_deref(), Some("msg_1"));
    }

    #[tokio::test]
    async fn test_generation_error_leaves_session_untouched() {
        let client = CodeGenerationClient::new(Arc::new(FailingModel));
        let mut session = Session::new(None);
        session.record_turn("msg_0");

        let err = client.generate(&mut session, "do it", None).await.unwrap_err();

        assert!(matches!(err, AIServiceError::ApiError(_)));
        assert_eq!(session.conversation_id.as_deref(), Some("msg_0"));
    }
}
