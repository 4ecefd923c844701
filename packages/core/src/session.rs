// ABOUTME: Per-process conversation session threaded through every generation call
// ABOUTME: Holds the latest conversation handle and the free-text additional context

use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    /// Handle returned by the most recent generation
    pub conversation_id: Option<String>,
    /// Seed knowledge embedded in system and repair prompts
    pub additional_context: Option<String>,
}

impl Session {
    pub fn new(additional_context: Option<String>) -> Self {
        let id = Uuid::new_v4();
        debug!("Starting session {}", id);
        Self {
            id,
            conversation_id: None,
            additional_context,
        }
    }

    /// Remember the handle of the latest generation
    pub fn record_turn(&mut self, conversation_id: impl Into<String>) {
        self.conversation_id = Some(conversation_id.into());
    }

    pub fn additional_context(&self) -> Option<&str> {
        self.additional_context.as_deref()
    }
}
