//! Ephemeral per-task conversation

use tracing::{debug, warn};

use super::service::{ChatRequest, ChatService};
use crate::domain::{ChatMessage, Task};

/// Shown when the model returns nothing
pub const EMPTY_REPLY: &str = "Sorry, I could not process that request.";

/// Shown when the reply could not be fetched
pub const FAILED_REPLY: &str = "Sorry, something went wrong. Please try again.";

/// Messages for the task currently open; never persisted
#[derive(Debug, Default)]
pub struct ChatSession {
    task_id: Option<String>,
    messages: Vec<ChatMessage>,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Switch to a task, dropping the conversation if it changed
    pub fn select(&mut self, task_id: &str) {
        if self.task_id.as_deref() != Some(task_id) {
            debug!(%task_id, previous = ?self.task_id, "ChatSession::select: task changed, clearing");
            self.task_id = Some(task_id.to_string());
            self.messages.clear();
        }
    }

    pub fn task_id(&self) -> Option<&str> {
        self.task_id.as_deref()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Send one user turn and append the assistant's answer
    ///
    /// Blank input is ignored. Failures become an assistant message rather
    /// than an error.
    pub async fn send(&mut self, service: &ChatService, task: &Task, input: &str) -> Option<&ChatMessage> {
        let input = input.trim();
        if input.is_empty() {
            return None;
        }
        self.select(&task.id);

        let request = ChatRequest {
            task_id: task.id.clone(),
            task_title: task.title.clone(),
            task_research: task.research.clone(),
            message: input.to_string(),
            history: self.messages.clone(),
        };
        self.messages.push(ChatMessage::user(input));

        let content = match service.reply(&request).await {
            Ok(reply) if reply.trim().is_empty() => EMPTY_REPLY.to_string(),
            Ok(reply) => reply,
            Err(e) => {
                warn!(task_id = %task.id, error = %e, "Chat reply failed");
                FAILED_REPLY.to_string()
            }
        };
        self.messages.push(ChatMessage::assistant(content));
        self.messages.last()
    }
}
