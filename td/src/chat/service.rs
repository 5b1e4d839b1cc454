//! Chat reply service
//!
//! Answers follow-up questions about one task. The conversation is rebuilt
//! on every call: a context turn describing the task and its briefing, a
//! fixed acknowledgement, the prior history, then the new message.

use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::LlmConfig;
use crate::domain::{ChatMessage, ChatRole, Research};
use crate::llm::{CompletionRequest, LlmClient, LlmError, Message};
use crate::prompts::PromptLoader;
use crate::research::parser::normalize_research;

/// Assistant turn that follows the context turn
pub const CONTEXT_ACK: &str = "I understand. I'll help answer questions about this task using the research provided.";

/// Reply when the request has no message
pub const MISSING_MESSAGE_REPLY: &str = "Please provide a message.";

/// User-safe reply when the provider fails
pub const ERROR_REPLY: &str = "Sorry, I encountered an error. Please try again.";

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("message is empty")]
    EmptyMessage,

    #[error("Chat completion failed: {0}")]
    Provider(#[from] LlmError),

    #[error("Failed to render chat context: {0}")]
    Prompt(String),
}

impl ChatError {
    /// What the user sees instead of the raw error
    pub fn user_reply(&self) -> &'static str {
        match self {
            ChatError::EmptyMessage => MISSING_MESSAGE_REPLY,
            ChatError::Provider(_) | ChatError::Prompt(_) => ERROR_REPLY,
        }
    }
}

/// One follow-up question about a task
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default)]
    pub task_id: String,
    #[serde(default)]
    pub task_title: String,
    #[serde(default, deserialize_with = "lenient_research")]
    pub task_research: Option<Research>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub history: Vec<ChatMessage>,
}

/// Accept any briefing object the client sends, however partial
fn lenient_research<'de, D>(deserializer: D) -> Result<Option<Research>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Object(obj) => Some(normalize_research(&obj)),
        _ => None,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    pub reply: String,
}

pub struct ChatService {
    llm: Arc<dyn LlmClient>,
    prompts: Arc<PromptLoader>,
    max_tokens: u32,
    temperature: f32,
}

impl ChatService {
    pub fn new(llm: Arc<dyn LlmClient>, prompts: Arc<PromptLoader>, config: &LlmConfig) -> Self {
        debug!(max_tokens = config.chat_max_tokens, "ChatService::new: called");
        Self {
            llm,
            prompts,
            max_tokens: config.chat_max_tokens,
            temperature: config.temperature,
        }
    }

    fn build_request(&self, request: &ChatRequest) -> Result<CompletionRequest, ChatError> {
        let context = self
            .prompts
            .chat_context_prompt(&request.task_title, request.task_research.as_ref())
            .map_err(|e| ChatError::Prompt(e.to_string()))?;

        let mut messages = Vec::with_capacity(request.history.len() + 3);
        messages.push(Message::user(context));
        messages.push(Message::assistant(CONTEXT_ACK));
        messages.extend(request.history.iter().map(|m| match m.role {
            ChatRole::User => Message::user(m.content.clone()),
            ChatRole::Assistant => Message::assistant(m.content.clone()),
        }));
        messages.push(Message::user(request.message.clone()));

        Ok(CompletionRequest {
            system_prompt: String::new(),
            messages,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            web_search: false,
        })
    }

    /// Ask the model for the next assistant turn
    pub async fn reply(&self, request: &ChatRequest) -> Result<String, ChatError> {
        debug!(task_id = %request.task_id, history = request.history.len(), "ChatService::reply: called");
        if request.message.trim().is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        let completion = self.build_request(request)?;
        let response = self.llm.complete(completion).await?;
        info!(
            task_id = %request.task_id,
            output_tokens = response.usage.output_tokens,
            "Chat reply generated"
        );
        Ok(response.content.unwrap_or_default())
    }
}
