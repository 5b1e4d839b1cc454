//! LlmClient trait definition

use async_trait::async_trait;

use super::{CompletionRequest, CompletionResponse, LlmError};

/// Stateless LLM client - each call is independent
///
/// Research and chat both send their whole context with every request; no
/// conversation state lives in the client.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send a single completion request and wait for the full answer
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;
}
