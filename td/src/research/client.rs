//! Research client
//!
//! One research call: render the prompts, ask the model with web search
//! enabled, and hand back the raw text.

use std::sync::Arc;

use tracing::{debug, info};

use super::error::ResearchError;
use super::parser::{self, ParsedResearch};
use crate::config::LlmConfig;
use crate::llm::{CompletionRequest, LlmClient, Message};
use crate::prompts::PromptLoader;

/// Invokes the research-capable model for a task title
pub struct ResearchClient {
    llm: Arc<dyn LlmClient>,
    prompts: Arc<PromptLoader>,
    max_tokens: u32,
    temperature: f32,
}

impl ResearchClient {
    pub fn new(llm: Arc<dyn LlmClient>, prompts: Arc<PromptLoader>, config: &LlmConfig) -> Self {
        debug!(max_tokens = config.max_tokens, temperature = config.temperature, "ResearchClient::new: called");
        Self {
            llm,
            prompts,
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        }
    }

    fn build_request(&self, title: &str) -> Result<CompletionRequest, ResearchError> {
        let system_prompt = self
            .prompts
            .research_system_prompt()
            .map_err(|e| ResearchError::Prompt(e.to_string()))?;
        let prompt = self
            .prompts
            .research_prompt(title)
            .map_err(|e| ResearchError::Prompt(e.to_string()))?;

        Ok(CompletionRequest {
            system_prompt,
            messages: vec![Message::user(prompt)],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            web_search: true,
        })
    }

    /// Call the model and return its raw text; no schema is assumed
    pub async fn invoke(&self, title: &str) -> Result<String, ResearchError> {
        debug!(%title, "ResearchClient::invoke: called");
        let request = self.build_request(title)?;
        let response = self.llm.complete(request).await?;
        info!(
            %title,
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            "Research call completed"
        );
        Ok(response.content.unwrap_or_default())
    }

    /// Invoke then parse
    pub async fn research(&self, title: &str) -> Result<ParsedResearch, ResearchError> {
        let raw = self.invoke(title).await?;
        Ok(parser::parse(&raw)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::client::mock::MockLlmClient;

    fn client(mock: Arc<MockLlmClient>) -> ResearchClient {
        ResearchClient::new(mock, Arc::new(PromptLoader::embedded_only()), &LlmConfig::default())
    }

    #[tokio::test]
    async fn test_invoke_sends_research_request() {
        let mock = Arc::new(MockLlmClient::with_texts(&["raw answer"]));
        let client = client(mock.clone());

        assert_eq!(client.invoke("Book dentist").await.unwrap(), "raw answer");

        let request = mock.last_request().await.unwrap();
        assert!(request.web_search);
        assert_eq!(request.max_tokens, 2048);
        assert!(request.system_prompt.contains("executive assistant"));
        assert!(request.messages[0].content.contains("Task: \"Book dentist\""));
    }

    #[tokio::test]
    async fn test_research_parses_output() {
        let mock = Arc::new(MockLlmClient::with_texts(&[
            "{\"isPersonal\": false, \"research\": {\"summary\": \"Call ahead\"}}",
        ]));
        let client = client(mock);

        match client.research("Book dentist").await.unwrap() {
            ParsedResearch::Research(research) => assert_eq!(research.summary, "Call ahead"),
            ParsedResearch::Personal => panic!("expected research"),
        }
    }

    #[tokio::test]
    async fn test_invocation_error_propagates() {
        let client = client(Arc::new(MockLlmClient::failing(500)));
        let err = client.research("Book dentist").await.unwrap_err();
        assert!(matches!(err, ResearchError::Invocation(_)));
    }

    #[tokio::test]
    async fn test_empty_response_is_parse_error() {
        let mock = Arc::new(MockLlmClient::new(vec![crate::llm::CompletionResponse::default()]));
        let err = client(mock).research("Book dentist").await.unwrap_err();
        assert!(matches!(err, ResearchError::Parse(_)));
    }
}
