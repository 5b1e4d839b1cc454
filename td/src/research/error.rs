//! Research error types

use thiserror::Error;

use crate::llm::LlmError;

/// Errors turning raw model output into a briefing
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("no JSON found")]
    NoJsonFound,

    #[error("malformed JSON: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Errors from one research attempt
#[derive(Debug, Error)]
pub enum ResearchError {
    /// The provider call itself failed
    #[error("Research invocation failed: {0}")]
    Invocation(#[from] LlmError),

    /// The provider answered but the answer was unusable
    #[error("Failed to parse research response: {0}")]
    Parse(#[from] ParseError),

    #[error("Failed to render research prompt: {0}")]
    Prompt(String),
}
