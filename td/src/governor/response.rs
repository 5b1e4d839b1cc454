//! Governor replies

use serde::{Deserialize, Serialize};

use crate::domain::Research;

/// Uniform research answer; failures are data, never thrown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearchResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_personal: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub research: Option<Research>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ResearchResponse {
    pub fn personal() -> Self {
        Self {
            success: true,
            is_personal: Some(true),
            research: None,
            error: None,
        }
    }

    pub fn researched(research: Research) -> Self {
        Self {
            success: true,
            is_personal: Some(false),
            research: Some(research),
            error: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            is_personal: None,
            research: None,
            error: Some(message.into()),
        }
    }
}

/// How the governor disposed of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyStatus {
    /// Personal verdict, cache hit, or fresh research
    Ok,
    /// Quota exhausted; the research client was not called
    RateLimited,
    /// The research client or parser failed
    Failed,
}

/// Quota left for the requesting identity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quota {
    pub remaining: u32,
    /// Window end (Unix milliseconds)
    pub reset_at: i64,
}

/// A response plus the metadata a transport needs to present it
#[derive(Debug, Clone, PartialEq)]
pub struct GovernorReply {
    pub response: ResearchResponse,
    pub status: ReplyStatus,
    /// Present whenever the rate limiter was consulted
    pub quota: Option<Quota>,
}

impl GovernorReply {
    pub fn ok(response: ResearchResponse, quota: Option<Quota>) -> Self {
        Self {
            response,
            status: ReplyStatus::Ok,
            quota,
        }
    }
}
