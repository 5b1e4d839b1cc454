//! HTTP request handlers
//!
//! Handles POST /research, POST /chat, GET /health.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::AppState;
use crate::chat::{ChatError, ChatReply, ChatRequest, MISSING_MESSAGE_REPLY};
use crate::governor::{GovernorReply, ReplyStatus, ResearchResponse};

pub const RATE_LIMIT_REMAINING: &str = "x-ratelimit-remaining";
pub const RATE_LIMIT_RESET: &str = "x-ratelimit-reset";

/// Identity used when the request carries no client address
pub const ANONYMOUS: &str = "anonymous";

/// Request body for POST /research
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearchRequest {
    #[serde(default)]
    pub task_id: Option<String>,
    #[serde(default)]
    pub task_title: Option<String>,
}

/// Response body for GET /health
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

/// Requester identity: first x-forwarded-for hop, then x-real-ip
pub fn requester_identity(headers: &HeaderMap) -> String {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(',').next().unwrap_or("").trim().to_string())
            .filter(|v| !v.is_empty())
    };
    header("x-forwarded-for")
        .or_else(|| header("x-real-ip"))
        .unwrap_or_else(|| ANONYMOUS.to_string())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// POST /research
pub async fn post_research(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<ResearchRequest>, JsonRejection>,
) -> Response {
    let body = match payload {
        Ok(Json(body)) => body,
        Err(rejection) => {
            warn!(error = %rejection.body_text(), "post_research: rejected body");
            return (
                StatusCode::BAD_REQUEST,
                Json(ResearchResponse::failure(format!("Invalid request body: {}", rejection.body_text()))),
            )
                .into_response();
        }
    };
    let (Some(task_id), Some(task_title)) = (non_empty(body.task_id), non_empty(body.task_title)) else {
        debug!("post_research: missing taskId or taskTitle");
        return (
            StatusCode::BAD_REQUEST,
            Json(ResearchResponse::failure("Missing taskId or taskTitle")),
        )
            .into_response();
    };

    let identity = requester_identity(&headers);
    debug!(%task_id, %identity, "post_research: called");
    research_response(state.governor.research(&task_id, &task_title, &identity).await)
}

fn research_response(reply: GovernorReply) -> Response {
    let status = match reply.status {
        ReplyStatus::Ok => StatusCode::OK,
        ReplyStatus::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        ReplyStatus::Failed => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let mut response = (status, Json(reply.response)).into_response();
    if let Some(quota) = reply.quota {
        let headers = response.headers_mut();
        headers.insert(RATE_LIMIT_REMAINING, HeaderValue::from(quota.remaining));
        if reply.status == ReplyStatus::RateLimited {
            headers.insert(RATE_LIMIT_RESET, HeaderValue::from(quota.reset_at));
        }
    }
    response
}

/// POST /chat
pub async fn post_chat(State(state): State<AppState>, payload: Result<Json<ChatRequest>, JsonRejection>) -> Response {
    let body = match payload {
        Ok(Json(body)) => body,
        Err(rejection) => {
            warn!(error = %rejection.body_text(), "post_chat: rejected body");
            return (
                StatusCode::BAD_REQUEST,
                Json(ChatReply {
                    reply: MISSING_MESSAGE_REPLY.to_string(),
                }),
            )
                .into_response();
        }
    };
    debug!(task_id = %body.task_id, "post_chat: called");
    match state.chat.reply(&body).await {
        Ok(reply) => Json(ChatReply { reply }).into_response(),
        Err(e) => {
            let status = match &e {
                ChatError::EmptyMessage => StatusCode::BAD_REQUEST,
                _ => {
                    warn!(error = %e, "Chat API error");
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            };
            (
                status,
                Json(ChatReply {
                    reply: e.user_reply().to_string(),
                }),
            )
                .into_response()
        }
    }
}

/// GET /health
pub async fn get_health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.started.elapsed().as_secs(),
    })
}
