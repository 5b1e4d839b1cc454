//! HTTP boundary
//!
//! A small axum server exposing the request governor and chat service to
//! networked clients.

use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::routing::{get, post};
use eyre::{Context, Result};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::chat::ChatService;
use crate::config::ServerConfig;
use crate::governor::Governor;

mod handlers;

pub use handlers::{
    ANONYMOUS, HealthResponse, RATE_LIMIT_REMAINING, RATE_LIMIT_RESET, ResearchRequest, requester_identity,
};

/// Shared state for request handlers
#[derive(Clone)]
pub struct AppState {
    pub governor: Arc<Governor>,
    pub chat: Arc<ChatService>,
    pub started: Instant,
}

impl AppState {
    pub fn new(governor: Arc<Governor>, chat: Arc<ChatService>) -> Self {
        Self {
            governor,
            chat,
            started: Instant::now(),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/research", post(handlers::post_research))
        .route("/chat", post(handlers::post_chat))
        .route("/health", get(handlers::get_health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind and serve until ctrl-c
pub async fn serve(config: &ServerConfig, state: AppState) -> Result<()> {
    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context(format!("Failed to bind {}", addr))?;
    info!(%addr, "Server listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await
        .context("Server error")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::response::Response;
    use tower::ServiceExt;

    use super::*;
    use crate::chat::{ERROR_REPLY, MISSING_MESSAGE_REPLY};
    use crate::config::LlmConfig;
    use crate::governor::GovernorConfig;
    use crate::llm::client::mock::MockLlmClient;
    use crate::prompts::PromptLoader;
    use crate::research::ResearchClient;

    const DENTIST_JSON: &str = r#"{"isPersonal": false, "research": {"summary": "Dr. Smith has openings", "quickInfo": {"phoneFormatted": "(555) 123-4567"}}}"#;

    fn app(mock: MockLlmClient, max: u32) -> Router {
        let mock = Arc::new(mock);
        let prompts = Arc::new(PromptLoader::embedded_only());
        let llm_config = LlmConfig::default();
        let client = ResearchClient::new(mock.clone(), prompts.clone(), &llm_config);
        let config = GovernorConfig {
            rate_limit_max: max,
            ..Default::default()
        };
        let governor = Arc::new(Governor::new(config, Arc::new(client)));
        let chat = Arc::new(ChatService::new(mock, prompts, &llm_config));
        router(AppState::new(governor, chat))
    }

    fn post(uri: &str, body: serde_json::Value) -> Request<Body> {
        post_raw(uri, &body.to_string())
    }

    fn post_raw(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .header("x-forwarded-for", "1.2.3.4")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json(resp: Response) -> serde_json::Value {
        let body = axum::body::to_bytes(resp.into_body(), 100_000).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_research_success_sets_remaining_header() {
        let app = app(MockLlmClient::with_texts(&[DENTIST_JSON]), 10);
        let resp = app
            .oneshot(post("/research", serde_json::json!({"taskId": "t1", "taskTitle": "Book dentist"})))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[RATE_LIMIT_REMAINING], "9");
        let body = json(resp).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["isPersonal"], false);
        assert_eq!(body["research"]["quickInfo"]["phoneFormatted"], "(555) 123-4567");
    }

    #[tokio::test]
    async fn test_research_missing_fields() {
        let app = app(MockLlmClient::with_texts(&[]), 10);
        let resp = app
            .oneshot(post("/research", serde_json::json!({"taskId": "t1"})))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = json(resp).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Missing taskId or taskTitle");
    }

    #[tokio::test]
    async fn test_research_bad_body_keeps_response_shape() {
        let app = app(MockLlmClient::with_texts(&[]), 10);

        let wrong_type = app
            .clone()
            .oneshot(post("/research", serde_json::json!({"taskId": 42, "taskTitle": "Book dentist"})))
            .await
            .unwrap();
        assert_eq!(wrong_type.status(), StatusCode::BAD_REQUEST);
        assert!(!wrong_type.headers().contains_key(RATE_LIMIT_REMAINING));
        let body = json(wrong_type).await;
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().starts_with("Invalid request body"));

        let not_json = app.oneshot(post_raw("/research", "taskId=t1")).await.unwrap();
        assert_eq!(not_json.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json(not_json).await["success"], false);
    }

    #[tokio::test]
    async fn test_research_rate_limited() {
        let app = app(MockLlmClient::failing(500), 1);

        let first = app
            .clone()
            .oneshot(post("/research", serde_json::json!({"taskId": "t1", "taskTitle": "Find flights"})))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json(first).await["success"], false);

        let second = app
            .oneshot(post("/research", serde_json::json!({"taskId": "t2", "taskTitle": "Find hotels"})))
            .await
            .unwrap();
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(second.headers()[RATE_LIMIT_REMAINING], "0");
        assert!(second.headers().contains_key(RATE_LIMIT_RESET));
        assert_eq!(
            json(second).await["error"],
            "Rate limit exceeded. You can make 1 research requests per day."
        );
    }

    #[tokio::test]
    async fn test_research_personal_has_no_quota_header() {
        let app = app(MockLlmClient::with_texts(&[]), 10);
        let resp = app
            .oneshot(post("/research", serde_json::json!({"taskId": "t1", "taskTitle": "Call mom"})))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(!resp.headers().contains_key(RATE_LIMIT_REMAINING));
        assert_eq!(json(resp).await["isPersonal"], true);
    }

    #[tokio::test]
    async fn test_chat_replies() {
        let app = app(MockLlmClient::with_texts(&["Call before noon."]), 10);
        let resp = app
            .oneshot(post(
                "/chat",
                serde_json::json!({
                    "taskId": "t1",
                    "taskTitle": "Book dentist",
                    "taskResearch": null,
                    "message": "When should I call?",
                    "history": []
                }),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(json(resp).await["reply"], "Call before noon.");
    }

    #[tokio::test]
    async fn test_chat_accepts_partial_research() {
        let app = app(MockLlmClient::with_texts(&["Ask about openings."]), 10);
        let resp = app
            .oneshot(post(
                "/chat",
                serde_json::json!({"message": "hi", "taskResearch": {"summary": "x"}}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(json(resp).await["reply"], "Ask about openings.");
    }

    #[tokio::test]
    async fn test_chat_bad_body_keeps_reply_shape() {
        let app = app(MockLlmClient::with_texts(&[]), 10);

        let wrong_type = app
            .clone()
            .oneshot(post("/chat", serde_json::json!({"message": ["hi"]})))
            .await
            .unwrap();
        assert_eq!(wrong_type.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json(wrong_type).await["reply"], MISSING_MESSAGE_REPLY);

        let not_json = app.oneshot(post_raw("/chat", "{\"message\": ")).await.unwrap();
        assert_eq!(not_json.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json(not_json).await["reply"], MISSING_MESSAGE_REPLY);
    }

    #[tokio::test]
    async fn test_chat_errors() {
        let app = app(MockLlmClient::failing(500), 10);
        let missing = app
            .clone()
            .oneshot(post("/chat", serde_json::json!({"taskTitle": "Book dentist"})))
            .await
            .unwrap();
        assert_eq!(missing.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json(missing).await["reply"], MISSING_MESSAGE_REPLY);

        let failed = app
            .oneshot(post("/chat", serde_json::json!({"taskTitle": "Book dentist", "message": "hi"})))
            .await
            .unwrap();
        assert_eq!(failed.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json(failed).await["reply"], ERROR_REPLY);
    }

    #[tokio::test]
    async fn test_health() {
        let app = app(MockLlmClient::with_texts(&[]), 10);
        let resp = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let health: HealthResponse = serde_json::from_value(json(resp).await).unwrap();
        assert_eq!(health.status, "ok");
    }
}
