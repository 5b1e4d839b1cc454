//! Governor implementation

use std::sync::Arc;

use taskstore::now_ms;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::cache::{ResponseCache, cache_key};
use super::config::GovernorConfig;
use super::rate_limit::{RateDecision, RateLimiter};
use super::response::{GovernorReply, Quota, ReplyStatus, ResearchResponse};
use crate::classifier::is_personal_task;
use crate::domain::RateLimitInfo;
use crate::research::{ParsedResearch, ResearchClient};

/// Rejection text for an exhausted quota
pub fn rate_limit_message(max: u32) -> String {
    format!("Rate limit exceeded. You can make {} research requests per day.", max)
}

/// Cache and rate limiter in front of the research client
///
/// Both maps are held for the life of the process and reset on restart. Locks
/// are never held across the research call, so two requests for the same
/// title may both miss the cache and both call out.
pub struct Governor {
    config: GovernorConfig,
    client: Arc<ResearchClient>,
    cache: Mutex<ResponseCache>,
    limiter: Mutex<RateLimiter>,
}

impl Governor {
    pub fn new(config: GovernorConfig, client: Arc<ResearchClient>) -> Self {
        debug!(?config, "Governor::new: called");
        Self {
            cache: Mutex::new(ResponseCache::new(config.cache_ttl_ms())),
            limiter: Mutex::new(RateLimiter::new(config.rate_limit_max, config.rate_window_ms())),
            config,
            client,
        }
    }

    pub fn config(&self) -> &GovernorConfig {
        &self.config
    }

    /// Research a task title on behalf of `identity`
    pub async fn research(&self, task_id: &str, title: &str, identity: &str) -> GovernorReply {
        self.research_at(task_id, title, identity, now_ms()).await
    }

    /// Research with an explicit clock reading
    pub async fn research_at(&self, task_id: &str, title: &str, identity: &str, now: i64) -> GovernorReply {
        debug!(%task_id, %title, %identity, now, "Governor::research_at: called");

        if is_personal_task(title) {
            debug!(%task_id, "Governor::research_at: personal task, skipping research");
            return GovernorReply::ok(ResearchResponse::personal(), None);
        }

        let key = cache_key(title);
        if let Some(cached) = self.cache.lock().await.get(&key, now) {
            debug!(%task_id, %key, "Governor::research_at: cache hit");
            return GovernorReply::ok(cached, None);
        }

        let decision = self.limiter.lock().await.check(identity, now);
        let quota = match decision {
            RateDecision::Limited { reset_at } => {
                info!(%identity, reset_at, "Research request rate limited");
                return GovernorReply {
                    response: ResearchResponse::failure(rate_limit_message(self.config.rate_limit_max)),
                    status: ReplyStatus::RateLimited,
                    quota: Some(Quota { remaining: 0, reset_at }),
                };
            }
            RateDecision::Allowed { remaining, reset_at } => Quota { remaining, reset_at },
        };

        match self.client.research(title).await {
            Ok(parsed) => {
                let response = match parsed {
                    ParsedResearch::Personal => ResearchResponse::personal(),
                    ParsedResearch::Research(research) => ResearchResponse::researched(research),
                };
                self.cache.lock().await.insert(key, response.clone(), now);
                info!(%task_id, remaining = quota.remaining, "Research succeeded");
                GovernorReply::ok(response, Some(quota))
            }
            Err(e) => {
                warn!(%task_id, error = %e, "Research failed");
                GovernorReply {
                    response: ResearchResponse::failure(e.to_string()),
                    status: ReplyStatus::Failed,
                    quota: Some(quota),
                }
            }
        }
    }

    /// Current rate-limit window for `identity`
    pub async fn quota(&self, identity: &str) -> Option<RateLimitInfo> {
        self.limiter.lock().await.info(identity)
    }

    /// Seed the limiter with a window persisted by an earlier process
    pub async fn restore_quota(&self, identity: &str, info: RateLimitInfo) {
        self.limiter.lock().await.seed(identity, info);
    }

    /// Number of cached results
    pub async fn cached_len(&self) -> usize {
        self.cache.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LlmConfig;
    use crate::llm::client::mock::MockLlmClient;
    use crate::prompts::PromptLoader;

    const DENTIST_JSON: &str = r#"{"isPersonal": false, "research": {"summary": "Dr. Smith has openings", "quickInfo": {"phoneFormatted": "(555) 123-4567"}}}"#;

    fn governor(mock: Arc<MockLlmClient>, config: GovernorConfig) -> Governor {
        let client = ResearchClient::new(mock, Arc::new(PromptLoader::embedded_only()), &LlmConfig::default());
        Governor::new(config, Arc::new(client))
    }

    fn small_config(max: u32) -> GovernorConfig {
        GovernorConfig {
            rate_limit_max: max,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_personal_task_skips_everything() {
        let mock = Arc::new(MockLlmClient::with_texts(&[]));
        let governor = governor(mock.clone(), small_config(1));

        for _ in 0..3 {
            let reply = governor.research("t1", "Call mom tonight", "ip").await;
            assert_eq!(reply.status, ReplyStatus::Ok);
            assert_eq!(reply.response, ResearchResponse::personal());
            assert!(reply.quota.is_none());
        }
        assert_eq!(mock.call_count(), 0);
        assert!(governor.quota("ip").await.is_none());
    }

    #[tokio::test]
    async fn test_success_is_cached_without_counting() {
        let mock = Arc::new(MockLlmClient::with_texts(&[DENTIST_JSON]));
        let governor = governor(mock.clone(), GovernorConfig::default());

        let first = governor.research_at("t1", "Book dentist", "ip", 1_000).await;
        assert_eq!(first.status, ReplyStatus::Ok);
        assert_eq!(first.quota.unwrap().remaining, 9);
        let research = first.response.research.clone().unwrap();
        assert_eq!(
            research.quick_info.unwrap().phone_formatted.as_deref(),
            Some("(555) 123-4567")
        );

        let second = governor.research_at("t2", "  BOOK DENTIST ", "ip", 2_000).await;
        assert_eq!(second.response, first.response);
        assert!(second.quota.is_none());

        assert_eq!(mock.call_count(), 1);
        assert_eq!(governor.quota("ip").await.unwrap().count, 1);
    }

    #[tokio::test]
    async fn test_cache_expires_after_ttl() {
        let mock = Arc::new(MockLlmClient::with_texts(&[DENTIST_JSON, DENTIST_JSON]));
        let config = GovernorConfig {
            cache_ttl_secs: 10,
            ..Default::default()
        };
        let governor = governor(mock.clone(), config);

        let start = now_ms();
        governor.research_at("t1", "Book dentist", "ip", start).await;
        governor.research_at("t1", "Book dentist", "ip", start + 60_000).await;
        assert_eq!(mock.call_count(), 2);
    }

    #[tokio::test]
    async fn test_rate_limit_counts_failures() {
        let mock = Arc::new(MockLlmClient::failing(500));
        let governor = governor(mock.clone(), small_config(3));

        for i in 0..3 {
            let reply = governor.research_at("t", &format!("Find flights {}", i), "ip", 0).await;
            assert_eq!(reply.status, ReplyStatus::Failed);
            assert!(!reply.response.success);
            assert!(reply.response.error.is_some());
        }

        let limited = governor.research_at("t", "Find hotels", "ip", 0).await;
        assert_eq!(limited.status, ReplyStatus::RateLimited);
        assert_eq!(limited.quota.unwrap().remaining, 0);
        assert_eq!(
            limited.response.error.as_deref(),
            Some("Rate limit exceeded. You can make 3 research requests per day.")
        );
        assert_eq!(mock.call_count(), 3);
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let mock = Arc::new(MockLlmClient::with_texts(&["no json here", DENTIST_JSON]));
        let governor = governor(mock.clone(), GovernorConfig::default());

        let failed = governor.research_at("t1", "Book dentist", "ip", 0).await;
        assert_eq!(failed.status, ReplyStatus::Failed);
        assert!(failed.response.error.unwrap().contains("no JSON found"));
        assert_eq!(governor.cached_len().await, 0);

        let retried = governor.research_at("t1", "Book dentist", "ip", 1).await;
        assert_eq!(retried.status, ReplyStatus::Ok);
        assert_eq!(retried.quota.unwrap().remaining, 8);
    }

    #[tokio::test]
    async fn test_window_resets_after_expiry() {
        let mock = Arc::new(MockLlmClient::failing(500));
        let config = GovernorConfig {
            rate_limit_max: 1,
            rate_limit_window_secs: 1,
            ..Default::default()
        };
        let governor = governor(mock.clone(), config);

        governor.research_at("t", "Find flights", "ip", 0).await;
        let limited = governor.research_at("t", "Find flights", "ip", 500).await;
        assert_eq!(limited.status, ReplyStatus::RateLimited);
        assert_eq!(limited.quota.unwrap().reset_at, 1000);

        let after = governor.research_at("t", "Find flights", "ip", 1001).await;
        assert_eq!(after.status, ReplyStatus::Failed);
        assert_eq!(mock.call_count(), 2);
    }

    #[tokio::test]
    async fn test_restored_quota_is_enforced() {
        let mock = Arc::new(MockLlmClient::with_texts(&[DENTIST_JSON]));
        let governor = governor(mock.clone(), small_config(2));
        governor
            .restore_quota("default", RateLimitInfo { count: 2, reset_at: 10_000 })
            .await;

        let reply = governor.research_at("t1", "Book dentist", "default", 5_000).await;
        assert_eq!(reply.status, ReplyStatus::RateLimited);
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_model_personal_verdict_is_cached() {
        let mock = Arc::new(MockLlmClient::with_texts(&[r#"{"isPersonal": true}"#]));
        let governor = governor(mock.clone(), GovernorConfig::default());

        let reply = governor.research_at("t1", "Ponder the meaning of life", "ip", 0).await;
        assert_eq!(reply.response, ResearchResponse::personal());
        governor.research_at("t1", "Ponder the meaning of life", "ip", 1).await;
        assert_eq!(mock.call_count(), 1);
    }
}
