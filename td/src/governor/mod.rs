//! Request governor
//!
//! Sits in front of the research client: personal titles short-circuit, fresh
//! cached results are returned verbatim, and everything else is counted
//! against a per-identity quota before the model is called.

mod cache;
mod config;
mod core;
mod rate_limit;
mod response;

pub use cache::{ResponseCache, cache_key};
pub use config::GovernorConfig;
pub use self::core::{Governor, rate_limit_message};
pub use rate_limit::{RateDecision, RateLimiter};
pub use response::{GovernorReply, Quota, ReplyStatus, ResearchResponse};
