//! Fixed-window rate limiter keyed by requester identity

use std::collections::HashMap;

use tracing::debug;

use crate::domain::RateLimitInfo;

/// Outcome of one rate-limit check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    /// Counted; `remaining` is what is left after this request
    Allowed { remaining: u32, reset_at: i64 },
    Limited { reset_at: i64 },
}

/// In-process per-identity counters; lives as long as the process
#[derive(Debug, Default)]
pub struct RateLimiter {
    windows: HashMap<String, RateLimitInfo>,
    max: u32,
    window_ms: i64,
}

impl RateLimiter {
    pub fn new(max: u32, window_ms: i64) -> Self {
        Self {
            windows: HashMap::new(),
            max,
            window_ms,
        }
    }

    /// Count one request for `identity` unless its window is full
    pub fn check(&mut self, identity: &str, now: i64) -> RateDecision {
        if !self.windows.contains_key(identity) {
            self.sweep(now);
        }
        let window_ms = self.window_ms;
        let info = self
            .windows
            .entry(identity.to_string())
            .or_insert_with(|| RateLimitInfo::fresh(now, window_ms));
        info.roll(now, window_ms);

        if info.count >= self.max {
            debug!(%identity, count = info.count, "RateLimiter::check: limited");
            return RateDecision::Limited {
                reset_at: info.reset_at,
            };
        }

        info.count += 1;
        debug!(%identity, count = info.count, "RateLimiter::check: allowed");
        RateDecision::Allowed {
            remaining: info.remaining(self.max),
            reset_at: info.reset_at,
        }
    }

    /// Adopt a previously persisted window for `identity`
    ///
    /// Only used at startup; a window already counted in this process wins.
    pub fn seed(&mut self, identity: &str, info: RateLimitInfo) {
        debug!(%identity, count = info.count, reset_at = info.reset_at, "RateLimiter::seed: called");
        self.windows.entry(identity.to_string()).or_insert(info);
    }

    /// Current window for `identity`, if any
    pub fn info(&self, identity: &str) -> Option<RateLimitInfo> {
        self.windows.get(identity).copied()
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    /// Drop every window that has run out; an absent window means a full quota
    fn sweep(&mut self, now: i64) {
        let before = self.windows.len();
        self.windows.retain(|_, info| !info.is_expired(now));
        let swept = before - self.windows.len();
        if swept > 0 {
            debug!(swept, "RateLimiter::sweep: dropped expired windows");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_request_opens_window() {
        let mut limiter = RateLimiter::new(10, 1000);
        assert_eq!(
            limiter.check("ip", 5),
            RateDecision::Allowed {
                remaining: 9,
                reset_at: 1005
            }
        );
        assert_eq!(limiter.info("ip").unwrap().count, 1);
    }

    #[test]
    fn test_limit_then_reset() {
        let mut limiter = RateLimiter::new(2, 1000);
        assert!(matches!(limiter.check("ip", 0), RateDecision::Allowed { remaining: 1, .. }));
        assert!(matches!(limiter.check("ip", 1), RateDecision::Allowed { remaining: 0, .. }));
        assert_eq!(limiter.check("ip", 2), RateDecision::Limited { reset_at: 1000 });
        assert_eq!(limiter.info("ip").unwrap().count, 2);

        // Still inside the window at exactly reset_at
        assert!(matches!(limiter.check("ip", 1000), RateDecision::Limited { .. }));
        assert!(matches!(limiter.check("ip", 1001), RateDecision::Allowed { remaining: 1, .. }));
    }

    #[test]
    fn test_seeded_window_counts() {
        let mut limiter = RateLimiter::new(3, 1000);
        limiter.seed("ip", RateLimitInfo { count: 3, reset_at: 500 });
        assert_eq!(limiter.check("ip", 10), RateDecision::Limited { reset_at: 500 });

        // An expired seed rolls over like any other window
        assert!(matches!(limiter.check("ip", 501), RateDecision::Allowed { remaining: 2, .. }));

        limiter.seed("ip", RateLimitInfo { count: 0, reset_at: 0 });
        assert_eq!(limiter.info("ip").unwrap().count, 1);
    }

    #[test]
    fn test_identities_are_independent() {
        let mut limiter = RateLimiter::new(1, 1000);
        assert!(matches!(limiter.check("a", 0), RateDecision::Allowed { .. }));
        assert!(matches!(limiter.check("a", 0), RateDecision::Limited { .. }));
        assert!(matches!(limiter.check("b", 0), RateDecision::Allowed { .. }));
    }

    #[test]
    fn test_new_identity_sweeps_expired_windows() {
        let mut limiter = RateLimiter::new(10, 1000);
        for i in 0..100 {
            limiter.check(&format!("10.0.0.{}", i), 0);
        }
        limiter.check("late", 600);
        assert_eq!(limiter.len(), 101);

        // Repeat callers do not trigger a sweep
        limiter.check("late", 1500);
        assert_eq!(limiter.len(), 101);

        limiter.check("newcomer", 1500);
        assert_eq!(limiter.len(), 2);
        assert!(limiter.info("10.0.0.0").is_none());
        assert_eq!(limiter.info("late").unwrap().count, 2);
    }
}
