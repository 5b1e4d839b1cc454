//! Per-identity request quota

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Requests counted in the current window for one identity
///
/// The window resets by replacement once `now > reset_at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitInfo {
    pub count: u32,
    /// Window end (Unix milliseconds)
    pub reset_at: i64,
}

impl RateLimitInfo {
    /// A fresh, empty window starting at `now`
    pub fn fresh(now: i64, window_ms: i64) -> Self {
        Self {
            count: 0,
            reset_at: now.saturating_add(window_ms),
        }
    }

    pub fn is_expired(&self, now: i64) -> bool {
        now > self.reset_at
    }

    /// Replace an expired window with a fresh one; returns whether it reset
    pub fn roll(&mut self, now: i64, window_ms: i64) -> bool {
        if self.is_expired(now) {
            debug!(count = self.count, reset_at = self.reset_at, now, "RateLimitInfo::roll: window expired");
            *self = Self::fresh(now, window_ms);
            true
        } else {
            false
        }
    }

    /// Requests left in this window, never negative
    pub fn remaining(&self, max: u32) -> u32 {
        max.saturating_sub(self.count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roll_only_after_reset_at() {
        let mut info = RateLimitInfo { count: 4, reset_at: 1000 };
        assert!(!info.roll(1000, 500));
        assert_eq!(info.count, 4);

        assert!(info.roll(1001, 500));
        assert_eq!(info, RateLimitInfo { count: 0, reset_at: 1501 });
    }

    #[test]
    fn test_remaining_saturates() {
        let info = RateLimitInfo { count: 12, reset_at: 0 };
        assert_eq!(info.remaining(10), 0);
        assert_eq!(RateLimitInfo::fresh(0, 10).remaining(10), 10);
    }

    #[test]
    fn test_serializes_camel_case() {
        let json = serde_json::to_value(RateLimitInfo { count: 1, reset_at: 2 }).unwrap();
        assert_eq!(json, serde_json::json!({"count": 1, "resetAt": 2}));
    }
}
