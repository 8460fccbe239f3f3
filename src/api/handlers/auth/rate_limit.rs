//! Admission checks applied ahead of the credential flows.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::warn;

#[derive(Clone, Copy, Debug)]
pub enum RateLimitAction {
    Login,
    ForgotPassword,
    RequestVerify,
}

impl RateLimitAction {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::ForgotPassword => "forgot-password",
            Self::RequestVerify => "request-verify",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed,
    Limited,
}

pub trait RateLimiter: Send + Sync {
    fn check_ip(&self, ip: Option<&str>, action: RateLimitAction) -> RateLimitDecision;
}

/// Test/dev limiter that never rejects.
#[derive(Clone, Debug)]
pub struct NoopRateLimiter;

impl RateLimiter for NoopRateLimiter {
    fn check_ip(&self, _ip: Option<&str>, _action: RateLimitAction) -> RateLimitDecision {
        RateLimitDecision::Allowed
    }
}

struct Window {
    started_at: Instant,
    count: u32,
}

/// In-process fixed-window limiter keyed by action and caller IP.
///
/// Handlers resolve the IP from `x-forwarded-for` / `x-real-ip` with the
/// connection peer as fallback; a `None` key shares one bucket.
pub struct FixedWindowLimiter {
    max_requests: u32,
    window: Duration,
    windows: Mutex<HashMap<String, Window>>,
}

impl FixedWindowLimiter {
    #[must_use]
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests: max_requests.max(1),
            window,
            windows: Mutex::new(HashMap::new()),
        }
    }
}

impl RateLimiter for FixedWindowLimiter {
    fn check_ip(&self, ip: Option<&str>, action: RateLimitAction) -> RateLimitDecision {
        let key = format!("{}:{}", action.as_str(), ip.unwrap_or("unknown"));
        let mut windows = match self.windows.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        // Drop stale buckets so the map stays bounded by active callers.
        windows.retain(|_, window| window.started_at.elapsed() < self.window);

        let window = windows.entry(key).or_insert_with(|| Window {
            started_at: Instant::now(),
            count: 0,
        });
        if window.started_at.elapsed() >= self.window {
            window.started_at = Instant::now();
            window.count = 0;
        }
        window.count = window.count.saturating_add(1);

        if window.count > self.max_requests {
            warn!(action = action.as_str(), "rate limit exceeded");
            RateLimitDecision::Limited
        } else {
            RateLimitDecision::Allowed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn noop_rate_limiter_allows() {
        let limiter = NoopRateLimiter;
        assert_eq!(
            limiter.check_ip(None, RateLimitAction::Login),
            RateLimitDecision::Allowed
        );
        assert_eq!(
            limiter.check_ip(Some("1.2.3.4"), RateLimitAction::ForgotPassword),
            RateLimitDecision::Allowed
        );
    }

    #[test]
    fn fixed_window_limits_after_budget() {
        let limiter = FixedWindowLimiter::new(3, Duration::from_secs(60));
        for _ in 0..3 {
            assert_eq!(
                limiter.check_ip(Some("1.2.3.4"), RateLimitAction::Login),
                RateLimitDecision::Allowed
            );
        }
        assert_eq!(
            limiter.check_ip(Some("1.2.3.4"), RateLimitAction::Login),
            RateLimitDecision::Limited
        );
    }

    #[test]
    fn budgets_are_per_ip_and_action() {
        let limiter = FixedWindowLimiter::new(1, Duration::from_secs(60));
        assert_eq!(
            limiter.check_ip(Some("1.2.3.4"), RateLimitAction::Login),
            RateLimitDecision::Allowed
        );
        assert_eq!(
            limiter.check_ip(Some("5.6.7.8"), RateLimitAction::Login),
            RateLimitDecision::Allowed
        );
        assert_eq!(
            limiter.check_ip(Some("1.2.3.4"), RateLimitAction::ForgotPassword),
            RateLimitDecision::Allowed
        );
        assert_eq!(
            limiter.check_ip(Some("1.2.3.4"), RateLimitAction::Login),
            RateLimitDecision::Limited
        );
    }

    #[test]
    fn window_resets_after_elapse() {
        let limiter = FixedWindowLimiter::new(1, Duration::from_millis(40));
        assert_eq!(
            limiter.check_ip(Some("1.2.3.4"), RateLimitAction::Login),
            RateLimitDecision::Allowed
        );
        assert_eq!(
            limiter.check_ip(Some("1.2.3.4"), RateLimitAction::Login),
            RateLimitDecision::Limited
        );
        sleep(Duration::from_millis(60));
        assert_eq!(
            limiter.check_ip(Some("1.2.3.4"), RateLimitAction::Login),
            RateLimitDecision::Allowed
        );
    }

    #[test]
    fn missing_ip_shares_one_bucket() {
        let limiter = FixedWindowLimiter::new(1, Duration::from_secs(60));
        assert_eq!(
            limiter.check_ip(None, RateLimitAction::Login),
            RateLimitDecision::Allowed
        );
        assert_eq!(
            limiter.check_ip(None, RateLimitAction::Login),
            RateLimitDecision::Limited
        );
    }
}
