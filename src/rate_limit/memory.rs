use std::{collections::HashMap, sync::Mutex};

use anyhow::anyhow;
use chrono::{DateTime, Utc};

use super::{window_length, RateLimitResult, RateLimiter};

/// An in-process rate limiter.
///
/// Each key gets a one minute window that starts with its first attempt.
/// Limits are not shared between processes.
#[derive(Default)]
pub struct MemoryRateLimiter {
    windows: Mutex<HashMap<String, (DateTime<Utc>, u64)>>,
}

impl MemoryRateLimiter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RateLimiter for MemoryRateLimiter {
    fn is_limited(&self, key: &str, max_req_per_min: u64) -> anyhow::Result<RateLimitResult> {
        let mut windows = self
            .windows
            .lock()
            .map_err(|_| anyhow!("rate limiter lock was poisoned"))?;

        let now = Utc::now();
        // Drop windows that have ended so the map does not grow without bound.
        windows.retain(|_, (started, _)| now - *started < window_length());

        let (started, attempts) = windows.entry(key.to_owned()).or_insert((now, 0));
        *attempts = attempts.saturating_add(1);

        Ok(RateLimitResult::for_attempt(
            *attempts,
            max_req_per_min,
            *started + window_length(),
        ))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn limits_after_max_attempts() -> anyhow::Result<()> {
        let limiter = MemoryRateLimiter::new();

        for _ in 0..3 {
            assert!(matches!(
                limiter.is_limited("login_203.0.113.7", 3)?,
                RateLimitResult::NotLimited
            ));
        }

        assert!(matches!(
            limiter.is_limited("login_203.0.113.7", 3)?,
            RateLimitResult::LimitedUntil(_)
        ));

        Ok(())
    }

    #[test]
    fn keys_are_limited_independently() -> anyhow::Result<()> {
        let limiter = MemoryRateLimiter::new();

        assert!(matches!(
            limiter.is_limited("login_a", 1)?,
            RateLimitResult::NotLimited
        ));
        assert!(matches!(
            limiter.is_limited("login_b", 1)?,
            RateLimitResult::NotLimited
        ));

        Ok(())
    }
}
