use anyhow::Context;
use chrono::{DurationRound, Utc};

use super::{window_length, RateLimitResult, RateLimiter};

/// A rate limiter that uses Redis as a backing store, so that limits hold
/// across every instance of the service.
///
/// Attempts are counted in fixed windows aligned to the minute.
pub struct RedisRateLimiter {
    client: redis::Client,
}

impl RedisRateLimiter {
    /// Create a new rate limiter.
    ///
    /// # Arguments
    ///
    /// * `connection_uri` - The connection string used to connect to Redis.
    pub fn new(connection_uri: &str) -> anyhow::Result<Self> {
        Ok(Self {
            client: redis::Client::open(connection_uri)
                .context("Invalid Redis connection string.")?,
        })
    }
}

fn window_key(key: &str, window_start: i64) -> String {
    format!("rate_limit:{}:{}", key, window_start)
}

impl RateLimiter for RedisRateLimiter {
    fn is_limited(&self, key: &str, max_req_per_min: u64) -> anyhow::Result<RateLimitResult> {
        let mut conn = self
            .client
            .get_connection()
            .context("Failed to connect to Redis.")?;

        let window_start = Utc::now().duration_trunc(window_length())?;
        let cache_key = window_key(key, window_start.timestamp());

        // INCR hands back the count including this attempt, so concurrent
        // attempts can never both see the last free slot.
        let (attempts,): (u64,) = redis::pipe()
            .atomic()
            .cmd("INCR")
            .arg(&cache_key)
            .cmd("EXPIRE")
            .arg(&cache_key)
            .arg(window_length().num_seconds())
            .ignore()
            .query(&mut conn)?;

        Ok(RateLimitResult::for_attempt(
            attempts,
            max_req_per_min,
            window_start + window_length(),
        ))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn window_keys_differ_per_window() {
        assert_eq!(
            "rate_limit:/accounts/login_post_203.0.113.7:1700000040",
            window_key("/accounts/login_post_203.0.113.7", 1_700_000_040)
        );
        assert_ne!(window_key("login", 60), window_key("login", 120));
    }
}
