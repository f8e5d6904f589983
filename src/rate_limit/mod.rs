//! Per-client attempt limits for the account flow.

mod memory;
mod redis;

use axum::{
    http::{header::RETRY_AFTER, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

pub use self::memory::MemoryRateLimiter;
pub use self::redis::RedisRateLimiter;

/// A requests-per-minute definition of a rate limiter.
pub trait RateLimiter: Send + Sync {
    /// Record an attempt against a resource and report whether the attempt
    /// exceeds the limit.
    ///
    /// # Arguments
    ///
    /// * `key` - A unique key for the resource being rate limited. In the
    ///   context of a web request, this should encapsulate the request path and
    ///   method, as well as the actor making the request.
    /// * `max_req_per_min` - The maximum number of requests allowed in a given
    ///   minute.
    ///
    /// # Returns
    ///
    /// An [Err] is returned if the limiter's backing store could not be
    /// consulted.
    fn is_limited(&self, key: &str, max_req_per_min: u64) -> anyhow::Result<RateLimitResult>;
}

fn window_length() -> Duration {
    Duration::minutes(1)
}

#[derive(Debug)]
pub enum RateLimitResult {
    /// The rate limit has not been exceeded.
    NotLimited,
    /// The rate limit has been exceeded. Requests will be accepted again at the
    /// contained timestamp.
    LimitedUntil(DateTime<Utc>),
}

impl RateLimitResult {
    /// Judge an attempt given the number of attempts made in the current
    /// window, the attempt itself included.
    fn for_attempt(attempts: u64, max_req_per_min: u64, window_end: DateTime<Utc>) -> Self {
        if attempts > max_req_per_min {
            Self::LimitedUntil(window_end)
        } else {
            Self::NotLimited
        }
    }

    /// Whole seconds until the limit lifts, rounded up.
    fn retry_after_seconds(&self, now: DateTime<Utc>) -> Option<i64> {
        match self {
            Self::NotLimited => None,
            Self::LimitedUntil(until) => {
                let remaining = (*until - now).num_milliseconds().max(0);

                Some((remaining + 999) / 1000)
            }
        }
    }
}

#[derive(Serialize)]
pub struct RateLimitResponse {
    pub message: String,
    pub retry_after_seconds: i64,
}

impl IntoResponse for RateLimitResult {
    fn into_response(self) -> Response {
        let retry_after_seconds = match self.retry_after_seconds(Utc::now()) {
            Some(seconds) => seconds,
            // Only limited results are expected to reach a response.
            None => return StatusCode::OK.into_response(),
        };

        let body = RateLimitResponse {
            message: "Too many attempts. Please try again later.".to_owned(),
            retry_after_seconds,
        };

        (
            StatusCode::TOO_MANY_REQUESTS,
            [(RETRY_AFTER, HeaderValue::from(retry_after_seconds))],
            Json(body),
        )
            .into_response()
    }
}
