use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::error;

use crate::{paths, rate_limit::RateLimitResult};

#[derive(Serialize)]
pub struct InternalServerError {
    pub message: String,
}

impl Default for InternalServerError {
    fn default() -> Self {
        Self {
            message: "Internal server error.".to_string(),
        }
    }
}

impl IntoResponse for InternalServerError {
    fn into_response(self) -> Response {
        (StatusCode::INTERNAL_SERVER_ERROR, Json(self)).into_response()
    }
}

#[derive(Serialize)]
pub struct ErrorRep {
    pub message: String,
}

/// A message paired with the path the client should move on to.
#[derive(Debug, Serialize)]
pub struct NextStepRep {
    pub message: String,
    pub next: String,
}

impl NextStepRep {
    pub fn new(message: impl Into<String>, next: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            next: next.into(),
        }
    }
}

pub enum ApiError {
    /// A request with field-level problems. The response body lists them.
    BadRequest(Response),
    BadRequestReason(String),
    InternalServerError(InternalServerError),
    /// The provider delivering codes could not be reached.
    ServiceUnavailable(String),
    TooManyRequests(RateLimitResult),
    /// The caller has to (re)start at the contained step.
    Unauthorized(NextStepRep),
}

impl ApiError {
    pub fn bad_request<T: Serialize>(rep: T) -> Self {
        Self::BadRequest((StatusCode::BAD_REQUEST, Json(rep)).into_response())
    }

    /// The caller is not logged in, or their verification is gone.
    pub fn login_required(message: impl Into<String>) -> Self {
        Self::Unauthorized(NextStepRep::new(message, paths::LOGIN))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::BadRequest(response) => response,
            Self::BadRequestReason(message) => {
                (StatusCode::BAD_REQUEST, Json(ErrorRep { message })).into_response()
            }
            Self::InternalServerError(inner) => inner.into_response(),
            Self::ServiceUnavailable(message) => {
                (StatusCode::SERVICE_UNAVAILABLE, Json(ErrorRep { message })).into_response()
            }
            Self::TooManyRequests(result) => result.into_response(),
            Self::Unauthorized(rep) => (StatusCode::UNAUTHORIZED, Json(rep)).into_response(),
        }
    }
}

impl From<InternalServerError> for ApiError {
    fn from(error: InternalServerError) -> Self {
        Self::InternalServerError(error)
    }
}

impl From<RateLimitResult> for ApiError {
    fn from(result: RateLimitResult) -> Self {
        Self::TooManyRequests(result)
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(error: anyhow::Error) -> Self {
        error!(?error, "Received error.");

        Self::InternalServerError(Default::default())
    }
}

pub type ApiResponse<T> = Result<T, ApiError>;
