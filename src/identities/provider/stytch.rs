use std::time::Duration;

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::{OtpProvider, ProviderError, VerificationHandle};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StytchEnvironment {
    Test,
    Live,
}

impl StytchEnvironment {
    pub fn base_url(&self) -> &'static str {
        match self {
            Self::Test => "https://test.stytch.com/v1/",
            Self::Live => "https://api.stytch.com/v1/",
        }
    }
}

/// Email one-time passwords delivered and verified by Stytch.
pub struct StytchProvider {
    client: Client,
    base_url: String,
    project_id: String,
    secret: String,
    expiration_minutes: i64,
}

#[derive(Serialize)]
struct LoginOrCreateRequest<'a> {
    email: &'a str,
    expiration_minutes: i64,
}

#[derive(Serialize)]
struct AuthenticateRequest<'a> {
    method_id: &'a str,
    code: &'a str,
}

impl StytchProvider {
    pub fn new(
        environment: StytchEnvironment,
        project_id: String,
        secret: String,
        expiration_minutes: i64,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build Stytch HTTP client.")?;

        Ok(Self {
            client,
            base_url: environment.base_url().to_owned(),
            project_id,
            secret,
            expiration_minutes,
        })
    }

    /// Point the client at a different API root, such as a local mock.
    pub fn with_base_url(self, base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..self
        }
    }

    async fn post<T: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> reqwest::Result<reqwest::Response> {
        self.client
            .post(format!("{}{}", self.base_url, path))
            .basic_auth(&self.project_id, Some(&self.secret))
            .json(body)
            .send()
            .await
    }
}

/// Stytch email one-time passwords always have six digits.
const STYTCH_CODE_LENGTH: usize = 6;

/// Error types Stytch reports when the request itself was refused, as opposed
/// to the submitted code.
const REQUEST_REJECTIONS: [&str; 3] = [
    "unauthorized_credentials",
    "invalid_secret_authentication",
    "project_id_not_found",
];

/// Decide what a non-success answer to an authenticate call means. Client
/// errors about the code are a failed verification. Anything pointing at the
/// provider or our credentials is an error.
fn classify_rejection(
    status: StatusCode,
    error_type: Option<&str>,
) -> Result<bool, ProviderError> {
    let refused = status.is_server_error()
        || status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::FORBIDDEN
        || error_type.map_or(false, |error_type| REQUEST_REJECTIONS.contains(&error_type));

    if refused {
        Err(ProviderError::Unavailable(anyhow!(
            "Stytch refused verification with {} ({})",
            status,
            error_type.unwrap_or("no error type")
        )))
    } else {
        Ok(false)
    }
}

/// Pull the handle needed for verification out of a send response. Depending
/// on the API version it is reported as `method_id` or `email_id`.
fn extract_method_id(response: &Value) -> Option<VerificationHandle> {
    ["method_id", "email_id"]
        .iter()
        .filter_map(|key| response.get(key).and_then(Value::as_str))
        .find(|id| !id.is_empty())
        .map(VerificationHandle::new)
}

#[async_trait]
impl OtpProvider for StytchProvider {
    async fn send_code(&self, email: &str) -> Result<VerificationHandle, ProviderError> {
        let request = LoginOrCreateRequest {
            email,
            expiration_minutes: self.expiration_minutes,
        };

        let response = self
            .post("otps/email/login_or_create", &request)
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|error| ProviderError::Unavailable(error.into()))?;

        let body: Value = response
            .json()
            .await
            .map_err(|error| ProviderError::Unavailable(error.into()))?;

        let handle = extract_method_id(&body).ok_or(ProviderError::MissingHandle)?;
        info!("Sent email one-time password via Stytch.");

        Ok(handle)
    }

    async fn verify_code(
        &self,
        submitted_code: &str,
        handle: Option<&VerificationHandle>,
        _email: &str,
    ) -> Result<bool, ProviderError> {
        let handle = match handle {
            Some(handle) => handle,
            None => {
                // The REST API can only authenticate against a method id.
                debug!("No verification handle available for Stytch verification.");
                return Ok(false);
            }
        };

        let request = AuthenticateRequest {
            method_id: handle.as_str(),
            code: submitted_code,
        };

        let response = self
            .post("otps/authenticate", &request)
            .await
            .map_err(|error| {
                warn!(?error, "Failed to reach Stytch to verify one-time password.");

                ProviderError::Unavailable(error.into())
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(true);
        }

        let body: Value = response.json().await.unwrap_or(Value::Null);
        let error_type = body.get("error_type").and_then(Value::as_str);
        debug!(%status, ?error_type, "Stytch rejected one-time password.");

        classify_rejection(status, error_type)
    }

    fn code_length(&self) -> usize {
        STYTCH_CODE_LENGTH
    }
}
