//! Delivery and verification of one-time passwords.
//!
//! The flow controller only ever sees [`OtpProvider`]. Which implementation
//! backs it is chosen once, at startup.

mod local;
mod stytch;

use std::{fmt, sync::Arc};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use local::LocalProvider;
pub use stytch::{StytchEnvironment, StytchProvider};

/// An opaque token correlating a sent code with its later verification.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(transparent)]
pub struct VerificationHandle(String);

impl VerificationHandle {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VerificationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider could not be reached or rejected the request.
    #[error("OTP provider request failed")]
    Unavailable(#[source] anyhow::Error),

    /// The provider accepted the request but gave back nothing to verify
    /// against later.
    #[error("OTP provider returned no verification handle")]
    MissingHandle,
}

#[async_trait]
pub trait OtpProvider: Send + Sync {
    /// Deliver a new code to `email`.
    async fn send_code(&self, email: &str) -> Result<VerificationHandle, ProviderError>;

    /// Check a submitted code.
    ///
    /// The handle is preferred when present. Without one, providers that can
    /// verify by email address do so. A wrong, expired or unverifiable code is
    /// `Ok(false)`; errors are reserved for the provider itself failing.
    async fn verify_code(
        &self,
        submitted_code: &str,
        handle: Option<&VerificationHandle>,
        email: &str,
    ) -> Result<bool, ProviderError>;

    /// The number of digits in the codes this provider sends.
    fn code_length(&self) -> usize;
}

pub type DynOtpProvider = Arc<dyn OtpProvider>;
