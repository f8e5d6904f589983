use std::time::Duration;

use super::domain::email::EmailDomainPolicy;

pub const DEFAULT_OTP_LENGTH: usize = 6;
pub const DEFAULT_OTP_TTL_MINUTES: i64 = 10;
pub const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(10);

/// Settings for the signup and verification flow.
#[derive(Clone, Debug)]
pub struct AccountsConfig {
    /// Domains that may sign up. Empty allows all.
    pub email_policy: EmailDomainPolicy,
    /// Number of digits in codes issued by the local ledger.
    pub otp_length: usize,
    pub otp_ttl_minutes: i64,
    /// How long to wait on the OTP provider before giving up.
    pub provider_timeout: Duration,
}

impl Default for AccountsConfig {
    fn default() -> Self {
        Self {
            email_policy: EmailDomainPolicy::default(),
            otp_length: DEFAULT_OTP_LENGTH,
            otp_ttl_minutes: DEFAULT_OTP_TTL_MINUTES,
            provider_timeout: DEFAULT_PROVIDER_TIMEOUT,
        }
    }
}
